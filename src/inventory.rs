//! Per-user inventories and the multiset ownership rules over them.
use crate::error::{Result, TradeError};
use crate::locks::LockTable;
use crate::types::{ProductId, UserId};
use crate::utils::{self, keys};
use serde::Serialize;
use sled::Batch;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Ordered multiset of the products a user owns. A product owned in several
/// units appears once per unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, minicbor::Encode, minicbor::Decode)]
pub struct Inventory {
    #[n(0)]
    pub owner: UserId,
    #[n(1)]
    pub items: Vec<ProductId>,
}

impl Inventory {
    pub fn new(owner: UserId) -> Self {
        Self {
            owner,
            items: vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of units of `product` held.
    pub fn count_of(&self, product: &ProductId) -> usize {
        self.items.iter().filter(|item| *item == product).count()
    }

    /// True when every requested unit is held, counting duplicates.
    pub fn owns_all(&self, requested: &[ProductId]) -> bool {
        let mut needed: HashMap<&ProductId, usize> = HashMap::new();
        for item in requested {
            *needed.entry(item).or_default() += 1;
        }
        needed
            .into_iter()
            .all(|(product, count)| self.count_of(product) >= count)
    }

    /// Remove one unit per requested id, first match wins. Nothing is removed
    /// unless every unit is held.
    pub fn remove_items(&mut self, requested: &[ProductId]) -> Result<()> {
        if !self.owns_all(requested) {
            return Err(TradeError::InsufficientItems(self.owner.to_string()));
        }
        for item in requested {
            if let Some(pos) = self.items.iter().position(|owned| owned == item) {
                self.items.remove(pos);
            }
        }
        Ok(())
    }

    pub fn add_items(&mut self, items: &[ProductId]) {
        self.items.extend_from_slice(items);
    }
}

/// Durable inventory documents, one per user, keyed by the owner's id.
#[derive(Clone)]
pub struct InventoryStore {
    instance: Arc<sled::Db>,
    locks: Arc<LockTable>,
}

impl InventoryStore {
    pub fn new(instance: Arc<sled::Db>, locks: Arc<LockTable>) -> Self {
        Self { instance, locks }
    }

    /// Read the inventory without taking the owner's lock.
    pub fn load(&self, owner: &UserId) -> Result<Option<Inventory>> {
        utils::load(&self.instance, &keys::inventory(owner.as_str()))
    }

    pub(crate) fn load_required(&self, owner: &UserId) -> Result<Inventory> {
        self.load(owner)?
            .ok_or_else(|| TradeError::NotFound(format!("Inventory of {owner}")))
    }

    /// Queue the write of `inventory` into `batch`.
    pub(crate) fn stage(batch: &mut Batch, inventory: &Inventory) -> Result<()> {
        batch.insert(
            keys::inventory(inventory.owner.as_str()).as_bytes(),
            utils::encode(inventory)?,
        );
        Ok(())
    }

    fn save(&self, inventory: &Inventory) -> Result<()> {
        let mut batch = Batch::default();
        Self::stage(&mut batch, inventory)?;
        self.instance.apply_batch(batch)?;
        Ok(())
    }

    /// Existing inventory, or a freshly persisted empty one.
    pub fn get_or_create(&self, owner: &UserId) -> Result<Inventory> {
        if let Some(inventory) = self.load(owner)? {
            return Ok(inventory);
        }
        self.locks.with_users(&[owner], || {
            // another caller may have created it while we waited
            if let Some(inventory) = self.load(owner)? {
                return Ok(inventory);
            }
            let inventory = Inventory::new(owner.clone());
            self.save(&inventory)?;
            info!(owner = %owner, "inventory created");
            Ok(inventory)
        })
    }

    /// Ownership test against the current document. A missing inventory owns
    /// only the empty request.
    pub fn owns_all(&self, owner: &UserId, items: &[ProductId]) -> Result<bool> {
        Ok(match self.load(owner)? {
            Some(inventory) => inventory.owns_all(items),
            None => items.is_empty(),
        })
    }

    pub fn remove_items(&self, owner: &UserId, items: &[ProductId]) -> Result<Inventory> {
        self.locks.with_users(&[owner], || {
            let mut inventory = match self.load(owner)? {
                Some(inventory) => inventory,
                None if items.is_empty() => return Ok(Inventory::new(owner.clone())),
                None => return Err(TradeError::InsufficientItems(owner.to_string())),
            };
            inventory.remove_items(items)?;
            self.save(&inventory)?;
            info!(owner = %owner, removed = items.len(), "inventory items removed");
            Ok(inventory)
        })
    }

    pub fn add_items(&self, owner: &UserId, items: &[ProductId]) -> Result<Inventory> {
        self.locks.with_users(&[owner], || {
            let mut inventory = self.get_or_create_locked(owner)?;
            inventory.add_items(items);
            self.save(&inventory)?;
            info!(owner = %owner, added = items.len(), "inventory items added");
            Ok(inventory)
        })
    }

    // caller holds the owner's lock
    fn get_or_create_locked(&self, owner: &UserId) -> Result<Inventory> {
        match self.load(owner)? {
            Some(inventory) => Ok(inventory),
            None => {
                let inventory = Inventory::new(owner.clone());
                self.save(&inventory)?;
                Ok(inventory)
            }
        }
    }
}
