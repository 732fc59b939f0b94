//! Buying a catalog product into a user's inventory
use crate::catalog::Catalog;
use crate::error::{Result, TradeError};
use crate::inventory::{Inventory, InventoryStore};
use crate::locks::LockTable;
use crate::types::{ProductId, UserId};
use sled::Batch;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct PurchaseService {
    instance: Arc<sled::Db>,
    locks: Arc<LockTable>,
    catalog: Catalog,
    inventories: InventoryStore,
}

impl PurchaseService {
    pub fn new(instance: Arc<sled::Db>, locks: Arc<LockTable>) -> Self {
        Self {
            catalog: Catalog::new(Arc::clone(&instance), Arc::clone(&locks)),
            inventories: InventoryStore::new(Arc::clone(&instance), Arc::clone(&locks)),
            instance,
            locks,
        }
    }

    /// Debit the product's price and append one unit to the buyer's inventory,
    /// creating the inventory on first purchase. Every call is a new purchase.
    pub fn purchase(&self, buyer: &UserId, product_id: &ProductId) -> Result<Inventory> {
        let product = self
            .catalog
            .get_product(product_id)?
            .ok_or_else(|| TradeError::NotFound("Product".into()))?;

        self.locks.with_users(&[buyer], || {
            let mut user = self.catalog.require_user(buyer)?;
            if user.balance < product.price {
                return Err(TradeError::InsufficientFunds);
            }

            let mut inventory = self
                .inventories
                .load(buyer)?
                .unwrap_or_else(|| Inventory::new(buyer.clone()));
            inventory.add_items(std::slice::from_ref(&product.id));
            user.balance -= product.price;

            let mut batch = Batch::default();
            Catalog::stage_user(&mut batch, &user)?;
            InventoryStore::stage(&mut batch, &inventory)?;
            self.instance.apply_batch(batch)?;

            info!(
                buyer = %buyer,
                product = %product.id,
                price = product.price,
                balance = user.balance,
                "product purchased"
            );
            Ok(inventory)
        })
    }
}
