//! Service layer API for the trade workflow: proposal and resolution
use crate::catalog::Catalog;
use crate::error::{Result, TradeError};
use crate::inventory::{Inventory, InventoryStore};
use crate::ledger::TradeLedger;
use crate::locks::LockTable;
use crate::trade::{Decision, Trade};
use crate::types::{ProductId, TradeId, UserId};
use sled::Batch;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct TradeService {
    instance: Arc<sled::Db>,
    locks: Arc<LockTable>,
    catalog: Catalog,
    inventories: InventoryStore,
    ledger: TradeLedger,
}

// `side` names the party in the error message
fn check_ownership(
    inventory: &Inventory,
    items: &[ProductId],
    side: &str,
    trade: &TradeId,
) -> Result<()> {
    if inventory.owns_all(items) {
        return Ok(());
    }
    warn!(trade = %trade, owner = %inventory.owner, side, "ownership check failed");
    Err(TradeError::OwnershipViolation(side.to_owned()))
}

impl TradeService {
    pub fn new(instance: Arc<sled::Db>, locks: Arc<LockTable>) -> Self {
        Self {
            catalog: Catalog::new(Arc::clone(&instance), Arc::clone(&locks)),
            inventories: InventoryStore::new(Arc::clone(&instance), Arc::clone(&locks)),
            ledger: TradeLedger::new(Arc::clone(&instance)),
            instance,
            locks,
        }
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    /// Record a pending offer of `initiator_items` for `receiver_items`.
    ///
    /// Both parties must exist, hold an inventory, and currently own the items
    /// they put up (duplicates counted). The trade and the two users' trade
    /// references are written in one batch.
    pub fn propose(
        &self,
        initiator: &UserId,
        receiver: &UserId,
        initiator_items: Vec<ProductId>,
        receiver_items: Vec<ProductId>,
    ) -> Result<Trade> {
        let trade = Trade::propose(
            initiator.clone(),
            receiver.clone(),
            initiator_items,
            receiver_items,
        )?;

        self.locks.with_users(&[initiator, receiver], move || {
            let mut initiator_user = self.catalog.require_user(initiator)?;
            let mut receiver_user = self.catalog.require_user(receiver)?;
            let initiator_inventory = self.inventories.load_required(initiator)?;
            let receiver_inventory = self.inventories.load_required(receiver)?;

            check_ownership(&initiator_inventory, &trade.initiator_items, "Initiator", &trade.id)?;
            check_ownership(&receiver_inventory, &trade.receiver_items, "Receiver", &trade.id)?;

            initiator_user.trades.push(trade.id.clone());
            receiver_user.trades.push(trade.id.clone());

            let mut batch = Batch::default();
            TradeLedger::stage(&mut batch, &trade)?;
            Catalog::stage_user(&mut batch, &initiator_user)?;
            Catalog::stage_user(&mut batch, &receiver_user)?;
            self.instance.apply_batch(batch)?;

            info!(
                trade = %trade.id,
                initiator = %initiator,
                receiver = %receiver,
                offered = trade.initiator_items.len(),
                requested = trade.receiver_items.len(),
                "trade proposed"
            );
            Ok(trade)
        })
    }

    /// Close a pending trade on behalf of its receiver.
    ///
    /// Completing re-checks both sides against the inventories as they are now,
    /// then swaps the items. The four inventory changes and the status change
    /// land in a single batch while both parties' locks are held. A failed
    /// re-check leaves the trade pending and both inventories untouched.
    pub fn resolve(&self, trade_id: &TradeId, caller: &UserId, decision: Decision) -> Result<Trade> {
        let snapshot = self.ledger.require(trade_id)?;
        snapshot.ensure_resolvable_by(caller)?;

        self.locks.with_users(&[&snapshot.initiator, &snapshot.receiver], || {
            // re-read: a concurrent resolve may have closed it while we waited
            let mut trade = self.ledger.require(trade_id)?;
            trade.ensure_resolvable_by(caller)?;

            let mut batch = Batch::default();
            if decision == Decision::Completed {
                let mut initiator_inventory = self.inventories.load_required(&trade.initiator)?;
                let mut receiver_inventory = self.inventories.load_required(&trade.receiver)?;

                check_ownership(&initiator_inventory, &trade.initiator_items, "Initiator", &trade.id)?;
                check_ownership(&receiver_inventory, &trade.receiver_items, "Receiver", &trade.id)?;

                initiator_inventory.remove_items(&trade.initiator_items)?;
                receiver_inventory.remove_items(&trade.receiver_items)?;
                initiator_inventory.add_items(&trade.receiver_items);
                receiver_inventory.add_items(&trade.initiator_items);

                InventoryStore::stage(&mut batch, &initiator_inventory)?;
                InventoryStore::stage(&mut batch, &receiver_inventory)?;
            }

            trade.close(decision)?;
            TradeLedger::stage(&mut batch, &trade)?;
            self.instance.apply_batch(batch)?;

            info!(trade = %trade.id, status = ?trade.status, "trade resolved");
            Ok(trade)
        })
    }
}
