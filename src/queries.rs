//! Read paths: paginated inventories, trade listings and status counts.
//!
//! Views resolve stored ids against the catalog. A product id the catalog no
//! longer knows resolves to `null` rather than failing the whole view.
use crate::catalog::Catalog;
use crate::error::{Result, TradeError};
use crate::inventory::InventoryStore;
use crate::ledger::TradeLedger;
use crate::locks::LockTable;
use crate::trade::{Trade, TradeStatus};
use crate::types::{OwnerSummary, Product, ProductId, TimeStamp, TradeId, UserId};
use crate::utils;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: usize = 25;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryPage {
    pub user_info: OwnerSummary,
    pub total_items: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub items: Vec<Option<Product>>,
}

#[derive(Debug, Serialize)]
pub struct TraderSide {
    pub products: Vec<Option<Product>>,
    pub user: OwnerSummary,
}

#[derive(Debug, Serialize)]
pub struct TradersInventories {
    pub initiator: TraderSide,
    pub receiver: TraderSide,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeView {
    pub id: TradeId,
    pub initiator_products: Vec<Option<Product>>,
    pub receiver_products: Vec<Option<Product>>,
    pub status: TradeStatus,
    pub initiator: OwnerSummary,
    pub receiver: OwnerSummary,
    pub receiver_confirmed: bool,
    pub is_caller_receiver: bool,
    pub created_at: TimeStamp,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TradeCounts {
    pub trade_counts: BTreeMap<TradeStatus, usize>,
    pub total_trades: usize,
}

/// Memoises catalog lookups across one view.
struct Resolver<'a> {
    catalog: &'a Catalog,
    products: HashMap<ProductId, Option<Product>>,
    owners: HashMap<UserId, OwnerSummary>,
}

impl<'a> Resolver<'a> {
    fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            products: HashMap::new(),
            owners: HashMap::new(),
        }
    }

    fn products(&mut self, ids: &[ProductId]) -> Result<Vec<Option<Product>>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if !self.products.contains_key(id) {
                let product = self.catalog.get_product(id)?;
                self.products.insert(id.clone(), product);
            }
            out.push(self.products.get(id).cloned().flatten());
        }
        Ok(out)
    }

    fn owner(&mut self, id: &UserId) -> Result<OwnerSummary> {
        if let Some(summary) = self.owners.get(id) {
            return Ok(summary.clone());
        }
        let summary = OwnerSummary::from(&self.catalog.require_user(id)?);
        self.owners.insert(id.clone(), summary.clone());
        Ok(summary)
    }
}

#[derive(Clone)]
pub struct Queries {
    catalog: Catalog,
    inventories: InventoryStore,
    ledger: TradeLedger,
    page_size: usize,
}

impl Queries {
    pub fn new(instance: Arc<sled::Db>, locks: Arc<LockTable>, page_size: usize) -> Self {
        Self {
            catalog: Catalog::new(Arc::clone(&instance), Arc::clone(&locks)),
            inventories: InventoryStore::new(Arc::clone(&instance), locks),
            ledger: TradeLedger::new(instance),
            page_size: if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size },
        }
    }

    /// One page of a user's inventory. Pages are 1-based; page 0 reads as 1.
    pub fn list_inventory(&self, owner: &UserId, page: usize) -> Result<InventoryPage> {
        let user = self.catalog.require_user(owner)?;
        let inventory = self
            .inventories
            .load(owner)?
            .ok_or_else(|| TradeError::NotFound("Inventory".into()))?;

        let page = page.max(1);
        let window = utils::page_window(&inventory.items, page, self.page_size);
        let items = Resolver::new(&self.catalog).products(window)?;

        Ok(InventoryPage {
            user_info: OwnerSummary::from(&user),
            total_items: inventory.len(),
            current_page: page,
            total_pages: utils::total_pages(inventory.len(), self.page_size),
            items,
        })
    }

    /// Both sides of a prospective trade, as seen by the initiating caller.
    pub fn traders_inventories(
        &self,
        initiator: &UserId,
        receiver: &UserId,
    ) -> Result<TradersInventories> {
        let missing = || TradeError::NotFound("One or both inventories".into());
        if initiator == receiver {
            return Err(missing());
        }
        let initiator_inventory = self.inventories.load(initiator)?.ok_or_else(missing)?;
        let receiver_inventory = self.inventories.load(receiver)?.ok_or_else(missing)?;

        let mut resolver = Resolver::new(&self.catalog);
        Ok(TradersInventories {
            initiator: TraderSide {
                products: resolver.products(&initiator_inventory.items)?,
                user: resolver.owner(initiator)?,
            },
            receiver: TraderSide {
                products: resolver.products(&receiver_inventory.items)?,
                user: resolver.owner(receiver)?,
            },
        })
    }

    fn trades_of(&self, user: &UserId) -> Result<Vec<Trade>> {
        let user = self.catalog.require_user(user)?;
        self.ledger.get_many(&user.trades)
    }

    /// Every trade the caller takes part in, newest first.
    pub fn list_trades_for_user(&self, caller: &UserId) -> Result<Vec<TradeView>> {
        let mut resolver = Resolver::new(&self.catalog);
        let mut views = Vec::new();

        for trade in self.trades_of(caller)?.into_iter().rev() {
            views.push(TradeView {
                initiator_products: resolver.products(&trade.initiator_items)?,
                receiver_products: resolver.products(&trade.receiver_items)?,
                initiator: resolver.owner(&trade.initiator)?,
                receiver: resolver.owner(&trade.receiver)?,
                is_caller_receiver: trade.receiver == *caller,
                status: trade.status,
                receiver_confirmed: trade.receiver_confirmed,
                created_at: trade.created_at,
                id: trade.id,
            });
        }
        Ok(views)
    }

    pub fn trade_counts_by_status(&self, user: &UserId) -> Result<TradeCounts> {
        let trades = self.trades_of(user)?;

        let mut trade_counts: BTreeMap<TradeStatus, usize> =
            TradeStatus::ALL.iter().map(|status| (*status, 0)).collect();
        for trade in &trades {
            *trade_counts.entry(trade.status).or_default() += 1;
        }

        Ok(TradeCounts {
            trade_counts,
            total_trades: trades.len(),
        })
    }
}
