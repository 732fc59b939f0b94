//! One handle over a single database and lock table, wiring every service so
//! they all serialize on the same per-user locks.
use crate::catalog::Catalog;
use crate::config::ServiceConfig;
use crate::inventory::InventoryStore;
use crate::locks::LockTable;
use crate::purchase::PurchaseService;
use crate::queries::Queries;
use crate::service::TradeService;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct Marketplace {
    pub catalog: Catalog,
    pub inventories: InventoryStore,
    pub trades: TradeService,
    pub purchases: PurchaseService,
    pub queries: Queries,
}

impl Marketplace {
    pub fn new(instance: Arc<sled::Db>, config: &ServiceConfig) -> Self {
        let locks = Arc::new(LockTable::new(config.lock_timeout()));

        Self {
            catalog: Catalog::new(Arc::clone(&instance), Arc::clone(&locks)),
            inventories: InventoryStore::new(Arc::clone(&instance), Arc::clone(&locks)),
            trades: TradeService::new(Arc::clone(&instance), Arc::clone(&locks)),
            purchases: PurchaseService::new(Arc::clone(&instance), Arc::clone(&locks)),
            queries: Queries::new(instance, locks, config.inventory_page_size),
        }
    }

    /// Open (or create) the database at `config.db_path`.
    pub fn open(config: &ServiceConfig) -> anyhow::Result<Self> {
        let db = sled::open(&config.db_path)?;
        info!(path = %config.db_path.display(), "database opened");
        Ok(Self::new(Arc::new(db), config))
    }
}
