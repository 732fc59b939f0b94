//! Durable trade records. Trades are written once at proposal, rewritten once
//! at resolution and never deleted.
use crate::error::{Result, TradeError};
use crate::trade::Trade;
use crate::types::TradeId;
use crate::utils::{self, keys};
use sled::Batch;
use std::sync::Arc;

#[derive(Clone)]
pub struct TradeLedger {
    instance: Arc<sled::Db>,
}

impl TradeLedger {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self { instance }
    }

    pub fn get(&self, id: &TradeId) -> Result<Option<Trade>> {
        utils::load(&self.instance, &keys::trade(id.as_str()))
    }

    pub fn require(&self, id: &TradeId) -> Result<Trade> {
        self.get(id)?
            .ok_or_else(|| TradeError::NotFound(format!("Trade {id}")))
    }

    pub(crate) fn stage(batch: &mut Batch, trade: &Trade) -> Result<()> {
        batch.insert(keys::trade(trade.id.as_str()).as_bytes(), utils::encode(trade)?);
        Ok(())
    }

    /// Load trades by id in the given order, skipping ids with no record.
    pub fn get_many(&self, ids: &[TradeId]) -> Result<Vec<Trade>> {
        let mut trades = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(trade) = self.get(id)? {
                trades.push(trade);
            }
        }
        Ok(trades)
    }

    pub fn len(&self) -> usize {
        self.instance.scan_prefix(keys::TRADE.as_bytes()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
