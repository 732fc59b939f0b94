//! Trade records and their status transitions
use crate::error::{Result, TradeError};
use crate::types::{ProductId, TimeStamp, TradeId, UserId};
use serde::{Deserialize, Serialize};

#[derive(
    minicbor::Encode,
    minicbor::Decode,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    Eq,
    Ord,
    PartialEq,
    PartialOrd,
    Hash,
)]
pub enum TradeStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Completed,
    #[n(2)]
    Canceled,
}

impl TradeStatus {
    pub const ALL: [TradeStatus; 3] = [
        TradeStatus::Pending,
        TradeStatus::Completed,
        TradeStatus::Canceled,
    ];

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TradeStatus::Pending)
    }
}

/// Receiver's answer to a pending trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Completed,
    Canceled,
}

impl Decision {
    /// Only the literal "Completed" accepts; every other value rejects.
    pub fn parse(status: &str) -> Self {
        if status == "Completed" {
            Decision::Completed
        } else {
            Decision::Canceled
        }
    }
}

impl From<Decision> for TradeStatus {
    fn from(value: Decision) -> Self {
        match value {
            Decision::Completed => TradeStatus::Completed,
            Decision::Canceled => TradeStatus::Canceled,
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    #[n(0)]
    pub id: TradeId,
    #[n(1)]
    pub initiator: UserId,
    #[n(2)]
    pub receiver: UserId,
    #[n(3)]
    pub initiator_items: Vec<ProductId>,
    #[n(4)]
    pub receiver_items: Vec<ProductId>,
    #[n(5)]
    pub status: TradeStatus,
    #[n(6)]
    pub receiver_confirmed: bool,
    #[n(7)]
    pub created_at: TimeStamp,
}

impl Trade {
    /// Build a pending trade after the shape checks that need no storage.
    pub fn propose(
        initiator: UserId,
        receiver: UserId,
        initiator_items: Vec<ProductId>,
        receiver_items: Vec<ProductId>,
    ) -> Result<Self> {
        if initiator_items.is_empty() && receiver_items.is_empty() {
            return Err(TradeError::InvalidTrade(
                "Trade must contain at least one item".into(),
            ));
        }
        if initiator == receiver {
            return Err(TradeError::InvalidTrade(
                "Receiver cannot be the same as the initiator".into(),
            ));
        }

        Ok(Self {
            id: TradeId::generate()?,
            initiator,
            receiver,
            initiator_items,
            receiver_items,
            status: TradeStatus::Pending,
            receiver_confirmed: false,
            created_at: TimeStamp::new(),
        })
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Pending && !self.receiver_confirmed
    }

    /// Checks that `caller` may resolve this trade right now.
    pub fn ensure_resolvable_by(&self, caller: &UserId) -> Result<()> {
        if !self.is_open() {
            return Err(TradeError::AlreadyClosed);
        }
        if *caller != self.receiver {
            return Err(TradeError::Forbidden(
                "You cannot confirm this trade".into(),
            ));
        }
        Ok(())
    }

    /// Move to the terminal state chosen by the receiver.
    pub fn close(&mut self, decision: Decision) -> Result<()> {
        if !self.is_open() {
            return Err(TradeError::AlreadyClosed);
        }
        self.status = decision.into();
        self.receiver_confirmed = true;
        Ok(())
    }
}
