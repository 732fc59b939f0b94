//! Error taxonomy shared by every store and service, plus the boundary body
//! each error is rendered into.

use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum TradeError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    InvalidTrade(String),
    #[error("{0} does not own all trade products")]
    OwnershipViolation(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Trade is already closed")]
    AlreadyClosed,
    #[error("Not enough money to purchase this product")]
    InsufficientFunds,
    #[error("Inventory of {0} does not hold the requested items")]
    InsufficientItems(String),
    #[error("{0} already exists")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Timed out waiting for the lock on {0}, retry the request")]
    LockTimeout(String),
    #[error("storage failure: {0}")]
    Storage(#[from] sled::Error),
    #[error("failed to encode or decode record: {0}")]
    Codec(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, TradeError>;

/// JSON body returned for failed requests. Unmapped failures omit the status.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

impl TradeError {
    /// HTTP status the boundary reports for this error.
    pub fn status(&self) -> u16 {
        match self {
            TradeError::NotFound(_) => 404,
            TradeError::InvalidTrade(_)
            | TradeError::OwnershipViolation(_)
            | TradeError::AlreadyClosed
            | TradeError::InsufficientFunds
            | TradeError::InsufficientItems(_)
            | TradeError::BadRequest(_) => 400,
            TradeError::Forbidden(_) => 403,
            TradeError::Conflict(_) => 409,
            TradeError::LockTimeout(_) => 503,
            TradeError::Storage(_) | TradeError::Codec(_) | TradeError::Internal(_) => 500,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TradeError::LockTimeout(_))
    }

    pub fn to_body(&self) -> ErrorBody {
        match self.status() {
            500 => ErrorBody {
                status: None,
                message: "Server error".into(),
            },
            status => ErrorBody {
                status: Some(status),
                message: self.to_string(),
            },
        }
    }
}
