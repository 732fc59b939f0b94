pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod locks;
pub mod logging;
pub mod market;
pub mod purchase;
pub mod queries;
pub mod service;
pub mod trade;
pub mod types;
pub mod utils;

pub use error::{Result, TradeError};
pub use market::Marketplace;
