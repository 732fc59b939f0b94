//! Utility functions for identifiers, keys and record serialization

use crate::error::{Result, TradeError};
use bech32::Bech32m;
use uuid7::uuid7;

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

pub(crate) fn encode<T: minicbor::Encode<()>>(record: &T) -> Result<Vec<u8>> {
    minicbor::to_vec(record).map_err(|e| TradeError::Codec(e.to_string()))
}

pub(crate) fn decode<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    minicbor::decode(bytes).map_err(|e| TradeError::Codec(e.to_string()))
}

/// Load and decode a record, `None` when the key is absent.
pub(crate) fn load<T>(db: &sled::Db, key: &str) -> Result<Option<T>>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    match db.get(key.as_bytes())? {
        Some(bytes) => decode(&bytes).map(Some),
        None => Ok(None),
    }
}

/// Namespaced keys, one prefix per record type.
pub(crate) mod keys {
    pub const USER: &str = "user/";
    pub const PRODUCT: &str = "product/";
    pub const INVENTORY: &str = "inventory/";
    pub const TRADE: &str = "trade/";
    pub const USERNAME: &str = "username/";

    pub fn user(id: &str) -> String {
        format!("{USER}{id}")
    }
    pub fn product(id: &str) -> String {
        format!("{PRODUCT}{id}")
    }
    pub fn inventory(owner: &str) -> String {
        format!("{INVENTORY}{owner}")
    }
    pub fn trade(id: &str) -> String {
        format!("{TRADE}{id}")
    }
    pub fn username(name: &str) -> String {
        format!("{USERNAME}{name}")
    }
}

/// Ceil division used for page counts; zero items still yields zero pages.
pub(crate) fn total_pages(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Offset/limit window over `items` for the 1-based `page`.
pub(crate) fn page_window<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}
