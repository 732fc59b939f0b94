//! Identifiers, timestamps and the catalog records (users and products)
use crate::error::{Result, TradeError};
use crate::utils;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! bech32_id {
    ($(#[$meta:meta])* $name:ident, $hrp:literal) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Mint a fresh id (bech32m encoded uuid7).
            pub fn generate() -> Result<Self> {
                utils::new_uuid_to_bech32($hrp)
                    .map(Self)
                    .map_err(|e| TradeError::Internal(e.to_string()))
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        // encoded as a bare text string
        impl<C> minicbor::Encode<C> for $name {
            fn encode<W: minicbor::encode::Write>(
                &self,
                e: &mut minicbor::Encoder<W>,
                _: &mut C,
            ) -> std::result::Result<(), minicbor::encode::Error<W::Error>> {
                e.str(&self.0)?.ok()
            }
        }

        impl<'b, C> minicbor::Decode<'b, C> for $name {
            fn decode(
                d: &mut minicbor::Decoder<'b>,
                _: &mut C,
            ) -> std::result::Result<Self, minicbor::decode::Error> {
                Ok(Self(d.str()?.to_owned()))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

bech32_id!(
    /// Identity of a user, also the key of their inventory.
    UserId,
    "user_"
);
bech32_id!(ProductId, "product_");
bech32_id!(TradeId, "trade_");

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Serialize)]
#[serde(transparent)]
pub struct TimeStamp(DateTime<Utc>);

impl TimeStamp {
    pub fn new() -> Self {
        Self(Utc::now())
    }
}

impl Default for TimeStamp {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> minicbor::Encode<C> for TimeStamp {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> std::result::Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp {
    fn decode(
        d: &mut minicbor::Decoder<'b>,
        _: &mut C,
    ) -> std::result::Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, minicbor::Encode, minicbor::Decode)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[n(0)]
    pub id: UserId,
    #[n(1)]
    pub username: String,
    #[n(2)]
    pub image_url: Option<String>,
    #[n(3)]
    pub balance: u64, // smallest currency unit
    #[n(4)]
    pub trades: Vec<TradeId>, // append order, oldest first
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, minicbor::Encode, minicbor::Decode)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[n(0)]
    pub id: ProductId,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub price: u64,
    #[n(3)]
    pub description: String,
    #[n(4)]
    pub image_url: Option<String>,
}

/// Public face of a user inside trade and inventory views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: UserId,
    pub username: String,
    pub image_url: Option<String>,
}

impl From<&User> for OwnerSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            image_url: user.image_url.clone(),
        }
    }
}
