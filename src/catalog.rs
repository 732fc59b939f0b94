//! Minimal user and product records.
//!
//! Account management and the product admin surface live elsewhere; this is
//! the create/read/update slice the trading core depends on.
use crate::error::{Result, TradeError};
use crate::locks::LockTable;
use crate::types::{Product, ProductId, User, UserId};
use crate::utils::{self, keys};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_PRODUCT_PAGE_SIZE: usize = 12;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub total_products: usize,
    pub total_pages: usize,
    pub current_page: usize,
    pub products: Vec<Product>,
}

#[derive(Clone)]
pub struct Catalog {
    instance: Arc<sled::Db>,
    locks: Arc<LockTable>,
}

impl Catalog {
    pub fn new(instance: Arc<sled::Db>, locks: Arc<LockTable>) -> Self {
        Self { instance, locks }
    }

    pub fn create_user(
        &self,
        username: &str,
        image_url: Option<String>,
        balance: u64,
    ) -> Result<User> {
        let id = UserId::generate()?;
        // claiming the name index entry is the uniqueness check
        let claimed = self.instance.compare_and_swap(
            keys::username(username).as_bytes(),
            None as Option<&[u8]>,
            Some(id.as_str().as_bytes()),
        )?;
        if claimed.is_err() {
            return Err(TradeError::Conflict(format!("Username {username}")));
        }
        let user = User {
            id,
            username: username.to_owned(),
            image_url,
            balance,
            trades: vec![],
        };
        self.save_user(&user)?;
        info!(user = %user.id, username, "user created");
        Ok(user)
    }

    pub fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        utils::load(&self.instance, &keys::user(id.as_str()))
    }

    pub(crate) fn require_user(&self, id: &UserId) -> Result<User> {
        self.get_user(id)?
            .ok_or_else(|| TradeError::NotFound(format!("User {id}")))
    }

    pub(crate) fn stage_user(batch: &mut sled::Batch, user: &User) -> Result<()> {
        batch.insert(keys::user(user.id.as_str()).as_bytes(), utils::encode(user)?);
        Ok(())
    }

    fn save_user(&self, user: &User) -> Result<()> {
        self.instance
            .insert(keys::user(user.id.as_str()).as_bytes(), utils::encode(user)?)?;
        Ok(())
    }

    /// Credit `amount` to the user's balance.
    pub fn deposit(&self, id: &UserId, amount: u64) -> Result<User> {
        self.locks.with_users(&[id], || {
            let mut user = self.require_user(id)?;
            user.balance = user
                .balance
                .checked_add(amount)
                .ok_or_else(|| TradeError::BadRequest("Balance overflow".into()))?;
            self.save_user(&user)?;
            info!(user = %id, amount, balance = user.balance, "balance credited");
            Ok(user)
        })
    }

    pub fn create_product(
        &self,
        name: &str,
        price: u64,
        description: &str,
        image_url: Option<String>,
    ) -> Result<Product> {
        let product = Product {
            id: ProductId::generate()?,
            name: name.to_owned(),
            price,
            description: description.to_owned(),
            image_url,
        };
        self.instance.insert(
            keys::product(product.id.as_str()).as_bytes(),
            utils::encode(&product)?,
        )?;
        info!(product = %product.id, price, "product created");
        Ok(product)
    }

    pub fn get_product(&self, id: &ProductId) -> Result<Option<Product>> {
        utils::load(&self.instance, &keys::product(id.as_str()))
    }

    /// Resolve each id in order, keeping duplicates. Unknown ids resolve to `None`.
    pub fn resolve_products(&self, ids: &[ProductId]) -> Result<Vec<Option<Product>>> {
        ids.iter().map(|id| self.get_product(id)).collect()
    }

    pub fn list_products(&self, page: usize, limit: usize) -> Result<ProductPage> {
        let limit = if limit == 0 { DEFAULT_PRODUCT_PAGE_SIZE } else { limit };
        let page = page.max(1);

        let mut products = Vec::new();
        for entry in self.instance.scan_prefix(keys::PRODUCT.as_bytes()) {
            let (_, bytes) = entry?;
            products.push(utils::decode::<Product>(&bytes)?);
        }
        if products.is_empty() {
            return Err(TradeError::NotFound("Products".into()));
        }

        Ok(ProductPage {
            total_products: products.len(),
            total_pages: utils::total_pages(products.len(), limit),
            current_page: page,
            products: utils::page_window(&products, page, limit).to_vec(),
        })
    }
}
