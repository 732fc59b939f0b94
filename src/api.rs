//! Request boundary.
//!
//! Each function handles one route of the public contract given an already
//! verified caller identity and the decoded JSON body, and returns the HTTP
//! status with the JSON payload. Routing and authentication sit in front of
//! these functions.
use crate::error::{Result, TradeError};
use crate::market::Marketplace;
use crate::trade::Decision;
use crate::types::{ProductId, TradeId, UserId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    fn ok<T: Serialize>(status: u16, payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(body) => Self { status, body },
            Err(e) => Self::from_error(&TradeError::Internal(e.to_string())),
        }
    }

    fn from_error(err: &TradeError) -> Self {
        if err.status() == 500 {
            error!(error = %err, "request failed");
        }
        Self {
            status: err.status(),
            body: json!(err.to_body()),
        }
    }
}

fn respond<T: Serialize>(status: u16, outcome: Result<T>) -> Response {
    match outcome {
        Ok(payload) => Response::ok(status, &payload),
        Err(err) => Response::from_error(&err),
    }
}

fn parse_body<T: DeserializeOwned>(body: &Value) -> Result<T> {
    serde_json::from_value(body.clone()).map_err(|e| TradeError::BadRequest(e.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    #[serde(default)]
    pub product_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    #[serde(default)]
    pub initiator_products: Vec<ProductId>,
    #[serde(default)]
    pub receiver_products: Vec<ProductId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub trade_id: TradeId,
    #[serde(default)]
    pub status: String,
}

/// `POST /inventory`
pub fn add_to_inventory(market: &Marketplace, caller: &UserId, body: &Value) -> Response {
    let outcome = parse_body::<PurchaseRequest>(body).and_then(|request| {
        let product_id = request
            .product_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| TradeError::BadRequest("Product ID is required".into()))?;
        let inventory = market
            .purchases
            .purchase(caller, &ProductId::from(product_id))?;
        Ok(json!({ "message": "Product added to inventory", "inventory": inventory }))
    });
    respond(200, outcome)
}

/// `GET /inventory/:userId?page=`
pub fn get_user_inventory(market: &Marketplace, owner: &UserId, page: Option<usize>) -> Response {
    respond(200, market.queries.list_inventory(owner, page.unwrap_or(1)))
}

/// `GET /inventory/traders/:receiverId`
pub fn get_traders_inventories(market: &Marketplace, caller: &UserId, receiver: &UserId) -> Response {
    respond(200, market.queries.traders_inventories(caller, receiver))
}

/// `POST /trade/request/:receiverId`
pub fn request_trade(
    market: &Marketplace,
    caller: &UserId,
    receiver: &UserId,
    body: &Value,
) -> Response {
    let outcome = parse_body::<TradeRequest>(body).and_then(|request| {
        market.trades.propose(
            caller,
            receiver,
            request.initiator_products,
            request.receiver_products,
        )
    });
    respond(201, outcome)
}

/// `POST /trade`
pub fn confirm_trade(market: &Marketplace, caller: &UserId, body: &Value) -> Response {
    let outcome = parse_body::<ResolveRequest>(body).and_then(|request| {
        market
            .trades
            .resolve(&request.trade_id, caller, Decision::parse(&request.status))?;
        Ok(json!({ "message": "Trade was successfully closed" }))
    });
    respond(200, outcome)
}

/// `GET /trade`
pub fn get_user_trades(market: &Marketplace, caller: &UserId) -> Response {
    respond(200, market.queries.list_trades_for_user(caller))
}

/// `GET /trade/countByStatus`
pub fn get_trades_count_by_status(market: &Marketplace, caller: &UserId) -> Response {
    respond(200, market.queries.trade_counts_by_status(caller))
}
