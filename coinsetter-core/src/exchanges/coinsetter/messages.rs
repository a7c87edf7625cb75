//! Coinsetter wire messages and their canonical conversions

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::exchanges::errors::{GatewayError, GatewayResult};
use crate::exchanges::types::{
    Market, MarketSide, MarketTrade, OrderStatus, OrderStatusReport, OrderType, Side,
};

/// `requestStatus` of a successful order or cancel acknowledgement
pub const REQUEST_SUCCESS: &str = "SUCCESS";
pub const PARTIAL_FILL_STAGE: &str = "PARTIAL_FILL";
pub const ROUTING_METHOD: u8 = 2;

/// Trade print on the `last` room
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinsetterLast {
    pub price: f64,
    pub size: f64,
    #[serde(default)]
    pub exchange_id: Option<String>,
    #[serde(default)]
    pub tick_id: Option<i64>,
    /// Epoch seconds
    pub time_stamp: f64,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub volume24: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideLevel {
    pub price: f64,
    pub size: f64,
    #[serde(default)]
    pub exchange_id: Option<String>,
    #[serde(default)]
    pub time_stamp: Option<f64>,
}

/// One row of the `depth` room: bid and ask at the same index
#[derive(Debug, Clone, Deserialize)]
pub struct DepthLevel {
    pub bid: SideLevel,
    pub ask: SideLevel,
}

/// Order lifecycle push on the `orders` room. Everything but the stage may be
/// missing or null.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinsetterOrderStatus {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub customer_uuid: Option<String>,
    #[serde(default)]
    pub client_order_id: Option<String>,
    #[serde(default)]
    pub filled_quantity: Option<f64>,
    #[serde(default)]
    pub order_type: Option<String>,
    pub stage: String,
    #[serde(default)]
    pub requested_quantity: Option<f64>,
    #[serde(default)]
    pub requested_price: Option<f64>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub exch_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinsetterOrder {
    pub account_uuid: String,
    pub customer_uuid: String,
    pub order_type: String,
    pub requested_quantity: f64,
    pub requested_price: f64,
    pub side: String,
    pub symbol: String,
    pub routing_method: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_denomination: Option<String>,
}

/// Reply to `POST order` and `DELETE cancel/{id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinsetterOrderAck {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Absent on error bodies such as `{"message":..,"code":400}`
    #[serde(default)]
    pub request_status: Option<String>,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub client_order_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinsetterAccountResponse {
    #[serde(default)]
    pub account_uuid: Option<String>,
    #[serde(default)]
    pub customer_uuid: Option<String>,
    pub btc_balance: f64,
    pub usd_balance: f64,
    #[serde(default)]
    pub account_class: Option<String>,
    #[serde(default)]
    pub active_status: Option<String>,
}

pub fn convert_to_side(side: &str) -> Side {
    match side {
        "BUY" => Side::Bid,
        "SELL" => Side::Ask,
        _ => Side::Unknown,
    }
}

pub fn convert_from_side(side: Side) -> GatewayResult<&'static str> {
    match side {
        Side::Bid => Ok("BUY"),
        Side::Ask => Ok("SELL"),
        Side::Unknown => Err(GatewayError::UnsupportedSide {
            side: side.to_string(),
        }),
    }
}

/// Unknown venue order types decode to `None`
pub fn convert_to_order_type(order_type: &str) -> Option<OrderType> {
    match order_type {
        "MARKET" => Some(OrderType::Market),
        "LIMIT" => Some(OrderType::Limit),
        _ => None,
    }
}

pub fn convert_from_order_type(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Market => "MARKET",
        OrderType::Limit => "LIMIT",
    }
}

pub fn convert_to_order_status(stage: &str) -> OrderStatus {
    match stage {
        "NEW" | "PENDING" | "OPEN" | "PARTIAL_FILL" | "EXT_ROUTED" => OrderStatus::Working,
        "EXPIRED" | "CLOSED" => OrderStatus::Cancelled,
        "REJECTED" => OrderStatus::Rejected,
        _ => OrderStatus::Other,
    }
}

fn convert_to_market_side(level: &SideLevel) -> MarketSide {
    MarketSide::new(level.price, level.size)
}

/// Full book snapshot stamped with `time`, not with any venue timestamp
pub fn convert_to_market(levels: &[DepthLevel], time: DateTime<Utc>) -> Market {
    Market {
        bids: levels.iter().map(|l| convert_to_market_side(&l.bid)).collect(),
        asks: levels.iter().map(|l| convert_to_market_side(&l.ask)).collect(),
        time,
    }
}

pub fn convert_to_market_trade(last: &CoinsetterLast) -> Option<MarketTrade> {
    let secs = last.time_stamp.floor();
    let nanos = ((last.time_stamp - secs) * 1e9).round().min(999_999_999.0) as u32;
    let time = Utc.timestamp_opt(secs as i64, nanos).single()?;
    Some(MarketTrade {
        price: last.price,
        size: last.size,
        time,
        make_taker: false,
        side: Side::Unknown,
    })
}

/// Map an order push independently of any HTTP acknowledgement
pub fn convert_order_status_push(
    data: &CoinsetterOrderStatus,
    time: DateTime<Utc>,
) -> OrderStatusReport {
    OrderStatusReport {
        order_id: data.client_order_id.clone().unwrap_or_default(),
        exchange_id: data.uuid.clone(),
        time,
        order_status: convert_to_order_status(&data.stage),
        cum_quantity: data.filled_quantity,
        partially_filled: data.stage == PARTIAL_FILL_STAGE,
        side: Some(data.side.as_deref().map_or(Side::Unknown, convert_to_side)),
        price: data.requested_price,
        quantity: data.requested_quantity,
        order_type: data.order_type.as_deref().and_then(convert_to_order_type),
        ..Default::default()
    }
}
