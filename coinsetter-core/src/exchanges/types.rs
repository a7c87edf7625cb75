//! Canonical venue-neutral data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Push channel connectivity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectivityStatus {
    Connected,
    Disconnected,
}

/// Exchange identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    Coinsetter,
    Null,
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exchange::Coinsetter => write!(f, "Coinsetter"),
            Exchange::Null => write!(f, "Null"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    BTC,
    USD,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::BTC => write!(f, "BTC"),
            Currency::USD => write!(f, "USD"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub base: Currency,
    pub quote: Currency,
}

impl CurrencyPair {
    pub fn new(base: Currency, quote: Currency) -> Self {
        Self { base, quote }
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Order / market side
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
    Unknown,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "Bid"),
            Side::Ask => write!(f, "Ask"),
            Side::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Market,
}

/// Canonical order status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Working,
    Cancelled,
    Rejected,
    #[default]
    Other,
}

/// A value paired with the time it was received
#[derive(Clone, Debug)]
pub struct Timestamped<T> {
    pub data: T,
    pub time: DateTime<Utc>,
}

impl<T> Timestamped<T> {
    pub fn new(data: T, time: DateTime<Utc>) -> Self {
        Self { data, time }
    }
}

/// One price level of a book side
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketSide {
    pub price: f64,
    pub size: f64,
}

impl MarketSide {
    pub fn new(price: f64, size: f64) -> Self {
        Self { price, size }
    }
}

/// Full order book snapshot. Each one replaces the previous.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub bids: Vec<MarketSide>,
    pub asks: Vec<MarketSide>,
    pub time: DateTime<Utc>,
}

/// Trade print from the public feed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketTrade {
    pub price: f64,
    pub size: f64,
    pub time: DateTime<Utc>,
    /// Maker/taker flag; false when the venue does not report it.
    pub make_taker: bool,
    pub side: Side,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurrencyPosition {
    pub amount: f64,
    pub held_amount: f64,
    pub currency: Currency,
}

impl CurrencyPosition {
    pub fn new(amount: f64, held_amount: f64, currency: Currency) -> Self {
        Self {
            amount,
            held_amount,
            currency,
        }
    }
}

/// New order handed to a gateway by the engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrokeredOrder {
    pub order_id: String,
    pub side: Side,
    pub quantity: f64,
    pub order_type: OrderType,
    pub price: f64,
}

/// Cancel request. `exchange_id` is the venue-assigned id of the order being cancelled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrokeredCancel {
    pub orig_order_id: String,
    pub order_id: String,
    pub side: Side,
    pub exchange_id: Option<String>,
}

/// Replace request: new parameters for `orig_order_id` under a fresh `order_id`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrokeredReplace {
    pub orig_order_id: String,
    pub order_id: String,
    pub side: Side,
    pub quantity: f64,
    pub order_type: OrderType,
    pub price: f64,
    pub exchange_id: Option<String>,
}

impl BrokeredReplace {
    pub fn to_cancel(&self) -> BrokeredCancel {
        BrokeredCancel {
            orig_order_id: self.orig_order_id.clone(),
            order_id: self.order_id.clone(),
            side: self.side,
            exchange_id: self.exchange_id.clone(),
        }
    }

    pub fn to_order(&self) -> BrokeredOrder {
        BrokeredOrder {
            order_id: self.order_id.clone(),
            side: self.side,
            quantity: self.quantity,
            order_type: self.order_type,
            price: self.price,
        }
    }
}

/// Synchronous receipt for an order action. Only says the request was handed
/// to the transport; the venue's verdict arrives later as an `OrderStatusReport`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderGatewayActionReport {
    pub sent_time: DateTime<Utc>,
}

impl OrderGatewayActionReport {
    pub fn new(sent_time: DateTime<Utc>) -> Self {
        Self { sent_time }
    }
}

/// The single output type of an order entry gateway
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusReport {
    pub order_id: String,
    pub exchange_id: Option<String>,
    pub time: DateTime<Utc>,
    pub order_status: OrderStatus,
    pub reject_message: Option<String>,
    pub cancel_rejected: bool,
    pub cum_quantity: Option<f64>,
    pub partially_filled: bool,
    pub side: Option<Side>,
    pub price: Option<f64>,
    pub quantity: Option<f64>,
    pub order_type: Option<OrderType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_splits_into_cancel_and_order() {
        let replace = BrokeredReplace {
            orig_order_id: "orig".to_string(),
            order_id: "next".to_string(),
            side: Side::Ask,
            quantity: 2.0,
            order_type: OrderType::Limit,
            price: 410.5,
            exchange_id: Some("venue-1".to_string()),
        };

        let cancel = replace.to_cancel();
        assert_eq!(cancel.orig_order_id, "orig");
        assert_eq!(cancel.exchange_id.as_deref(), Some("venue-1"));

        let order = replace.to_order();
        assert_eq!(order.order_id, "next");
        assert_eq!(order.price, 410.5);
        assert_eq!(order.side, Side::Ask);
    }

    #[test]
    fn test_report_defaults() {
        let report = OrderStatusReport::default();
        assert_eq!(report.order_status, OrderStatus::Other);
        assert!(!report.cancel_rejected);
        assert!(!report.partially_filled);
        assert!(report.cum_quantity.is_none());
    }

    #[test]
    fn test_pair_display() {
        let pair = CurrencyPair::new(Currency::BTC, Currency::USD);
        assert_eq!(pair.to_string(), "BTC/USD");
    }
}
