//! Gateway traits the trading engine talks to, and the composite that bundles them

use std::sync::Arc;
use tokio::sync::broadcast;

use super::errors::GatewayResult;
use super::types::{
    BrokeredCancel, BrokeredOrder, BrokeredReplace, ConnectivityStatus, CurrencyPair,
    CurrencyPosition, Exchange, Market, MarketTrade, OrderGatewayActionReport, OrderStatusReport,
};

/// Public market data: book snapshots and trade prints
pub trait MarketDataGateway: Send + Sync {
    /// Transitions only. The value at subscribe time is `connect_status()`.
    fn connect_changed(&self) -> broadcast::Receiver<ConnectivityStatus>;

    fn connect_status(&self) -> ConnectivityStatus;

    fn market_data(&self) -> broadcast::Receiver<Market>;

    fn market_trades(&self) -> broadcast::Receiver<MarketTrade>;
}

/// Order entry. Action methods return as soon as the request is handed to the
/// transport; the outcome is published on `order_updates`.
pub trait OrderEntryGateway: Send + Sync {
    /// Transitions only. The value at subscribe time is `connect_status()`.
    fn connect_changed(&self) -> broadcast::Receiver<ConnectivityStatus>;

    fn connect_status(&self) -> ConnectivityStatus;

    fn order_updates(&self) -> broadcast::Receiver<OrderStatusReport>;

    fn send_order(&self, order: &BrokeredOrder) -> GatewayResult<OrderGatewayActionReport>;

    fn cancel_order(&self, cancel: &BrokeredCancel) -> GatewayResult<OrderGatewayActionReport>;

    fn replace_order(&self, replace: &BrokeredReplace) -> GatewayResult<OrderGatewayActionReport>;

    /// Fresh client order id, known before anything is sent
    fn generate_client_order_id(&self) -> String;

    /// Whether `cancel_order` works without a venue-assigned id
    fn cancels_by_client_order_id(&self) -> bool;
}

pub trait PositionGateway: Send + Sync {
    fn position_updates(&self) -> broadcast::Receiver<CurrencyPosition>;
}

/// Static venue facts
pub trait ExchangeDetailsGateway: Send + Sync {
    fn name(&self) -> &str;

    fn exchange(&self) -> Exchange;

    fn make_fee(&self) -> f64;

    fn take_fee(&self) -> f64;

    fn has_self_trade_prevention(&self) -> bool;

    fn supported_currency_pairs(&self) -> &[CurrencyPair];
}

/// Everything the engine needs from one venue
#[derive(Clone)]
pub struct CombinedGateway {
    pub market_data: Arc<dyn MarketDataGateway>,
    pub order_entry: Arc<dyn OrderEntryGateway>,
    pub positions: Arc<dyn PositionGateway>,
    pub details: Arc<dyn ExchangeDetailsGateway>,
}

impl CombinedGateway {
    pub fn new(
        market_data: Arc<dyn MarketDataGateway>,
        order_entry: Arc<dyn OrderEntryGateway>,
        positions: Arc<dyn PositionGateway>,
        details: Arc<dyn ExchangeDetailsGateway>,
    ) -> Self {
        Self {
            market_data,
            order_entry,
            positions,
            details,
        }
    }
}
