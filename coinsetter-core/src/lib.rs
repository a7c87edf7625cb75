//! Coinsetter Venue Adapter Library
//!
//! Translates Coinsetter's REST and Socket.IO protocol into venue-neutral
//! market data, order status, and balance events, and venue-neutral order
//! actions back into Coinsetter requests.

pub mod config;
pub mod exchanges;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types for easy access
pub use config::{CoinsetterConfig, OrderDestination};
pub use exchanges::coinsetter::Coinsetter;
pub use exchanges::{
    BrokeredCancel, BrokeredOrder, BrokeredReplace, CombinedGateway, ConnectivityStatus, Currency,
    CurrencyPair, CurrencyPosition, Exchange, ExchangeDetailsGateway, GatewayError, GatewayResult,
    Market, MarketDataGateway, MarketSide, MarketTrade, OrderEntryGateway,
    OrderGatewayActionReport, OrderStatus, OrderStatusReport, OrderType, PositionGateway, Side,
};
