//! Exchange connectivity modules

pub mod clock;
pub mod coinsetter;
pub mod connector;
pub mod errors;
pub mod events;
pub mod null_gateway;
pub mod rest;
pub mod types;
pub mod websocket;

pub use clock::{SystemClock, TimeProvider};
pub use connector::{
    CombinedGateway, ExchangeDetailsGateway, MarketDataGateway, OrderEntryGateway,
    PositionGateway,
};
pub use errors::{ErrorKind, GatewayError, GatewayResult};
pub use events::Evt;
pub use null_gateway::NullOrderGateway;
pub use rest::{HttpMethod, HttpRequest, HttpSender, ReqwestSender};
pub use types::{
    BrokeredCancel, BrokeredOrder, BrokeredReplace, ConnectivityStatus, Currency, CurrencyPair,
    CurrencyPosition, Exchange, Market, MarketSide, MarketTrade, OrderGatewayActionReport,
    OrderStatus, OrderStatusReport, OrderType, Side, Timestamped,
};
pub use websocket::{PushTransport, SocketIoClient, SocketIoPacket, TransportEvent, WebSocketConfig};
