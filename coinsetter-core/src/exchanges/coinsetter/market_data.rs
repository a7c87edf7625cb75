//! Depth and trade feeds

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

use super::messages::{convert_to_market, convert_to_market_trade, CoinsetterLast, DepthLevel};
use super::realtime::{ConnectivityMirror, RealtimeConnection};
use crate::exchanges::clock::TimeProvider;
use crate::exchanges::connector::MarketDataGateway;
use crate::exchanges::errors::GatewayResult;
use crate::exchanges::events::Evt;
use crate::exchanges::types::{ConnectivityStatus, Market, MarketTrade};

pub struct CoinsetterMarketDataGateway {
    market_data: Evt<Market>,
    market_trade: Evt<MarketTrade>,
    connectivity: ConnectivityMirror,
    _socket: Arc<RealtimeConnection>,
}

impl CoinsetterMarketDataGateway {
    pub fn new(socket: Arc<RealtimeConnection>, clock: Arc<dyn TimeProvider>) -> GatewayResult<Self> {
        let connectivity = socket.mirror();
        let market_data = Evt::new();
        let market_trade = Evt::new();

        let depth_evt = market_data.clone();
        socket.subscribe(
            "depth",
            move |levels: Vec<DepthLevel>| depth_evt.trigger(convert_to_market(&levels, clock.utc_now())),
            "",
        )?;

        let trade_evt = market_trade.clone();
        socket.subscribe(
            "last",
            move |last: CoinsetterLast| match convert_to_market_trade(&last) {
                Some(trade) => trade_evt.trigger(trade),
                None => warn!("Dropping trade with invalid timestamp {}", last.time_stamp),
            },
            "",
        )?;

        Ok(Self {
            market_data,
            market_trade,
            connectivity,
            _socket: socket,
        })
    }
}

impl MarketDataGateway for CoinsetterMarketDataGateway {
    fn connect_changed(&self) -> broadcast::Receiver<ConnectivityStatus> {
        self.connectivity.subscribe()
    }

    fn connect_status(&self) -> ConnectivityStatus {
        self.connectivity.status()
    }

    fn market_data(&self) -> broadcast::Receiver<Market> {
        self.market_data.subscribe()
    }

    fn market_trades(&self) -> broadcast::Receiver<MarketTrade> {
        self.market_trade.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::types::{MarketSide, Side};
    use crate::exchanges::websocket::TransportEvent;
    use crate::test_support::{fixed_time, next, FixedClock, RecordingTransport};
    use serde_json::json;

    fn gateway() -> (Arc<RealtimeConnection>, CoinsetterMarketDataGateway) {
        let socket = Arc::new(RealtimeConnection::new(Arc::new(RecordingTransport::default())));
        let gateway =
            CoinsetterMarketDataGateway::new(socket.clone(), Arc::new(FixedClock(fixed_time()))).unwrap();
        (socket, gateway)
    }

    #[tokio::test]
    async fn test_each_depth_push_is_one_snapshot() {
        let (socket, gateway) = gateway();
        let mut books = gateway.market_data();

        for px in [400.0, 401.0] {
            socket.handle_transport_event(TransportEvent::Message {
                event: "depth".to_string(),
                data: json!([{"bid": {"price": px, "size": 1.0}, "ask": {"price": px + 1.0, "size": 2.0}}]),
            });
        }

        let first = next(&mut books).await;
        assert_eq!(first.bids, vec![MarketSide::new(400.0, 1.0)]);
        assert_eq!(first.time, fixed_time());
        let second = next(&mut books).await;
        assert_eq!(second.asks, vec![MarketSide::new(402.0, 2.0)]);
    }

    #[tokio::test]
    async fn test_last_push_becomes_trade() {
        let (socket, gateway) = gateway();
        let mut trades = gateway.market_trades();

        socket.handle_transport_event(TransportEvent::Message {
            event: "last".to_string(),
            data: json!({"price": 412.5, "size": 0.3, "timeStamp": 1426345766}),
        });

        let trade = next(&mut trades).await;
        assert_eq!(trade.size, 0.3);
        assert_eq!(trade.time.timestamp(), 1426345766);
        assert_eq!(trade.side, Side::Unknown);
    }

    #[tokio::test]
    async fn test_mirrors_push_connectivity() {
        let (socket, gateway) = gateway();
        let mut changes = gateway.connect_changed();
        assert_eq!(gateway.connect_status(), ConnectivityStatus::Disconnected);

        socket.handle_transport_event(TransportEvent::Connect);
        assert_eq!(next(&mut changes).await, ConnectivityStatus::Connected);
        assert_eq!(gateway.connect_status(), ConnectivityStatus::Connected);
    }
}
