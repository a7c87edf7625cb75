//! Coinsetter venue adapter
//!
//! One push connection feeds market data and order entry; one REST client
//! serves order entry and position polling.

pub mod details;
pub mod http;
pub mod market_data;
pub mod messages;
pub mod order_entry;
pub mod position;
pub mod realtime;

pub use details::{CoinsetterBaseGateway, CoinsetterSymbolProvider};
pub use http::CoinsetterHttp;
pub use market_data::CoinsetterMarketDataGateway;
pub use order_entry::CoinsetterOrderEntryGateway;
pub use position::CoinsetterPositionGateway;
pub use realtime::{ConnectivityMirror, RealtimeConnection};

use std::sync::Arc;
use tracing::info;

use crate::config::{CoinsetterConfig, OrderDestination};
use crate::exchanges::clock::{SystemClock, TimeProvider};
use crate::exchanges::connector::{CombinedGateway, OrderEntryGateway};
use crate::exchanges::errors::GatewayResult;
use crate::exchanges::null_gateway::NullOrderGateway;
use crate::exchanges::rest::{HttpSender, ReqwestSender};
use crate::exchanges::types::CurrencyPair;
use crate::exchanges::websocket::SocketIoClient;

pub struct Coinsetter;

impl Coinsetter {
    /// Connect to the venue and build the composite gateway. Must be called
    /// inside a tokio runtime.
    pub fn create(config: &CoinsetterConfig, pair: CurrencyPair) -> GatewayResult<CombinedGateway> {
        let (client, events) = SocketIoClient::connect(config.websocket_config())?;
        let socket = Arc::new(RealtimeConnection::new(Arc::new(client)));
        socket.start(events);

        Self::assemble(
            config,
            pair,
            socket,
            Arc::new(ReqwestSender::new()),
            Arc::new(SystemClock),
        )
    }

    /// Wire the gateways around an existing push connection and HTTP sender
    pub fn assemble(
        config: &CoinsetterConfig,
        pair: CurrencyPair,
        socket: Arc<RealtimeConnection>,
        sender: Arc<dyn HttpSender>,
        clock: Arc<dyn TimeProvider>,
    ) -> GatewayResult<CombinedGateway> {
        info!("Creating Coinsetter gateway for {}", pair);
        let symbol = CoinsetterSymbolProvider::new(pair);
        let http = Arc::new(CoinsetterHttp::new(config, sender, clock.clone()));

        let order_entry: Arc<dyn OrderEntryGateway> = match config.order_destination {
            OrderDestination::Coinsetter => Arc::new(CoinsetterOrderEntryGateway::new(
                socket.clone(),
                http.clone(),
                symbol,
                clock.clone(),
            )?),
            OrderDestination::Null => Arc::new(NullOrderGateway::new(clock.clone())),
        };

        Ok(CombinedGateway::new(
            Arc::new(CoinsetterMarketDataGateway::new(socket, clock)?),
            order_entry,
            Arc::new(CoinsetterPositionGateway::new(http)),
            Arc::new(CoinsetterBaseGateway::new()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::rest::HttpMethod;
    use crate::exchanges::types::{ConnectivityStatus, Currency, CurrencyPosition, Exchange};
    use crate::exchanges::websocket::TransportEvent;
    use crate::test_support::{fixed_time, next, test_config, FixedClock, RecordingTransport, ScriptedSender};

    fn assemble(
        config: &CoinsetterConfig,
    ) -> (Arc<RecordingTransport>, Arc<RealtimeConnection>, Arc<ScriptedSender>, CombinedGateway) {
        let transport = Arc::new(RecordingTransport::default());
        let socket = Arc::new(RealtimeConnection::new(transport.clone()));
        let sender = Arc::new(ScriptedSender::default());
        sender.respond(
            HttpMethod::Get,
            "customer/account/acct-1",
            Ok(r#"{"btcBalance":2.0,"usdBalance":100.0}"#.to_string()),
        );
        let gateway = Coinsetter::assemble(
            config,
            CurrencyPair::new(Currency::BTC, Currency::USD),
            socket.clone(),
            sender.clone(),
            Arc::new(FixedClock(fixed_time())),
        )
        .unwrap();
        (transport, socket, sender, gateway)
    }

    #[tokio::test]
    async fn test_connect_joins_every_room() {
        let (transport, socket, _sender, gateway) = assemble(&test_config());
        let mut md_changes = gateway.market_data.connect_changed();
        let mut oe_changes = gateway.order_entry.connect_changed();

        socket.handle_transport_event(TransportEvent::Connect);

        let mut joins = transport.emitted();
        joins.sort();
        assert_eq!(
            joins,
            vec![
                ("depth room".to_string(), String::new()),
                ("last room".to_string(), String::new()),
                ("orders room".to_string(), "cust-1".to_string()),
            ]
        );
        assert_eq!(next(&mut md_changes).await, ConnectivityStatus::Connected);
        assert_eq!(next(&mut oe_changes).await, ConnectivityStatus::Connected);
        assert_eq!(gateway.details.exchange(), Exchange::Coinsetter);
    }

    #[tokio::test]
    async fn test_positions_polled_on_construction() {
        let (_transport, _socket, _sender, gateway) = assemble(&test_config());
        let mut positions = gateway.positions.position_updates();

        assert_eq!(
            next(&mut positions).await,
            CurrencyPosition::new(2.0, 0.0, Currency::BTC)
        );
    }

    #[tokio::test]
    async fn test_null_destination_skips_orders_room() {
        let mut config = test_config();
        config.order_destination = OrderDestination::Null;
        let (transport, socket, _sender, gateway) = assemble(&config);

        socket.handle_transport_event(TransportEvent::Connect);

        assert!(transport.emitted().iter().all(|(room, _)| room != "orders room"));
        assert!(gateway.order_entry.cancels_by_client_order_id());
    }
}
