//! Order entry over REST with status pushes on the `orders` room
//!
//! Two producers write into the same report stream: acknowledgements of
//! `POST order` / `DELETE cancel/{id}`, and lifecycle pushes. They are neither
//! ordered nor deduplicated against each other.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error};

use super::details::CoinsetterSymbolProvider;
use super::http::CoinsetterHttp;
use super::messages::{
    convert_from_order_type, convert_from_side, convert_order_status_push, CoinsetterOrder,
    CoinsetterOrderAck, CoinsetterOrderStatus, REQUEST_SUCCESS, ROUTING_METHOD,
};
use super::realtime::{ConnectivityMirror, RealtimeConnection};
use crate::exchanges::clock::TimeProvider;
use crate::exchanges::connector::OrderEntryGateway;
use crate::exchanges::errors::{GatewayError, GatewayResult};
use crate::exchanges::events::Evt;
use crate::exchanges::types::{
    BrokeredCancel, BrokeredOrder, BrokeredReplace, ConnectivityStatus, OrderGatewayActionReport,
    OrderStatus, OrderStatusReport, Timestamped,
};

pub struct CoinsetterOrderEntryGateway {
    http: Arc<CoinsetterHttp>,
    symbol: CoinsetterSymbolProvider,
    clock: Arc<dyn TimeProvider>,
    order_update: Evt<OrderStatusReport>,
    connectivity: ConnectivityMirror,
    _socket: Arc<RealtimeConnection>,
}

impl CoinsetterOrderEntryGateway {
    pub fn new(
        socket: Arc<RealtimeConnection>,
        http: Arc<CoinsetterHttp>,
        symbol: CoinsetterSymbolProvider,
        clock: Arc<dyn TimeProvider>,
    ) -> GatewayResult<Self> {
        let connectivity = socket.mirror();
        let order_update = Evt::new();

        let push_evt = order_update.clone();
        let push_clock = clock.clone();
        socket.subscribe(
            "orders",
            move |data: CoinsetterOrderStatus| {
                debug!("Order push {:?} stage {}", data.client_order_id, data.stage);
                push_evt.trigger(convert_order_status_push(&data, push_clock.utc_now()));
            },
            &http.customer_uuid,
        )?;

        Ok(Self {
            http,
            symbol,
            clock,
            order_update,
            connectivity,
            _socket: socket,
        })
    }

    /// Encode before anything touches the network
    fn build_order(&self, order: &BrokeredOrder) -> GatewayResult<CoinsetterOrder> {
        Ok(CoinsetterOrder {
            account_uuid: self.http.account_uuid.clone(),
            customer_uuid: self.http.customer_uuid.clone(),
            order_type: convert_from_order_type(order.order_type).to_string(),
            requested_quantity: order.quantity,
            requested_price: order.price,
            side: convert_from_side(order.side)?.to_string(),
            symbol: self.symbol.symbol.clone(),
            routing_method: ROUTING_METHOD,
            client_order_id: Some(order.order_id.clone()),
            quantity_denomination: None,
        })
    }

    fn dispatch_order(&self, venue_order: CoinsetterOrder, order_id: String) {
        let http = self.http.clone();
        let order_update = self.order_update.clone();
        tokio::spawn(async move {
            match http.post::<_, CoinsetterOrderAck>("order", &venue_order).await {
                Ok(resp) => order_update.trigger(handle_order_ack(resp, OrderStatus::Working, &order_id)),
                Err(e) => error!("New order {} got no acknowledgement: {}", order_id, e),
            }
        });
    }

    fn dispatch_cancel(&self, exchange_id: String, order_id: String) {
        let http = self.http.clone();
        let order_update = self.order_update.clone();
        tokio::spawn(async move {
            let endpoint = format!("cancel/{}", exchange_id);
            match http.del::<CoinsetterOrderAck>(&endpoint).await {
                Ok(resp) => order_update.trigger(handle_order_ack(resp, OrderStatus::Cancelled, &order_id)),
                Err(e) => error!("Cancel of {} got no acknowledgement: {}", order_id, e),
            }
        });
    }

    fn require_exchange_id(cancel: &BrokeredCancel) -> GatewayResult<String> {
        cancel
            .exchange_id
            .clone()
            .ok_or_else(|| GatewayError::MissingExchangeId {
                order_id: cancel.orig_order_id.clone(),
            })
    }
}

/// Turn an acknowledgement into a report. A venue-level failure is a
/// `Rejected` report, flagged as a cancel rejection on the cancel path.
pub fn handle_order_ack(
    resp: Timestamped<CoinsetterOrderAck>,
    success_status: OrderStatus,
    known_order_id: &str,
) -> OrderStatusReport {
    let ack = resp.data;
    let order_id = ack
        .client_order_id
        .unwrap_or_else(|| known_order_id.to_string());

    if ack.request_status.as_deref() == Some(REQUEST_SUCCESS) {
        OrderStatusReport {
            order_id,
            exchange_id: ack.uuid,
            time: resp.time,
            order_status: success_status,
            ..Default::default()
        }
    } else {
        OrderStatusReport {
            order_id,
            exchange_id: ack.uuid,
            time: resp.time,
            order_status: OrderStatus::Rejected,
            reject_message: ack.message,
            cancel_rejected: success_status == OrderStatus::Cancelled,
            ..Default::default()
        }
    }
}

impl OrderEntryGateway for CoinsetterOrderEntryGateway {
    fn connect_changed(&self) -> broadcast::Receiver<ConnectivityStatus> {
        self.connectivity.subscribe()
    }

    fn connect_status(&self) -> ConnectivityStatus {
        self.connectivity.status()
    }

    fn order_updates(&self) -> broadcast::Receiver<OrderStatusReport> {
        self.order_update.subscribe()
    }

    fn send_order(&self, order: &BrokeredOrder) -> GatewayResult<OrderGatewayActionReport> {
        let venue_order = self.build_order(order)?;
        self.dispatch_order(venue_order, order.order_id.clone());
        Ok(OrderGatewayActionReport::new(self.clock.utc_now()))
    }

    fn cancel_order(&self, cancel: &BrokeredCancel) -> GatewayResult<OrderGatewayActionReport> {
        let exchange_id = Self::require_exchange_id(cancel)?;
        self.dispatch_cancel(exchange_id, cancel.orig_order_id.clone());
        Ok(OrderGatewayActionReport::new(self.clock.utc_now()))
    }

    fn replace_order(&self, replace: &BrokeredReplace) -> GatewayResult<OrderGatewayActionReport> {
        let cancel = replace.to_cancel();
        let order = replace.to_order();
        let exchange_id = Self::require_exchange_id(&cancel)?;
        let venue_order = self.build_order(&order)?;

        self.dispatch_cancel(exchange_id, cancel.orig_order_id);
        self.dispatch_order(venue_order, order.order_id);
        Ok(OrderGatewayActionReport::new(self.clock.utc_now()))
    }

    fn generate_client_order_id(&self) -> String {
        nanoid::nanoid!(12)
    }

    fn cancels_by_client_order_id(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::rest::HttpMethod;
    use crate::exchanges::types::{Currency, CurrencyPair, OrderType, Side};
    use crate::exchanges::websocket::TransportEvent;
    use crate::test_support::{
        fixed_time, next, settle, test_config, FixedClock, RecordingTransport, ScriptedSender,
    };
    use serde_json::json;
    use tokio_test::assert_err;

    struct Harness {
        transport: Arc<RecordingTransport>,
        socket: Arc<RealtimeConnection>,
        sender: Arc<ScriptedSender>,
        gateway: CoinsetterOrderEntryGateway,
    }

    fn harness() -> Harness {
        let transport = Arc::new(RecordingTransport::default());
        let socket = Arc::new(RealtimeConnection::new(transport.clone()));
        let sender = Arc::new(ScriptedSender::default());
        let clock: Arc<dyn TimeProvider> = Arc::new(FixedClock(fixed_time()));
        let http = Arc::new(CoinsetterHttp::new(&test_config(), sender.clone(), clock.clone()));
        let symbol = CoinsetterSymbolProvider::new(CurrencyPair::new(Currency::BTC, Currency::USD));
        let gateway =
            CoinsetterOrderEntryGateway::new(socket.clone(), http, symbol, clock).unwrap();
        Harness {
            transport,
            socket,
            sender,
            gateway,
        }
    }

    fn order(order_id: &str, side: Side) -> BrokeredOrder {
        BrokeredOrder {
            order_id: order_id.to_string(),
            side,
            quantity: 1.5,
            order_type: OrderType::Limit,
            price: 400.0,
        }
    }

    fn ack(status: &str, uuid: &str, client_order_id: &str, message: Option<&str>) -> String {
        json!({
            "uuid": uuid,
            "requestStatus": status,
            "clientOrderId": client_order_id,
            "message": message,
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_send_then_cancel_reports_working_then_cancelled() {
        let h = harness();
        h.sender.respond(HttpMethod::Post, "order", Ok(ack("SUCCESS", "ex-1", "c-1", None)));
        h.sender.respond(HttpMethod::Delete, "cancel/ex-1", Ok(ack("SUCCESS", "ex-1", "c-1", None)));
        let mut updates = h.gateway.order_updates();

        let receipt = h.gateway.send_order(&order("c-1", Side::Bid)).unwrap();
        assert_eq!(receipt.sent_time, fixed_time());
        let cancel = BrokeredCancel {
            orig_order_id: "c-1".to_string(),
            order_id: "c-2".to_string(),
            side: Side::Bid,
            exchange_id: Some("ex-1".to_string()),
        };
        h.gateway.cancel_order(&cancel).unwrap();

        let mut reports = vec![next(&mut updates).await, next(&mut updates).await];
        reports.sort_by_key(|r| r.order_status == OrderStatus::Cancelled);
        assert_eq!(reports[0].order_status, OrderStatus::Working);
        assert_eq!(reports[0].exchange_id.as_deref(), Some("ex-1"));
        assert_eq!(reports[1].order_status, OrderStatus::Cancelled);
        assert_eq!(reports[1].order_id, "c-1");

        let requests = h.sender.requests();
        let post = requests
            .iter()
            .find(|r| r.method == HttpMethod::Post)
            .unwrap();
        let body = post.body.as_ref().unwrap();
        assert_eq!(body["side"], "BUY");
        assert_eq!(body["orderType"], "LIMIT");
        assert_eq!(body["symbol"], "BTCUSD");
        assert_eq!(body["routingMethod"], 2);
        assert_eq!(body["clientOrderId"], "c-1");
        assert_eq!(body["accountUuid"], "acct-1");
        assert_eq!(body["customerUuid"], "cust-1");
    }

    #[tokio::test]
    async fn test_venue_rejection_is_a_report() {
        let h = harness();
        h.sender.respond(
            HttpMethod::Post,
            "order",
            Ok(ack("FAILURE", "ex-9", "c-9", Some("Insufficient funds"))),
        );
        let mut updates = h.gateway.order_updates();

        h.gateway.send_order(&order("c-9", Side::Ask)).unwrap();

        let report = next(&mut updates).await;
        assert_eq!(report.order_status, OrderStatus::Rejected);
        assert_eq!(report.reject_message.as_deref(), Some("Insufficient funds"));
        assert!(!report.cancel_rejected);
    }

    #[tokio::test]
    async fn test_cancel_rejection_sets_flag() {
        let h = harness();
        h.sender.respond(
            HttpMethod::Delete,
            "cancel/ex-1",
            Ok(ack("FAILURE", "ex-1", "c-1", Some("Order already closed"))),
        );
        let mut updates = h.gateway.order_updates();

        let cancel = BrokeredCancel {
            orig_order_id: "c-1".to_string(),
            order_id: "c-2".to_string(),
            side: Side::Bid,
            exchange_id: Some("ex-1".to_string()),
        };
        h.gateway.cancel_order(&cancel).unwrap();

        let report = next(&mut updates).await;
        assert_eq!(report.order_status, OrderStatus::Rejected);
        assert!(report.cancel_rejected);
    }

    #[tokio::test]
    async fn test_error_body_without_status_rejects_send() {
        let h = harness();
        h.sender.respond(
            HttpMethod::Post,
            "order",
            Ok(r#"{"message":"Invalid price","code":400}"#.to_string()),
        );
        let mut updates = h.gateway.order_updates();

        h.gateway.send_order(&order("c-1", Side::Bid)).unwrap();

        let report = next(&mut updates).await;
        assert_eq!(report.order_id, "c-1");
        assert_eq!(report.order_status, OrderStatus::Rejected);
        assert_eq!(report.reject_message.as_deref(), Some("Invalid price"));
        assert!(!report.cancel_rejected);
    }

    #[tokio::test]
    async fn test_error_body_without_status_rejects_cancel() {
        let h = harness();
        h.sender.respond(
            HttpMethod::Delete,
            "cancel/ex-1",
            Ok(r#"{"message":"Order not found","code":404}"#.to_string()),
        );
        let mut updates = h.gateway.order_updates();

        let cancel = BrokeredCancel {
            orig_order_id: "c-1".to_string(),
            order_id: "c-2".to_string(),
            side: Side::Bid,
            exchange_id: Some("ex-1".to_string()),
        };
        h.gateway.cancel_order(&cancel).unwrap();

        let report = next(&mut updates).await;
        assert_eq!(report.order_id, "c-1");
        assert_eq!(report.order_status, OrderStatus::Rejected);
        assert_eq!(report.reject_message.as_deref(), Some("Order not found"));
        assert!(report.cancel_rejected);
    }

    #[tokio::test]
    async fn test_unsupported_side_fails_before_network() {
        let h = harness();
        let err = assert_err!(h.gateway.send_order(&order("c-1", Side::Unknown)));
        assert!(matches!(err, GatewayError::UnsupportedSide { .. }));

        settle().await;
        assert!(h.sender.requests().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_without_exchange_id_fails_locally() {
        let h = harness();
        let cancel = BrokeredCancel {
            orig_order_id: "c-1".to_string(),
            order_id: "c-2".to_string(),
            side: Side::Bid,
            exchange_id: None,
        };
        let err = assert_err!(h.gateway.cancel_order(&cancel));
        assert!(matches!(err, GatewayError::MissingExchangeId { .. }));
        assert!(!h.gateway.cancels_by_client_order_id());

        settle().await;
        assert!(h.sender.requests().is_empty());
    }

    #[tokio::test]
    async fn test_replace_is_cancel_then_send() {
        let h = harness();
        h.sender.respond(HttpMethod::Delete, "cancel/ex-1", Ok(ack("SUCCESS", "ex-1", "c-1", None)));
        h.sender.respond(HttpMethod::Post, "order", Ok(ack("SUCCESS", "ex-2", "c-2", None)));
        let mut updates = h.gateway.order_updates();

        let replace = BrokeredReplace {
            orig_order_id: "c-1".to_string(),
            order_id: "c-2".to_string(),
            side: Side::Bid,
            quantity: 2.0,
            order_type: OrderType::Limit,
            price: 401.0,
            exchange_id: Some("ex-1".to_string()),
        };
        h.gateway.replace_order(&replace).unwrap();

        let mut ids = vec![next(&mut updates).await, next(&mut updates).await]
            .into_iter()
            .map(|r| (r.order_id, r.order_status))
            .collect::<Vec<_>>();
        ids.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            ids,
            vec![
                ("c-1".to_string(), OrderStatus::Cancelled),
                ("c-2".to_string(), OrderStatus::Working),
            ]
        );

        let requests = h.sender.requests();
        assert_eq!(requests[0].method, HttpMethod::Delete);
        assert_eq!(requests[1].body.as_ref().unwrap()["requestedPrice"], 401.0);
    }

    #[tokio::test]
    async fn test_replace_with_bad_side_sends_nothing() {
        let h = harness();
        let replace = BrokeredReplace {
            orig_order_id: "c-1".to_string(),
            order_id: "c-2".to_string(),
            side: Side::Unknown,
            quantity: 2.0,
            order_type: OrderType::Limit,
            price: 401.0,
            exchange_id: Some("ex-1".to_string()),
        };
        assert_err!(h.gateway.replace_order(&replace));

        settle().await;
        assert!(h.sender.requests().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_emits_no_report() {
        let h = harness();
        h.sender.respond(
            HttpMethod::Post,
            "order",
            Err(GatewayError::Timeout {
                url: "https://api.coinsetter.com/v1/order".to_string(),
                seconds: 5,
            }),
        );
        let mut updates = h.gateway.order_updates();

        h.gateway.send_order(&order("c-1", Side::Bid)).unwrap();
        settle().await;

        assert_eq!(h.sender.requests().len(), 1);
        assert!(updates.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_orders_room_joined_with_customer_and_pushes_mapped() {
        let h = harness();
        let mut updates = h.gateway.order_updates();
        h.socket.handle_transport_event(TransportEvent::Connect);
        assert_eq!(
            h.transport.emitted(),
            vec![("orders room".to_string(), "cust-1".to_string())]
        );

        h.socket.handle_transport_event(TransportEvent::Message {
            event: "orders".to_string(),
            data: json!({
                "uuid": "ex-1", "clientOrderId": "c-1", "filledQuantity": 1.5,
                "orderType": "LIMIT", "stage": "CLOSED", "requestedQuantity": 1.5,
                "requestedPrice": 400.0, "side": "SELL", "symbol": "BTCUSD"
            }),
        });

        let report = next(&mut updates).await;
        assert_eq!(report.order_status, OrderStatus::Cancelled);
        assert_eq!(report.side, Some(Side::Ask));
        assert_eq!(report.time, fixed_time());
        assert!(!report.partially_filled);
    }

    #[tokio::test]
    async fn test_orders_push_with_null_order_type_is_reported() {
        let h = harness();
        let mut updates = h.gateway.order_updates();
        h.socket.handle_transport_event(TransportEvent::Connect);

        h.socket.handle_transport_event(TransportEvent::Message {
            event: "orders".to_string(),
            data: json!({
                "uuid": "ex-1", "clientOrderId": "c-1", "filledQuantity": 0.0,
                "orderType": null, "stage": "OPEN", "requestedQuantity": 1.5,
                "side": "BUY"
            }),
        });

        let report = next(&mut updates).await;
        assert_eq!(report.order_id, "c-1");
        assert_eq!(report.order_status, OrderStatus::Working);
        assert_eq!(report.order_type, None);
        assert_eq!(report.side, Some(Side::Bid));
    }

    #[test]
    fn test_ack_without_client_id_uses_known_id() {
        let resp = Timestamped::new(
            CoinsetterOrderAck {
                uuid: Some("ex-1".to_string()),
                message: None,
                request_status: Some(REQUEST_SUCCESS.to_string()),
                order_number: None,
                client_order_id: None,
            },
            fixed_time(),
        );
        let report = handle_order_ack(resp, OrderStatus::Working, "c-1");
        assert_eq!(report.order_id, "c-1");
        assert_eq!(report.time, fixed_time());
    }

    #[tokio::test]
    async fn test_generated_ids_are_unique() {
        let h = harness();
        let a = h.gateway.generate_client_order_id();
        let b = h.gateway.generate_client_order_id();
        assert_eq!(a.len(), 12);
        assert_ne!(a, b);
    }
}
