//! Order entry that acknowledges everything locally

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

use super::clock::TimeProvider;
use super::connector::OrderEntryGateway;
use super::errors::GatewayResult;
use super::events::Evt;
use super::types::{
    BrokeredCancel, BrokeredOrder, BrokeredReplace, ConnectivityStatus, OrderGatewayActionReport,
    OrderStatus, OrderStatusReport,
};

/// Dry-run order destination. Orders are reported working and cancels
/// cancelled, on the next scheduler turn.
pub struct NullOrderGateway {
    clock: Arc<dyn TimeProvider>,
    order_update: Evt<OrderStatusReport>,
    connect_changed: Evt<ConnectivityStatus>,
}

impl NullOrderGateway {
    pub fn new(clock: Arc<dyn TimeProvider>) -> Self {
        info!("Orders are routed to the null gateway");
        Self {
            clock,
            order_update: Evt::new(),
            connect_changed: Evt::new(),
        }
    }

    fn report_later(&self, order_id: String, order_status: OrderStatus) {
        let report = OrderStatusReport {
            order_id,
            exchange_id: Some(nanoid::nanoid!(12)),
            time: self.clock.utc_now(),
            order_status,
            ..Default::default()
        };
        let evt = self.order_update.clone();
        tokio::spawn(async move {
            evt.trigger(report);
        });
    }
}

impl OrderEntryGateway for NullOrderGateway {
    fn connect_changed(&self) -> broadcast::Receiver<ConnectivityStatus> {
        self.connect_changed.subscribe()
    }

    fn connect_status(&self) -> ConnectivityStatus {
        ConnectivityStatus::Connected
    }

    fn order_updates(&self) -> broadcast::Receiver<OrderStatusReport> {
        self.order_update.subscribe()
    }

    fn send_order(&self, order: &BrokeredOrder) -> GatewayResult<OrderGatewayActionReport> {
        self.report_later(order.order_id.clone(), OrderStatus::Working);
        Ok(OrderGatewayActionReport::new(self.clock.utc_now()))
    }

    fn cancel_order(&self, cancel: &BrokeredCancel) -> GatewayResult<OrderGatewayActionReport> {
        self.report_later(cancel.orig_order_id.clone(), OrderStatus::Cancelled);
        Ok(OrderGatewayActionReport::new(self.clock.utc_now()))
    }

    fn replace_order(&self, replace: &BrokeredReplace) -> GatewayResult<OrderGatewayActionReport> {
        self.cancel_order(&replace.to_cancel())?;
        self.send_order(&replace.to_order())
    }

    fn generate_client_order_id(&self) -> String {
        nanoid::nanoid!(12)
    }

    fn cancels_by_client_order_id(&self) -> bool {
        true
    }
}
