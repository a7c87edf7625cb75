//! Push connection with room subscriptions replayed on every (re)connect

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::exchanges::errors::{GatewayError, GatewayResult};
use crate::exchanges::events::{forward, Evt};
use crate::exchanges::types::ConnectivityStatus;
use crate::exchanges::websocket::{PushTransport, TransportEvent};

type RoomHandler = Arc<dyn Fn(Value) + Send + Sync>;

struct Subscription {
    handler: RoomHandler,
    payload: String,
}

/// Owns connectivity state and the room registry for one push session.
///
/// The registry lock is held across check, insert and join in `subscribe`, and
/// across the state flip and replay on connect, so a subscribe racing a
/// reconnect is joined exactly once by one side or the other.
pub struct RealtimeConnection {
    transport: Arc<dyn PushTransport>,
    subscriptions: Mutex<HashMap<String, Subscription>>,
    status: RwLock<ConnectivityStatus>,
    connect_changed: Evt<ConnectivityStatus>,
}

impl RealtimeConnection {
    pub fn new(transport: Arc<dyn PushTransport>) -> Self {
        Self {
            transport,
            subscriptions: Mutex::new(HashMap::new()),
            status: RwLock::new(ConnectivityStatus::Disconnected),
            connect_changed: Evt::new(),
        }
    }

    /// Pump transport events into this connection until the transport or the
    /// connection goes away.
    pub fn start(self: &Arc<Self>, mut events: mpsc::UnboundedReceiver<TransportEvent>) -> JoinHandle<()> {
        let connection = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match connection.upgrade() {
                    Some(connection) => connection.handle_transport_event(event),
                    None => break,
                }
            }
            debug!("Push event pump stopped");
        })
    }

    pub fn connect_status(&self) -> ConnectivityStatus {
        *self.status.read()
    }

    pub fn connect_changed(&self) -> broadcast::Receiver<ConnectivityStatus> {
        self.connect_changed.subscribe()
    }

    /// Connectivity view for a component that mirrors this connection
    pub fn mirror(&self) -> ConnectivityMirror {
        let upstream = self.connect_changed.subscribe();
        ConnectivityMirror::new(upstream, self.connect_status())
    }

    /// Register the only handler for `room`. Joins now if connected, otherwise
    /// on the next connect.
    pub fn subscribe<T, F>(&self, room: &str, handler: F, payload: &str) -> GatewayResult<()>
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let room_name = room.to_string();
        let handler: RoomHandler = Arc::new(move |data: Value| {
            match serde_json::from_value::<T>(data) {
                Ok(message) => handler(message),
                Err(e) => warn!("Failed to decode {} message: {}", room_name, e),
            }
        });

        let mut subscriptions = self.subscriptions.lock();
        if subscriptions.contains_key(room) {
            return Err(GatewayError::DuplicateSubscription {
                room: room.to_string(),
            });
        }

        info!("subscribing for {} data: {:?}", room, payload);
        subscriptions.insert(
            room.to_string(),
            Subscription {
                handler,
                payload: payload.to_string(),
            },
        );

        if *self.status.read() == ConnectivityStatus::Connected {
            self.join(room, payload);
        }
        Ok(())
    }

    pub fn handle_transport_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Connect => self.on_connect("connected"),
            TransportEvent::Reconnect => self.on_connect("reconnected"),
            TransportEvent::ConnectError(e) => {
                warn!("connect_error. Disconnected: {}", e);
                self.on_disconnect();
            }
            TransportEvent::ReconnectError(e) => {
                warn!("reconnect_error. Disconnected: {}", e);
                self.on_disconnect();
            }
            TransportEvent::ConnectTimeout => {
                warn!("connect timeout. Disconnected.");
                self.on_disconnect();
            }
            TransportEvent::ReconnectFailed => {
                warn!("reconnect failed");
                self.on_disconnect();
            }
            TransportEvent::Disconnect(reason) => {
                warn!("disconnected: {}", reason);
                self.on_disconnect();
            }
            TransportEvent::ReconnectAttempt => debug!("reconnect_attempt"),
            TransportEvent::Reconnecting(attempt) => info!("reconnecting attempt {}", attempt),
            TransportEvent::Message { event, data } => self.dispatch(&event, data),
        }
    }

    fn on_connect(&self, how: &str) {
        info!("{}", how);
        {
            let subscriptions = self.subscriptions.lock();
            *self.status.write() = ConnectivityStatus::Connected;
            for (room, subscription) in subscriptions.iter() {
                self.join(room, &subscription.payload);
            }
        }
        self.connect_changed.trigger(ConnectivityStatus::Connected);
    }

    fn on_disconnect(&self) {
        {
            let _subscriptions = self.subscriptions.lock();
            *self.status.write() = ConnectivityStatus::Disconnected;
        }
        self.connect_changed.trigger(ConnectivityStatus::Disconnected);
    }

    fn join(&self, room: &str, payload: &str) {
        if let Err(e) = self.transport.emit(&format!("{} room", room), payload) {
            warn!("Failed to join {} room: {}", room, e);
        }
    }

    fn dispatch(&self, room: &str, data: Value) {
        let handler = self
            .subscriptions
            .lock()
            .get(room)
            .map(|s| s.handler.clone());
        match handler {
            Some(handler) => handler(data),
            None => debug!("No subscriber for {} message", room),
        }
    }
}

/// Connectivity as seen by a derived component. `status()` starts at the
/// upstream value given at construction; the channel only carries later
/// upstream changes.
pub struct ConnectivityMirror {
    connect_changed: Evt<ConnectivityStatus>,
    status: Arc<RwLock<ConnectivityStatus>>,
    forwarder: JoinHandle<()>,
}

impl ConnectivityMirror {
    pub fn new(
        upstream: broadcast::Receiver<ConnectivityStatus>,
        initial: ConnectivityStatus,
    ) -> Self {
        let connect_changed = Evt::new();
        let status = Arc::new(RwLock::new(initial));
        let mirrored = status.clone();
        let forwarder = forward(upstream, connect_changed.clone(), move |value| {
            *mirrored.write() = *value;
        });

        Self {
            connect_changed,
            status,
            forwarder,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityStatus> {
        self.connect_changed.subscribe()
    }

    pub fn status(&self) -> ConnectivityStatus {
        *self.status.read()
    }
}

impl Drop for ConnectivityMirror {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}
