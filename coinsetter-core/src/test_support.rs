//! Scripted collaborators for gateway tests

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::config::{CoinsetterConfig, OrderDestination};
use crate::exchanges::clock::TimeProvider;
use crate::exchanges::errors::{GatewayError, GatewayResult};
use crate::exchanges::rest::{HttpMethod, HttpRequest, HttpSender};
use crate::exchanges::websocket::PushTransport;

/// Records every emit instead of sending it
#[derive(Default)]
pub struct RecordingTransport {
    emitted: Mutex<Vec<(String, String)>>,
}

impl RecordingTransport {
    pub fn emitted(&self) -> Vec<(String, String)> {
        self.emitted.lock().clone()
    }

    pub fn clear(&self) {
        self.emitted.lock().clear();
    }
}

impl PushTransport for RecordingTransport {
    fn emit(&self, event: &str, payload: &str) -> GatewayResult<()> {
        self.emitted
            .lock()
            .push((event.to_string(), payload.to_string()));
        Ok(())
    }
}

struct Route {
    method: HttpMethod,
    path: String,
    responses: VecDeque<GatewayResult<String>>,
}

/// Answers requests from per-route queues. The last queued answer for a route
/// repeats once the queue is down to one.
#[derive(Default)]
pub struct ScriptedSender {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedSender {
    pub fn respond(&self, method: HttpMethod, path: &str, response: GatewayResult<String>) {
        let mut routes = self.routes.lock();
        match routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path)
        {
            Some(route) => route.responses.push_back(response),
            None => routes.push(Route {
                method,
                path: path.to_string(),
                responses: VecDeque::from(vec![response]),
            }),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl HttpSender for ScriptedSender {
    async fn send(&self, request: HttpRequest) -> GatewayResult<String> {
        self.requests.lock().push(request.clone());

        let mut routes = self.routes.lock();
        let route = routes
            .iter_mut()
            .find(|r| r.method == request.method && request.url.ends_with(&r.path));
        match route {
            Some(route) if route.responses.len() > 1 => route.responses.pop_front().unwrap(),
            Some(route) => route.responses[0].clone(),
            None => Err(GatewayError::Transport {
                url: request.url.clone(),
                message: "no scripted response".to_string(),
            }),
        }
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl TimeProvider for FixedClock {
    fn utc_now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2015, 3, 14, 15, 9, 26).unwrap()
}

pub fn test_config() -> CoinsetterConfig {
    CoinsetterConfig {
        socket_io_url: "https://plug.coinsetter.com:3000".to_string(),
        http_url: "https://api.coinsetter.com/v1".to_string(),
        customer_uuid: "cust-1".to_string(),
        account_uuid: "acct-1".to_string(),
        client_session_id: "session-1".to_string(),
        order_destination: OrderDestination::Coinsetter,
    }
}

/// Next value on `rx`, failing the test after a second of silence
pub async fn next<T: Clone>(rx: &mut broadcast::Receiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Let spawned tasks run to their next await point
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
