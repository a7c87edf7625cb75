//! Coinsetter REST client

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::CoinsetterConfig;
use crate::exchanges::clock::TimeProvider;
use crate::exchanges::errors::{GatewayError, GatewayResult};
use crate::exchanges::rest::{HttpMethod, HttpRequest, HttpSender};
use crate::exchanges::types::Timestamped;

pub const CLIENT_SESSION_HEADER: &str = "coinsetter-client-session-id";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// JSON request/response against the venue's REST API. Every successful reply
/// is stamped with its receive time. Nothing is retried.
pub struct CoinsetterHttp {
    sender: Arc<dyn HttpSender>,
    clock: Arc<dyn TimeProvider>,
    base_url: String,
    client_session_id: String,
    pub account_uuid: String,
    pub customer_uuid: String,
}

impl CoinsetterHttp {
    pub fn new(
        config: &CoinsetterConfig,
        sender: Arc<dyn HttpSender>,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            sender,
            clock,
            base_url: config.http_url.trim_end_matches('/').to_string(),
            client_session_id: config.client_session_id.clone(),
            account_uuid: config.account_uuid.clone(),
            customer_uuid: config.customer_uuid.clone(),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> GatewayResult<Timestamped<T>> {
        self.do_request(HttpMethod::Get, endpoint, None).await
    }

    pub async fn del<T: DeserializeOwned>(&self, endpoint: &str) -> GatewayResult<Timestamped<T>> {
        self.do_request(HttpMethod::Delete, endpoint, None).await
    }

    pub async fn post<B, T>(&self, endpoint: &str, msg: &B) -> GatewayResult<Timestamped<T>>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(msg).map_err(|e| GatewayError::Encode {
            url: self.url(endpoint),
            message: e.to_string(),
        })?;
        self.do_request(HttpMethod::Post, endpoint, Some(body)).await
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn do_request<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<Value>,
    ) -> GatewayResult<Timestamped<T>> {
        let url = self.url(endpoint);
        let request = HttpRequest {
            method,
            url: url.clone(),
            headers: vec![(
                CLIENT_SESSION_HEADER.to_string(),
                self.client_session_id.clone(),
            )],
            body,
            timeout: REQUEST_TIMEOUT,
        };

        debug!("{} {}", method, url);
        let body = match self.sender.send(request).await {
            Ok(body) => body,
            Err(e) => {
                error!("Error returned: url={} err={}", url, e);
                return Err(e);
            }
        };

        match serde_json::from_str::<T>(&body) {
            Ok(data) => Ok(Timestamped::new(data, self.clock.utc_now())),
            Err(e) => {
                error!("Error parsing JSON url={} err={} body={}", url, e, body);
                Err(GatewayError::Decode {
                    url,
                    message: e.to_string(),
                    body,
                })
            }
        }
    }
}
