//! Gateway configuration read from the environment

use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::exchanges::errors::{GatewayError, GatewayResult};
use crate::exchanges::websocket::WebSocketConfig;

pub const SOCKET_IO_URL_KEY: &str = "COINSETTER_SOCKET_IO_URL";
pub const HTTP_URL_KEY: &str = "COINSETTER_HTTP_URL";
pub const CUSTOMER_UUID_KEY: &str = "COINSETTER_CUSTOMER_UUID";
pub const ACCOUNT_UUID_KEY: &str = "COINSETTER_ACCOUNT_UUID";
pub const CLIENT_SESSION_ID_KEY: &str = "COINSETTER_CLIENT_SESSION_ID";
pub const ORDER_DESTINATION_KEY: &str = "COINSETTER_ORDER_DESTINATION";

/// Where orders go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDestination {
    Coinsetter,
    /// Acknowledge locally without touching the venue
    #[default]
    Null,
}

impl FromStr for OrderDestination {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "coinsetter" => Ok(Self::Coinsetter),
            "null" => Ok(Self::Null),
            _ => Err(GatewayError::Config {
                key: format!("{}={}", ORDER_DESTINATION_KEY, s),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoinsetterConfig {
    pub socket_io_url: String,
    pub http_url: String,
    pub customer_uuid: String,
    pub account_uuid: String,
    pub client_session_id: String,
    pub order_destination: OrderDestination,
}

impl CoinsetterConfig {
    pub fn from_env() -> GatewayResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> GatewayResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| GatewayError::Config {
                    key: key.to_string(),
                })
        };

        let order_destination = match lookup(ORDER_DESTINATION_KEY) {
            Some(value) => value.parse()?,
            None => OrderDestination::default(),
        };

        Ok(Self {
            socket_io_url: required(SOCKET_IO_URL_KEY)?,
            http_url: required(HTTP_URL_KEY)?,
            customer_uuid: required(CUSTOMER_UUID_KEY)?,
            account_uuid: required(ACCOUNT_UUID_KEY)?,
            client_session_id: lookup(CLIENT_SESSION_ID_KEY)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            order_destination,
        })
    }

    pub fn websocket_config(&self) -> WebSocketConfig {
        WebSocketConfig {
            url: self.socket_io_url.clone(),
            reconnect_interval: Duration::from_secs(5),
            ..WebSocketConfig::default()
        }
    }
}
