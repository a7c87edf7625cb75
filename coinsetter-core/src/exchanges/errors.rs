//! Gateway error types

use thiserror::Error;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Request to {url} timed out after {seconds} seconds")]
    Timeout { url: String, seconds: u64 },

    #[error("Failed to decode response from {url}: {message}")]
    Decode {
        url: String,
        message: String,
        body: String,
    },

    #[error("Failed to encode request for {url}: {message}")]
    Encode { url: String, message: String },

    #[error("Already have subscriber for {room}")]
    DuplicateSubscription { room: String },

    #[error("Coinsetter does not support side {side}")]
    UnsupportedSide { side: String },

    #[error("Order {order_id} has no exchange id; cancel by client order id is not supported")]
    MissingExchangeId { order_id: String },

    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Missing or invalid configuration: {key}")]
    Config { key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network failure or timeout talking to the venue
    Transport,
    /// Venue answered with something that is not the expected JSON
    Decode,
    /// Contract violation detected before anything was sent
    Local,
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } | Self::Connection { .. } => {
                ErrorKind::Transport
            }
            Self::Decode { .. } => ErrorKind::Decode,
            Self::DuplicateSubscription { .. }
            | Self::UnsupportedSide { .. }
            | Self::MissingExchangeId { .. }
            | Self::Encode { .. }
            | Self::Config { .. } => ErrorKind::Local,
        }
    }

    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    pub fn is_decode(&self) -> bool {
        self.kind() == ErrorKind::Decode
    }
}

impl From<url::ParseError> for GatewayError {
    fn from(err: url::ParseError) -> Self {
        Self::Config {
            key: format!("url ({})", err),
        }
    }
}

impl GatewayError {
    /// Classify a reqwest failure for a request with the given timeout
    pub fn from_reqwest(err: reqwest::Error, url: &str, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
                seconds: timeout_secs,
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}
