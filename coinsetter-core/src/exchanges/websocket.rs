//! Socket.IO push transport over WebSocket
//!
//! Speaks just enough Engine.IO v3 / Socket.IO to join rooms and receive
//! events. Reconnects on a fixed interval and reports every lifecycle
//! transition as a [`TransportEvent`]; deciding what a transition means is
//! left to the consumer.

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, timeout, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

use super::errors::{GatewayError, GatewayResult};

/// Everything a push transport can tell its owner
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connect,
    Reconnect,
    ConnectError(String),
    ReconnectError(String),
    ConnectTimeout,
    ReconnectAttempt,
    Reconnecting(u32),
    ReconnectFailed,
    Disconnect(String),
    Message { event: String, data: Value },
}

/// Outbound half of a push session
pub trait PushTransport: Send + Sync {
    /// Queue a Socket.IO event for the current session
    fn emit(&self, event: &str, payload: &str) -> GatewayResult<()>;
}

/// WebSocket configuration
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub url: String,
    /// Used until the server's handshake announces its own values
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
    pub reconnect_interval: Duration,
    pub connect_timeout: Duration,
    /// `None` retries forever
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            url: "https://plug.coinsetter.com:3000".to_string(),
            ping_interval: Duration::from_secs(25),
            ping_timeout: Duration::from_secs(60),
            reconnect_interval: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(20),
            max_reconnect_attempts: None,
        }
    }
}

/// One decoded Engine.IO / Socket.IO frame
#[derive(Debug, Clone, PartialEq)]
pub enum SocketIoPacket {
    Open {
        ping_interval: Duration,
        ping_timeout: Duration,
    },
    Close,
    Ping,
    Pong,
    Connect,
    Disconnect,
    Event { event: String, data: Value },
    Error(String),
    Noop,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Handshake {
    ping_interval: u64,
    ping_timeout: u64,
}

impl SocketIoPacket {
    pub fn parse(text: &str) -> GatewayResult<Self> {
        let mut chars = text.chars();
        let engine_type = chars.next().ok_or_else(|| Self::decode_error("empty packet", text))?;
        let rest = chars.as_str();

        match engine_type {
            '0' => {
                let handshake: Handshake = serde_json::from_str(rest)
                    .map_err(|e| Self::decode_error(&e.to_string(), text))?;
                Ok(Self::Open {
                    ping_interval: Duration::from_millis(handshake.ping_interval),
                    ping_timeout: Duration::from_millis(handshake.ping_timeout),
                })
            }
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping),
            '3' => Ok(Self::Pong),
            '4' => Self::parse_socket_packet(rest, text),
            '6' => Ok(Self::Noop),
            _ => Err(Self::decode_error("unknown engine.io packet type", text)),
        }
    }

    fn parse_socket_packet(rest: &str, text: &str) -> GatewayResult<Self> {
        let mut chars = rest.chars();
        match chars.next() {
            Some('0') => Ok(Self::Connect),
            Some('1') => Ok(Self::Disconnect),
            Some('2') => {
                // optional "/nsp," and ack id precede the argument array
                let body = chars.as_str();
                let start = body
                    .find('[')
                    .ok_or_else(|| Self::decode_error("event without arguments", text))?;
                let args: Vec<Value> = serde_json::from_str(&body[start..])
                    .map_err(|e| Self::decode_error(&e.to_string(), text))?;
                let mut args = args.into_iter();
                let event = match args.next() {
                    Some(Value::String(name)) => name,
                    _ => return Err(Self::decode_error("event name is not a string", text)),
                };
                Ok(Self::Event {
                    event,
                    data: args.next().unwrap_or(Value::Null),
                })
            }
            Some('4') => Ok(Self::Error(chars.as_str().to_string())),
            _ => Ok(Self::Noop),
        }
    }

    /// `42["<event>","<payload>"]`
    pub fn encode_event(event: &str, payload: &str) -> String {
        format!("42{}", serde_json::json!([event, payload]))
    }

    fn decode_error(message: &str, text: &str) -> GatewayError {
        GatewayError::Decode {
            url: "socket.io".to_string(),
            message: message.to_string(),
            body: text.to_string(),
        }
    }
}

/// Why a session ended and whether it got as far as a Socket.IO connect
struct SessionEnd {
    connected: bool,
    reason: String,
}

/// Socket.IO client owning one background session loop
pub struct SocketIoClient {
    outbound: mpsc::UnboundedSender<String>,
    session_task: JoinHandle<()>,
}

impl SocketIoClient {
    /// Start the session loop. Lifecycle transitions and room messages arrive on
    /// the returned receiver.
    pub fn connect(
        config: WebSocketConfig,
    ) -> GatewayResult<(Self, mpsc::UnboundedReceiver<TransportEvent>)> {
        let url = Self::engine_io_url(&config.url)?;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        info!("Connecting to socket.io at {}", url);
        let session_task = tokio::spawn(Self::run_session_loop(config, url, outbound_rx, event_tx));

        Ok((
            Self {
                outbound: outbound_tx,
                session_task,
            },
            event_rx,
        ))
    }

    pub fn engine_io_url(base: &str) -> GatewayResult<Url> {
        let mut url = Url::parse(base)?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme).map_err(|_| GatewayError::Config {
            key: format!("socket.io url {}", base),
        })?;
        url.set_path("/socket.io/");
        url.set_query(Some("EIO=3&transport=websocket"));
        Ok(url)
    }

    async fn run_session_loop(
        config: WebSocketConfig,
        url: Url,
        mut outbound: mpsc::UnboundedReceiver<String>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) {
        let mut ever_connected = false;
        let mut attempts: u32 = 0;

        while !events.is_closed() {
            if attempts > 0 {
                let _ = events.send(TransportEvent::ReconnectAttempt);
                let _ = events.send(TransportEvent::Reconnecting(attempts));
            }
            let retrying = ever_connected || attempts > 0;

            let ws = match timeout(config.connect_timeout, connect_async(url.as_str())).await {
                Ok(Ok((ws, _))) => ws,
                Ok(Err(e)) => {
                    error!("Failed to connect to socket.io: {}", e);
                    let event = if retrying {
                        TransportEvent::ReconnectError(e.to_string())
                    } else {
                        TransportEvent::ConnectError(e.to_string())
                    };
                    let _ = events.send(event);
                    if !Self::wait_for_retry(&config, &mut attempts, &events).await {
                        break;
                    }
                    continue;
                }
                Err(_) => {
                    warn!("socket.io connect timed out after {:?}", config.connect_timeout);
                    let _ = events.send(TransportEvent::ConnectTimeout);
                    if !Self::wait_for_retry(&config, &mut attempts, &events).await {
                        break;
                    }
                    continue;
                }
            };

            let end = Self::drive_session(ws, &config, &mut outbound, &events, ever_connected).await;
            if end.connected {
                ever_connected = true;
                attempts = 0;
                warn!("socket.io disconnected: {}", end.reason);
                let _ = events.send(TransportEvent::Disconnect(end.reason));
            } else {
                let event = if retrying {
                    TransportEvent::ReconnectError(end.reason)
                } else {
                    TransportEvent::ConnectError(end.reason)
                };
                let _ = events.send(event);
            }

            if !Self::wait_for_retry(&config, &mut attempts, &events).await {
                break;
            }
        }
        debug!("socket.io session loop finished");
    }

    async fn wait_for_retry(
        config: &WebSocketConfig,
        attempts: &mut u32,
        events: &mpsc::UnboundedSender<TransportEvent>,
    ) -> bool {
        *attempts += 1;
        if let Some(max) = config.max_reconnect_attempts {
            if *attempts > max {
                error!("Max reconnection attempts reached, giving up");
                let _ = events.send(TransportEvent::ReconnectFailed);
                return false;
            }
        }
        sleep(config.reconnect_interval).await;
        true
    }

    async fn drive_session(
        ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
        config: &WebSocketConfig,
        outbound: &mut mpsc::UnboundedReceiver<String>,
        events: &mpsc::UnboundedSender<TransportEvent>,
        reconnecting: bool,
    ) -> SessionEnd {
        let (mut sink, mut stream) = ws.split();
        let mut connected = false;
        let mut silence_limit = config.ping_interval + config.ping_timeout;
        let mut ping_timer = interval_at(Instant::now() + config.ping_interval, config.ping_interval);
        let silence = sleep(silence_limit);
        tokio::pin!(silence);

        macro_rules! end {
            ($reason:expr) => {
                return SessionEnd {
                    connected,
                    reason: $reason,
                }
            };
        }

        loop {
            tokio::select! {
                Some(text) = outbound.recv(), if connected => {
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        end!(format!("send failed: {}", e));
                    }
                }

                _ = ping_timer.tick() => {
                    if let Err(e) = sink.send(Message::Text("2".to_string())).await {
                        end!(format!("ping failed: {}", e));
                    }
                }

                _ = &mut silence => {
                    end!("ping timeout".to_string());
                }

                msg = stream.next() => {
                    silence.as_mut().reset(Instant::now() + silence_limit);
                    let text = match msg {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(frame))) => end!(format!("close frame {:?}", frame)),
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => end!(e.to_string()),
                        None => end!("transport close".to_string()),
                    };

                    match SocketIoPacket::parse(&text) {
                        Ok(SocketIoPacket::Open { ping_interval, ping_timeout }) => {
                            let ping_interval = ping_interval.max(Duration::from_secs(1));
                            debug!("socket.io handshake: ping every {:?}", ping_interval);
                            silence_limit = ping_interval + ping_timeout;
                            silence.as_mut().reset(Instant::now() + silence_limit);
                            ping_timer = interval_at(Instant::now() + ping_interval, ping_interval);
                        }
                        Ok(SocketIoPacket::Connect) => {
                            if !connected {
                                connected = true;
                                // joins queued while down are superseded by the owner's replay
                                while outbound.try_recv().is_ok() {}
                                let event = if reconnecting {
                                    TransportEvent::Reconnect
                                } else {
                                    TransportEvent::Connect
                                };
                                if events.send(event).is_err() {
                                    end!("listener dropped".to_string());
                                }
                            }
                        }
                        Ok(SocketIoPacket::Ping) => {
                            if let Err(e) = sink.send(Message::Text("3".to_string())).await {
                                end!(format!("pong failed: {}", e));
                            }
                        }
                        Ok(SocketIoPacket::Pong) => debug!("Received pong"),
                        Ok(SocketIoPacket::Event { event, data }) => {
                            if events.send(TransportEvent::Message { event, data }).is_err() {
                                end!("listener dropped".to_string());
                            }
                        }
                        Ok(SocketIoPacket::Disconnect) | Ok(SocketIoPacket::Close) => {
                            end!("io server disconnect".to_string());
                        }
                        Ok(SocketIoPacket::Error(message)) => warn!("socket.io error packet: {}", message),
                        Ok(SocketIoPacket::Noop) => {}
                        Err(e) => warn!("Failed to parse socket.io packet: {}", e),
                    }
                }
            }
        }
    }
}

impl PushTransport for SocketIoClient {
    fn emit(&self, event: &str, payload: &str) -> GatewayResult<()> {
        self.outbound
            .send(SocketIoPacket::encode_event(event, payload))
            .map_err(|_| GatewayError::Connection {
                message: "socket.io session loop has stopped".to_string(),
            })
    }
}

impl Drop for SocketIoClient {
    fn drop(&mut self) {
        self.session_task.abort();
    }
}
