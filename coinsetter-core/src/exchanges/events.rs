//! Per-instance fan-out event channels

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

const DEFAULT_CAPACITY: usize = 1024;

/// Multi-subscriber event. Every gateway owns its own `Evt`s; triggering with
/// no live receivers is not an error.
#[derive(Debug)]
pub struct Evt<T> {
    sender: broadcast::Sender<T>,
}

impl<T> Clone for Evt<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Evt<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn trigger(&self, value: T) {
        // No receivers, that's OK
        let _ = self.sender.send(value);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T: Clone + Send + 'static> Default for Evt<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-trigger everything received on `upstream` on `downstream` until the
/// upstream sender is dropped.
pub fn forward<T, F>(
    mut upstream: broadcast::Receiver<T>,
    downstream: Evt<T>,
    mut on_value: F,
) -> JoinHandle<()>
where
    T: Clone + Send + 'static,
    F: FnMut(&T) + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match upstream.recv().await {
                Ok(value) => {
                    on_value(&value);
                    downstream.trigger(value);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event forwarder lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
