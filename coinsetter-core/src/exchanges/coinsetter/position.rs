//! Balance polling

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::warn;

use super::http::CoinsetterHttp;
use super::messages::CoinsetterAccountResponse;
use crate::exchanges::connector::PositionGateway;
use crate::exchanges::events::Evt;
use crate::exchanges::types::{Currency, CurrencyPosition};

pub const POSITION_REFRESH_INTERVAL: Duration = Duration::from_secs(15);

/// Polls the account balance once at construction and then on every tick.
/// A failed poll is skipped; the next tick is the retry.
pub struct CoinsetterPositionGateway {
    position_update: Evt<CurrencyPosition>,
    poller: JoinHandle<()>,
}

impl CoinsetterPositionGateway {
    pub fn new(http: Arc<CoinsetterHttp>) -> Self {
        Self::with_interval(http, POSITION_REFRESH_INTERVAL)
    }

    pub fn with_interval(http: Arc<CoinsetterHttp>, period: Duration) -> Self {
        let position_update = Evt::new();
        let evt = position_update.clone();

        let poller = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // first tick completes immediately
                ticker.tick().await;
                Self::refresh_positions(&http, &evt).await;
            }
        });

        Self {
            position_update,
            poller,
        }
    }

    async fn refresh_positions(http: &CoinsetterHttp, evt: &Evt<CurrencyPosition>) {
        let endpoint = format!("customer/account/{}", http.account_uuid);
        match http.get::<CoinsetterAccountResponse>(&endpoint).await {
            Ok(resp) => {
                evt.trigger(CurrencyPosition::new(resp.data.btc_balance, 0.0, Currency::BTC));
                evt.trigger(CurrencyPosition::new(resp.data.usd_balance, 0.0, Currency::USD));
            }
            Err(e) => warn!("Failed to refresh positions: {}", e),
        }
    }
}

impl PositionGateway for CoinsetterPositionGateway {
    fn position_updates(&self) -> broadcast::Receiver<CurrencyPosition> {
        self.position_update.subscribe()
    }
}

impl Drop for CoinsetterPositionGateway {
    fn drop(&mut self) {
        self.poller.abort();
    }
}
