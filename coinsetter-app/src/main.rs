//! Coinsetter Gateway Application
//!
//! Connects the Coinsetter venue adapter and logs every canonical event
//! stream until interrupted.

use anyhow::Result;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use coinsetter_core::{Coinsetter, CoinsetterConfig, Currency, CurrencyPair};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = CoinsetterConfig::from_env()?;
    info!(
        "Starting Coinsetter gateway: socket.io={} http={} orders={:?}",
        config.socket_io_url, config.http_url, config.order_destination
    );

    let pair = CurrencyPair::new(Currency::BTC, Currency::USD);
    let gateway = Coinsetter::create(&config, pair)?;
    info!(
        "{} gateway ready, make fee {} take fee {}",
        gateway.details.name(),
        gateway.details.make_fee(),
        gateway.details.take_fee()
    );

    let tasks = vec![
        spawn_logger("md connectivity", gateway.market_data.connect_changed(), |s| format!("{:?}", s)),
        spawn_logger("oe connectivity", gateway.order_entry.connect_changed(), |s| format!("{:?}", s)),
        spawn_logger("book", gateway.market_data.market_data(), |m| {
            let best_bid = m.bids.first().map(|b| b.price);
            let best_ask = m.asks.first().map(|a| a.price);
            format!("{} levels, best {:?} / {:?}", m.bids.len(), best_bid, best_ask)
        }),
        spawn_logger("trade", gateway.market_data.market_trades(), |t| {
            format!("{} @ {} at {}", t.size, t.price, t.time)
        }),
        spawn_logger("order", gateway.order_entry.order_updates(), |r| {
            format!("{} {:?} exchange_id={:?}", r.order_id, r.order_status, r.exchange_id)
        }),
        spawn_logger("position", gateway.positions.position_updates(), |p| {
            format!("{} {}", p.amount, p.currency)
        }),
    ];

    info!("System is running. Press Ctrl+C to stop.");
    signal::ctrl_c().await?;
    info!("Shutdown signal received...");

    for task in tasks {
        task.abort();
    }
    info!("Coinsetter gateway shutdown complete");

    Ok(())
}

fn spawn_logger<T, F>(
    name: &'static str,
    mut rx: broadcast::Receiver<T>,
    describe: F,
) -> tokio::task::JoinHandle<()>
where
    T: Clone + Send + 'static,
    F: Fn(&T) -> String + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(value) => info!("{}: {}", name, describe(&value)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("{} logger lagged, skipped {} events", name, skipped)
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
