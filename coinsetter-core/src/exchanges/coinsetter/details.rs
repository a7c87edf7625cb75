//! Static venue facts

use crate::exchanges::connector::ExchangeDetailsGateway;
use crate::exchanges::types::{Currency, CurrencyPair, Exchange};

pub const MAKE_FEE: f64 = 0.001;
pub const TAKE_FEE: f64 = 0.002;

pub struct CoinsetterBaseGateway {
    pairs: Vec<CurrencyPair>,
}

impl CoinsetterBaseGateway {
    pub fn new() -> Self {
        Self {
            pairs: vec![CurrencyPair::new(Currency::BTC, Currency::USD)],
        }
    }
}

impl Default for CoinsetterBaseGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl ExchangeDetailsGateway for CoinsetterBaseGateway {
    fn name(&self) -> &str {
        "Coinsetter"
    }

    fn exchange(&self) -> Exchange {
        Exchange::Coinsetter
    }

    fn make_fee(&self) -> f64 {
        MAKE_FEE
    }

    fn take_fee(&self) -> f64 {
        TAKE_FEE
    }

    fn has_self_trade_prevention(&self) -> bool {
        false
    }

    fn supported_currency_pairs(&self) -> &[CurrencyPair] {
        &self.pairs
    }
}

/// Venue symbol for the traded pair, e.g. `BTCUSD`
#[derive(Debug, Clone)]
pub struct CoinsetterSymbolProvider {
    pub symbol: String,
}

impl CoinsetterSymbolProvider {
    pub fn new(pair: CurrencyPair) -> Self {
        Self {
            symbol: format!("{}{}", pair.base, pair.quote),
        }
    }
}
