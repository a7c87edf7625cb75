//! Time source for canonical event timestamps

use chrono::{DateTime, Utc};

pub trait TimeProvider: Send + Sync {
    fn utc_now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeProvider for SystemClock {
    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
