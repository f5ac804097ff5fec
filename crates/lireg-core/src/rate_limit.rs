//! Pacing of registration page fetches.
//!
//! The SMS site is fetched at most once per configured delay. The default
//! pacer sleeps unconditionally before every fetch; the token bucket pacer
//! lets the first fetch through immediately and spaces the rest.

use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};

/// Type alias for governor's direct rate limiter.
type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingMode {
    /// Sleep for the full delay before every fetch.
    #[default]
    Fixed,
    /// One permit per delay period, no burst.
    TokenBucket,
}

pub enum DetailPacer {
    Disabled,
    Fixed(Duration),
    TokenBucket {
        limiter: DirectLimiter,
        period: Duration,
    },
}

impl DetailPacer {
    /// Build a pacer. A zero delay disables pacing.
    pub fn new(mode: PacingMode, delay: Duration) -> Self {
        if delay.is_zero() {
            return DetailPacer::Disabled;
        }
        match mode {
            PacingMode::Fixed => DetailPacer::Fixed(delay),
            PacingMode::TokenBucket => match Quota::with_period(delay) {
                Some(quota) => DetailPacer::TokenBucket {
                    limiter: DirectLimiter::direct(quota),
                    period: delay,
                },
                None => DetailPacer::Disabled,
            },
        }
    }

    /// Upper bound on how long [`wait`](Self::wait) may block.
    pub fn delay(&self) -> Duration {
        match self {
            DetailPacer::Disabled => Duration::ZERO,
            DetailPacer::Fixed(d) => *d,
            DetailPacer::TokenBucket { period, .. } => *period,
        }
    }

    /// Wait until the next registration fetch is allowed.
    pub async fn wait(&self) {
        match self {
            DetailPacer::Disabled => {}
            DetailPacer::Fixed(d) => tokio::time::sleep(*d).await,
            DetailPacer::TokenBucket { limiter, .. } => limiter.until_ready().await,
        }
    }
}

impl std::fmt::Debug for DetailPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetailPacer::Disabled => write!(f, "DetailPacer::Disabled"),
            DetailPacer::Fixed(d) => write!(f, "DetailPacer::Fixed({d:?})"),
            DetailPacer::TokenBucket { period, .. } => {
                write!(f, "DetailPacer::TokenBucket({period:?})")
            }
        }
    }
}
