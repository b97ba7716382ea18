//! Trailing-window event counting, and Tower rate limiting built on it.
//!
//! A [`WindowCounter`] answers "how many events happened in the last N
//! seconds?" with one integer per second of history and no per-event storage.
//! [`RateLimit`] wraps a Tower service and holds it back while a [`Policy`]
//! built from such counters reports it as over its limit.
pub mod clock;
pub mod error;
pub mod policy;
pub mod service;
mod window_counter;

pub use self::{
    clock::{Clock, SystemClock, TokioClock},
    error::{Error, Result},
    policy::{MaxRate, Policy},
    service::RateLimit,
    window_counter::{WindowCounter, DEFAULT_CAPACITY},
};
use tokio::time::Duration;

/// Configures a [`RateLimit`].
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config<P> {
    /// The policy used to determine whether the service is over its limit.
    pub policy: P,
    /// How long a limited service waits before asking the policy again.
    pub retry_after: Duration,
}

impl<P> Config<P> {
    /// Returns a config that re-checks `policy` once a second while limited.
    pub fn new(policy: P) -> Self {
        Config {
            policy,
            retry_after: Duration::from_secs(1),
        }
    }

    pub fn retry_after(self, retry_after: Duration) -> Self {
        Config {
            retry_after,
            ..self
        }
    }
}
