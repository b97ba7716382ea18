//! Sources of "now", at one-second resolution.
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::time::Instant;

/// Provides the current time in whole seconds.
///
/// Only differences between two readings are meaningful to a
/// [`WindowCounter`](crate::WindowCounter). A clock is allowed to go
/// backwards; the counter treats that as no time having passed.
pub trait Clock {
    fn now_secs(&self) -> u64;
}

/// Wall-clock seconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

/// Seconds elapsed since the clock was created, read from Tokio's clock.
///
/// When the Tokio runtime's time is paused, this clock only moves when the
/// runtime's time is advanced.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    epoch: Instant,
}

// === impl SystemClock ===

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

// === impl TokioClock ===

impl TokioClock {
    pub fn new() -> Self {
        TokioClock {
            epoch: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_secs(&self) -> u64 {
        Instant::now().duration_since(self.epoch).as_secs()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_secs(&self) -> u64 {
        (**self).now_secs()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_secs(&self) -> u64 {
        (**self).now_secs()
    }
}

#[cfg(test)]
pub(crate) use self::manual::ManualClock;

#[cfg(test)]
mod manual {
    use super::Clock;
    use std::sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    };

    /// A clock that only moves when told to.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct ManualClock(Arc<AtomicU64>);

    impl ManualClock {
        pub(crate) fn at(secs: u64) -> Self {
            ManualClock(Arc::new(AtomicU64::new(secs)))
        }

        pub(crate) fn advance(&self, secs: u64) {
            self.0.fetch_add(secs, Ordering::SeqCst);
        }

        pub(crate) fn set(&self, secs: u64) {
            self.0.store(secs, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_secs(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }
}
