use crate::{
    clock::{Clock, TokioClock},
    error::{Error, Result},
    window_counter::WindowCounter,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Limits a service to at most `max_requests` requests per trailing window.
///
/// Request and failure counts are kept in two [`WindowCounter`]s, each behind
/// its own lock. Clones share the same counters.
#[derive(Debug)]
pub struct MaxRate<C = TokioClock>(Arc<Inner<C>>);

#[derive(Debug)]
struct Inner<C> {
    /// The window, in seconds, requests are counted over.
    window_secs: usize,
    max_requests: u64,
    reqs: Mutex<WindowCounter<C>>,
    fails: Mutex<WindowCounter<C>>,
}

impl MaxRate {
    /// Returns a new `MaxRate` policy allowing `max_requests` over the
    /// trailing `window_secs` seconds, timed by Tokio's clock.
    ///
    /// # Errors
    ///
    /// If `window_secs` is zero.
    pub fn new(window_secs: usize, max_requests: u64) -> Result<Self> {
        Self::with_clock(window_secs, max_requests, TokioClock::new())
    }
}

impl<C: Clock + Clone> MaxRate<C> {
    /// Returns a new `MaxRate` policy reading the time from `clock`.
    ///
    /// # Errors
    ///
    /// If `window_secs` is zero.
    pub fn with_clock(window_secs: usize, max_requests: u64, clock: C) -> Result<Self> {
        if window_secs == 0 {
            return Err(Error::invalid_argument(
                "window_secs",
                0,
                "rate window must be at least one second",
            ));
        }
        Ok(MaxRate(Arc::new(Inner {
            window_secs,
            max_requests,
            reqs: Mutex::new(WindowCounter::with_clock(window_secs, clock.clone())?),
            fails: Mutex::new(WindowCounter::with_clock(window_secs, clock)?),
        })))
    }
}

impl<C: Clock> MaxRate<C> {
    pub fn requests_in_window(&self) -> u64 {
        self.0.reqs.lock().total()
    }

    pub fn failures_in_window(&self) -> u64 {
        self.0.fails.lock().total()
    }

    pub fn window_secs(&self) -> usize {
        self.0.window_secs
    }

    pub fn max_requests(&self) -> u64 {
        self.0.max_requests
    }
}

impl<C> Clone for MaxRate<C> {
    fn clone(&self) -> Self {
        MaxRate(self.0.clone())
    }
}

impl<C: Clock> super::Policy for MaxRate<C> {
    fn record_request(&self) {
        self.0.reqs.lock().record_event();
    }

    fn record_failure(&self) {
        self.0.fails.lock().record_event();
    }

    fn is_limited(&self) -> bool {
        let reqs = self.requests_in_window();
        let limited = reqs >= self.0.max_requests;
        if limited {
            tracing::trace!(
                requests = reqs,
                max_requests = self.0.max_requests,
                window_secs = self.0.window_secs,
                "Request rate at max; limiting service"
            );
        }
        limited
    }

    fn reset(&self) {
        self.0.reqs.lock().clear();
        self.0.fails.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, Policy};

    #[test]
    fn limits_at_max_requests() {
        let clock = ManualClock::at(0);
        let policy = MaxRate::with_clock(10, 3, clock.clone()).unwrap();

        policy.record_request();
        policy.record_request();
        assert!(!policy.is_limited());

        policy.record_request();
        assert!(policy.is_limited());
        assert_eq!(policy.requests_in_window(), 3);
    }

    #[test]
    fn unlimits_once_requests_age_out() {
        let clock = ManualClock::at(0);
        let policy = MaxRate::with_clock(10, 2, clock.clone()).unwrap();
        policy.record_request();
        clock.advance(5);
        policy.record_request();
        assert!(policy.is_limited());

        clock.advance(5);
        assert!(!policy.is_limited());
        assert_eq!(policy.requests_in_window(), 1);

        clock.advance(5);
        assert_eq!(policy.requests_in_window(), 0);
    }

    #[test]
    fn clones_share_counters() {
        let clock = ManualClock::at(0);
        let policy = MaxRate::with_clock(10, 100, clock).unwrap();
        let other = policy.clone();

        other.record_request();
        other.record_failure();
        assert_eq!(policy.requests_in_window(), 1);
        assert_eq!(policy.failures_in_window(), 1);

        policy.reset();
        assert_eq!(other.requests_in_window(), 0);
        assert_eq!(other.failures_in_window(), 0);
    }

    #[test]
    fn zero_window_is_rejected() {
        assert!(matches!(
            MaxRate::new(0, 10),
            Err(Error::InvalidArgument { .. })
        ));
    }
}
