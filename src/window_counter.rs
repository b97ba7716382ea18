use crate::{
    clock::{Clock, SystemClock},
    error::{Error, Result},
};
use tokio::time::Duration;

/// The number of one-second buckets retained when no capacity is given.
pub const DEFAULT_CAPACITY: usize = 300;

/// Counts events over a trailing window of up to `capacity` seconds.
///
/// Events are tallied into one bucket per second, kept in a fixed ring of
/// `capacity` slots. Seconds with no activity are materialized as zero
/// buckets the next time the counter is touched, and buckets older than
/// `capacity` seconds are overwritten. Memory use never grows after
/// construction, no matter the event rate or how long the counter sits idle.
///
/// A `WindowCounter` is not synchronized. Callers sharing one between tasks
/// must serialize access themselves; see [`MaxRate`](crate::policy::MaxRate)
/// for a counter behind a lock.
#[derive(Debug)]
pub struct WindowCounter<C = SystemClock> {
    buckets: Box<[u64]>,
    /// Index of the newest (still open) bucket.
    newest: usize,
    /// Number of buckets holding data, oldest to newest.
    len: usize,
    /// The second at which the window was last advanced.
    last_advance: Option<u64>,
    clock: C,
}

// === impl WindowCounter ===

impl WindowCounter {
    /// Returns a counter retaining `capacity` seconds of history, using the
    /// system wall clock.
    ///
    /// # Errors
    ///
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_clock(capacity, SystemClock)
    }
}

impl Default for WindowCounter {
    fn default() -> Self {
        Self::from_parts(DEFAULT_CAPACITY, SystemClock)
    }
}

impl<C: Clock> WindowCounter<C> {
    /// Returns a counter retaining `capacity` seconds of history, reading the
    /// time from `clock`.
    ///
    /// # Errors
    ///
    /// If `capacity` is zero.
    pub fn with_clock(capacity: usize, clock: C) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::invalid_argument(
                "capacity",
                0,
                "must retain at least one second",
            ));
        }
        Ok(Self::from_parts(capacity, clock))
    }

    fn from_parts(capacity: usize, clock: C) -> Self {
        WindowCounter {
            buckets: vec![0; capacity].into_boxed_slice(),
            newest: capacity - 1,
            len: 0,
            last_advance: None,
            clock,
        }
    }

    /// Records one event at the current second, returning the number of
    /// events in the trailing `capacity` seconds (including this one).
    pub fn record_event(&mut self) -> u64 {
        self.advance();
        if self.len == 0 {
            self.push(1);
        } else {
            self.buckets[self.newest] += 1;
        }
        self.sum_newest(self.len)
    }

    /// Returns the number of events recorded in the trailing `window_secs`
    /// seconds.
    ///
    /// Windows longer than the counter's capacity are accepted, but only
    /// `capacity` seconds of history are ever retained, so the count is
    /// silently capped at that.
    ///
    /// # Errors
    ///
    /// If `window_secs` is negative. The window is not advanced in that case.
    pub fn count_in_window(&mut self, window_secs: i64) -> Result<u64> {
        if window_secs < 0 {
            return Err(Error::invalid_argument(
                "window_secs",
                window_secs,
                "window must not be negative",
            ));
        }
        let window = usize::try_from(window_secs).unwrap_or(usize::MAX);
        self.advance();
        Ok(self.sum_newest(window))
    }

    /// Returns the number of events recorded in the trailing `window`,
    /// rounded down to whole seconds.
    pub fn count_in(&mut self, window: Duration) -> u64 {
        let window = usize::try_from(window.as_secs()).unwrap_or(usize::MAX);
        self.advance();
        self.sum_newest(window)
    }

    /// Returns the number of events in the whole retained window.
    pub fn total(&mut self) -> u64 {
        self.advance();
        self.sum_newest(self.len)
    }

    /// Forgets all recorded events.
    pub fn clear(&mut self) {
        self.buckets.fill(0);
        self.newest = self.capacity() - 1;
        self.len = 0;
        self.last_advance = None;
    }

    /// The longest window, in seconds, this counter can answer for.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// The number of one-second buckets currently retained.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn advance(&mut self) {
        let now = self.clock.now_secs();
        let last = match self.last_advance {
            Some(last) => last,
            None => {
                self.last_advance = Some(now);
                return;
            }
        };

        if now < last {
            tracing::debug!(now, last, "clock went backwards; window not advanced");
            return;
        }

        // we are still within the same second, keep filling the open bucket.
        let elapsed = now - last;
        if elapsed == 0 {
            return;
        }

        let skipped = usize::try_from(elapsed)
            .unwrap_or(usize::MAX)
            .min(self.capacity());
        tracing::trace!(elapsed, skipped, "advancing window");
        self.push_zeros(skipped);
        self.last_advance = Some(now);
    }

    fn push(&mut self, value: u64) {
        let capacity = self.capacity();
        self.newest = (self.newest + 1) % capacity;
        self.buckets[self.newest] = value;
        self.len = (self.len + 1).min(capacity);
    }

    /// Appends `n` empty buckets, overwriting the oldest ones once full.
    fn push_zeros(&mut self, n: usize) {
        let capacity = self.capacity();
        debug_assert!(n <= capacity);
        let start = (self.newest + 1) % capacity;
        let right = n.min(capacity - start);
        self.buckets[start..start + right].fill(0);
        self.buckets[..n - right].fill(0);
        self.newest = (self.newest + n) % capacity;
        self.len = (self.len + n).min(capacity);
    }

    /// Sums the newest `n` buckets (or all of them, if fewer are retained).
    fn sum_newest(&self, n: usize) -> u64 {
        let n = n.min(self.len);
        let end = self.newest + 1;
        if n <= end {
            return self.buckets[end - n..end].iter().sum();
        }
        let wrapped = n - end;
        let capacity = self.capacity();
        self.buckets[..end].iter().sum::<u64>()
            + self.buckets[capacity - wrapped..].iter().sum::<u64>()
    }
}
