/// Decides whether a [`RateLimit`](crate::RateLimit)ed service may accept more
/// requests, based on the events it has been told about.
///
/// Policies are shared between a service and its response futures, so every
/// method takes `&self`.
pub trait Policy {
    fn record_request(&self);

    fn record_failure(&self);

    fn is_limited(&self) -> bool;

    fn reset(&self);
}

mod max_rate;
pub use max_rate::MaxRate;
