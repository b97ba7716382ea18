use crate::{Config, Policy};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::time::{self, Duration, Instant};
use tower_service::Service;

/// Holds back an inner service while its [`Policy`] reports it as limited.
///
/// Every call is recorded as a request event, and every call whose response
/// resolves to an error is also recorded as a failure event.
pub struct RateLimit<P, S> {
    inner: S,
    config: Config<P>,
    limited: bool,
    limited_until: Pin<Box<time::Sleep>>,
}

const MIN_RETRY_AFTER: Duration = Duration::from_millis(1);

pin_project_lite::pin_project! {
    #[derive(Debug)]
    pub struct ResponseFuture<P, F> {
        #[pin]
        future: F,
        policy: P,
    }
}

// === impl RateLimit ===

impl<P, S> RateLimit<P, S>
where
    P: Policy + Clone,
{
    /// Wraps `inner`, limiting it according to `config`.
    ///
    /// # Panics
    ///
    /// If called outside of a Tokio runtime.
    pub fn new(mut config: Config<P>, inner: S) -> Self {
        config.retry_after = config.retry_after.max(MIN_RETRY_AFTER);
        // this sleep is only polled once the service becomes limited, which
        // resets it first.
        let limited_until = Box::pin(time::sleep(config.retry_after));
        RateLimit {
            inner,
            config,
            limited: false,
            limited_until,
        }
    }

    pub fn policy(&self) -> &P {
        &self.config.policy
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<P, S, Req> Service<Req> for RateLimit<P, S>
where
    P: Policy + Clone,
    S: Service<Req>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = ResponseFuture<P, S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        loop {
            if self.limited {
                // are we still waiting out the backoff?
                match self.limited_until.as_mut().poll(cx) {
                    Poll::Ready(()) => self.limited = false,
                    Poll::Pending => return Poll::Pending,
                }
            }

            if !self.config.policy.is_limited() {
                break;
            }

            tracing::trace!(
                "service limited; re-checking in {:?}",
                self.config.retry_after
            );
            self.limited = true;
            self.limited_until
                .as_mut()
                .reset(Instant::now() + self.config.retry_after);
        }

        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        debug_assert!(!self.limited, "tried to call a limited service!");
        self.config.policy.record_request();
        ResponseFuture {
            future: self.inner.call(req),
            policy: self.config.policy.clone(),
        }
    }
}

impl<P, S> std::fmt::Debug for RateLimit<P, S>
where
    P: std::fmt::Debug,
    S: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimit")
            .field("inner", &self.inner)
            .field("config", &self.config)
            .field("limited", &self.limited)
            .finish()
    }
}

// === impl ResponseFuture ===

impl<P, F, T, E> Future for ResponseFuture<P, F>
where
    F: Future<Output = Result<T, E>>,
    P: Policy,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.future.poll(cx) {
            Poll::Ready(Err(err)) => {
                this.policy.record_failure();
                Poll::Ready(Err(err))
            }
            poll => poll,
        }
    }
}
