//! The request timer middleware.
//!
//! On every request the timer asks [`filter::should_instrument`] whether the
//! exchange is worth measuring. If it is, the timer captures a start
//! [`Instant`] and registers a completion listener carrying it. Either way
//! the request then goes to the next handler.
//!
//! When the exchange completes, the listener measures the elapsed time,
//! buckets the final status into a [`StatusClass`] and reports one count and
//! one duration to the [`MetricsSink`]. Sink failures stay inside the
//! listener: they are logged, never returned, and the completion chain
//! always resumes.
//!
//! ```rust
//! use std::sync::Arc;
//! use reqmeter::{Exchange, ExchangeTimer, HttpExchange, Registry};
//!
//! # fn main() -> Result<(), reqmeter::Error> {
//! let registry = Arc::new(Registry::new("app")?);
//! let timer = ExchangeTimer::new(registry.clone());
//!
//! let mut exchange = HttpExchange::new("/track");
//! timer.handle(&mut exchange, &|exchange: &mut dyn Exchange| {
//!     let _ = exchange.request_path();
//! });
//! exchange.set_status_code(201);
//! exchange.finish();
//!
//! assert_eq!(registry.counter("requests.2xx"), Some(1));
//! # Ok(())
//! # }
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, trace, warn};

use crate::exchange::{CompletionListener, Exchange, NextListener};
use crate::filter;
use crate::handler::Handler;
use crate::sink::MetricsSink;
use crate::status::StatusClass;

/// Times eligible exchanges and reports them to a [`MetricsSink`].
///
/// Cheap to clone: clones share the sink.
#[derive(Clone)]
pub struct ExchangeTimer {
    sink: Arc<dyn MetricsSink>,
}

impl ExchangeTimer {
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self { sink }
    }

    /// Registers a timing listener on `exchange` if it is eligible.
    ///
    /// Returns `true` if a listener was registered. Does not call any
    /// further handler; use [`handle`](Self::handle) for that.
    pub fn instrument(&self, exchange: &mut dyn Exchange) -> bool {
        if !filter::should_instrument(exchange.request_path(), exchange.is_complete()) {
            trace!(path = exchange.request_path(), "request not instrumented");
            return false;
        }

        exchange.add_completion_listener(Box::new(RequestCompletion {
            start: Instant::now(),
            sink: Arc::clone(&self.sink),
        }));
        true
    }

    /// Instruments `exchange` if eligible, then passes it to `next`.
    ///
    /// `next` runs exactly once whatever the filter decided.
    pub fn handle(&self, exchange: &mut dyn Exchange, next: &dyn Handler) {
        self.instrument(exchange);
        next.handle_request(exchange);
    }

    /// Binds the timer in front of `next`, producing a [`Handler`].
    pub fn wrap<H: Handler>(self, next: H) -> TimedHandler<H> {
        TimedHandler { timer: self, next }
    }
}

/// An [`ExchangeTimer`] bound to the handler it forwards to.
pub struct TimedHandler<H> {
    timer: ExchangeTimer,
    next: H,
}

impl<H: Handler> Handler for TimedHandler<H> {
    fn handle_request(&self, exchange: &mut dyn Exchange) {
        self.timer.handle(exchange, &self.next);
    }
}

// ── Completion listener ───────────────────────────────────────────────────────

/// Carries the start time of one exchange until it completes.
struct RequestCompletion {
    start: Instant,
    sink: Arc<dyn MetricsSink>,
}

impl CompletionListener for RequestCompletion {
    fn exchange_completed(self: Box<Self>, exchange: &dyn Exchange, next: NextListener<'_>) {
        let elapsed = self.start.elapsed();
        let class = StatusClass::from_code(exchange.status_code());

        let sink = &*self.sink;
        if panic::catch_unwind(AssertUnwindSafe(|| report(sink, class, elapsed))).is_err() {
            error!(%class, path = exchange.request_path(), "metrics sink panicked, measurement dropped");
        }

        next.proceed();
    }
}

fn report(sink: &dyn MetricsSink, class: StatusClass, elapsed: Duration) {
    let label = class.label();
    if let Err(e) = sink.increment(label) {
        warn!(label, "failed to record request count: {e}");
    }
    if let Err(e) = sink.record_duration(label, elapsed) {
        warn!(label, "failed to record request time: {e}");
    }
}
