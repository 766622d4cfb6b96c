//! Metrics backends.
//!
//! The timer reports through [`MetricsSink`] and never knows which backend
//! is behind it. Three are provided:
//!
//! | Sink | Use |
//! |---|---|
//! | [`NoopSink`] | metrics disabled; every call is discarded |
//! | [`Registry`] | in-process counters and latency histograms, exported as Prometheus text |
//! | [`StatsdSink`] | fire-and-forget UDP datagrams to a StatsD collector |
//!
//! Pick one at startup, usually via
//! [`sink_from_config`](crate::config::sink_from_config), and share it
//! behind an `Arc`.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;

mod noop;
pub mod registry;
mod statsd;

pub use noop::NoopSink;
pub use registry::{Registry, Snapshot, TimerSnapshot};
pub use statsd::StatsdSink;

/// Destination for request counts and durations.
///
/// `label` identifies the series, e.g. `requests.2xx`. Implementations must
/// be safe to call from any number of threads at once and must not block on
/// I/O: calls happen while a response is being finalised.
#[cfg_attr(test, mockall::automock)]
pub trait MetricsSink: Send + Sync {
    /// Adds one to the counter for `label`.
    fn increment(&self, label: &str) -> Result<(), Error>;

    /// Records one duration sample for `label`.
    fn record_duration(&self, label: &str, elapsed: Duration) -> Result<(), Error>;
}

impl<S: MetricsSink + ?Sized> MetricsSink for Arc<S> {
    fn increment(&self, label: &str) -> Result<(), Error> {
        (**self).increment(label)
    }

    fn record_duration(&self, label: &str, elapsed: Duration) -> Result<(), Error> {
        (**self).record_duration(label, elapsed)
    }
}
