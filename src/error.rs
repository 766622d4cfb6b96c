//! Unified error type.

use thiserror::Error;

/// The error type returned by reqmeter's fallible operations.
///
/// Nothing here ever reaches the request/response path: the completion
/// listener logs and drops sink errors. `Error` surfaces at construction
/// time (building a sink from configuration) and from direct sink calls.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("metrics registry: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("invalid statsd configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("could not resolve statsd collector `{0}`")]
    Resolve(String),

    /// The StatsD send queue is full; the metric line was dropped.
    #[error("statsd buffer full, dropped `{0}`")]
    BufferFull(String),

    /// The background StatsD sender has stopped.
    #[error("statsd sender closed")]
    Closed,
}
