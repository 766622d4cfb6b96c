//! In-process metrics registry.
//!
//! Counts and latency histograms live in a [`prometheus::Registry`] for the
//! life of the process and are exported in Prometheus text format, either via
//! [`Registry::render`] or by mounting [`export`] on a management route.
//!
//! Build exactly one registry at startup and hand clones of its `Arc` to
//! whatever needs it: the timer that records into it and the route that
//! exports it. There is no global instance.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use reqmeter::{MetricsSink, Registry};
//!
//! # fn main() -> Result<(), reqmeter::Error> {
//! let registry = Arc::new(Registry::new("shop")?);
//! registry.increment("requests.2xx")?;
//! registry.record_duration("requests.2xx", Duration::from_millis(12))?;
//!
//! assert_eq!(registry.counter("requests.2xx"), Some(1));
//! assert!(registry.render()?.contains(r#"shop_requests_total{series="requests.2xx"} 1"#));
//! # Ok(())
//! # }
//! ```
//!
//! # Export format
//!
//! Every label becomes a `series` on two metric families, prefixed with the
//! namespace (mapped onto the Prometheus name alphabet):
//!
//! ```text
//! # TYPE shop_requests_total counter
//! shop_requests_total{series="requests.2xx"} 1
//! # TYPE shop_request_duration_seconds histogram
//! shop_request_duration_seconds_bucket{series="requests.2xx",le="0.005"} 0
//! shop_request_duration_seconds_bucket{series="requests.2xx",le="0.025"} 1
//! ...
//! shop_request_duration_seconds_sum{series="requests.2xx"} 0.012
//! shop_request_duration_seconds_count{series="requests.2xx"} 1
//! ```

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use http::StatusCode;
use http::header::{CONTENT_TYPE, HeaderValue};
use http_body_util::Full;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, TextEncoder};
use tracing::error;

use super::MetricsSink;
use crate::error::Error;
use crate::status::StatusClass;

/// Prometheus label carrying the sink label, e.g. `requests.2xx`.
const SERIES: &str = "series";

/// Upper bounds, in seconds, of the latency histogram buckets.
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Process-wide store of request counts and latency distributions.
pub struct Registry {
    namespace: String,
    inner: prometheus::Registry,
    requests: IntCounterVec,
    durations: HistogramVec,
    series: DashMap<String, Series>,
}

/// Child handles for one label, resolved once.
#[derive(Clone)]
struct Series {
    count: IntCounter,
    duration: Histogram,
}

impl Registry {
    /// Creates a registry whose exported names start with `namespace`.
    ///
    /// Series for every [`StatusClass`] exist from the start, so an idle
    /// service exports zeros rather than nothing.
    pub fn new(namespace: impl Into<String>) -> Result<Self, Error> {
        let namespace = namespace.into();
        let prefix = sanitize(&namespace);

        let requests = IntCounterVec::new(
            Opts::new("requests_total", "Completed requests.").namespace(prefix.clone()),
            &[SERIES],
        )?;
        let durations = HistogramVec::new(
            HistogramOpts::new("request_duration_seconds", "End-to-end request latency in seconds.")
                .namespace(prefix)
                .buckets(LATENCY_BUCKETS.to_vec()),
            &[SERIES],
        )?;

        let inner = prometheus::Registry::new();
        inner.register(Box::new(requests.clone()))?;
        inner.register(Box::new(durations.clone()))?;

        let registry = Self {
            namespace,
            inner,
            requests,
            durations,
            series: DashMap::new(),
        };
        for class in StatusClass::ALL {
            registry.handles(class.label())?;
        }
        Ok(registry)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Current value of the counter for `label`.
    pub fn counter(&self, label: &str) -> Option<u64> {
        self.series.get(label).map(|s| s.count.get())
    }

    /// Current state of the latency histogram for `label`.
    pub fn timer(&self, label: &str) -> Option<TimerSnapshot> {
        self.series.get(label).map(|s| TimerSnapshot::of(&s.duration))
    }

    /// Point-in-time copy of every series, keyed by label.
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for entry in self.series.iter() {
            snapshot.counters.insert(entry.key().clone(), entry.count.get());
            snapshot.timers.insert(entry.key().clone(), TimerSnapshot::of(&entry.duration));
        }
        snapshot
    }

    /// Renders every series in Prometheus text exposition format.
    pub fn render(&self) -> Result<String, Error> {
        Ok(TextEncoder::new().encode_to_string(&self.inner.gather())?)
    }

    /// Looks up the handles for `label`, creating the series on first use.
    fn handles(&self, label: &str) -> Result<Series, Error> {
        if let Some(series) = self.series.get(label) {
            return Ok(series.clone());
        }
        let series = Series {
            count: self.requests.get_metric_with_label_values(&[label])?,
            duration: self.durations.get_metric_with_label_values(&[label])?,
        };
        Ok(self.series.entry(label.to_owned()).or_insert(series).clone())
    }
}

impl MetricsSink for Registry {
    fn increment(&self, label: &str) -> Result<(), Error> {
        self.handles(label)?.count.inc();
        Ok(())
    }

    fn record_duration(&self, label: &str, elapsed: Duration) -> Result<(), Error> {
        self.handles(label)?.duration.observe(elapsed.as_secs_f64());
        Ok(())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("namespace", &self.namespace)
            .field("series", &self.series.len())
            .finish_non_exhaustive()
    }
}

/// Maps a dotted name onto the Prometheus metric-name alphabet.
fn sanitize(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == ':' { c } else { '_' })
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

// ── Snapshots ─────────────────────────────────────────────────────────────────

/// Count and total of one latency histogram. All zero until the first sample.
///
/// The bucketed distribution is only available through [`Registry::render`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimerSnapshot {
    pub count: u64,
    pub total: Duration,
}

impl TimerSnapshot {
    fn of(histogram: &Histogram) -> Self {
        Self {
            count: histogram.get_sample_count(),
            total: Duration::from_secs_f64(histogram.get_sample_sum().max(0.0)),
        }
    }

    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        self.total / u32::try_from(self.count).unwrap_or(u32::MAX)
    }
}

/// Every series of a [`Registry`] at a point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub counters: BTreeMap<String, u64>,
    pub timers: BTreeMap<String, TimerSnapshot>,
}

// ── Management endpoint ───────────────────────────────────────────────────────

/// Serves [`Registry::render`] as `text/plain`.
///
/// Mount it on a management route with `hyper::service::service_fn`:
///
/// ```rust,ignore
/// let registry = Arc::clone(&registry);
/// service_fn(move |req| reqmeter::sink::registry::export(Arc::clone(&registry), req))
/// ```
pub async fn export<B>(
    registry: Arc<Registry>,
    _req: http::Request<B>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let mut response = match registry.render() {
        Ok(text) => http::Response::new(Full::new(Bytes::from(text))),
        Err(e) => {
            error!(namespace = registry.namespace(), "failed to render metrics: {e}");
            let mut response = http::Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            return Ok(response);
        }
    };
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    Ok(response)
}
