use std::time::Duration;

use super::MetricsSink;
use crate::error::Error;

/// A sink that drops everything. Used when metrics are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn increment(&self, _label: &str) -> Result<(), Error> {
        Ok(())
    }

    fn record_duration(&self, _label: &str, _elapsed: Duration) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_accepts_everything() {
        assert!(NoopSink.increment("requests.2xx").is_ok());
        assert!(NoopSink.record_duration("requests.2xx", Duration::from_secs(3)).is_ok());
    }
}
