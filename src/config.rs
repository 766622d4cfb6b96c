//! StatsD configuration and sink selection.
//!
//! Loading the configuration is the host application's business; this
//! module only defines its shape and turns it into a sink:
//!
//! ```toml
//! [statsd]
//! enabled = true
//! host = "statsd.internal"
//! port = 8125
//! prefix = "divolte"
//! buffer_size = 1024
//! ```

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::error::Error;
use crate::sink::{MetricsSink, NoopSink, StatsdSink};

/// Where and how to send request metrics.
///
/// Every field is optional when deserialising; missing fields take the
/// [`Default`] values (disabled, `localhost:8125`, no prefix, 1024 queued
/// lines).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StatsdConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Prepended to every metric name, joined with a `.`.
    pub prefix: String,
    /// Number of metric lines that may wait for the sender before new ones
    /// are dropped.
    #[serde(alias = "bufferSize")]
    pub buffer_size: usize,
}

impl Default for StatsdConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "localhost".to_owned(),
            port: 8125,
            prefix: String::new(),
            buffer_size: 1024,
        }
    }
}

impl StatsdConfig {
    /// Checks the fields a connection needs.
    pub fn validate(&self) -> Result<(), Error> {
        if self.host.trim().is_empty() {
            return Err(Error::InvalidConfig("host must not be empty"));
        }
        if self.port == 0 {
            return Err(Error::InvalidConfig("port must not be 0"));
        }
        if self.buffer_size == 0 {
            return Err(Error::InvalidConfig("buffer_size must be at least 1"));
        }
        Ok(())
    }
}

/// Builds the sink `config` asks for: [`NoopSink`] when disabled, a
/// connected [`StatsdSink`] otherwise.
///
/// Must be called from within a tokio runtime when metrics are enabled.
pub async fn sink_from_config(config: &StatsdConfig) -> Result<Arc<dyn MetricsSink>, Error> {
    if !config.enabled {
        info!("statsd disabled, request metrics are discarded");
        return Ok(Arc::new(NoopSink));
    }
    Ok(Arc::new(StatsdSink::connect(config).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Root {
        statsd: StatsdConfig,
    }

    #[test]
    fn test_defaults() {
        let config = StatsdConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8125);
        assert_eq!(config.prefix, "");
        assert_eq!(config.buffer_size, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_section() {
        let root: Root = toml::from_str(
            r#"
            [statsd]
            enabled = true
            host = "statsd.internal"
            port = 9125
            prefix = "divolte"
            buffer_size = 64
            "#,
        )
        .unwrap();

        assert_eq!(
            root.statsd,
            StatsdConfig {
                enabled: true,
                host: "statsd.internal".to_owned(),
                port: 9125,
                prefix: "divolte".to_owned(),
                buffer_size: 64,
            }
        );
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let root: Root = toml::from_str("[statsd]\nenabled = true\n").unwrap();
        assert!(root.statsd.enabled);
        assert_eq!(root.statsd.port, 8125);
        assert_eq!(root.statsd.buffer_size, 1024);
    }

    #[test]
    fn test_camel_case_buffer_size_is_accepted() {
        let root: Root = toml::from_str("[statsd]\nbufferSize = 16\n").unwrap();
        assert_eq!(root.statsd.buffer_size, 16);
    }

    #[test]
    fn test_out_of_range_port_is_rejected() {
        assert!(toml::from_str::<Root>("[statsd]\nport = 70000\n").is_err());
    }

    #[test]
    fn test_validate() {
        let invalid = [
            StatsdConfig { host: " ".to_owned(), ..Default::default() },
            StatsdConfig { port: 0, ..Default::default() },
            StatsdConfig { buffer_size: 0, ..Default::default() },
        ];
        for config in invalid {
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))), "{config:?}");
        }
    }

    #[tokio::test]
    async fn test_disabled_config_builds_a_noop_sink() {
        let config = StatsdConfig { port: 0, ..Default::default() };
        let sink = sink_from_config(&config).await.unwrap();
        assert!(sink.increment("requests.2xx").is_ok());
    }

    #[tokio::test]
    async fn test_enabled_config_with_bad_fields_fails() {
        let config = StatsdConfig { enabled: true, buffer_size: 0, ..Default::default() };
        assert!(matches!(sink_from_config(&config).await, Err(Error::InvalidConfig(_))));
    }
}
