//! # reqmeter
//!
//! Request-latency metrics for HTTP services. Nothing more. Nothing less.
//!
//! ## What it does
//!
//! For every inbound request reqmeter decides whether the request is worth
//! timing, notes when it started, and, once the response is final, reports
//! one count and one duration bucketed by status class (2xx, 3xx, 4xx, 5xx)
//! to a pluggable metrics backend.
//!
//! What reqmeter leaves to others:
//!
//! - **Serving HTTP**: bring your own hyper server; [`middleware::TimedService`]
//!   wraps any hyper service
//! - **Loading configuration**: [`StatsdConfig`] derives `Deserialize`; read it
//!   with whatever your application already uses
//! - **Shipping metrics**: a [`StatsdSink`] collector or a Prometheus scrape
//!   of the [`Registry`]
//!
//! Never timed: health checks (`/ping…`), static assets (`/static…`, `*.js`,
//! `*.css`), and exchanges that were already complete when they arrived.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reqmeter::{ExchangeTimer, StatsdConfig, sink_from_config};
//!
//! # async fn run() -> Result<(), reqmeter::Error> {
//! let config = StatsdConfig {
//!     enabled: true,
//!     host: "127.0.0.1".into(),
//!     prefix: "shop".into(),
//!     ..Default::default()
//! };
//!
//! // Disabled configs get a no-op sink; enabled ones a StatsD client.
//! let sink = sink_from_config(&config).await?;
//! let timer = Arc::new(ExchangeTimer::new(sink));
//! // wrap your hyper service: reqmeter::middleware::TimedService::new(svc, timer)
//! # let _ = timer;
//! # Ok(())
//! # }
//! ```
//!
//! ## Without hyper
//!
//! The core is server-agnostic. Implement [`Exchange`] for your server's
//! request type, call [`ExchangeTimer::handle`] from its dispatch path, and
//! run the registered [`CompletionListener`]s when the response is done.
//! [`HttpExchange`] is a ready-made implementation driven by hand.

mod error;
mod handler;
mod status;
mod timer;

pub mod config;
pub mod exchange;
pub mod filter;
pub mod middleware;
pub mod sink;

pub use config::{StatsdConfig, sink_from_config};
pub use error::Error;
pub use exchange::{CompletionListener, Exchange, HttpExchange, NextListener};
pub use handler::Handler;
pub use sink::{MetricsSink, NoopSink, Registry, StatsdSink};
pub use status::StatusClass;
pub use timer::{ExchangeTimer, TimedHandler};
