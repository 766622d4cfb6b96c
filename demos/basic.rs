//! Minimal reqmeter example: a hyper server with timed requests and a
//! Prometheus scrape endpoint.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/nope
//!   curl http://localhost:3000/ping          # never timed
//!   curl http://localhost:3000/metrics
//!
//! Set STATSD_PORT to also see what the StatsD sink would send; point it at
//! `nc -ul 8125`.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use reqmeter::middleware::TimedService;
use reqmeter::sink::registry::export;
use reqmeter::{ExchangeTimer, MetricsSink, Registry, StatsdConfig, sink_from_config};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let registry = Arc::new(Registry::new("basic").expect("registry"));

    // The registry is always on; StatsD only when a port is given.
    let statsd = StatsdConfig {
        enabled: std::env::var("STATSD_PORT").is_ok(),
        host: "127.0.0.1".to_owned(),
        port: std::env::var("STATSD_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8125),
        prefix: "basic".to_owned(),
        ..Default::default()
    };
    let statsd = sink_from_config(&statsd).await.expect("statsd sink");
    let sink: Arc<dyn MetricsSink> = Arc::new(Both(registry.clone(), statsd));
    let timer = Arc::new(ExchangeTimer::new(sink));

    let listener = TcpListener::bind("0.0.0.0:3000").await.expect("bind");
    info!(addr = "0.0.0.0:3000", "basic listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(v) => v,
            Err(e) => {
                error!("accept error: {e}");
                continue;
            }
        };

        let registry = Arc::clone(&registry);
        let app = service_fn(move |req: Request<Incoming>| {
            let registry = Arc::clone(&registry);
            async move {
                if req.uri().path() == "/metrics" {
                    return export(registry, req).await;
                }
                Ok::<_, Infallible>(route(req.uri().path()))
            }
        });
        let svc = TimedService::new(app, Arc::clone(&timer));

        tokio::spawn(async move {
            if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), svc)
                .await
            {
                error!(%peer, "connection error: {e}");
            }
        });
    }
}

fn route(path: &str) -> Response<Full<Bytes>> {
    let (status, body) = match path {
        "/ping" => (StatusCode::OK, "pong".to_owned()),
        p if p.starts_with("/users/") => {
            let id = &p["/users/".len()..];
            (StatusCode::OK, format!(r#"{{"id":"{id}","name":"alice"}}"#))
        }
        _ => (StatusCode::NOT_FOUND, String::new()),
    };

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
}

/// Fans every measurement out to two sinks.
struct Both(Arc<Registry>, Arc<dyn MetricsSink>);

impl MetricsSink for Both {
    fn increment(&self, label: &str) -> Result<(), reqmeter::Error> {
        self.0.increment(label)?;
        self.1.increment(label)
    }

    fn record_duration(&self, label: &str, elapsed: std::time::Duration) -> Result<(), reqmeter::Error> {
        self.0.record_duration(label, elapsed)?;
        self.1.record_duration(label, elapsed)
    }
}
