//! hyper integration.
//!
//! [`TimedService`] puts an [`ExchangeTimer`] in front of any
//! [`hyper::service::Service`]. Each request gets its own [`HttpExchange`],
//! which rides along inside the response as a [`TimedBody`]. The exchange
//! completes with the response's status once the body has yielded its last
//! frame, so the measured time covers streaming the body too. A response with
//! an empty body completes as soon as the inner service returns it. If the
//! inner service fails instead, the exchange completes with status `0`,
//! which counts as 5xx.
//!
//! ```rust,no_run
//! use std::convert::Infallible;
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use http_body_util::Full;
//! use hyper::service::service_fn;
//! use reqmeter::{ExchangeTimer, Registry, middleware::TimedService};
//!
//! async fn app(_req: http::Request<hyper::body::Incoming>)
//!     -> Result<http::Response<Full<Bytes>>, Infallible>
//! {
//!     Ok(http::Response::new(Full::new(Bytes::from_static(b"ok"))))
//! }
//!
//! # fn main() -> Result<(), reqmeter::Error> {
//! let registry = Arc::new(Registry::new("app")?);
//! let timer = Arc::new(ExchangeTimer::new(registry));
//! let svc = TimedService::new(service_fn(app), timer);
//! // hand `svc` to hyper's connection builder
//! # let _ = svc;
//! # Ok(())
//! # }
//! ```
//!
//! A request whose future or body is dropped before the end (client gone,
//! timeout layer fired) never completes its exchange, so nothing is recorded
//! for it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use hyper::body::Body;
use hyper::service::Service;
use tracing::debug;

use crate::exchange::{Exchange, HttpExchange};
use crate::timer::ExchangeTimer;

mod body;

pub use body::TimedBody;

/// A heap-allocated, type-erased future, so [`TimedService`] can name its
/// `Future` type whatever the inner service returns.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// A hyper service wrapped by an [`ExchangeTimer`].
#[derive(Clone)]
pub struct TimedService<S> {
    inner: S,
    timer: Arc<ExchangeTimer>,
}

impl<S> TimedService<S> {
    pub fn new(inner: S, timer: Arc<ExchangeTimer>) -> Self {
        Self { inner, timer }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, B, R> Service<http::Request<B>> for TimedService<S>
where
    S: Service<http::Request<B>, Response = http::Response<R>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    R: Body + Unpin + Send + 'static,
{
    type Response = http::Response<TimedBody<R>>;
    type Error = S::Error;
    type Future = BoxFuture<Result<Self::Response, Self::Error>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let mut exchange = HttpExchange::new(req.uri().path());
        self.timer.instrument(&mut exchange);

        // The inner service is always called, instrumented or not.
        let response = self.inner.call(req);

        Box::pin(async move {
            match response.await {
                Ok(res) => {
                    exchange.set_status_code(res.status().as_u16());
                    let exchange = if exchange.pending_listeners() == 0 || res.body().is_end_stream() {
                        exchange.finish();
                        None
                    } else {
                        Some(exchange)
                    };
                    Ok(res.map(|body| TimedBody::new(body, exchange)))
                }
                Err(e) => {
                    debug!(path = exchange.request_path(), "inner service failed, no status");
                    exchange.finish();
                    Err(e)
                }
            }
        })
    }
}
