//! The "next handler" in a chain.
//!
//! A [`Handler`] is whatever processes an exchange after the timer has had
//! its look at it. Any closure over `&mut dyn Exchange` qualifies:
//!
//! ```rust
//! use reqmeter::{Exchange, Handler, HttpExchange};
//!
//! let next = |exchange: &mut dyn Exchange| {
//!     assert_eq!(exchange.request_path(), "/track");
//! };
//! next.handle_request(&mut HttpExchange::new("/track"));
//! ```
//!
//! Handlers are shared across concurrent requests, hence `Send + Sync`. The
//! chain is built once at startup and stored as concrete types, so a request
//! pays no allocation to walk it.

use crate::exchange::Exchange;

/// Processes one exchange.
pub trait Handler: Send + Sync + 'static {
    fn handle_request(&self, exchange: &mut dyn Exchange);
}

impl<F> Handler for F
where
    F: Fn(&mut dyn Exchange) + Send + Sync + 'static,
{
    fn handle_request(&self, exchange: &mut dyn Exchange) {
        self(exchange)
    }
}
