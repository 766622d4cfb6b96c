//! The request/response cycle as the middleware sees it.
//!
//! # Completion chain
//!
//! Work that must wait until a response is final is registered as a
//! [`CompletionListener`]. When the exchange finishes, the listeners run as
//! a chain, last-registered first, the same order in which nested
//! middleware unwinds:
//!
//! ```text
//! exchange.finish()
//!        ↓
//! listener_n.exchange_completed(exchange, next)   ← last registered
//!        ↓ next.proceed()
//! listener_n-1.exchange_completed(exchange, next)
//!        ↓ …
//! listener_1.exchange_completed(exchange, next)
//!        ↓ next.proceed()                          ← chain ends
//! ```
//!
//! The types enforce the "exactly once" half of the contract:
//! `exchange_completed` consumes its boxed listener and
//! [`NextListener::proceed`] consumes the continuation, so neither can fire
//! twice. A listener that returns without calling `proceed` stalls the rest
//! of the chain, so every listener must call it on every path.

use std::fmt;

use tracing::warn;

/// One HTTP request/response cycle, owned by the server.
///
/// The middleware only reads from an exchange and registers listeners on
/// it. `Send` because the completion chain may run on a different thread
/// from the one that dispatched the request.
pub trait Exchange: Send {
    /// The request path, without the query string.
    fn request_path(&self) -> &str;

    /// `true` once no further processing will happen on this exchange.
    fn is_complete(&self) -> bool;

    /// The response status. Final once [`is_complete`](Self::is_complete)
    /// returns `true`; `0` if no response was produced.
    fn status_code(&self) -> u16;

    /// Registers `listener` to run when the exchange completes.
    ///
    /// Registering on an exchange that is already complete is a contract
    /// violation; callers check [`is_complete`](Self::is_complete) first.
    fn add_completion_listener(&mut self, listener: Box<dyn CompletionListener>);
}

/// Deferred work bound to one exchange.
pub trait CompletionListener: Send + 'static {
    /// Called once, after the exchange has completed. Implementations must
    /// call `next.proceed()` exactly once before returning.
    fn exchange_completed(self: Box<Self>, exchange: &dyn Exchange, next: NextListener<'_>);
}

/// Continuation to the rest of an exchange's completion chain.
#[must_use = "the completion chain stalls unless `proceed` is called"]
pub struct NextListener<'a> {
    exchange: &'a dyn Exchange,
    remaining: &'a mut Vec<Box<dyn CompletionListener>>,
}

impl NextListener<'_> {
    /// Runs the next listener in the chain, if any.
    pub fn proceed(self) {
        let NextListener { exchange, remaining } = self;
        if let Some(listener) = remaining.pop() {
            listener.exchange_completed(exchange, NextListener { exchange, remaining });
        }
    }
}

// ── HttpExchange ──────────────────────────────────────────────────────────────

/// An in-memory [`Exchange`] driven explicitly by its owner.
///
/// The hyper adapter creates one per request, records the response status
/// once the inner service answers, then calls [`finish`](Self::finish).
pub struct HttpExchange {
    path: String,
    status: u16,
    complete: bool,
    listeners: Vec<Box<dyn CompletionListener>>,
}

impl HttpExchange {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), status: 0, complete: false, listeners: Vec::new() }
    }

    /// Sets the response status. Ignored once the exchange is complete.
    pub fn set_status_code(&mut self, code: u16) {
        if self.complete {
            warn!(path = %self.path, code, "status set on a completed exchange; ignored");
            return;
        }
        self.status = code;
    }

    /// Number of listeners waiting for completion.
    pub fn pending_listeners(&self) -> usize {
        self.listeners.len()
    }

    /// Marks the exchange complete and runs its completion chain.
    ///
    /// Calling `finish` again is a no-op: listeners fire at most once.
    pub fn finish(&mut self) {
        if self.complete {
            return;
        }
        self.complete = true;

        let mut listeners = std::mem::take(&mut self.listeners);
        NextListener { exchange: &*self, remaining: &mut listeners }.proceed();
    }
}

impl Exchange for HttpExchange {
    fn request_path(&self) -> &str { &self.path }
    fn is_complete(&self) -> bool { self.complete }
    fn status_code(&self) -> u16 { self.status }

    fn add_completion_listener(&mut self, listener: Box<dyn CompletionListener>) {
        if self.complete {
            warn!(path = %self.path, "completion listener added to a completed exchange; discarded");
            return;
        }
        self.listeners.push(listener);
    }
}

impl fmt::Debug for HttpExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpExchange")
            .field("path", &self.path)
            .field("status", &self.status)
            .field("complete", &self.complete)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
