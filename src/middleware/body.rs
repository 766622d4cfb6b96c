use std::pin::Pin;
use std::task::{Context, Poll, ready};

use hyper::body::{Body, Frame, SizeHint};

use crate::exchange::HttpExchange;

/// Response body that completes its exchange once the last frame is out.
///
/// The exchange finishes when the inner body reports its end, either by
/// returning `None`, by returning an error, or by reporting
/// [`is_end_stream`](Body::is_end_stream) right after a data frame. A body
/// dropped before then (client gone mid-stream) never completes the exchange.
pub struct TimedBody<B> {
    inner: B,
    exchange: Option<HttpExchange>,
}

impl<B: std::fmt::Debug> std::fmt::Debug for TimedBody<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedBody")
            .field("inner", &self.inner)
            .field("exchange", &self.exchange.is_some())
            .finish()
    }
}

impl<B> TimedBody<B> {
    pub(crate) fn new(inner: B, exchange: Option<HttpExchange>) -> Self {
        Self { inner, exchange }
    }

    pub fn get_ref(&self) -> &B {
        &self.inner
    }

    /// Unwraps the inner body. The exchange, if still open, is abandoned.
    pub fn into_inner(self) -> B {
        self.inner
    }

    fn complete(&mut self) {
        if let Some(mut exchange) = self.exchange.take() {
            exchange.finish();
        }
    }
}

impl<B: Body + Unpin> Body for TimedBody<B> {
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let frame = ready!(Pin::new(&mut this.inner).poll_frame(cx));
        match &frame {
            Some(Ok(_)) if !this.inner.is_end_stream() => {}
            _ => this.complete(),
        }
        Poll::Ready(frame)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
