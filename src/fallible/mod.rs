//! # Try 适配器
//!
//! Lets a fallible service take part in an infallible pipeline. [`Try`]
//! stores whatever the wrapped service returns into the request's
//! [`ErrorSlot`]: an error on failure, "no error" on success. It never fails
//! itself; on error it answers with an empty default response that
//! [`crate::catch::Catch`] hands to its renderer.

use std::convert::Infallible;
use std::fmt;
use std::task::{Context, Poll};

use axum::http::{Request, Response};
use futures::future::{self, BoxFuture};
use tower::util::ServiceFn;
use tower::{Layer, Service, service_fn};

use crate::error::{BoxError, SlotError};
use crate::slot::ErrorSlot;

/// Wrap an async function returning `Result<Response<_>, E>` in [`Try`].
pub fn try_fn<F>(f: F) -> Try<ServiceFn<F>> {
    Try::new(service_fn(f))
}

/// [`Layer`] that wraps services in [`Try`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TryLayer;

impl TryLayer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TryLayer {
    type Service = Try<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Try::new(inner)
    }
}

/// Fallible-to-infallible service adapter, see the [module docs](self).
pub struct Try<S> {
    inner: S,
    // poll_ready 的错误，在下一次 call 时写入错误槽
    pending: Option<BoxError>,
}

impl<S> Try<S> {
    pub const fn new(inner: S) -> Self {
        Self {
            inner,
            pending: None,
        }
    }

    pub const fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Clone> Clone for Try<S> {
    fn clone(&self) -> Self {
        Self::new(self.inner.clone())
    }
}

impl<S: fmt::Debug> fmt::Debug for Try<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Try")
            .field("inner", &self.inner)
            .field("pending", &self.pending.as_ref().map(ToString::to_string))
            .finish()
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for Try<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Infallible>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        if self.pending.is_some() {
            return Poll::Ready(Ok(()));
        }
        match self.inner.poll_ready(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(())) => Poll::Ready(Ok(())),
            Poll::Ready(Err(err)) => {
                self.pending = Some(err.into());
                Poll::Ready(Ok(()))
            }
        }
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let slot = ErrorSlot::from_extensions(request.extensions());

        if let Some(err) = self.pending.take() {
            return Box::pin(future::ready(Ok(record(slot, Err(err)))));
        }

        let inner = self.inner.call(request);
        Box::pin(async move {
            let result = inner.await.map_err(Into::into);
            Ok(record(slot, result))
        })
    }
}

/// Store the handler's outcome, error or not.
fn record<B: Default>(slot: Option<ErrorSlot>, result: Result<Response<B>, BoxError>) -> Response<B> {
    let Some(slot) = slot else {
        SlotError::NotConfigured.raise()
    };
    match result {
        Ok(response) => {
            slot.clear();
            response
        }
        Err(err) => {
            slot.store(err);
            Response::default()
        }
    }
}
