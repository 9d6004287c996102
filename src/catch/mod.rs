//! # Catch 中间件
//!
//! The outermost layer of the error protocol. [`Catch`] installs a fresh
//! [`ErrorSlot`] into every request, runs the inner service and, if anything
//! was recorded in the slot by the time the response is ready, hands the
//! response, the request head and the error to a [`Renderer`].
//!
//! `Catch` never looks at the error itself. Status codes, bodies and logging
//! are entirely the renderer's business.

pub mod render;

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::{HeaderMap, Method, Request, Response, Uri, Version};
use futures::future::BoxFuture;
use tower::{Layer, Service};

use crate::error::SharedError;
use crate::slot::ErrorSlot;

pub use render::{json_renderer, plain_text_renderer};

/// Turns a recorded error into the response sent to the client.
///
/// `response` is whatever the inner service produced; a renderer may keep
/// it, modify it or replace it entirely.
pub trait Renderer<B>: Send + Sync + 'static {
    fn render(&self, response: Response<B>, request: &RequestHead, error: SharedError) -> Response<B>;
}

impl<F, B> Renderer<B> for F
where
    F: Fn(Response<B>, &RequestHead, SharedError) -> Response<B> + Send + Sync + 'static,
{
    fn render(&self, response: Response<B>, request: &RequestHead, error: SharedError) -> Response<B> {
        self(response, request, error)
    }
}

/// 请求头部快照，供渲染器使用
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
}

impl RequestHead {
    #[must_use]
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            version: request.version(),
            headers: request.headers().clone(),
        }
    }
}

/// [`Layer`] that wraps services in [`Catch`].
pub struct CatchLayer<R> {
    renderer: Arc<R>,
}

impl<R> CatchLayer<R> {
    /// The renderer is shared by every request the layer wraps.
    pub fn new(renderer: R) -> Self {
        Self {
            renderer: Arc::new(renderer),
        }
    }
}

impl<R> Clone for CatchLayer<R> {
    fn clone(&self) -> Self {
        Self {
            renderer: Arc::clone(&self.renderer),
        }
    }
}

impl<S, R> Layer<S> for CatchLayer<R> {
    type Service = Catch<S, R>;

    fn layer(&self, inner: S) -> Self::Service {
        Catch {
            inner,
            renderer: Arc::clone(&self.renderer),
        }
    }
}

/// Error dispatcher service, see the [module docs](self).
pub struct Catch<S, R> {
    inner: S,
    renderer: Arc<R>,
}

impl<S, R> Catch<S, R> {
    pub fn new(inner: S, renderer: R) -> Self {
        CatchLayer::new(renderer).layer(inner)
    }
}

impl<S: Clone, R> Clone for Catch<S, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            renderer: Arc::clone(&self.renderer),
        }
    }
}

impl<S, R, ReqBody, ResBody> Service<Request<ReqBody>> for Catch<S, R>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    R: Renderer<ResBody>,
    ResBody: 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        let slot = ErrorSlot::install(request.extensions_mut());
        let head = RequestHead::from_request(&request);
        let renderer = Arc::clone(&self.renderer);
        let future = self.inner.call(request);

        Box::pin(async move {
            let response = future.await?;

            // 槽在此处被读取并丢弃，之后的写入不再可见
            match slot.take() {
                Some(error) => {
                    tracing::debug!(
                        method = %head.method,
                        uri = %head.uri,
                        error = %error,
                        "rendering recorded request error"
                    );
                    Ok(renderer.render(response, &head, error))
                }
                None => Ok(response),
            }
        })
    }
}
