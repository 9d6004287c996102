//! # Recover 中间件
//!
//! [`Recover`] contains panics raised by the service it wraps, both while the
//! service is building its future and while that future is polled. A caught
//! panic becomes a [`PanicError`] (original payload plus captured
//! [`StackTrace`]) stored into the request's [`ErrorSlot`]; the request then
//! completes with an empty default response for [`crate::catch::Catch`] to
//! render.
//!
//! The trace normally comes from the panic hook and starts at the function
//! that panicked. A payload re-raised with `std::panic::resume_unwind` (for
//! example the panic of a `spawn_blocking` task) bypasses the hook; its trace
//! is taken where `Recover` caught it, starts at the caller of `Recover` and
//! does not contain the original handler frame.
//!
//! Place `RecoverLayer` inside `CatchLayer`, otherwise there is no slot to
//! store the panic into and `Recover` fails loudly.
//!
//! Two process-wide tunables apply to every `Recover`:
//! [`set_max_stack_frames`] and [`set_forward_panics`].

mod hook;
mod panic_error;
mod trace;

use std::future::poll_fn;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};

use axum::http::{Method, Request, Response, Uri};
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use tower::{Layer, Service};

use crate::error::SlotError;
use crate::slot::ErrorSlot;

pub use panic_error::{PANIC_PREFIX, PanicError, as_panic, is_panic};
pub use trace::{Frame, StackTrace};

/// Default bound on captured stack frames.
pub const DEFAULT_MAX_STACK_FRAMES: usize = 32;

// 捕获点调用栈中 Recover 自身帧的函数名片段
const RECOVER_FRAME: &str = "error_slot::recover::Recover";

static MAX_STACK_FRAMES: AtomicUsize = AtomicUsize::new(DEFAULT_MAX_STACK_FRAMES);
static FORWARD_PANICS: AtomicBool = AtomicBool::new(true);

/// Set the maximum number of frames kept in a captured [`StackTrace`].
/// Values below 1 are raised to 1.
pub fn set_max_stack_frames(frames: usize) {
    MAX_STACK_FRAMES.store(frames.max(1), Ordering::Relaxed);
}

#[must_use]
pub fn max_stack_frames() -> usize {
    MAX_STACK_FRAMES.load(Ordering::Relaxed)
}

/// Whether panics caught by `Recover` are still passed to the panic hook
/// that was installed before this crate's own (by default, std's hook which
/// prints to stderr). Defaults to `true`.
pub fn set_forward_panics(forward: bool) {
    FORWARD_PANICS.store(forward, Ordering::Relaxed);
}

#[must_use]
pub fn forward_panics() -> bool {
    FORWARD_PANICS.load(Ordering::Relaxed)
}

/// [`Layer`] that wraps services in [`Recover`].
#[derive(Debug, Clone)]
pub struct RecoverLayer {
    _private: (),
}

impl RecoverLayer {
    /// Creating the layer installs the trace-capturing panic hook.
    #[must_use]
    pub fn new() -> Self {
        hook::install();
        Self { _private: () }
    }
}

impl Default for RecoverLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for RecoverLayer {
    type Service = Recover<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Recover::new(inner)
    }
}

/// Panic-containing service, see the [module docs](self).
#[derive(Debug, Clone)]
pub struct Recover<S> {
    inner: S,
}

impl<S> Recover<S> {
    pub fn new(inner: S) -> Self {
        hook::install();
        Self { inner }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for Recover<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let slot = ErrorSlot::from_extensions(request.extensions());
        let method = request.method().clone();
        let uri = request.uri().clone();

        let called = {
            let _scope = hook::CaptureScope::enter();
            let inner = &mut self.inner;
            panic::catch_unwind(AssertUnwindSafe(move || inner.call(request)))
        };

        match called {
            Ok(inner_future) => {
                hook::discard_captured();
                let mut inner_future = Box::pin(inner_future);
                // 每次 poll 都处于捕获范围内
                let guarded = poll_fn(move |cx| {
                    let _scope = hook::CaptureScope::enter();
                    Pin::as_mut(&mut inner_future).poll(cx)
                });

                Box::pin(async move {
                    match AssertUnwindSafe(guarded).catch_unwind().await {
                        Ok(result) => {
                            hook::discard_captured();
                            result
                        }
                        Err(payload) => Ok(recovered(payload, slot, &method, &uri)),
                    }
                })
            }
            Err(payload) => Box::pin(future::ready(Ok(recovered(payload, slot, &method, &uri)))),
        }
    }
}

/// Convert a caught panic into a [`PanicError`] and record it.
fn recovered<B: Default>(
    payload: Box<dyn std::any::Any + Send>,
    slot: Option<ErrorSlot>,
    method: &Method,
    uri: &Uri,
) -> Response<B> {
    let trace = match hook::take_captured(&*payload) {
        Some(backtrace) => StackTrace::from_backtrace(&backtrace, max_stack_frames()),
        None => StackTrace::capture_below(RECOVER_FRAME),
    };
    let error = PanicError::new(payload, trace);

    tracing::error!(
        method = %method,
        uri = %uri,
        panic = %error.message(),
        frames = error.stack_trace().len(),
        "recovered panic in request handler"
    );

    let Some(slot) = slot else {
        SlotError::NotConfigured.raise()
    };
    slot.set(Some(Arc::new(error)));
    Response::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial(recover_tunables)]
    fn test_max_stack_frames_roundtrip() {
        set_max_stack_frames(8);
        assert_eq!(max_stack_frames(), 8);

        set_max_stack_frames(0);
        assert_eq!(max_stack_frames(), 1);

        set_max_stack_frames(DEFAULT_MAX_STACK_FRAMES);
        assert_eq!(max_stack_frames(), DEFAULT_MAX_STACK_FRAMES);
    }

    #[test]
    #[serial(recover_tunables)]
    fn test_forward_panics_toggle() {
        set_forward_panics(false);
        assert!(!forward_panics());
        set_forward_panics(true);
        assert!(forward_panics());
    }
}
