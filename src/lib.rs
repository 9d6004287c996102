//! # error-slot
//!
//! Side-channel error reporting for `tower`/`axum` services.
//!
//! Handlers record failures into a per-request [`slot::ErrorSlot`] instead of
//! rendering them; a single outer [`catch::CatchLayer`] decides how every
//! recorded failure reaches the client.
//!
//! * [`catch`]: installs the slot and calls the renderer when it is set.
//! * [`recover`]: turns panics into [`recover::PanicError`] values.
//! * [`fallible`]: adapts services that return errors ([`fallible::Try`]).
//! * [`slot`]: `store` / `get` accessors for handler code.
//!
//! ```no_run
//! use axum::{Router, body::Body, http::{Request, Response}, routing::get};
//! use error_slot::{CatchLayer, RecoverLayer, try_fn, plain_text_renderer};
//! use tower::ServiceBuilder;
//!
//! let app: Router = Router::new()
//!     .route("/", get(|| async { "ok" }))
//!     .route_service(
//!         "/fallible",
//!         try_fn(|_req: Request<Body>| async {
//!             Err::<Response<Body>, _>(std::io::Error::other("this failed!"))
//!         }),
//!     )
//!     .layer(
//!         ServiceBuilder::new()
//!             .layer(CatchLayer::new(plain_text_renderer::<Body>))
//!             .layer(RecoverLayer::new()),
//!     );
//! ```

pub mod catch;
pub mod config;
pub mod error;
pub mod fallible;
pub mod logging;
pub mod recover;
pub mod slot;

// Re-export commonly used types
pub use catch::{Catch, CatchLayer, Renderer, RequestHead, json_renderer, plain_text_renderer};
pub use config::AppConfig;
pub use error::{BoxError, Error, Result, SharedError, SlotError};
pub use fallible::{Try, TryLayer, try_fn};
pub use recover::{PanicError, Recover, RecoverLayer, StackTrace, is_panic};
pub use slot::{ErrorSlot, clear, get, store, store_shared, try_store};
