//! # 请求错误槽
//!
//! Every request that passes through [`crate::catch::CatchLayer`] carries one
//! [`ErrorSlot`] in its extensions. Handlers, the [`crate::fallible::Try`]
//! adapter and [`crate::recover::Recover`] write into it; `Catch` reads it
//! once after the inner service has produced its response.
//!
//! Writing to a request that was never configured is a construction-order
//! bug and panics. Reading is always safe and reports absence as `None`.

mod extract;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::http::request::Parts;
use axum::http::{Extensions, Request};

use crate::error::{BoxError, SharedError, SlotError};

/// Handle to the single error cell of one request.
///
/// Clones share the same cell. The last write wins; there is no aggregation.
#[derive(Clone, Default)]
pub struct ErrorSlot {
    cell: Arc<Mutex<Option<SharedError>>>,
}

impl ErrorSlot {
    /// 创建一个空的错误槽
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh slot and insert it into `extensions`, replacing any slot
    /// installed by an outer layer.
    pub fn install(extensions: &mut Extensions) -> Self {
        let slot = Self::new();
        extensions.insert(slot.clone());
        slot
    }

    /// 从请求扩展中获取错误槽
    #[must_use]
    pub fn from_extensions(extensions: &Extensions) -> Option<Self> {
        extensions.get::<Self>().cloned()
    }

    /// Replace the slot's content. `None` clears it.
    pub fn set(&self, err: Option<SharedError>) {
        *self.lock() = err;
    }

    /// 写入错误（覆盖之前的值）
    pub fn store<E: Into<BoxError>>(&self, err: E) {
        let boxed: BoxError = err.into();
        self.set(Some(Arc::from(boxed)));
    }

    /// 清空错误槽
    pub fn clear(&self) {
        self.set(None);
    }

    /// Current value, left in place.
    #[must_use]
    pub fn get(&self) -> Option<SharedError> {
        self.lock().clone()
    }

    /// Remove and return the current value.
    pub fn take(&self) -> Option<SharedError> {
        self.lock().take()
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.lock().is_some()
    }

    /// Whether both handles point at the same cell.
    #[must_use]
    pub fn same_slot(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    fn lock(&self) -> MutexGuard<'_, Option<SharedError>> {
        // 锁内从不执行用户代码，中毒状态可以直接忽略
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ErrorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorSlot")
            .field("error", &self.get().map(|err| err.to_string()))
            .finish()
    }
}

/// Anything that exposes the request-scoped [`Extensions`].
pub trait HasExtensions {
    /// 请求扩展
    fn extensions(&self) -> &Extensions;
}

impl<B> HasExtensions for Request<B> {
    fn extensions(&self) -> &Extensions {
        Request::extensions(self)
    }
}

impl HasExtensions for Parts {
    fn extensions(&self) -> &Extensions {
        &self.extensions
    }
}

impl HasExtensions for Extensions {
    fn extensions(&self) -> &Extensions {
        self
    }
}

/// Store `err` into the request's slot.
///
/// # Panics
///
/// Panics if the request did not pass through [`crate::catch::CatchLayer`].
#[track_caller]
pub fn store<R, E>(request: &R, err: E)
where
    R: HasExtensions + ?Sized,
    E: Into<BoxError>,
{
    require(request).store(err);
}

/// Like [`store`], for an error that is already shared.
#[track_caller]
pub fn store_shared<R>(request: &R, err: SharedError)
where
    R: HasExtensions + ?Sized,
{
    require(request).set(Some(err));
}

/// Clear the request's slot, the equivalent of storing "no error".
#[track_caller]
pub fn clear<R>(request: &R)
where
    R: HasExtensions + ?Sized,
{
    require(request).clear();
}

/// Non-panicking [`store`].
pub fn try_store<R, E>(request: &R, err: E) -> Result<(), SlotError>
where
    R: HasExtensions + ?Sized,
    E: Into<BoxError>,
{
    let slot = ErrorSlot::from_extensions(request.extensions()).ok_or(SlotError::NotConfigured)?;
    slot.store(err);
    Ok(())
}

/// Read the request's slot. Returns `None` when nothing was stored or when
/// the request was never configured, so it is safe to call speculatively.
#[must_use]
pub fn get<R>(request: &R) -> Option<SharedError>
where
    R: HasExtensions + ?Sized,
{
    ErrorSlot::from_extensions(request.extensions()).and_then(|slot| slot.get())
}

/// Fetch the installed slot or fail loudly.
#[track_caller]
pub(crate) fn require<R>(request: &R) -> ErrorSlot
where
    R: HasExtensions + ?Sized,
{
    match ErrorSlot::from_extensions(request.extensions()) {
        Some(slot) => slot,
        None => SlotError::NotConfigured.raise(),
    }
}
