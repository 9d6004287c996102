//! # 结构化 panic 错误

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use super::StackTrace;
use crate::error::{BoxError, SharedError};

/// Leading token of every [`PanicError`] message.
pub const PANIC_PREFIX: &str = "panic: ";

/// A panic caught by [`super::Recover`], turned into an error value.
///
/// Holds the payload exactly as it was raised, a message derived from it and
/// the stack captured when the panic happened. `Display` yields
/// `"panic: <message>"`; the alternate form (`{:#}`) appends the stack trace.
///
/// The message is taken from `&str` and `String` payloads, and from the
/// type-erased error payloads `BoxError`, `Box<dyn Error + Send>`,
/// [`SharedError`] and `anyhow::Error`. A concrete error type raised with
/// `std::panic::panic_any` cannot be recognised through `Any` and yields
/// `"Box<dyn Any>"`; box it first (`panic_any(BoxError::from(err))`) to keep
/// its message. The payload itself is always preserved.
pub struct PanicError {
    // 只为满足 Sync；载荷创建后不再修改
    payload: Mutex<Box<dyn Any + Send>>,
    message: String,
    trace: StackTrace,
}

impl PanicError {
    #[must_use]
    pub fn new(payload: Box<dyn Any + Send>, trace: StackTrace) -> Self {
        let message = payload_message(&*payload);
        Self {
            payload: Mutex::new(payload),
            message,
            trace,
        }
    }

    /// Message derived from the payload, without the `panic: ` prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub const fn stack_trace(&self) -> &StackTrace {
        &self.trace
    }

    /// Inspect the original payload.
    pub fn with_payload<T>(&self, f: impl FnOnce(&(dyn Any + Send)) -> T) -> T {
        let payload = self.payload.lock().unwrap_or_else(PoisonError::into_inner);
        f(&**payload)
    }

    /// Whether the payload is a `T`.
    #[must_use]
    pub fn payload_is<T: Any>(&self) -> bool {
        self.with_payload(|payload| payload.is::<T>())
    }

    /// Give the payload back, e.g. to `std::panic::resume_unwind` it.
    #[must_use]
    pub fn into_payload(self) -> Box<dyn Any + Send> {
        self.payload.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Display for PanicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PANIC_PREFIX}{}", self.message)?;
        if f.alternate() && !self.trace.is_empty() {
            write!(f, "\n\n{}", self.trace)?;
        }
        Ok(())
    }
}

impl fmt::Debug for PanicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanicError")
            .field("message", &self.message)
            .field("frames", &self.trace.len())
            .finish_non_exhaustive()
    }
}

impl StdError for PanicError {}

/// Whether `err` is a recovered panic rather than a plain error.
#[must_use]
pub fn is_panic(err: &(dyn StdError + 'static)) -> bool {
    err.is::<PanicError>()
}

#[must_use]
pub fn as_panic<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a PanicError> {
    err.downcast_ref::<PanicError>()
}

/// 字符串载荷原样使用，错误类载荷使用其消息，其它类型与 std 的默认输出一致
pub(super) fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return (*message).to_owned();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    if let Some(err) = payload.downcast_ref::<BoxError>() {
        return err.to_string();
    }
    if let Some(err) = payload.downcast_ref::<Box<dyn StdError + Send>>() {
        return err.to_string();
    }
    if let Some(err) = payload.downcast_ref::<SharedError>() {
        return err.to_string();
    }
    if let Some(err) = payload.downcast_ref::<anyhow::Error>() {
        return err.to_string();
    }
    "Box<dyn Any>".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::sync::Arc;

    fn panic_error(payload: Box<dyn Any + Send>) -> PanicError {
        PanicError::new(payload, StackTrace::parse("   0: app::handler\n", 32))
    }

    #[rstest]
    #[case::static_str(Box::new("oops"), "oops")]
    #[case::string(Box::new(String::from("formatted 42")), "formatted 42")]
    #[case::box_error(Box::new(BoxError::from("boxed failure")), "boxed failure")]
    #[case::shared_error(
        Box::new(Arc::new(std::io::Error::other("shared failure")) as SharedError),
        "shared failure"
    )]
    #[case::anyhow(Box::new(anyhow::anyhow!("anyhow failure")), "anyhow failure")]
    #[case::opaque(Box::new(42_u32), "Box<dyn Any>")]
    fn test_message_from_payload(#[case] payload: Box<dyn Any + Send>, #[case] expected: &str) {
        let err = panic_error(payload);
        assert_eq!(err.message(), expected);
        assert_eq!(err.to_string(), format!("panic: {expected}"));
    }

    #[test]
    fn test_concrete_error_payload_needs_boxing() {
        let concrete = panic_error(Box::new(std::io::Error::other("disk full")));
        assert_eq!(concrete.message(), "Box<dyn Any>");
        assert!(concrete.payload_is::<std::io::Error>());

        let boxed = panic_error(Box::new(BoxError::from(std::io::Error::other("disk full"))));
        assert_eq!(boxed.message(), "disk full");
    }

    #[test]
    fn test_as_panic_borrows_from_error() {
        let err = panic_error(Box::new("oops"));
        let erased: &(dyn StdError + 'static) = &err;

        let found = as_panic(erased).map(|panic| panic.stack_trace().len());
        assert_eq!(found, Some(1));
        assert!(as_panic(&std::io::Error::other("plain")).is_none());
    }

    #[test]
    fn test_payload_is_kept_as_raised() {
        let err = panic_error(Box::new(42_u32));

        assert!(err.payload_is::<u32>());
        assert!(!err.payload_is::<i32>());
        assert_eq!(err.with_payload(|p| p.downcast_ref::<u32>().copied()), Some(42));
        assert_eq!(*err.into_payload().downcast::<u32>().unwrap(), 42);
    }

    #[test]
    fn test_alternate_display_includes_trace() {
        let err = panic_error(Box::new("oops"));

        assert_eq!(format!("{err:#}"), "panic: oops\n\napp::handler");
        assert_eq!(format!("{err:?}"), "PanicError { message: \"oops\", frames: 1, .. }");
    }

    #[test]
    fn test_detection_through_shared_error() {
        let shared: SharedError = Arc::new(panic_error(Box::new("oops")));
        let plain: SharedError = Arc::new(std::io::Error::other("plain"));

        assert!(is_panic(&*shared));
        assert!(!is_panic(&*plain));
        assert_eq!(as_panic(&*shared).map(PanicError::message), Some("oops"));
        assert!(shared.to_string().starts_with(PANIC_PREFIX));
    }

    proptest! {
        #[test]
        fn prop_string_payload_message_is_verbatim(text in ".*") {
            let err = panic_error(Box::new(text.clone()));
            prop_assert_eq!(err.message(), text.as_str());
            prop_assert!(err.to_string().starts_with(PANIC_PREFIX));
        }
    }
}
