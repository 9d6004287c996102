//! Process panic hook that records a backtrace for panics raised while a
//! [`super::Recover`] service is running on the current thread.
//!
//! The hook runs before unwinding starts, which is the only point where the
//! panicking frames are still on the stack. `Recover` picks the parked trace
//! up on the same thread right after `catch_unwind` returns. A parked trace
//! is only handed out for a payload of the same type and message, so a panic
//! swallowed inside the handler cannot lend its trace to a later
//! `resume_unwind`.

use std::any::{Any, TypeId};
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic;
use std::sync::Once;

use super::forward_panics;
use super::panic_error::payload_message;

/// 某次 panic 的调用栈及其载荷特征
struct Captured {
    backtrace: Backtrace,
    payload_type: TypeId,
    message: String,
}

thread_local! {
    static SCOPE_DEPTH: Cell<usize> = const { Cell::new(0) };
    static CAPTURED: RefCell<Option<Captured>> = const { RefCell::new(None) };
}

static INSTALL: Once = Once::new();

/// 安装 panic hook（仅一次），并保留之前的 hook
pub(crate) fn install() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if SCOPE_DEPTH.with(Cell::get) > 0 {
                let payload = info.payload();
                let captured = Captured {
                    backtrace: Backtrace::force_capture(),
                    payload_type: payload.type_id(),
                    message: payload_message(payload),
                };
                CAPTURED.with(|slot| *slot.borrow_mut() = Some(captured));
                if !forward_panics() {
                    return;
                }
            }
            previous(info);
        }));
    });
}

/// Marks the current thread as running inside `Recover` until dropped.
pub(crate) struct CaptureScope {
    _private: (),
}

impl CaptureScope {
    pub(crate) fn enter() -> Self {
        SCOPE_DEPTH.with(|depth| {
            if depth.get() == 0 {
                CAPTURED.with(|captured| captured.borrow_mut().take());
            }
            depth.set(depth.get() + 1);
        });
        Self { _private: () }
    }
}

impl Drop for CaptureScope {
    fn drop(&mut self) {
        SCOPE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Take the backtrace parked by the most recent in-scope panic, if that
/// panic raised `payload`. The parked trace is cleared either way.
pub(crate) fn take_captured(payload: &(dyn Any + Send)) -> Option<Backtrace> {
    let captured = CAPTURED.with(|slot| slot.borrow_mut().take())?;
    (captured.payload_type == payload.type_id() && captured.message == payload_message(payload))
        .then_some(captured.backtrace)
}

/// Forget any parked trace.
pub(crate) fn discard_captured() {
    CAPTURED.with(|slot| slot.borrow_mut().take());
}
