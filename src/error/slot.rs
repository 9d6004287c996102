//! # 错误槽误用

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Raised when a request reaches an error-slot accessor without having
/// passed through [`crate::catch::CatchLayer`].
///
/// [`crate::slot::store`] turns this into a panic; [`crate::slot::try_store`]
/// returns it. Reading with [`crate::slot::get`] never produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("request not configured to store errors")]
    NotConfigured,
}

impl SlotError {
    /// Fail loudly at the misusing call site.
    #[track_caller]
    pub(crate) fn raise(self) -> ! {
        panic!("error-slot: {self}")
    }
}

// 作为 axum 提取器的拒绝类型：记录日志并返回 500
impl IntoResponse for SlotError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "ErrorSlot extracted outside of CatchLayer");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
