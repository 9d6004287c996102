//! # 内置渲染器
//!
//! Ready-made [`super::Renderer`]s for services that do not need their own
//! error format. Both answer `500 Internal Server Error`.

use axum::http::header::{CONTENT_TYPE, HeaderValue, X_CONTENT_TYPE_OPTIONS};
use axum::http::{Response, StatusCode};
use serde_json::json;

use super::RequestHead;
use crate::error::SharedError;
use crate::recover::is_panic;

/// Log the error and answer with its message as plain text.
pub fn plain_text_renderer<B>(_response: Response<B>, request: &RequestHead, error: SharedError) -> Response<B>
where
    B: From<String>,
{
    log_failure(request, &error);
    error_response(
        error.to_string(),
        HeaderValue::from_static("text/plain; charset=utf-8"),
    )
}

/// Log the error and answer with `{"error": <message>, "panic": <bool>}`.
pub fn json_renderer<B>(_response: Response<B>, request: &RequestHead, error: SharedError) -> Response<B>
where
    B: From<String>,
{
    log_failure(request, &error);
    let body = json!({
        "error": error.to_string(),
        "panic": is_panic(&*error),
    });
    error_response(body.to_string(), HeaderValue::from_static("application/json"))
}

fn log_failure(request: &RequestHead, error: &SharedError) {
    tracing::error!(
        method = %request.method,
        uri = %request.uri,
        error = %error,
        "request failed"
    );
}

fn error_response<B: From<String>>(body: String, content_type: HeaderValue) -> Response<B> {
    let mut response = Response::new(B::from(body));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, content_type);
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}
