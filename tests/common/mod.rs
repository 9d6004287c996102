//! # 测试辅助函数
//!
//! 提供通用的测试工具和辅助函数

#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use error_slot::{Renderer, RequestHead, SharedError};
use tracing::Level;

static INIT: Once = Once::new();

/// 初始化测试环境
pub fn init_test_env() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// 构造 GET 请求
pub fn get_request(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

/// 构造带状态码的文本响应
pub fn text_response(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
}

/// 读取完整响应体
pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// 记录每次调用的渲染器，响应 500 + 错误消息
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    calls: Arc<Mutex<Vec<(RequestHead, SharedError)>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn errors(&self) -> Vec<SharedError> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, error)| Arc::clone(error))
            .collect()
    }

    pub fn only_error(&self) -> SharedError {
        let errors = self.errors();
        assert_eq!(errors.len(), 1, "renderer should be called exactly once");
        Arc::clone(&errors[0])
    }

    pub fn heads(&self) -> Vec<RequestHead> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(head, _)| head.clone())
            .collect()
    }
}

impl Renderer<Body> for RecordingRenderer {
    fn render(&self, _response: Response<Body>, request: &RequestHead, error: SharedError) -> Response<Body> {
        let body = error.to_string();
        self.calls.lock().unwrap().push((request.clone(), error));

        let mut rendered = Response::new(Body::from(body));
        *rendered.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        rendered
    }
}
