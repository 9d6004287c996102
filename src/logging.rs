//! # 日志配置模块
//!
//! 基于 tracing-subscriber 的日志初始化

use std::env;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 默认过滤规则：全局级别 + 本 crate 的调试日志
#[must_use]
pub fn default_filter(log_level: Option<&str>) -> String {
    let level = log_level.unwrap_or("info");
    format!("{level},error_slot=debug,tower_http=debug")
}

/// 实际生效的过滤规则：`RUST_LOG` 优先于传入的日志级别
#[must_use]
pub fn resolve_filter(rust_log: Option<String>, log_level: Option<&str>) -> String {
    rust_log
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default_filter(log_level))
}

/// 初始化日志系统
pub fn init_logging(log_level: Option<&str>) {
    let log_filter = resolve_filter(env::var("RUST_LOG").ok(), log_level);

    tracing_subscriber::registry()
        .with(EnvFilter::new(&log_filter))
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();

    tracing::debug!(filter = %log_filter, "logging initialised");
}

/// 环境变量设置指南
pub fn print_logging_help() {
    println!("📋 日志配置指南:");
    println!("  RUST_LOG=info                      # 标准日志级别");
    println!("  RUST_LOG=debug                     # 调试级别");
    println!("  RUST_LOG=info,error_slot=trace     # 中间件详细追踪");
    println!("  RUST_LOG=info,tower_http=warn      # 关闭请求追踪日志");
}
