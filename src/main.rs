//! # error-slot 演示服务
//!
//! 展示 Catch / Recover / Try 在 axum 路由上的组合方式

use std::path::PathBuf;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::routing::get;
use clap::Parser;
use error_slot::config::{self, AppConfig};
use error_slot::{CatchLayer, ErrorSlot, RecoverLayer, json_renderer, logging, try_fn};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// 命令行参数
#[derive(Debug, Parser)]
#[command(name = "error-slot-demo", version, about = "error-slot middleware demo server")]
struct Args {
    /// TOML 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 覆盖配置中的监听端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 打印日志配置说明后退出
    #[arg(long)]
    logging_help: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.logging_help {
        logging::print_logging_help();
        return Ok(());
    }

    let mut app_config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(port) = args.port {
        app_config.server.port = port;
    }

    // 初始化日志系统
    logging::init_logging(Some(&app_config.server.log_level));
    app_config.recover.apply();

    let addr = app_config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "error-slot demo listening");

    axum::serve(listener, app()).await?;
    Ok(())
}

fn app() -> Router {
    Router::new()
        .route("/ok", get(|| async { "ok" }))
        .route("/stored", get(stored))
        .route("/panic", get(explode))
        .route_service(
            "/fallible",
            try_fn(|_req: Request<Body>| async {
                Err::<Response<Body>, _>(std::io::Error::other("this also failed!"))
            }),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchLayer::new(json_renderer::<Body>))
                .layer(RecoverLayer::new()),
        )
}

/// 通过提取器记录错误，响应体由渲染器替换
async fn stored(slot: ErrorSlot) -> &'static str {
    slot.store("this failed!");
    "partial response"
}

async fn explode() -> &'static str {
    panic!("oops")
}
