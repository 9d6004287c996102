//! # 应用配置结构定义

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::recover::{DEFAULT_MAX_STACK_FRAMES, set_forward_panics, set_max_stack_frames};

/// 应用主配置结构
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 演示服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// panic 恢复配置
    #[serde(default)]
    pub recover: RecoverConfig,
}

impl AppConfig {
    /// 从 TOML 文本解析并校验配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        super::validate_config(&config)?;
        Ok(config)
    }
}

/// 服务器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub bind_address: String,
    /// 监听端口
    pub port: u16,
    /// 日志级别
    pub log_level: String,
}

impl ServerConfig {
    /// 组合监听地址与端口
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|_| {
                ConfigError::invalid(format!("无效的监听地址: {}:{}", self.bind_address, self.port)).into()
            })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8000,
            log_level: "info".to_string(),
        }
    }
}

/// Recover 中间件配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoverConfig {
    /// 捕获调用栈的最大帧数
    pub max_stack_frames: usize,
    /// 是否仍将被捕获的 panic 交给原有的 panic hook
    pub forward_panics: bool,
}

impl RecoverConfig {
    /// Install these values as the process-wide Recover tunables.
    pub fn apply(&self) {
        set_max_stack_frames(self.max_stack_frames);
        set_forward_panics(self.forward_panics);
    }
}

impl Default for RecoverConfig {
    fn default() -> Self {
        Self {
            max_stack_frames: DEFAULT_MAX_STACK_FRAMES,
            forward_panics: true,
        }
    }
}
