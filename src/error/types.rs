//! # 错误类型定义

use thiserror::Error;

use super::{ConfigError, SlotError};

/// crate 主要错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// 请求未经 Catch 中间件配置
    #[error(transparent)]
    Slot(#[from] SlotError),

    /// 配置相关错误
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// 是否为错误槽误用
    #[must_use]
    pub const fn is_misuse(&self) -> bool {
        matches!(self, Self::Slot(SlotError::NotConfigured))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(ConfigError::Parse(err))
    }
}
