//! # 配置管理模块
//!
//! 处理配置加载与校验

mod app_config;

pub use app_config::{AppConfig, RecoverConfig, ServerConfig};

use std::path::Path;

use crate::error::{ConfigError, Result};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// 加载配置文件
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::load(path, e))?;

    AppConfig::from_toml_str(&content)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<()> {
    if config.recover.max_stack_frames == 0 {
        return Err(ConfigError::invalid("max_stack_frames 必须大于0").into());
    }

    if !LOG_LEVELS.contains(&config.server.log_level.to_lowercase().as_str()) {
        return Err(ConfigError::invalid(format!(
            "无效的日志级别: {}",
            config.server.log_level
        ))
        .into());
    }

    config.server.socket_addr()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::recover::{self, DEFAULT_MAX_STACK_FRAMES};
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.recover.max_stack_frames, DEFAULT_MAX_STACK_FRAMES);
        assert!(config.recover.forward_panics);
        assert_eq!(config.server.socket_addr().unwrap().to_string(), "127.0.0.1:8000");
    }

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            bind_address = "0.0.0.0"
            port = 9090
            log_level = "debug"

            [recover]
            max_stack_frames = 16
            forward_panics = false
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.recover.max_stack_frames, 16);
        assert!(!config.recover.forward_panics);
    }

    #[test]
    fn test_zero_stack_frames_rejected() {
        let err = AppConfig::from_toml_str("[recover]\nmax_stack_frames = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let err = AppConfig::from_toml_str("[server]\nlog_level = \"loud\"\n").unwrap_err();
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn test_bad_bind_address_rejected() {
        let err = AppConfig::from_toml_str("[server]\nbind_address = \"not an ip\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[recover]\nmax_stack_frames = 4").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.recover.max_stack_frames, 4);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config("/nonexistent/error-slot.toml").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Load { .. })));
    }

    #[test]
    #[serial(recover_tunables)]
    fn test_apply_sets_tunables() {
        RecoverConfig {
            max_stack_frames: 12,
            forward_panics: false,
        }
        .apply();
        assert_eq!(recover::max_stack_frames(), 12);
        assert!(!recover::forward_panics());

        RecoverConfig::default().apply();
        assert_eq!(recover::max_stack_frames(), DEFAULT_MAX_STACK_FRAMES);
        assert!(recover::forward_panics());
    }
}
