//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 从指定路径加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `PARLA_`，层级分隔符 `__`）
/// 2. 配置文件（TOML）
/// 3. 默认值
///
/// # 环境变量示例
/// - `PARLA_SERVER__ADDRESS=localhost:2727`
/// - `PARLA_SERVER__INSECURE=true`
/// - `PARLA_PLAYBACK__APPLICATION=aplay`
/// - `PARLA_STREAMING=true`
pub fn load_config(config_path: &Path) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 首先设置默认值（最低优先级）
    builder = builder
        .set_default("streaming", false)?
        .set_default("server.voice_id", "default")?
        .set_default("server.insecure", false)?
        .set_default("server.connect_timeout_secs", 2)?
        .set_default("log.level", "info")?;

    // 2. 配置文件（必须存在）
    builder = builder.add_source(File::from(config_path).required(true));

    // 3. 环境变量（最高优先级）
    // 前缀: PARLA_
    // 层级分隔符: __ (双下划线)
    builder = builder.add_source(
        Environment::with_prefix("PARLA")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    // 4. 构建并反序列化
    let config = builder.build()?;
    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::ParseError(format!("Failed to deserialize config: {}", e)))?;

    // 5. 验证配置
    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    // 服务地址必填
    if config.server.address.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Server address cannot be empty".to_string(),
        ));
    }

    // 建连超时不能为 0
    if config.server.connect_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Connect timeout cannot be 0".to_string(),
        ));
    }

    // 客户端证书与私钥必须成对出现
    if config.server.client_cert.is_some() != config.server.client_key.is_some() {
        return Err(ConfigError::ValidationError(
            "client_cert and client_key must be set together".to_string(),
        ));
    }

    // 播放程序必须可用
    check_playback_application(&config.playback.application)?;

    Ok(())
}

/// 验证播放程序存在: 带路径分隔符的必须指向现有文件，
/// 裸命令名则在 PATH 中查找
fn check_playback_application(application: &str) -> Result<(), ConfigError> {
    if application.is_empty() {
        return Err(ConfigError::ValidationError(
            "Playback application not specified".to_string(),
        ));
    }

    let path = Path::new(application);
    if path.components().count() > 1 {
        return match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(ConfigError::ValidationError(format!(
                "Playback application {} is a directory, not an executable",
                application
            ))),
            Err(_) => Err(ConfigError::ValidationError(format!(
                "Could not find playback application {}",
                application
            ))),
        };
    }

    let found = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(application).is_file()))
        .unwrap_or(false);

    if found {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "Could not find playback application {} in PATH",
            application
        )))
    }
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.address);
    tracing::info!("Voice ID: {}", config.server.voice_id);
    tracing::info!("Insecure: {}", config.server.insecure);
    tracing::info!("Connect Timeout: {}s", config.server.connect_timeout_secs);
    tracing::info!(
        "Mode: {}",
        if config.streaming { "streaming" } else { "batch" }
    );
    tracing::info!(
        "Playback: {} {}",
        config.playback.application,
        config.playback.args
    );
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
