//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;

/// 应用主配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// 是否使用流式合成（否则为批量模式）
    #[serde(default)]
    pub streaming: bool,

    /// 服务端配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 播放进程配置
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务端配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 服务地址（host:port，不带 scheme）
    #[serde(default)]
    pub address: String,

    /// 合成使用的音色 ID（与服务端配置一致）
    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    /// 关闭传输层安全（仅用于调试）
    #[serde(default)]
    pub insecure: bool,

    /// 服务端校验用根证书的 PEM 文件路径（自签名部署）
    #[serde(default)]
    pub ca_cert: Option<String>,

    /// 双向 TLS 的客户端证书 PEM 文件路径，必须与 client_key 成对
    #[serde(default)]
    pub client_cert: Option<String>,

    /// 双向 TLS 的客户端私钥 PEM 文件路径
    #[serde(default)]
    pub client_key: Option<String>,

    /// 建连超时（秒）
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_voice_id() -> String {
    "default".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    2
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            voice_id: default_voice_id(),
            insecure: false,
            ca_cert: None,
            client_cert: None,
            client_key: None,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// 播放进程配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PlaybackConfig {
    /// 播放程序路径或命令名
    #[serde(default)]
    pub application: String,

    /// 传给播放程序的参数串，按空白分割（不支持引号）
    #[serde(default)]
    pub args: String,
}

impl PlaybackConfig {
    /// 参数串分割成列表
    pub fn arg_list(&self) -> Vec<String> {
        self.args.split_whitespace().map(str::to_string).collect()
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(!config.streaming);
        assert!(config.server.address.is_empty());
        assert_eq!(config.server.voice_id, "default");
        assert_eq!(config.server.connect_timeout_secs, 2);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_arg_list_splits_on_whitespace() {
        let config = PlaybackConfig {
            application: "aplay".to_string(),
            args: " -r 22050  -f S16_LE -t raw - ".to_string(),
        };
        assert_eq!(
            config.arg_list(),
            vec!["-r", "22050", "-f", "S16_LE", "-t", "raw", "-"]
        );
    }

    #[test]
    fn test_sample_config_file_deserializes() {
        let sample = include_str!("../../config.toml");
        let config: AppConfig = toml::from_str(sample).unwrap();
        assert!(!config.server.address.is_empty());
        assert!(!config.playback.application.is_empty());
    }
}
