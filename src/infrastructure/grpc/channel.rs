//! gRPC Channel 配置 - 连接选项与调用选项
//!
//! 连接期选项在建连前折叠成一个经过校验的配置对象，
//! 证书类错误在任何网络动作之前暴露

use std::sync::{Arc, RwLock};
use std::time::Duration;

use base64::Engine;
use thiserror::Error;
use tonic::transport::{Certificate, ClientTlsConfig, Endpoint, Identity};

/// 默认建连超时
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// 客户端构造错误
#[derive(Debug, Error)]
pub enum ClientError {
    /// 配置错误（证书、地址），在任何网络动作之前返回
    #[error("Invalid client configuration: {0}")]
    Config(String),

    /// 拨号/握手失败或建连超时
    #[error("Failed to connect: {0}")]
    Connection(String),
}

/// 连接期选项
///
/// 按给出顺序应用，后出现的冲突选项覆盖先前的
/// （例如重复的 `ServerCert` 会替换根证书池）
#[derive(Debug, Clone)]
pub enum ConnectOption {
    /// 关闭传输层安全（仅用于调试）
    Insecure,
    /// 信任给定 PEM 证书作为服务端校验的根（自签名部署）
    ServerCert(Vec<u8>),
    /// 出示客户端证书与私钥，形成双向认证 TLS
    ClientCert { cert: Vec<u8>, key: Vec<u8> },
    /// 建连最长阻塞时间，默认 2 秒
    ConnectTimeout(Duration),
}

/// 附加到此连接上每次 RPC 的调用选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOption {
    /// 附加到请求的 ASCII metadata 键值对
    Metadata { key: String, value: String },
    /// 单次 RPC 的超时时间
    Timeout(Duration),
}

/// 校验后的连接配置
#[derive(Debug, Clone)]
pub(crate) struct ConnectionConfig {
    insecure: bool,
    ca_cert: Option<Vec<u8>>,
    identity: Option<(Vec<u8>, Vec<u8>)>,
    connect_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            insecure: false,
            ca_cert: None,
            identity: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    /// 依次应用全部选项
    pub(crate) fn from_options(options: Vec<ConnectOption>) -> Result<Self, ClientError> {
        let mut config = Self::default();
        for option in options {
            config.apply(option)?;
        }
        Ok(config)
    }

    /// 应用单个选项；证书在此处校验
    pub(crate) fn apply(&mut self, option: ConnectOption) -> Result<(), ClientError> {
        match option {
            ConnectOption::Insecure => {
                self.insecure = true;
            }
            ConnectOption::ServerCert(pem) => {
                validate_pem(&pem, "server certificate")?;
                self.insecure = false;
                self.ca_cert = Some(pem);
            }
            ConnectOption::ClientCert { cert, key } => {
                validate_pem(&cert, "client certificate")?;
                validate_pem(&key, "client key")?;
                self.insecure = false;
                self.identity = Some((cert, key));
            }
            ConnectOption::ConnectTimeout(timeout) => {
                self.connect_timeout = timeout;
            }
        }
        Ok(())
    }

    /// 构造 tonic Endpoint；地址形如 `host:port`，不带 scheme
    pub(crate) fn endpoint(&self, address: &str) -> Result<Endpoint, ClientError> {
        if address.trim().is_empty() {
            return Err(ClientError::Config("server address is empty".to_string()));
        }

        let scheme = if self.insecure { "http" } else { "https" };
        let mut endpoint = Endpoint::from_shared(format!("{}://{}", scheme, address))
            .map_err(|e| {
                ClientError::Config(format!("invalid server address {}: {}", address, e))
            })?
            .connect_timeout(self.connect_timeout);

        if !self.insecure {
            // 未给出 ServerCert 时使用系统默认信任库
            let mut tls = ClientTlsConfig::new();
            if let Some(ca) = &self.ca_cert {
                tls = tls.ca_certificate(Certificate::from_pem(ca));
            }
            if let Some((cert, key)) = &self.identity {
                tls = tls.identity(Identity::from_pem(cert, key));
            }
            endpoint = endpoint
                .tls_config(tls)
                .map_err(|e| ClientError::Config(format!("invalid TLS configuration: {}", e)))?;
        }

        Ok(endpoint)
    }

    pub(crate) fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

/// 连接级调用选项列表
///
/// 写时复制: 每次变更构建新列表后整体替换，
/// 并发派发 RPC 的读取方不会看到撕裂的中间状态
#[derive(Debug, Default)]
pub(crate) struct CallOptionList {
    inner: RwLock<Arc<Vec<CallOption>>>,
}

impl CallOptionList {
    /// 整体替换
    pub(crate) fn set(&self, options: Vec<CallOption>) {
        *self.inner.write().unwrap() = Arc::new(options);
    }

    /// 追加；重复项不去重
    pub(crate) fn append(&self, options: Vec<CallOption>) {
        let mut guard = self.inner.write().unwrap();
        let mut next = guard.as_ref().clone();
        next.extend(options);
        *guard = Arc::new(next);
    }

    /// 当前列表快照
    pub(crate) fn snapshot(&self) -> Arc<Vec<CallOption>> {
        self.inner.read().unwrap().clone()
    }
}

/// 粗校验 PEM 内容: 成对的标记行加 base64 体
fn validate_pem(pem: &[u8], what: &str) -> Result<(), ClientError> {
    let text = std::str::from_utf8(pem)
        .map_err(|_| ClientError::Config(format!("{} is not valid PEM: not UTF-8", what)))?;

    let mut body = String::new();
    let mut in_block = false;
    let mut blocks = 0usize;

    for line in text.lines() {
        let line = line.trim();
        if line.starts_with("-----BEGIN ") && line.ends_with("-----") {
            if in_block {
                return Err(ClientError::Config(format!(
                    "{} is not valid PEM: nested BEGIN marker",
                    what
                )));
            }
            in_block = true;
            body.clear();
            continue;
        }
        if line.starts_with("-----END ") && line.ends_with("-----") {
            if !in_block {
                return Err(ClientError::Config(format!(
                    "{} is not valid PEM: END marker without BEGIN",
                    what
                )));
            }
            base64::engine::general_purpose::STANDARD
                .decode(body.as_bytes())
                .map_err(|e| {
                    ClientError::Config(format!("{} is not valid PEM: {}", what, e))
                })?;
            in_block = false;
            blocks += 1;
            continue;
        }
        if in_block {
            body.push_str(line);
        }
    }

    if in_block || blocks == 0 {
        return Err(ClientError::Config(format!("{} is not valid PEM", what)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_pem(label: &str, payload: &[u8]) -> Vec<u8> {
        let body = base64::engine::general_purpose::STANDARD.encode(payload);
        format!(
            "-----BEGIN {label}-----\n{body}\n-----END {label}-----\n"
        )
        .into_bytes()
    }

    #[test]
    fn test_default_connect_timeout_is_two_seconds() {
        let config = ConnectionConfig::default();
        assert_eq!(config.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(DEFAULT_CONNECT_TIMEOUT, Duration::from_secs(2));
    }

    #[test]
    fn test_malformed_client_cert_rejected_before_any_io() {
        let mut config = ConnectionConfig::default();
        let err = config
            .apply(ConnectOption::ClientCert {
                cert: b"not a certificate".to_vec(),
                key: fake_pem("PRIVATE KEY", b"key"),
            })
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_malformed_base64_body_rejected() {
        let pem = b"-----BEGIN CERTIFICATE-----\n@@@@\n-----END CERTIFICATE-----\n";
        let mut config = ConnectionConfig::default();
        let err = config
            .apply(ConnectOption::ServerCert(pem.to_vec()))
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_duplicate_server_cert_replaces_root_pool() {
        let first = fake_pem("CERTIFICATE", b"first");
        let second = fake_pem("CERTIFICATE", b"second");
        let config = ConnectionConfig::from_options(vec![
            ConnectOption::ServerCert(first),
            ConnectOption::ServerCert(second.clone()),
        ])
        .unwrap();
        assert_eq!(config.ca_cert, Some(second));
    }

    #[test]
    fn test_later_cert_option_overrides_insecure() {
        let config = ConnectionConfig::from_options(vec![
            ConnectOption::Insecure,
            ConnectOption::ServerCert(fake_pem("CERTIFICATE", b"ca")),
        ])
        .unwrap();
        assert!(!config.insecure);
    }

    #[test]
    fn test_later_insecure_overrides_cert_option() {
        let config = ConnectionConfig::from_options(vec![
            ConnectOption::ServerCert(fake_pem("CERTIFICATE", b"ca")),
            ConnectOption::Insecure,
        ])
        .unwrap();
        assert!(config.insecure);
    }

    #[test]
    fn test_empty_address_is_config_error() {
        let config = ConnectionConfig::default();
        assert!(matches!(
            config.endpoint("  "),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_call_options_append_keeps_duplicates() {
        let list = CallOptionList::default();
        let option = CallOption::Metadata {
            key: "x-api-key".to_string(),
            value: "secret".to_string(),
        };
        list.append(vec![option.clone()]);
        list.append(vec![option.clone()]);
        assert_eq!(*list.snapshot(), vec![option.clone(), option]);
    }

    #[test]
    fn test_call_options_set_replaces_wholesale() {
        let list = CallOptionList::default();
        list.append(vec![CallOption::Timeout(Duration::from_secs(5))]);
        list.set(vec![CallOption::Timeout(Duration::from_secs(1))]);
        assert_eq!(
            *list.snapshot(),
            vec![CallOption::Timeout(Duration::from_secs(1))]
        );
    }

    #[test]
    fn test_snapshot_survives_later_replacement() {
        let list = CallOptionList::default();
        list.set(vec![CallOption::Timeout(Duration::from_secs(5))]);
        let snapshot = list.snapshot();
        list.set(Vec::new());
        assert_eq!(*snapshot, vec![CallOption::Timeout(Duration::from_secs(5))]);
    }
}
