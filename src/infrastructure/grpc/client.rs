//! gRPC Speech Client - 调用远程 TTS 服务
//!
//! 实现 SpeechServicePort trait，通过 gRPC 调用远程合成服务

use std::time::Duration;

use async_trait::async_trait;
use tonic::metadata::{AsciiMetadataKey, AsciiMetadataValue};
use tonic::transport::Channel;

use crate::application::ports::{AudioStreamPort, RpcError, SpeechServicePort};
use crate::application::streaming::SynthesisStream;
use crate::domain::speech::{AudioEncoding, SynthesisRequest, Voice};

use super::channel::{CallOption, CallOptionList, ClientError, ConnectOption, ConnectionConfig};
use super::pb;
use super::pb::speech_client::SpeechClient;

/// gRPC Speech 客户端
///
/// 持有到远程服务的唯一底层通道。除 `close` 外的全部操作都接受
/// `&self`，可以从多个调用方并发使用
#[derive(Debug)]
pub struct GrpcSpeechClient {
    address: String,
    inner: SpeechClient<Channel>,
    call_options: CallOptionList,
}

impl GrpcSpeechClient {
    /// 建立到远程服务的连接
    ///
    /// 选项按给出顺序应用。配置非法（证书、地址）时在任何网络动作
    /// 之前返回 `ClientError::Config`；拨号/握手失败或超过建连超时
    /// 返回 `ClientError::Connection`。要么返回完全可用的客户端，
    /// 要么返回错误，不存在部分可用状态
    pub async fn connect(
        address: impl Into<String>,
        options: Vec<ConnectOption>,
    ) -> Result<Self, ClientError> {
        let address = address.into();
        let config = ConnectionConfig::from_options(options)?;
        let endpoint = config.endpoint(&address)?;

        tracing::debug!(
            address = %address,
            connect_timeout_ms = config.connect_timeout().as_millis() as u64,
            "Dialing speech service"
        );

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| ClientError::Connection(format!("{}: {}", address, e)))?;

        tracing::info!(address = %address, "Connected to speech service");

        Ok(Self {
            address,
            inner: SpeechClient::new(channel),
            call_options: CallOptionList::default(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// 关闭连接并释放通道
    ///
    /// 消费自身: 关闭后的任何使用以及重复关闭都无法通过编译。
    /// 直接 drop 客户端有同样的效果
    pub fn close(self) {
        tracing::debug!(address = %self.address, "Closing speech service connection");
    }

    /// 整体替换调用选项（写时复制，不影响进行中的 RPC）
    pub fn set_call_options(&self, options: Vec<CallOption>) {
        self.call_options.set(options);
    }

    /// 追加调用选项；重复项不去重，这是接受的行为
    pub fn append_call_options(&self, options: Vec<CallOption>) {
        self.call_options.append(options);
    }

    /// 构造请求: 依次应用连接级调用选项，再用单次调用的截止时间覆盖
    fn make_request<T>(&self, message: T, deadline: Option<Duration>) -> tonic::Request<T> {
        let mut request = tonic::Request::new(message);

        let options = self.call_options.snapshot();
        for option in options.iter() {
            match option {
                CallOption::Metadata { key, value } => {
                    match (
                        key.parse::<AsciiMetadataKey>(),
                        value.parse::<AsciiMetadataValue>(),
                    ) {
                        (Ok(k), Ok(v)) => {
                            request.metadata_mut().append(k, v);
                        }
                        _ => {
                            tracing::warn!(key = %key, "Skipping invalid call metadata");
                        }
                    }
                }
                CallOption::Timeout(timeout) => request.set_timeout(*timeout),
            }
        }

        if let Some(deadline) = deadline {
            request.set_timeout(deadline);
        }

        request
    }
}

#[async_trait]
impl SpeechServicePort for GrpcSpeechClient {
    async fn version(&self, deadline: Option<Duration>) -> Result<String, RpcError> {
        let mut client = self.inner.clone();
        let response = client
            .version(self.make_request(pb::VersionRequest {}, deadline))
            .await
            .map_err(map_status)?;
        Ok(response.into_inner().version)
    }

    async fn list_voices(&self, deadline: Option<Duration>) -> Result<Vec<Voice>, RpcError> {
        // 直接转发到远端 stub，保持服务端返回顺序
        let mut client = self.inner.clone();
        let response = client
            .list_voices(self.make_request(pb::ListVoicesRequest {}, deadline))
            .await
            .map_err(map_status)?;
        Ok(response
            .into_inner()
            .voices
            .into_iter()
            .map(|v| Voice {
                id: v.id,
                name: v.name,
            })
            .collect())
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        deadline: Option<Duration>,
    ) -> Result<Vec<u8>, RpcError> {
        let mut client = self.inner.clone();

        tracing::debug!(
            voice_id = %request.voice_id(),
            text_len = request.text().len(),
            "Sending synthesize request"
        );

        let response = client
            .synthesize(self.make_request(to_pb_request(request), deadline))
            .await
            .map_err(map_status)?;
        let audio = response.into_inner().audio;

        tracing::debug!(audio_bytes = audio.len(), "Synthesize completed");

        Ok(audio)
    }

    async fn synthesize_stream(
        &self,
        request: &SynthesisRequest,
        deadline: Option<Duration>,
    ) -> Result<SynthesisStream, RpcError> {
        let mut client = self.inner.clone();

        tracing::debug!(
            voice_id = %request.voice_id(),
            text_len = request.text().len(),
            "Opening synthesis stream"
        );

        let response = client
            .synthesize_stream(self.make_request(to_pb_request(request), deadline))
            .await
            .map_err(map_status)?;

        Ok(SynthesisStream::new(Box::new(GrpcAudioStream {
            inner: response.into_inner(),
        })))
    }
}

/// tonic 服务端流到 AudioStreamPort 的适配
struct GrpcAudioStream {
    inner: tonic::codec::Streaming<pb::SynthesizeResponse>,
}

#[async_trait]
impl AudioStreamPort for GrpcAudioStream {
    async fn next_message(&mut self) -> Result<Option<Vec<u8>>, RpcError> {
        match self.inner.message().await {
            Ok(Some(response)) => Ok(Some(response.audio)),
            Ok(None) => Ok(None),
            Err(status) => Err(map_status(status)),
        }
    }
}

fn map_status(status: tonic::Status) -> RpcError {
    match status.code() {
        tonic::Code::Cancelled => RpcError::Canceled,
        tonic::Code::DeadlineExceeded => RpcError::DeadlineExceeded,
        _ => RpcError::Call(status.to_string()),
    }
}

fn to_pb_request(request: &SynthesisRequest) -> pb::SynthesizeRequest {
    let encoding = match request.encoding() {
        AudioEncoding::RawLinear16 => pb::synthesizer_config::Encoding::RawLinear16,
    };
    pb::SynthesizeRequest {
        config: Some(pb::SynthesizerConfig {
            voice_id: request.voice_id().to_string(),
            encoding: encoding as i32,
        }),
        text: request.text().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_refused_reports_connection_error() {
        // 绑定后立刻释放端口，保证拨号被拒绝而不是挂起
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = GrpcSpeechClient::connect(
            addr.to_string(),
            vec![
                ConnectOption::Insecure,
                ConnectOption::ConnectTimeout(Duration::from_millis(500)),
            ],
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ClientError::Connection(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_in_bounded_time() {
        // 黑洞地址: 要么立即不可达，要么在建连超时处被截断
        let start = std::time::Instant::now();
        let err = GrpcSpeechClient::connect(
            "10.255.255.1:443",
            vec![
                ConnectOption::Insecure,
                ConnectOption::ConnectTimeout(Duration::from_millis(500)),
            ],
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ClientError::Connection(_)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_bad_client_cert_fails_before_dialing() {
        let err = GrpcSpeechClient::connect(
            "localhost:2727",
            vec![ConnectOption::ClientCert {
                cert: b"garbage".to_vec(),
                key: b"garbage".to_vec(),
            }],
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_request_mapping_carries_voice_and_text() {
        let request = SynthesisRequest::new("v1", AudioEncoding::RawLinear16, "hello").unwrap();
        let pb_request = to_pb_request(&request);
        let config = pb_request.config.unwrap();
        assert_eq!(config.voice_id, "v1");
        assert_eq!(
            config.encoding,
            pb::synthesizer_config::Encoding::RawLinear16 as i32
        );
        assert_eq!(pb_request.text, "hello");
    }
}
