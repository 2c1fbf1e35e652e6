//! Speech Service Port - 远程 TTS 服务抽象
//!
//! 定义远程合成服务的四个操作，具体实现在 infrastructure/grpc 层

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::application::streaming::SynthesisStream;
use crate::domain::speech::{SynthesisRequest, Voice};

/// RPC 错误
///
/// 服务端返回的流结束信号不是错误，不会出现在这里
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("RPC failed: {0}")]
    Call(String),

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Call canceled")]
    Canceled,

    #[error("Stream already terminated")]
    StreamClosed,
}

/// Speech Service Port
///
/// 远程 TTS 服务的抽象接口。所有操作都接受可选的单次调用截止时间，
/// `None` 表示使用连接上已配置的调用选项（或不限时）。
#[async_trait]
pub trait SpeechServicePort: Send + Sync {
    /// 查询服务端版本号
    async fn version(&self, deadline: Option<Duration>) -> Result<String, RpcError>;

    /// 查询服务端已配置的音色列表（保持服务端返回顺序）
    async fn list_voices(&self, deadline: Option<Duration>) -> Result<Vec<Voice>, RpcError>;

    /// 批量合成：阻塞直到整段音频合成完毕
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        deadline: Option<Duration>,
    ) -> Result<Vec<u8>, RpcError>;

    /// 流式合成：返回一个一次性的分块音频流
    async fn synthesize_stream(
        &self,
        request: &SynthesisRequest,
        deadline: Option<Duration>,
    ) -> Result<SynthesisStream, RpcError>;
}

/// Audio Stream Port - 流式合成的单步接收抽象
///
/// 每次调用挂起直到网络送达下一条消息：
/// - `Ok(Some(chunk))` - 下一段音频
/// - `Ok(None)` - 服务端显式的流结束信号
/// - `Err(_)` - 流错误，之后不会再有数据
#[async_trait]
pub trait AudioStreamPort: Send {
    async fn next_message(&mut self) -> Result<Option<Vec<u8>>, RpcError>;
}
