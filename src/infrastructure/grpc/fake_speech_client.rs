//! Fake Speech Client - 用于测试的合成服务客户端
//!
//! 返回固定的版本号、音色与音频，不发出任何网络请求

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

use crate::application::ports::{AudioStreamPort, RpcError, SpeechServicePort};
use crate::application::streaming::SynthesisStream;
use crate::domain::speech::{SynthesisRequest, Voice};

/// Fake Speech Client 配置
#[derive(Debug, Clone)]
pub struct FakeSpeechClientConfig {
    /// 固定返回的版本号
    pub version: String,
    /// 固定返回的音色列表
    pub voices: Vec<Voice>,
    /// 批量合成固定返回的音频
    pub audio: Vec<u8>,
    /// 流式合成按顺序返回的分块
    pub stream_chunks: Vec<Vec<u8>>,
    /// 批量合成直接失败
    pub fail_synthesize: bool,
    /// 建流直接失败
    pub fail_stream_open: bool,
    /// 发完 `stream_chunks` 后以错误中止而不是正常结束
    pub fail_stream_after_chunks: bool,
}

impl Default for FakeSpeechClientConfig {
    fn default() -> Self {
        Self {
            version: "fake-speech 0.1".to_string(),
            voices: vec![Voice {
                id: "fake-voice".to_string(),
                name: "Fake Voice".to_string(),
            }],
            audio: Vec::new(),
            stream_chunks: Vec::new(),
            fail_synthesize: false,
            fail_stream_open: false,
            fail_stream_after_chunks: false,
        }
    }
}

/// Fake Speech Client
pub struct FakeSpeechClient {
    config: FakeSpeechClientConfig,
}

impl FakeSpeechClient {
    pub fn new(config: FakeSpeechClientConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SpeechServicePort for FakeSpeechClient {
    async fn version(&self, _deadline: Option<Duration>) -> Result<String, RpcError> {
        Ok(self.config.version.clone())
    }

    async fn list_voices(&self, _deadline: Option<Duration>) -> Result<Vec<Voice>, RpcError> {
        Ok(self.config.voices.clone())
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        _deadline: Option<Duration>,
    ) -> Result<Vec<u8>, RpcError> {
        if self.config.fail_synthesize {
            return Err(RpcError::Call("fake synthesize failure".to_string()));
        }
        tracing::debug!(
            text_len = request.text().len(),
            "FakeSpeechClient: returning fixed audio"
        );
        Ok(self.config.audio.clone())
    }

    async fn synthesize_stream(
        &self,
        _request: &SynthesisRequest,
        _deadline: Option<Duration>,
    ) -> Result<SynthesisStream, RpcError> {
        if self.config.fail_stream_open {
            return Err(RpcError::Call("fake stream open failure".to_string()));
        }
        Ok(SynthesisStream::new(Box::new(FakeAudioStream {
            chunks: self.config.stream_chunks.clone().into(),
            fail_at_end: self.config.fail_stream_after_chunks,
        })))
    }
}

/// 按脚本产出分块的接收端
struct FakeAudioStream {
    chunks: VecDeque<Vec<u8>>,
    fail_at_end: bool,
}

#[async_trait]
impl AudioStreamPort for FakeAudioStream {
    async fn next_message(&mut self) -> Result<Option<Vec<u8>>, RpcError> {
        match self.chunks.pop_front() {
            Some(chunk) => Ok(Some(chunk)),
            None if self.fail_at_end => {
                Err(RpcError::Call("fake mid-stream failure".to_string()))
            }
            None => Ok(None),
        }
    }
}
