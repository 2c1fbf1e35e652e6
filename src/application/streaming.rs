//! Streaming Consumer - 流式合成消费者
//!
//! 把服务端流式调用的接收循环转成一个有限的、一次性的分块序列，
//! 区分正常结束与错误，并记录首块到达耗时（time-to-first-chunk）

use std::time::{Duration, Instant};

use crate::application::ports::{AudioStreamPort, RpcError};

/// 流状态机: Streaming -> Completed | Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// 仍在接收分块
    Streaming,
    /// 收到服务端的流结束信号
    Completed,
    /// 接收出错，不会再有分块
    Failed,
}

/// 一次流式合成的消费端句柄
///
/// 不可重启: 进入 Completed/Failed 后再次调用 `next_chunk` 返回
/// `RpcError::StreamClosed`，重试需要重新发起 SynthesizeStream
pub struct SynthesisStream {
    source: Box<dyn AudioStreamPort + Send>,
    state: StreamState,
    opened_at: Instant,
    first_chunk_at: Option<Instant>,
}

impl SynthesisStream {
    /// 包装一个已建立的接收端，计时从此刻（流建立）开始
    pub fn new(source: Box<dyn AudioStreamPort + Send>) -> Self {
        Self {
            source,
            state: StreamState::Streaming,
            opened_at: Instant::now(),
            first_chunk_at: None,
        }
    }

    /// 接收下一段音频
    ///
    /// - `Ok(Some(chunk))` - 下一段音频，保持接收顺序
    /// - `Ok(None)` - 流正常结束
    /// - `Err(_)` - 流失败
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, RpcError> {
        match self.state {
            StreamState::Streaming => {}
            StreamState::Completed | StreamState::Failed => {
                return Err(RpcError::StreamClosed);
            }
        }

        match self.source.next_message().await {
            Ok(Some(chunk)) => {
                if self.first_chunk_at.is_none() {
                    let elapsed = self.opened_at.elapsed();
                    self.first_chunk_at = Some(Instant::now());
                    tracing::debug!(
                        time_to_first_chunk_ms = elapsed.as_millis() as u64,
                        "First audio chunk received"
                    );
                }
                Ok(Some(chunk))
            }
            Ok(None) => {
                self.state = StreamState::Completed;
                Ok(None)
            }
            Err(e) => {
                self.state = StreamState::Failed;
                Err(e)
            }
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// 流建立到首块到达的耗时，尚未收到任何分块时为 None
    pub fn time_to_first_chunk(&self) -> Option<Duration> {
        self.first_chunk_at.map(|t| t - self.opened_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    /// 测试用接收端: 按脚本依次产出分块/结束/错误
    struct ScriptedSource {
        steps: VecDeque<Result<Option<Vec<u8>>, RpcError>>,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Result<Option<Vec<u8>>, RpcError>>) -> Self {
            Self {
                steps: steps.into(),
            }
        }
    }

    #[async_trait]
    impl AudioStreamPort for ScriptedSource {
        async fn next_message(&mut self) -> Result<Option<Vec<u8>>, RpcError> {
            self.steps.pop_front().unwrap_or(Ok(None))
        }
    }

    #[tokio::test]
    async fn test_chunks_arrive_in_order_then_complete() {
        let source = ScriptedSource::new(vec![
            Ok(Some(vec![1])),
            Ok(Some(vec![2])),
            Ok(Some(vec![3])),
            Ok(None),
        ]);
        let mut stream = SynthesisStream::new(Box::new(source));

        let mut received = Vec::new();
        while let Some(chunk) = stream.next_chunk().await.unwrap() {
            received.push(chunk);
        }

        assert_eq!(received, vec![vec![1], vec![2], vec![3]]);
        assert_eq!(stream.state(), StreamState::Completed);
    }

    #[tokio::test]
    async fn test_error_transitions_to_failed() {
        let source = ScriptedSource::new(vec![
            Ok(Some(vec![1])),
            Err(RpcError::Call("server aborted".to_string())),
        ]);
        let mut stream = SynthesisStream::new(Box::new(source));

        assert!(stream.next_chunk().await.unwrap().is_some());
        assert!(stream.next_chunk().await.is_err());
        assert_eq!(stream.state(), StreamState::Failed);
    }

    #[tokio::test]
    async fn test_terminated_stream_is_not_reusable() {
        let source = ScriptedSource::new(vec![Ok(None)]);
        let mut stream = SynthesisStream::new(Box::new(source));

        assert!(stream.next_chunk().await.unwrap().is_none());
        assert!(matches!(
            stream.next_chunk().await,
            Err(RpcError::StreamClosed)
        ));
    }

    #[tokio::test]
    async fn test_time_to_first_chunk_recorded_once() {
        let source = ScriptedSource::new(vec![Ok(Some(vec![1])), Ok(Some(vec![2])), Ok(None)]);
        let mut stream = SynthesisStream::new(Box::new(source));

        assert!(stream.time_to_first_chunk().is_none());

        stream.next_chunk().await.unwrap();
        let first = stream.time_to_first_chunk().expect("recorded on first chunk");

        stream.next_chunk().await.unwrap();
        assert_eq!(stream.time_to_first_chunk(), Some(first));
    }
}
