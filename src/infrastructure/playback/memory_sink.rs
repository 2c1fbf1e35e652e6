//! Memory Sink - 用于测试的内存音频 sink
//!
//! 记录 Start/Push/Stop 的精确调用序列，可注入失败，不产生子进程

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::application::ports::{AudioSinkPort, PlaybackError};

/// sink 观察到的单个操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOp {
    Start,
    /// 一次成功写入的字节数
    Push(usize),
    Stop,
}

/// 内存 sink
#[derive(Default)]
pub struct MemorySink {
    ops: Arc<Mutex<Vec<SinkOp>>>,
    running: bool,
    fail_push: bool,
    fail_stop: bool,
    audio: Vec<u8>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// push_audio 总是失败的变体
    pub fn failing_push() -> Self {
        Self {
            fail_push: true,
            ..Self::default()
        }
    }

    /// stop 报错（但运行状态照常清除）的变体
    pub fn failing_stop() -> Self {
        Self {
            fail_stop: true,
            ..Self::default()
        }
    }

    /// 操作序列的共享句柄，sink 被移交后仍可检查
    pub fn ops_handle(&self) -> Arc<Mutex<Vec<SinkOp>>> {
        self.ops.clone()
    }

    /// 透传写入的全部字节
    pub fn audio(&self) -> &[u8] {
        &self.audio
    }
}

#[async_trait]
impl AudioSinkPort for MemorySink {
    async fn start(&mut self) -> Result<(), PlaybackError> {
        if self.running {
            return Ok(());
        }
        self.running = true;
        self.ops.lock().unwrap().push(SinkOp::Start);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), PlaybackError> {
        if !self.running {
            return Ok(());
        }
        self.running = false;
        self.ops.lock().unwrap().push(SinkOp::Stop);
        if self.fail_stop {
            return Err(PlaybackError::Process("injected stop failure".to_string()));
        }
        Ok(())
    }

    async fn push_audio(&mut self, audio: &[u8]) -> Result<(), PlaybackError> {
        if !self.running {
            return Err(PlaybackError::NotRunning);
        }
        if self.fail_push {
            return Err(PlaybackError::Write("injected push failure".to_string()));
        }
        self.ops.lock().unwrap().push(SinkOp::Push(audio.len()));
        self.audio.extend_from_slice(audio);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_lifecycle_in_order() {
        let mut sink = MemorySink::new();
        sink.batch_play(b"abc").await.unwrap();
        assert_eq!(
            *sink.ops_handle().lock().unwrap(),
            vec![SinkOp::Start, SinkOp::Push(3), SinkOp::Stop]
        );
        assert_eq!(sink.audio(), b"abc");
    }

    #[tokio::test]
    async fn test_push_without_start_is_rejected() {
        let mut sink = MemorySink::new();
        assert!(matches!(
            sink.push_audio(b"abc").await,
            Err(PlaybackError::NotRunning)
        ));
        assert!(sink.ops_handle().lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_play_stops_exactly_once_when_push_fails() {
        let mut sink = MemorySink::failing_push();
        let err = sink.batch_play(b"abc").await.unwrap_err();
        assert!(matches!(err, PlaybackError::Write(_)));

        let ops = sink.ops_handle().lock().unwrap().clone();
        assert_eq!(ops, vec![SinkOp::Start, SinkOp::Stop]);
    }

    #[tokio::test]
    async fn test_batch_play_reports_stop_failure_after_clean_push() {
        let mut sink = MemorySink::failing_stop();
        let err = sink.batch_play(b"abc").await.unwrap_err();
        assert!(matches!(err, PlaybackError::Process(_)));
        assert!(!sink.running);
    }
}
