//! Audio Sink Port - 外部播放进程抽象
//!
//! 把一个外部可执行程序抽象为只写的字节流消费者，
//! 测试中可用内存实现替代真实子进程
//!
//! 单写者约定: 同一个 sink 实例上的 start/stop/push_audio 必须由
//! 同一个逻辑持有者串行调用，trait 本身不提供互斥

use async_trait::async_trait;
use thiserror::Error;

/// 播放 sink 错误
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Failed to launch playback process: {0}")]
    Launch(String),

    #[error("Playback process is not running")]
    NotRunning,

    #[error("Failed to write audio to playback process: {0}")]
    Write(String),

    #[error("Playback process error: {0}")]
    Process(String),
}

/// Audio Sink Port
#[async_trait]
pub trait AudioSinkPort: Send {
    /// 启动播放进程。已在运行则是无操作并返回成功
    async fn start(&mut self) -> Result<(), PlaybackError>;

    /// 停止播放进程：关闭其标准输入并等待退出。
    /// 未在运行则是无操作；无论成败，运行状态都会被清除
    async fn stop(&mut self) -> Result<(), PlaybackError>;

    /// 把音频字节写入播放进程的标准输入。
    /// 未 start（或已 stop）时返回 `NotRunning`，不做任何 I/O
    async fn push_audio(&mut self, audio: &[u8]) -> Result<(), PlaybackError>;

    /// 组合便捷操作: start -> push_audio -> stop。
    ///
    /// stop 在每条退出路径上都会执行；push 与 stop 都失败时上报 push
    /// 的错误，stop 的错误记入日志而不被静默丢弃
    async fn batch_play(&mut self, audio: &[u8]) -> Result<(), PlaybackError> {
        self.start().await?;

        let push_result = self.push_audio(audio).await;
        let stop_result = self.stop().await;

        match push_result {
            Ok(()) => stop_result,
            Err(push_err) => {
                if let Err(stop_err) = stop_result {
                    tracing::warn!(error = %stop_err, "Sink stop failed after push error");
                }
                Err(push_err)
            }
        }
    }
}
