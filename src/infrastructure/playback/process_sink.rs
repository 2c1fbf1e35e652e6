//! Process Sink - 外部播放进程适配
//!
//! 把配置的外部可执行程序（如 aplay/ffplay）当作音频字节的消费端：
//! 音频原样写入其标准输入，关闭标准输入即通知其播完收尾退出

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};

use crate::application::ports::{AudioSinkPort, PlaybackError};

/// 播放进程 sink
///
/// 同一实例同一时刻至多只有一个存活子进程
pub struct ProcessSink {
    application: String,
    args: Vec<String>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl ProcessSink {
    pub fn new(application: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            application: application.into(),
            args,
            child: None,
            stdin: None,
        }
    }
}

#[async_trait]
impl AudioSinkPort for ProcessSink {
    async fn start(&mut self) -> Result<(), PlaybackError> {
        // 已在运行则忽略
        if self.child.is_some() {
            return Ok(());
        }

        let mut child = Command::new(&self.application)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlaybackError::Launch(format!("{}: {}", self.application, e)))?;

        let stdin = child.stdin.take().ok_or_else(|| {
            PlaybackError::Launch(format!("{}: no stdin handle", self.application))
        })?;

        tracing::debug!(
            application = %self.application,
            pid = child.id(),
            "Playback process started"
        );

        self.child = Some(child);
        self.stdin = Some(stdin);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), PlaybackError> {
        // 未在运行则忽略。句柄先整体取出，运行状态无条件被清除，
        // stop 失败也不会把 sink 留在"运行中"
        let mut child = match self.child.take() {
            Some(child) => child,
            None => return Ok(()),
        };
        let stdin = self.stdin.take();

        // 关闭标准输入，通知播放进程不再有音频
        let mut close_err = None;
        if let Some(mut stdin) = stdin {
            if let Err(e) = stdin.shutdown().await {
                close_err = Some(PlaybackError::Process(format!(
                    "failed to close stdin: {}",
                    e
                )));
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| PlaybackError::Process(format!("wait failed: {}", e)))?;

        tracing::debug!(
            application = %self.application,
            status = %status,
            "Playback process exited"
        );

        if let Some(e) = close_err {
            return Err(e);
        }
        if !status.success() {
            return Err(PlaybackError::Process(format!(
                "{} exited with {}",
                self.application, status
            )));
        }
        Ok(())
    }

    async fn push_audio(&mut self, audio: &[u8]) -> Result<(), PlaybackError> {
        let stdin = self.stdin.as_mut().ok_or(PlaybackError::NotRunning)?;
        stdin
            .write_all(audio)
            .await
            .map_err(|e| PlaybackError::Write(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cat_sink() -> ProcessSink {
        ProcessSink::new("cat", Vec::new())
    }

    #[tokio::test]
    async fn test_push_before_start_fails_without_io() {
        let mut sink = cat_sink();
        assert!(matches!(
            sink.push_audio(b"audio").await,
            Err(PlaybackError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        // 脚本每次被启动都向文件追加一行，两次 start 只能有一行
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("spawn.sh");
        let marker = dir.path().join("spawned");
        let mut file = std::fs::File::create(&script).unwrap();
        writeln!(file, "echo started >> \"$1\"").unwrap();
        writeln!(file, "cat > /dev/null").unwrap();
        drop(file);

        let mut sink = ProcessSink::new(
            "sh",
            vec![
                script.display().to_string(),
                marker.display().to_string(),
            ],
        );
        sink.start().await.unwrap();
        sink.start().await.unwrap();
        sink.push_audio(b"audio").await.unwrap();
        sink.stop().await.unwrap();

        let spawned = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(spawned.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut sink = cat_sink();
        sink.stop().await.unwrap();

        sink.start().await.unwrap();
        sink.stop().await.unwrap();
        sink.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_push_after_stop_fails() {
        let mut sink = cat_sink();
        sink.start().await.unwrap();
        sink.stop().await.unwrap();
        assert!(matches!(
            sink.push_audio(b"audio").await,
            Err(PlaybackError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_missing_executable_is_launch_error() {
        let mut sink = ProcessSink::new("/nonexistent/player-binary", Vec::new());
        assert!(matches!(
            sink.start().await,
            Err(PlaybackError::Launch(_))
        ));
    }

    #[tokio::test]
    async fn test_abnormal_exit_reported_and_state_cleared() {
        let mut sink = ProcessSink::new("false", Vec::new());
        sink.start().await.unwrap();

        assert!(matches!(
            sink.stop().await,
            Err(PlaybackError::Process(_))
        ));

        // 状态已被清除: 再次 stop 是无操作，push 报未运行
        sink.stop().await.unwrap();
        assert!(matches!(
            sink.push_audio(b"audio").await,
            Err(PlaybackError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_batch_play_runs_full_lifecycle() {
        let mut sink = cat_sink();
        sink.batch_play(&[0u8; 4096]).await.unwrap();
        // 生命周期已走完，sink 可复用于下一次请求
        sink.batch_play(b"again").await.unwrap();
    }
}
