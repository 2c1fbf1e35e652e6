//! Synthesis Orchestrator - 合成编排
//!
//! 按请求选择批量或流式模式，为每个阶段计时并产出统计报告。
//! 单个请求的失败只中止该请求，编排器始终可以继续处理下一个输入

use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::application::ports::{AudioSinkPort, PlaybackError, RpcError, SpeechServicePort};
use crate::domain::speech::SynthesisRequest;

/// 编排错误：RPC 失败或播放失败
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

/// 批量模式统计
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Synthesize 调用耗时
    pub synthesis: Duration,
    /// 整段音频的播放耗时
    pub playback: Duration,
    /// 实时率 = playback / synthesis
    pub real_time_factor: f64,
    /// 返回的音频字节数
    pub audio_bytes: usize,
}

/// 流式模式统计
#[derive(Debug, Clone)]
pub struct StreamReport {
    /// 从发起到流结束的总耗时
    pub total: Duration,
    /// 首块音频到达耗时
    pub time_to_first_chunk: Option<Duration>,
    /// 收到的分块数
    pub chunks: usize,
    /// 累计音频字节数
    pub audio_bytes: usize,
}

/// 合成编排器
///
/// 同一时刻最多只有一个请求在驱动 sink（单写者约定由持有方式保证：
/// sink 被编排器独占）
pub struct SynthesisOrchestrator {
    speech: Arc<dyn SpeechServicePort>,
    sink: Box<dyn AudioSinkPort>,
}

impl SynthesisOrchestrator {
    pub fn new(speech: Arc<dyn SpeechServicePort>, sink: Box<dyn AudioSinkPort>) -> Self {
        Self { speech, sink }
    }

    /// 批量模式：整段合成后一次性播放
    pub async fn synthesize_batch(
        &mut self,
        request: &SynthesisRequest,
    ) -> Result<BatchReport, SynthesisError> {
        let start = Instant::now();
        let audio = self.speech.synthesize(request, None).await?;
        let synthesis = start.elapsed();

        tracing::debug!(
            audio_bytes = audio.len(),
            synthesis_ms = synthesis.as_millis() as u64,
            "Batch synthesis completed"
        );

        let start = Instant::now();
        self.sink.batch_play(&audio).await?;
        let playback = start.elapsed();

        let report = BatchReport {
            synthesis,
            playback,
            real_time_factor: playback.as_secs_f64() / synthesis.as_secs_f64(),
            audio_bytes: audio.len(),
        };

        tracing::info!(
            synthesis_ms = report.synthesis.as_millis() as u64,
            playback_ms = report.playback.as_millis() as u64,
            real_time_factor = format!("{:.2}", report.real_time_factor),
            "Batch request finished"
        );

        Ok(report)
    }

    /// 流式模式：每收到一块立即写入 sink，不缓冲整段音频
    ///
    /// sink 的 stop 在每条退出路径上都会执行，包括建流失败和中途出错
    pub async fn synthesize_streaming(
        &mut self,
        request: &SynthesisRequest,
    ) -> Result<StreamReport, SynthesisError> {
        let start = Instant::now();

        self.sink.start().await?;
        let pump_result = Self::pump_stream(self.speech.as_ref(), self.sink.as_mut(), request).await;
        let stop_result = self.sink.stop().await;

        let total = start.elapsed();
        match pump_result {
            Ok((time_to_first_chunk, chunks, audio_bytes)) => {
                stop_result?;
                let report = StreamReport {
                    total,
                    time_to_first_chunk,
                    chunks,
                    audio_bytes,
                };
                tracing::info!(
                    total_ms = report.total.as_millis() as u64,
                    time_to_first_chunk_ms = report
                        .time_to_first_chunk
                        .map(|d| d.as_millis() as u64),
                    chunks = report.chunks,
                    audio_bytes = report.audio_bytes,
                    "Streaming request finished"
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(stop_err) = stop_result {
                    tracing::warn!(error = %stop_err, "Sink stop failed after stream error");
                }
                tracing::error!(
                    total_ms = total.as_millis() as u64,
                    error = %e,
                    "Streaming request failed"
                );
                Err(e)
            }
        }
    }

    /// 建流并把分块按到达顺序推给 sink
    async fn pump_stream(
        speech: &dyn SpeechServicePort,
        sink: &mut dyn AudioSinkPort,
        request: &SynthesisRequest,
    ) -> Result<(Option<Duration>, usize, usize), SynthesisError> {
        let mut stream = speech.synthesize_stream(request, None).await?;

        let mut chunks = 0usize;
        let mut audio_bytes = 0usize;
        while let Some(chunk) = stream.next_chunk().await? {
            chunks += 1;
            audio_bytes += chunk.len();
            sink.push_audio(&chunk).await?;
        }

        Ok((stream.time_to_first_chunk(), chunks, audio_bytes))
    }
}
