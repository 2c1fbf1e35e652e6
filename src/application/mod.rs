//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（SpeechService、AudioSink）
//! - streaming: 流式合成消费者（状态机 + 首块计时）
//! - orchestrator: 批量/流式合成编排与计时报告

pub mod orchestrator;
pub mod ports;
pub mod streaming;

pub use orchestrator::{BatchReport, StreamReport, SynthesisError, SynthesisOrchestrator};
pub use ports::{AudioSinkPort, AudioStreamPort, PlaybackError, RpcError, SpeechServicePort};
pub use streaming::{StreamState, SynthesisStream};
