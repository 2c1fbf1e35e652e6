//! Parla - 远程 TTS 服务的 gRPC 客户端 SDK
//!
//! 架构设计: Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Speech Context: 合成请求与音色
//!
//! 应用层 (application/):
//! - Ports: 端口定义（SpeechService, AudioSink）
//! - Streaming: 流式合成消费者（状态机 + 首块计时）
//! - Orchestrator: 批量/流式合成编排
//!
//! 基础设施层 (infrastructure/):
//! - gRPC: 远程合成服务客户端（含测试用 Fake）
//! - Playback: 外部播放进程 sink（含测试用内存 sink）

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
