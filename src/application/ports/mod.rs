//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_sink;
mod speech_service;

pub use audio_sink::{AudioSinkPort, PlaybackError};
pub use speech_service::{AudioStreamPort, RpcError, SpeechServicePort};
