//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod grpc;
pub mod playback;

pub use grpc::{CallOption, ClientError, ConnectOption, GrpcSpeechClient};
pub use playback::ProcessSink;
