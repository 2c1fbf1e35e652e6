//! gRPC Adapter - 远程合成服务的 gRPC 实现
//!
//! pb 模块为 proto/speech.proto 预生成的代码（随仓库提交，
//! 构建不依赖 protoc）

mod channel;
mod client;
mod fake_speech_client;
pub mod pb;

pub use channel::{CallOption, ClientError, ConnectOption, DEFAULT_CONNECT_TIMEOUT};
pub use client::GrpcSpeechClient;
pub use fake_speech_client::{FakeSpeechClient, FakeSpeechClientConfig};
