//! Speech Context - 语音合成上下文
//!
//! 定义合成请求、音色、输出编码等值对象及其校验规则

mod errors;
mod value_objects;

pub use errors::SpeechError;
pub use value_objects::{AudioEncoding, SynthesisRequest, Voice};
