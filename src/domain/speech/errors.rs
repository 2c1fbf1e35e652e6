//! Speech Context - Errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpeechError {
    #[error("合成文本去除空白后不能为空")]
    EmptyText,

    #[error("音色 ID 不能为空")]
    EmptyVoiceId,
}
