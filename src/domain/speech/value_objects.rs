//! Speech Context - Value Objects

use super::errors::SpeechError;

/// 服务端音色描述符
///
/// 由 ListVoices 返回，顺序与服务端配置一致
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// 服务端配置的音色 ID
    pub id: String,
    /// 人类可读的音色名称
    pub name: String,
}

impl std::fmt::Display for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// 合成音频的输出编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioEncoding {
    /// 裸 16-bit 小端线性 PCM
    #[default]
    RawLinear16,
}

/// 一次合成请求
///
/// 不变量:
/// - text 去除首尾空白后非空（纯空白输入在上游被过滤，不会发出请求）
/// - voice_id 非空
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    voice_id: String,
    encoding: AudioEncoding,
    text: String,
}

impl SynthesisRequest {
    pub fn new(
        voice_id: impl Into<String>,
        encoding: AudioEncoding,
        text: impl Into<String>,
    ) -> Result<Self, SpeechError> {
        let voice_id = voice_id.into();
        if voice_id.is_empty() {
            return Err(SpeechError::EmptyVoiceId);
        }

        let text = text.into();
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }

        Ok(Self {
            voice_id,
            encoding,
            text,
        })
    }

    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    pub fn encoding(&self) -> AudioEncoding {
        self.encoding
    }

    /// 原始输入文本（不做裁剪，原样发往服务端）
    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_keeps_original_text() {
        let req = SynthesisRequest::new("v1", AudioEncoding::RawLinear16, "  hello  ").unwrap();
        assert_eq!(req.text(), "  hello  ");
        assert_eq!(req.voice_id(), "v1");
    }

    #[test]
    fn test_request_rejects_whitespace_only_text() {
        let err = SynthesisRequest::new("v1", AudioEncoding::RawLinear16, "  \t\n ").unwrap_err();
        assert_eq!(err, SpeechError::EmptyText);
    }

    #[test]
    fn test_request_rejects_empty_voice_id() {
        let err = SynthesisRequest::new("", AudioEncoding::RawLinear16, "hello").unwrap_err();
        assert_eq!(err, SpeechError::EmptyVoiceId);
    }

    #[test]
    fn test_voice_display() {
        let voice = Voice {
            id: "v1".to_string(),
            name: "Aurora".to_string(),
        };
        assert_eq!(voice.to_string(), "Aurora (v1)");
    }
}
