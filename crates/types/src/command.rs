//! Voice command models
//!
//! `VoiceCommand` is the raw audio event entering the parser pipeline;
//! `ParsedVoiceCommand` is the transcription produced by the speech-to-text
//! service and, for non-English commands, rewritten by the translation
//! service before reaching the recognized sink.

use serde::{Deserialize, Serialize};

/// Raw voice command captured from a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceCommand {
    /// Command identifier
    pub id: String,
    /// Raw audio payload
    pub audio: Vec<u8>,
    /// Audio encoding of the payload (e.g. "FLAC")
    pub audio_codec: String,
    /// BCP 47 language tag of the speaker (e.g. "en-US")
    pub language: String,
}

/// Transcribed voice command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedVoiceCommand {
    /// Identifier of the originating `VoiceCommand`
    pub id: String,
    /// Transcribed text
    pub text: String,
    /// Audio encoding of the original payload
    pub audio_codec: String,
    /// Language of the transcription
    pub language: String,
    /// Transcription confidence in `[0, 1]`
    pub confidence: f64,
}

impl ParsedVoiceCommand {
    /// Whether the transcription language is a variant of English
    pub fn is_english(&self) -> bool {
        self.language.starts_with("en")
    }
}
