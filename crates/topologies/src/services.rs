//! External enrichment service boundaries
//!
//! The parser pipeline depends on two collaborators it does not own: a
//! transcription service and a translation service. Only their interfaces
//! live here; real transports (gRPC, HTTP) implement these traits outside
//! the pipeline crates, and tests supply counting mocks.
//!
//! The traits are synchronous on purpose: transforms run inline on the
//! partition worker, so per-record latency is the implementor's problem to
//! bound, not the engine's to hide.

use keystream_types::{ParsedVoiceCommand, VoiceCommand};
use thiserror::Error;

/// Failures from the enrichment services
#[derive(Error, Debug)]
pub enum EnrichmentError {
    /// The transcription service could not process a command
    #[error("speech-to-text failed for command '{command}': {reason}")]
    SpeechToText { command: String, reason: String },

    /// The translation service could not process a command
    #[error("translation failed for command '{command}': {reason}")]
    Translate { command: String, reason: String },
}

/// Transcribes raw audio into text with a confidence score
pub trait SpeechToText: Send + Sync {
    /// Transcribe one voice command
    fn transcribe(&self, command: &VoiceCommand) -> Result<ParsedVoiceCommand, EnrichmentError>;
}

/// Rewrites a transcription into English
pub trait Translate: Send + Sync {
    /// Translate one parsed command; the result's language is English
    fn translate(
        &self,
        command: &ParsedVoiceCommand,
    ) -> Result<ParsedVoiceCommand, EnrichmentError>;
}
