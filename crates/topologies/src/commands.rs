//! Voice command parsing pipeline
//!
//! Raw commands are transcribed, classified by confidence, and the
//! recognized ones normalized to English before publication. Routing is
//! first-match-wins: a command lands on exactly one of the recognized or
//! unrecognized channels, never both.

use std::sync::Arc;

use keystream_processor::{JsonCodec, StreamBuilder, Topology, TopologyError};
use keystream_types::{ParsedVoiceCommand, VoiceCommand};
use tracing::debug;

use crate::services::{SpeechToText, Translate};

/// Input channel of raw voice commands, keyed by command id
pub const VOICE_COMMANDS: &str = "voice-commands";

/// Output channel of confidently transcribed, English commands
pub const RECOGNIZED_COMMANDS: &str = "recognized-commands";

/// Output channel of low-confidence transcriptions
pub const UNRECOGNIZED_COMMANDS: &str = "unrecognized-commands";

/// Payloads shorter than this are noise and never reach transcription
pub const MIN_AUDIO_BYTES: usize = 10;

/// Default minimum confidence for a transcription to count as recognized
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.90;

/// Declares the parser pipeline around injected enrichment services
pub struct VoiceCommandParser {
    speech_to_text: Arc<dyn SpeechToText>,
    translate: Arc<dyn Translate>,
    threshold: f64,
}

impl VoiceCommandParser {
    /// Create a parser with the default confidence threshold
    pub fn new(speech_to_text: Arc<dyn SpeechToText>, translate: Arc<dyn Translate>) -> Self {
        Self {
            speech_to_text,
            translate,
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    /// Override the confidence threshold
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Declare the parser pipeline
    pub fn topology(&self) -> Result<Topology, TopologyError> {
        let builder = StreamBuilder::new();

        let speech_to_text = Arc::clone(&self.speech_to_text);
        let threshold = self.threshold;

        let parsed = builder
            .stream(
                VOICE_COMMANDS,
                JsonCodec::<String>::new(),
                JsonCodec::<VoiceCommand>::new(),
            )
            .filter("audible", |_id, command: &VoiceCommand| {
                command.audio.len() >= MIN_AUDIO_BYTES
            })
            .try_map_values(
                "speech-to-text",
                JsonCodec::<ParsedVoiceCommand>::new(),
                move |command| Ok(speech_to_text.transcribe(command)?),
            );

        let mut by_confidence = parsed
            .split("confidence")
            .branch("recognized", move |_id, parsed: &ParsedVoiceCommand| {
                parsed.confidence >= threshold
            })
            .default_branch("unrecognized");

        by_confidence
            .take("unrecognized")?
            .to(UNRECOGNIZED_COMMANDS);

        let mut by_language = by_confidence
            .take("recognized")?
            .split("language")
            .branch("english", |_id, parsed: &ParsedVoiceCommand| {
                parsed.is_english()
            })
            .default_branch("other");

        let translate = Arc::clone(&self.translate);
        let translated = by_language.take("other")?.try_map_values(
            "translate",
            JsonCodec::<ParsedVoiceCommand>::new(),
            move |parsed| Ok(translate.translate(parsed)?),
        );

        by_language
            .take("english")?
            .merge(translated)
            .to(RECOGNIZED_COMMANDS);

        let topology = builder.build()?;
        debug!(
            nodes = topology.node_count(),
            threshold = self.threshold,
            "voice parser topology built"
        );
        Ok(topology)
    }
}
