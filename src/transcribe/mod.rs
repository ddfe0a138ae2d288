// Transcription capability
//
// The pipeline consumes transcription as a capability: audio file in,
// ordered timed text out. The default implementation talks to the OpenAI
// Whisper API with word-level timestamps; tests inject a mock.

pub mod whisper_api;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::TranscriberConfig;
use crate::error::Result;

/// One timed unit of transcribed speech (word or phrase granularity,
/// implementation-determined).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedText {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Main trait for transcription operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file into ordered timed text
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<TimedText>>;
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    /// Create the default Whisper-API-backed transcriber
    pub fn create_transcriber(config: TranscriberConfig) -> Box<dyn Transcriber> {
        Box::new(whisper_api::WhisperApiTranscriber::new(config))
    }
}
