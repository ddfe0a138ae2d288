// OpenAI Whisper API implementation with word-level timestamps

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

use super::{TimedText, Transcriber};
use crate::config::TranscriberConfig;
use crate::error::{Result, ScriptCutError};

/// Whisper verbose_json response, reduced to the fields we use
#[derive(Debug, Deserialize)]
struct WhisperResponse {
    #[serde(default)]
    words: Vec<WhisperWord>,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    word: String,
    start: f64,
    end: f64,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

/// Whisper API backed transcriber
pub struct WhisperApiTranscriber {
    config: TranscriberConfig,
    client: reqwest::Client,
}

impl WhisperApiTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Key lookup is deferred to call time so runs that never transcribe
    /// (trim, bloopers) work without credentials.
    fn api_key(&self) -> Result<String> {
        std::env::var(&self.config.api_key_env).map_err(|_| {
            ScriptCutError::Config(format!(
                "Transcription API key not set; export {}",
                self.config.api_key_env
            ))
        })
    }

    fn words_to_timed_text(words: Vec<WhisperWord>) -> Vec<TimedText> {
        words
            .into_iter()
            .map(|w| TimedText {
                start: w.start,
                end: w.end,
                text: w.word.trim().to_string(),
            })
            .collect()
    }
}

#[async_trait]
impl Transcriber for WhisperApiTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<TimedText>> {
        info!("Transcribing {} via Whisper API", audio_path.display());

        let api_key = self.api_key()?;
        let audio_bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.wav".to_string());

        let form = multipart::Form::new()
            .part(
                "file",
                multipart::Part::bytes(audio_bytes)
                    .file_name(file_name)
                    .mime_str("audio/wav")
                    .map_err(|e| ScriptCutError::Transcriber(format!("Bad mime type: {}", e)))?,
            )
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word")
            .text("temperature", self.config.temperature.to_string())
            .text("prompt", self.config.prompt.clone());

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.config.endpoint))
            .bearer_auth(&api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ScriptCutError::Transcriber(format!(
                "Whisper API returned {}: {}",
                status, body
            )));
        }

        let parsed: WhisperResponse = response.json().await?;
        debug!(
            "Whisper returned {} words, {} segments",
            parsed.words.len(),
            parsed.segments.len()
        );

        // Word granularity preferred; some responses only carry segments.
        let timed = if !parsed.words.is_empty() {
            Self::words_to_timed_text(parsed.words)
        } else {
            parsed
                .segments
                .into_iter()
                .map(|s| TimedText {
                    start: s.start,
                    end: s.end,
                    text: s.text.trim().to_string(),
                })
                .collect()
        };

        if timed.is_empty() {
            return Err(ScriptCutError::Transcriber(
                "Whisper API returned an empty transcription".to_string(),
            ));
        }

        Ok(timed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing_prefers_words() {
        let json = r#"{
            "text": "hello world",
            "words": [
                {"word": "hello", "start": 0.0, "end": 0.4},
                {"word": "world", "start": 0.4, "end": 0.9}
            ],
            "segments": [
                {"start": 0.0, "end": 0.9, "text": "hello world"}
            ]
        }"#;

        let parsed: WhisperResponse = serde_json::from_str(json).unwrap();
        let timed = WhisperApiTranscriber::words_to_timed_text(parsed.words);

        assert_eq!(timed.len(), 2);
        assert_eq!(timed[0].text, "hello");
        assert_eq!(timed[1].start, 0.4);
    }

    #[test]
    fn test_response_parsing_without_words() {
        let json = r#"{
            "text": "hello world",
            "segments": [
                {"start": 0.0, "end": 0.9, "text": " hello world "}
            ]
        }"#;

        let parsed: WhisperResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.words.is_empty());
        assert_eq!(parsed.segments.len(), 1);
    }
}
