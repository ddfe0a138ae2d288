// Replicate-backed voice cloning client

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{poll_until, VoiceSynthesizer};
use crate::config::SynthesisConfig;
use crate::error::{Result, ScriptCutError};

#[derive(Debug, Clone, Deserialize)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl Prediction {
    fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "failed" | "canceled")
    }

    /// Output URL of a succeeded prediction; models return either a bare
    /// URI string or a one-element list.
    fn output_url(&self) -> Option<String> {
        match &self.output {
            Some(serde_json::Value::String(url)) => Some(url.clone()),
            Some(serde_json::Value::Array(items)) => items
                .first()
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            _ => None,
        }
    }
}

/// Voice synthesizer backed by a Replicate voice-cloning model
pub struct ReplicateSynthesizer {
    config: SynthesisConfig,
    client: reqwest::Client,
}

impl ReplicateSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Token lookup is deferred to call time so runs that never
    /// resynthesize (trim, bloopers) work without credentials.
    fn api_token(&self) -> Result<String> {
        std::env::var(&self.config.api_token_env).map_err(|_| {
            ScriptCutError::Config(format!(
                "Synthesis API token not set; export {}",
                self.config.api_token_env
            ))
        })
    }

    async fn submit(
        &self,
        reference_audio: &Path,
        reference_text: &str,
        target_text: &str,
    ) -> Result<Prediction> {
        let audio_bytes = tokio::fs::read(reference_audio).await?;
        let audio_uri = format!(
            "data:audio/wav;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&audio_bytes)
        );

        let response = self
            .client
            .post(format!("{}/predictions", self.config.endpoint))
            .bearer_auth(self.api_token()?)
            .json(&serde_json::json!({
                "version": self.config.model_version,
                "input": {
                    "gen_text": target_text,
                    "ref_text": reference_text,
                    "ref_audio": audio_uri,
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ScriptCutError::SynthesisFailed(format!(
                "Prediction submit returned {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    async fn poll_status(&self, id: &str) -> Result<Prediction> {
        let response = self
            .client
            .get(format!("{}/predictions/{}", self.config.endpoint, id))
            .bearer_auth(self.api_token()?)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(ScriptCutError::SynthesisFailed(format!(
                "Prediction status poll returned {}",
                status
            )));
        }

        Ok(response.json().await?)
    }

    async fn fetch_output(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Fetching synthesized audio from {}", url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(ScriptCutError::SynthesisFailed(format!(
                "Output fetch returned {}",
                response.status()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl VoiceSynthesizer for ReplicateSynthesizer {
    async fn synthesize(
        &self,
        reference_audio: &Path,
        reference_text: &str,
        target_text: &str,
    ) -> Result<Vec<u8>> {
        info!("Submitting voice cloning job ({} chars)", target_text.len());

        let submitted = self.submit(reference_audio, reference_text, target_text).await?;
        let id = submitted.id.clone();

        let interval = Duration::from_secs(self.config.poll_interval_secs);
        let final_state = if submitted.is_terminal() {
            Some(submitted)
        } else {
            poll_until(
                interval,
                self.config.poll_max_attempts,
                || self.poll_status(&id),
                Prediction::is_terminal,
            )
            .await?
        };

        let prediction = final_state.ok_or_else(|| {
            ScriptCutError::SynthesisTimeout(format!(
                "Prediction {} not terminal after {} polls",
                id, self.config.poll_max_attempts
            ))
        })?;

        match prediction.status.as_str() {
            "succeeded" => {
                let url = prediction.output_url().ok_or_else(|| {
                    ScriptCutError::SynthesisFailed(format!(
                        "Prediction {} succeeded without an output URL",
                        prediction.id
                    ))
                })?;
                self.fetch_output(&url).await
            }
            status => {
                warn!("Prediction {} ended as {}", prediction.id, status);
                Err(ScriptCutError::SynthesisFailed(format!(
                    "Prediction {} ended as {}: {}",
                    prediction.id,
                    status,
                    prediction.error.unwrap_or_default()
                )))
            }
        }
    }
}
