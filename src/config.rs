use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ScriptCutError};

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_poll_max_attempts() -> u32 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub transcriber: TranscriberConfig,
    pub synthesis: SynthesisConfig,
    pub media: MediaConfig,
    pub workspace: WorkspaceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Whisper API endpoint
    pub endpoint: String,
    /// Model to use for transcription
    pub model: String,
    /// API key environment variable name
    pub api_key_env: String,
    /// Temperature for transcription
    pub temperature: f32,
    /// Priming prompt; biasing the model toward disfluencies keeps the
    /// "umm"s in the transcript so the user can cut them
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Voice cloning API endpoint
    pub endpoint: String,
    /// Model version identifier for prediction requests
    pub model_version: String,
    /// API token environment variable name
    pub api_token_env: String,
    /// Seconds between status polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Hard ceiling on status polls before giving up
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,
    /// Gain applied to synthesized voice during duration fitting
    pub voice_gain: f64,
    /// Tolerance in seconds before audio is stretched/trimmed to the clip
    pub duration_tolerance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Path to ffprobe binary
    pub probe_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Base directory for per-run workspaces
    pub base_dir: PathBuf,
    /// Maximum accepted source file size in bytes
    pub max_upload_bytes: u64,
    /// Age in hours after which a run workspace is swept
    pub retention_hours: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transcriber: TranscriberConfig {
                endpoint: "https://api.openai.com/v1".to_string(),
                model: "whisper-1".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                temperature: 0.0,
                prompt: "Umm, let me think like, uh, uh, hmm... Okay, here's what I, I'm, like, thinking.".to_string(),
            },
            synthesis: SynthesisConfig {
                endpoint: "https://api.replicate.com/v1".to_string(),
                model_version: "87faf6dd7a692dd82043f662e76369cab126a2cf1937e25a9d41e0b834fd230e".to_string(),
                api_token_env: "REPLICATE_API_TOKEN".to_string(),
                poll_interval_secs: default_poll_interval_secs(),
                poll_max_attempts: default_poll_max_attempts(),
                voice_gain: 1.5,
                duration_tolerance: 0.1,
            },
            media: MediaConfig {
                binary_path: "ffmpeg".to_string(),
                probe_path: "ffprobe".to_string(),
            },
            workspace: WorkspaceConfig {
                base_dir: PathBuf::from(".scriptcut").join("runs"),
                max_upload_bytes: 500 * 1024 * 1024,
                retention_hours: 1,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScriptCutError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| ScriptCutError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ScriptCutError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ScriptCutError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.synthesis.poll_max_attempts, 100);
        assert_eq!(parsed.synthesis.poll_interval_secs, 2);
        assert_eq!(parsed.media.binary_path, "ffmpeg");
    }

    #[test]
    fn test_poll_defaults_apply_when_absent() {
        let text = r#"
[transcriber]
endpoint = "https://api.openai.com/v1"
model = "whisper-1"
api_key_env = "OPENAI_API_KEY"
temperature = 0.0
prompt = ""

[synthesis]
endpoint = "https://api.replicate.com/v1"
model_version = "abc"
api_token_env = "REPLICATE_API_TOKEN"
voice_gain = 1.5
duration_tolerance = 0.1

[media]
binary_path = "ffmpeg"
probe_path = "ffprobe"

[workspace]
base_dir = ".scriptcut/runs"
max_upload_bytes = 1000
retention_hours = 1
"#;
        let parsed: Config = toml::from_str(text).unwrap();
        assert_eq!(parsed.synthesis.poll_interval_secs, 2);
        assert_eq!(parsed.synthesis.poll_max_attempts, 100);
    }
}
