use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptCutError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed timestamp: {0}")]
    MalformedTimestamp(String),

    #[error("Transcript parse error: {0}")]
    TranscriptParse(String),

    #[error("Invalid time range: {0}")]
    InvalidRange(String),

    #[error("Segment extraction error: {0}")]
    Extraction(String),

    #[error("Voice synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Voice synthesis timed out: {0}")]
    SynthesisTimeout(String),

    #[error("Reassembly error: {0}")]
    Reassembly(String),

    #[error("Transcription error: {0}")]
    Transcriber(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

pub type Result<T> = std::result::Result<T, ScriptCutError>;
