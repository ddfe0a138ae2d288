// Media processing abstraction over ffmpeg
//
// - MediaProcessor: the capability trait the pipeline is written against
// - Commands: command builders and execution
// - Processor: the ffmpeg-backed implementation

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;
use crate::transcript::TimeRange;

/// Capability trait for the media operations the pipeline needs. The
/// pipeline never talks to ffmpeg directly; tests inject a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Cut `[range.start, range.end)` out of the source into a clip file,
    /// stream-copying both streams (no re-encode).
    async fn cut_segment(&self, source: &Path, range: TimeRange, output: &Path) -> Result<()>;

    /// Extract the audio track as mono 16 kHz PCM WAV (transcription input).
    async fn extract_audio(&self, video: &Path, audio: &Path) -> Result<()>;

    /// Replace a clip's audio track with the given audio file, keeping the
    /// video stream and trimming to the shorter of the two.
    async fn replace_audio(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;

    /// Concatenate clips in the given order into one output, re-encoding
    /// to a fixed codec pair at the given frame rate.
    async fn concatenate(&self, clips: &[PathBuf], frame_rate: f64, output: &Path) -> Result<()>;

    /// Duration of a media file in seconds.
    async fn probe_duration(&self, media: &Path) -> Result<f64>;

    /// Average video frame rate of a media file.
    async fn probe_frame_rate(&self, media: &Path) -> Result<f64>;

    /// Stretch/trim an audio file to exactly `target_duration` seconds,
    /// applying a gain factor on the way.
    async fn fit_audio(
        &self,
        audio: &Path,
        target_duration: f64,
        volume: f64,
        output: &Path,
    ) -> Result<()>;

    /// Check that the underlying binaries are present.
    fn check_availability(&self) -> Result<()>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default ffmpeg-backed media processor
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessor> {
        Box::new(processor::FfmpegProcessor::new(config))
    }
}
