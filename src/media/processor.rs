use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Command;
use tokio::fs;
use tracing::{debug, info};

use super::{MediaCommandBuilder, MediaProcessor};
use crate::config::MediaConfig;
use crate::error::{Result, ScriptCutError};
use crate::transcript::TimeRange;

/// ffmpeg/ffprobe-backed media processor
pub struct FfmpegProcessor {
    command_builder: MediaCommandBuilder,
    binary_path: String,
    probe_path: String,
}

impl FfmpegProcessor {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path, &config.probe_path);

        Self {
            command_builder,
            binary_path: config.binary_path,
            probe_path: config.probe_path,
        }
    }

    fn probe_number(&self, media: &Path, what: &str, raw: String) -> Result<f64> {
        let value = raw.trim();
        parse_probe_value(value).ok_or_else(|| {
            ScriptCutError::Media(format!(
                "Could not parse {} '{}' for {}",
                what,
                value,
                media.display()
            ))
        })
    }
}

/// Parse an ffprobe numeric value, accepting both plain floats and
/// rational forms like `30000/1001`.
fn parse_probe_value(value: &str) -> Option<f64> {
    if let Some((num, den)) = value.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        if den == 0.0 {
            return None;
        }
        Some(num / den)
    } else {
        value.parse().ok()
    }
}

#[async_trait]
impl MediaProcessor for FfmpegProcessor {
    async fn cut_segment(&self, source: &Path, range: TimeRange, output: &Path) -> Result<()> {
        debug!(
            "Cutting [{} - {}) from {} -> {}",
            range.start,
            range.end,
            source.display(),
            output.display()
        );

        self.command_builder
            .cut_segment(source, range, output)
            .execute()
            .await
    }

    async fn extract_audio(&self, video: &Path, audio: &Path) -> Result<()> {
        info!(
            "Extracting audio from {} to {}",
            video.display(),
            audio.display()
        );

        self.command_builder
            .extract_audio(video, audio)
            .execute()
            .await
    }

    async fn replace_audio(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        debug!(
            "Replacing audio of {} with {} -> {}",
            video.display(),
            audio.display(),
            output.display()
        );

        self.command_builder
            .replace_audio(video, audio, output)
            .execute()
            .await
    }

    async fn concatenate(&self, clips: &[PathBuf], frame_rate: f64, output: &Path) -> Result<()> {
        if clips.is_empty() {
            return Err(ScriptCutError::Media(
                "No clips given to concatenate".to_string(),
            ));
        }

        info!("Concatenating {} clips -> {}", clips.len(), output.display());

        // concat demuxer list file, single quotes escaped per ffmpeg rules
        let list_path = output.with_extension("txt");
        let list_content = clips
            .iter()
            .map(|clip| format!("file '{}'", clip.display().to_string().replace('\'', "'\\''")))
            .collect::<Vec<_>>()
            .join("\n");
        fs::write(&list_path, list_content).await?;

        let result = self
            .command_builder
            .concat_clips(list_path.as_path(), frame_rate, output)
            .execute()
            .await;

        let _ = fs::remove_file(&list_path).await;
        result
    }

    async fn probe_duration(&self, media: &Path) -> Result<f64> {
        let raw = self
            .command_builder
            .probe_duration(media)
            .execute_capture()
            .await?;
        self.probe_number(media, "duration", raw)
    }

    async fn probe_frame_rate(&self, media: &Path) -> Result<f64> {
        let raw = self
            .command_builder
            .probe_entry(media, "stream=avg_frame_rate")
            .execute_capture()
            .await?;
        self.probe_number(media, "frame rate", raw)
    }

    async fn fit_audio(
        &self,
        audio: &Path,
        target_duration: f64,
        volume: f64,
        output: &Path,
    ) -> Result<()> {
        if target_duration <= 0.0 {
            return Err(ScriptCutError::InvalidRange(format!(
                "target duration must be positive, got {}",
                target_duration
            )));
        }

        let actual = self.probe_duration(audio).await?;
        let tempo = actual / target_duration;

        debug!(
            "Fitting {} ({}s) to {}s (tempo {:.4})",
            audio.display(),
            actual,
            target_duration,
            tempo
        );

        self.command_builder
            .fit_audio(audio, tempo, target_duration, volume, output)
            .execute()
            .await
    }

    fn check_availability(&self) -> Result<()> {
        version_check(&self.binary_path, "Media processor")?;
        version_check(&self.probe_path, "Media prober")?;
        info!("Media processor and prober are available");
        Ok(())
    }
}

fn version_check(binary: &str, what: &str) -> Result<()> {
    let output = Command::new(binary)
        .arg("-version")
        .output()
        .map_err(|e| ScriptCutError::Media(format!("{} not found at '{}': {}", what, binary, e)))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(ScriptCutError::Media(format!(
            "{} version check failed",
            what
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_value_plain_and_rational() {
        assert_eq!(parse_probe_value("12.040000"), Some(12.04));
        assert_eq!(parse_probe_value("30000/1001"), Some(30000.0 / 1001.0));
        assert_eq!(parse_probe_value("25/1"), Some(25.0));
        assert_eq!(parse_probe_value("0/0"), None);
        assert_eq!(parse_probe_value("N/A"), None);
    }

    #[test]
    fn test_check_availability_requires_the_prober_too() {
        // An always-succeeding stand-in for the processor binary, so only
        // the missing prober can fail the check.
        let processor = FfmpegProcessor::new(MediaConfig {
            binary_path: "true".to_string(),
            probe_path: "/nonexistent/media-prober".to_string(),
        });

        let err = processor.check_availability().unwrap_err();
        assert!(err.to_string().contains("prober"));
    }
}
