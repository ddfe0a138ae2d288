use std::path::Path;
use std::process::Command;
use tracing::debug;

use crate::error::{Result, ScriptCutError};
use crate::transcript::TimeRange;

/// Abstract ffmpeg command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy video stream
    pub fn copy_video(self) -> Self {
        self.video_codec("copy")
    }

    /// Copy audio stream
    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    /// Disable video
    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    /// Set audio sample rate
    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.arg("-ar").arg(rate.to_string())
    }

    /// Set audio channels
    pub fn audio_channels(self, channels: u32) -> Self {
        self.arg("-ac").arg(channels.to_string())
    }

    /// Add audio filter
    pub fn audio_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-af").arg(filter)
    }

    /// Seek to a position (input-side accurate seek)
    pub fn seek(self, seconds: f64) -> Self {
        self.arg("-ss").arg(seconds.to_string())
    }

    /// Limit output duration
    pub fn duration(self, seconds: f64) -> Self {
        self.arg("-t").arg(seconds.to_string())
    }

    /// Execute the command, discarding stdout
    pub async fn execute(&self) -> Result<()> {
        self.execute_capture().await.map(|_| ())
    }

    /// Execute the command and return its stdout (used for probing)
    pub async fn execute_capture(&self) -> Result<String> {
        debug!("Executing media command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args);

        let output = cmd
            .output()
            .map_err(|e| ScriptCutError::Media(format!("Failed to execute media processor: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScriptCutError::Media(format!(
                "{} failed: {}",
                self.description, stderr
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Builder for the ffmpeg operations the pipeline performs
pub struct MediaCommandBuilder {
    binary_path: String,
    probe_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, probe_path: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            probe_path: probe_path.into(),
        }
    }

    /// Stream-copy cut of `[start, end)` from the source into a clip
    pub fn cut_segment<P: AsRef<Path>>(
        &self,
        source: P,
        range: TimeRange,
        output: P,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Segment cut")
            .seek(range.start)
            .input(source)
            .duration(range.duration())
            .copy_video()
            .copy_audio()
            .arg("-avoid_negative_ts")
            .arg("make_zero")
            .overwrite()
            .output(output)
    }

    /// Audio extraction as mono 16 kHz PCM (transcription-friendly)
    pub fn extract_audio<P: AsRef<Path>>(&self, video: P, audio: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio extraction")
            .input(video)
            .no_video()
            .audio_codec("pcm_s16le")
            .audio_sample_rate(16000)
            .audio_channels(1)
            .overwrite()
            .output(audio)
    }

    /// Replace a clip's audio with a separate audio file
    pub fn replace_audio<P: AsRef<Path>>(&self, video: P, audio: P, output: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio replacement")
            .input(video)
            .input(audio)
            .arg("-map")
            .arg("0:v:0")
            .arg("-map")
            .arg("1:a:0")
            .copy_video()
            .audio_codec("aac")
            .arg("-shortest")
            .overwrite()
            .output(output)
    }

    /// Concatenate clips listed in a concat-demuxer list file, re-encoding
    /// to libx264/aac at the given frame rate. Stream copy is not an option
    /// here: segment audio tracks differ in codec and origin after voice
    /// replacement.
    pub fn concat_clips<P: AsRef<Path>>(
        &self,
        list_file: P,
        frame_rate: f64,
        output: P,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Clip concatenation")
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .input(list_file)
            .video_codec("libx264")
            .arg("-pix_fmt")
            .arg("yuv420p")
            .audio_codec("aac")
            .arg("-r")
            .arg(frame_rate.to_string())
            .overwrite()
            .output(output)
    }

    /// Stretch/trim audio to an exact duration with a gain factor. The
    /// atempo factor is audio/target: >1 speeds up, <1 slows down; the
    /// trailing `-t` pins the output to the target even when atempo
    /// rounding leaves a few spare milliseconds.
    pub fn fit_audio<P: AsRef<Path>>(
        &self,
        audio: P,
        tempo: f64,
        target_duration: f64,
        volume: f64,
        output: P,
    ) -> MediaCommand {
        // ffmpeg only accepts atempo within [0.5, 100.0]
        let tempo = tempo.clamp(0.5, 100.0);
        MediaCommand::new(&self.binary_path, "Audio duration fit")
            .input(audio)
            .audio_filter(format!("atempo={:.6},volume={:.3}", tempo, volume))
            .duration(target_duration)
            .overwrite()
            .output(output)
    }

    /// ffprobe query for a single format/stream entry
    pub fn probe_entry<P: AsRef<Path>>(&self, media: P, entry: &str) -> MediaCommand {
        MediaCommand::new(&self.probe_path, format!("Probe {}", entry))
            .arg("-v")
            .arg("error")
            .arg("-select_streams")
            .arg("v:0")
            .arg("-show_entries")
            .arg(entry)
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .output(media)
    }

    /// ffprobe query for the container duration
    pub fn probe_duration<P: AsRef<Path>>(&self, media: P) -> MediaCommand {
        MediaCommand::new(&self.probe_path, "Probe duration")
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .output(media)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> MediaCommandBuilder {
        MediaCommandBuilder::new("ffmpeg", "ffprobe")
    }

    #[test]
    fn test_cut_segment_uses_stream_copy() {
        let range = TimeRange::new(2.0, 5.5).unwrap();
        let cmd = builder().cut_segment("in.mp4", range, "out.mp4");

        let args = cmd.args.join(" ");
        assert!(args.contains("-ss 2"));
        assert!(args.contains("-t 3.5"));
        assert!(args.contains("-c:v copy"));
        assert!(args.contains("-c:a copy"));
        assert_eq!(cmd.args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn test_extract_audio_is_mono_16k_pcm() {
        let cmd = builder().extract_audio("in.mp4", "out.wav");
        let args = cmd.args.join(" ");
        assert!(args.contains("-vn"));
        assert!(args.contains("-c:a pcm_s16le"));
        assert!(args.contains("-ar 16000"));
        assert!(args.contains("-ac 1"));
    }

    #[test]
    fn test_concat_re_encodes_fixed_codecs() {
        let cmd = builder().concat_clips("list.txt", 29.97, "final.mp4");
        let args = cmd.args.join(" ");
        assert!(args.contains("-f concat"));
        assert!(args.contains("-c:v libx264"));
        assert!(args.contains("-c:a aac"));
        assert!(args.contains("-r 29.97"));
    }

    #[test]
    fn test_fit_audio_clamps_tempo() {
        let cmd = builder().fit_audio("a.mp3", 0.1, 2.0, 1.5, "b.mp3");
        let args = cmd.args.join(" ");
        assert!(args.contains("atempo=0.500000"));
        assert!(args.contains("volume=1.500"));
        assert!(args.contains("-t 2"));
    }

    #[test]
    fn test_replace_audio_maps_streams() {
        let cmd = builder().replace_audio("clip.mp4", "voice.mp3", "out.mp4");
        let args = cmd.args.join(" ");
        assert!(args.contains("-map 0:v:0"));
        assert!(args.contains("-map 1:a:0"));
        assert!(args.contains("-shortest"));
        assert!(args.contains("-c:a aac"));
    }
}
