use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, ScriptCutError};
use crate::extractor::{Clip, SegmentExtractor, SourceMedia};
use crate::media::{MediaProcessor, MediaProcessorFactory};
use crate::planner::{plan_bloopers, plan_resync, plan_trim, EditDirective};
use crate::synthesis::{SynthesizerFactory, VoiceSynthesizer};
use crate::transcribe::{TimedText, Transcriber, TranscriberFactory};
use crate::transcript::{LineError, TimeRange, Transcript, TranscriptLine};
use crate::workspace::RunWorkspace;

/// Outcome of a pipeline run. Per-segment failures are absorbed into
/// `warnings`; only a total loss of usable content is an error.
#[derive(Debug)]
pub struct RunReport {
    /// Final muxed output file
    pub output: PathBuf,
    /// Number of segments in the output
    pub segments: usize,
    /// Number of planned segments that were dropped
    pub skipped: usize,
    /// Per-line and per-segment warnings, in occurrence order
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn summary(&self) -> String {
        if self.skipped == 0 {
            format!("{} segments -> {}", self.segments, self.output.display())
        } else {
            format!(
                "partial success: {} segments ({} skipped) -> {}",
                self.segments,
                self.skipped,
                self.output.display()
            )
        }
    }
}

/// The transcript-driven editing pipeline: plan directives from transcript
/// edits, cut clips, resynthesize flagged audio, reassemble. Capabilities
/// are injected so runs are testable and never share process-wide state.
pub struct Pipeline {
    config: Config,
    media: Box<dyn MediaProcessor>,
    transcriber: Box<dyn Transcriber>,
    synthesizer: Box<dyn VoiceSynthesizer>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        media: Box<dyn MediaProcessor>,
        transcriber: Box<dyn Transcriber>,
        synthesizer: Box<dyn VoiceSynthesizer>,
    ) -> Self {
        Self {
            config,
            media,
            transcriber,
            synthesizer,
        }
    }

    /// Wire up the default capability implementations from config.
    pub fn from_config(config: Config) -> Result<Self> {
        let media = MediaProcessorFactory::create_processor(config.media.clone());
        media.check_availability()?;

        let transcriber = TranscriberFactory::create_transcriber(config.transcriber.clone());
        let synthesizer = SynthesizerFactory::create_synthesizer(config.synthesis.clone());

        Ok(Self::new(config, media, transcriber, synthesizer))
    }

    /// Transcribe a video into a timestamped transcript ready for editing.
    pub async fn transcribe_video(&self, video: &Path) -> Result<Transcript> {
        let workspace = RunWorkspace::create(&self.config.workspace.base_dir)?;
        let source = self.open_source(video, &workspace).await?;

        let timed = self.transcriber.transcribe(&source.audio_path).await?;
        let transcript = transcript_from_timed(timed);

        if transcript.is_empty() {
            return Err(ScriptCutError::Transcriber(
                "Transcription produced no usable lines".to_string(),
            ));
        }

        info!("Transcribed {} lines from {}", transcript.len(), video.display());
        Ok(transcript)
    }

    /// Trim mode: keep exactly the lines present in the edited text, in
    /// order, with original audio.
    pub async fn run_trim(&self, video: &Path, edited_text: &str) -> Result<RunReport> {
        let (kept, line_errors) = Transcript::from_lines(edited_text);
        let directives = plan_trim(&kept);
        self.run(video, directives, line_errors).await
    }

    /// Bloopers mode: emit the complement, the lines the user removed.
    pub async fn run_bloopers(
        &self,
        video: &Path,
        original_text: &str,
        kept_text: &str,
    ) -> Result<RunReport> {
        let (original, mut line_errors) = Transcript::from_lines(original_text);
        let (kept, kept_errors) = Transcript::from_lines(kept_text);
        line_errors.extend(kept_errors);

        let directives = plan_bloopers(&original, &kept);
        self.run(video, directives, line_errors).await
    }

    /// Resync mode: positionally diff the edited transcript against the
    /// original and replace audio for every changed line.
    pub async fn run_resync(
        &self,
        video: &Path,
        original_text: &str,
        edited_text: &str,
    ) -> Result<RunReport> {
        let (original, mut line_errors) = Transcript::from_lines(original_text);
        let (edited, edited_errors) = Transcript::from_lines(edited_text);
        line_errors.extend(edited_errors);

        let directives = plan_resync(&original, &edited)?;
        self.run_with_reference(video, directives, line_errors, original.full_text())
            .await
    }

    async fn run(
        &self,
        video: &Path,
        directives: Vec<EditDirective>,
        line_errors: Vec<LineError>,
    ) -> Result<RunReport> {
        self.run_with_reference(video, directives, line_errors, String::new())
            .await
    }

    async fn run_with_reference(
        &self,
        video: &Path,
        directives: Vec<EditDirective>,
        line_errors: Vec<LineError>,
        reference_text: String,
    ) -> Result<RunReport> {
        let mut warnings: Vec<String> = line_errors.iter().map(|e| e.to_string()).collect();

        if directives.is_empty() {
            return Err(ScriptCutError::Reassembly(
                "nothing to process: no valid directives".to_string(),
            ));
        }

        let mut workspace = RunWorkspace::create(&self.config.workspace.base_dir)?;
        let source = self.open_source(video, &workspace).await?;

        let planned = directives.len();
        let extractor = SegmentExtractor::new(self.media.as_ref());
        let (mut clips, extract_warnings) =
            extractor.extract(&source, &directives, &workspace).await?;
        warnings.extend(extract_warnings);

        self.resynthesize_clips(&source, &mut clips, &workspace, &reference_text, &mut warnings)
            .await;

        let report = self
            .reassemble(&source, &clips, &workspace, planned, warnings)
            .await?;

        // The final output lives inside the workspace; the retention sweep
        // reclaims it later.
        workspace.keep();

        info!("Run finished: {}", report.summary());
        Ok(report)
    }

    /// Validate and open the source file, probing its duration and
    /// extracting its audio track into the workspace.
    async fn open_source(&self, path: &Path, workspace: &RunWorkspace) -> Result<SourceMedia> {
        if !path.exists() {
            return Err(ScriptCutError::FileNotFound(path.display().to_string()));
        }

        let size = fs::metadata(path).await?.len();
        if size > self.config.workspace.max_upload_bytes {
            return Err(ScriptCutError::Media(format!(
                "source file is {} bytes, above the {} byte limit",
                size, self.config.workspace.max_upload_bytes
            )));
        }

        let duration = self.media.probe_duration(path).await?;
        let audio_path = workspace.audio_path();
        self.media.extract_audio(path, &audio_path).await?;

        Ok(SourceMedia {
            path: path.to_path_buf(),
            duration,
            audio_path,
        })
    }

    /// Replace audio on every clip whose directive is flagged. Synthesis
    /// or muxing failure downgrades that clip to its original audio with a
    /// warning; it never aborts the run.
    async fn resynthesize_clips(
        &self,
        source: &SourceMedia,
        clips: &mut [Clip],
        workspace: &RunWorkspace,
        reference_text: &str,
        warnings: &mut Vec<String>,
    ) {
        for clip in clips.iter_mut() {
            if !clip.directive.resynthesize {
                continue;
            }

            match self
                .patch_clip_audio(source, clip, workspace, reference_text)
                .await
            {
                Ok(patched) => clip.path = patched,
                Err(e) => {
                    warn!(
                        "Audio resynthesis failed for segment {}, keeping original audio: {}",
                        clip.index, e
                    );
                    warnings.push(format!(
                        "segment {}: resynthesis failed, original audio kept ({})",
                        clip.index, e
                    ));
                }
            }
        }
    }

    async fn patch_clip_audio(
        &self,
        source: &SourceMedia,
        clip: &Clip,
        workspace: &RunWorkspace,
        reference_text: &str,
    ) -> Result<PathBuf> {
        info!("Resynthesizing audio for segment {}", clip.index);

        let voice_bytes = self
            .synthesizer
            .synthesize(&source.audio_path, reference_text, &clip.directive.text)
            .await?;

        let voice_path = workspace.voice_path(clip.index);
        fs::write(&voice_path, &voice_bytes).await?;

        // Keep video and audio frame-aligned: stretch/trim the synthesized
        // track to the directive's visual duration when it drifts past the
        // tolerance.
        let target = clip.directive.range.duration();
        let actual = self.media.probe_duration(&voice_path).await?;
        let voice_path = if (actual - target).abs() > self.config.synthesis.duration_tolerance {
            debug!(
                "Reconciling voice duration for segment {}: {}s -> {}s",
                clip.index, actual, target
            );
            let fitted = workspace.fitted_voice_path(clip.index);
            self.media
                .fit_audio(&voice_path, target, self.config.synthesis.voice_gain, &fitted)
                .await?;
            fitted
        } else {
            voice_path
        };

        let patched = workspace.patched_clip_path(clip.index);
        self.media
            .replace_audio(&clip.path, &voice_path, &patched)
            .await?;

        Ok(patched)
    }

    /// Concatenate surviving clips in directive order and mux the final
    /// output at the source frame rate.
    async fn reassemble(
        &self,
        source: &SourceMedia,
        clips: &[Clip],
        workspace: &RunWorkspace,
        planned: usize,
        warnings: Vec<String>,
    ) -> Result<RunReport> {
        if clips.is_empty() {
            // Surface the skip reasons; otherwise the caller only learns
            // that everything failed, not why.
            let reasons = if warnings.is_empty() {
                String::new()
            } else {
                format!(" ({})", warnings.join("; "))
            };
            return Err(ScriptCutError::Reassembly(format!(
                "no valid segments{}",
                reasons
            )));
        }

        let frame_rate = self.media.probe_frame_rate(&source.path).await?;
        let output = workspace.output_path();
        let paths: Vec<PathBuf> = clips.iter().map(|clip| clip.path.clone()).collect();

        self.media.concatenate(&paths, frame_rate, &output).await?;

        Ok(RunReport {
            output,
            segments: clips.len(),
            skipped: planned - clips.len(),
            warnings,
        })
    }
}

/// Build a transcript from transcription capability output, dropping
/// zero-length words (Whisper occasionally emits them) rather than failing
/// the whole document.
pub fn transcript_from_timed(timed: Vec<TimedText>) -> Transcript {
    let lines = timed
        .into_iter()
        .filter_map(|t| match TimeRange::new(t.start, t.end) {
            Ok(range) => Some(TranscriptLine::new(range, t.text)),
            Err(e) => {
                debug!("Dropping degenerate transcription unit: {}", e);
                None
            }
        })
        .collect();

    Transcript::new(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::media::MockMediaProcessor;
    use crate::synthesis::MockVoiceSynthesizer;
    use crate::transcribe::MockTranscriber;
    use mockall::predicate;

    fn test_config(base: &Path) -> Config {
        let mut config = Config::default();
        config.workspace.base_dir = base.to_path_buf();
        config
    }

    fn write_source(dir: &Path) -> PathBuf {
        let path = dir.join("source.mp4");
        std::fs::write(&path, b"fake video").unwrap();
        path
    }

    /// Media mock with the per-run bookkeeping every test needs: source
    /// probe, audio extraction and frame rate probe.
    fn media_mock(source_duration: f64) -> MockMediaProcessor {
        let mut media = MockMediaProcessor::new();
        media
            .expect_probe_duration()
            .with(predicate::function(|p: &Path| {
                p.extension().is_some_and(|e| e == "mp4")
            }))
            .returning(move |_| Ok(source_duration));
        media.expect_extract_audio().returning(|_, _| Ok(()));
        media.expect_probe_frame_rate().returning(|_| Ok(30.0));
        media
    }

    fn pipeline(base: &Path, media: MockMediaProcessor) -> Pipeline {
        Pipeline::new(
            test_config(base),
            Box::new(media),
            Box::new(MockTranscriber::new()),
            Box::new(MockVoiceSynthesizer::new()),
        )
    }

    const THREE_LINES: &str = "\
[00:00:00.000 - 00:00:01.000] :|: a
[00:00:01.000 - 00:00:02.000] :|: b
[00:00:02.000 - 00:00:03.000] :|: c";

    #[tokio::test]
    async fn test_trim_run_produces_report_in_order() {
        let base = tempfile::tempdir().unwrap();
        let video = write_source(base.path());

        let mut media = media_mock(10.0);
        media.expect_cut_segment().times(2).returning(|_, _, _| Ok(()));
        media
            .expect_concatenate()
            .withf(|paths, rate, _| {
                paths.len() == 2
                    && paths[0].file_name().unwrap() == "clip_0.mp4"
                    && paths[1].file_name().unwrap() == "clip_1.mp4"
                    && (*rate - 30.0).abs() < f64::EPSILON
            })
            .returning(|_, _, _| Ok(()));

        let kept = "\
[00:00:00.000 - 00:00:01.000] :|: a
[00:00:02.000 - 00:00:03.000] :|: c";

        let report = pipeline(base.path(), media)
            .run_trim(&video, kept)
            .await
            .unwrap();

        assert_eq!(report.segments, 2);
        assert_eq!(report.skipped, 0);
        assert!(report.warnings.is_empty());
        assert_eq!(report.output.file_name().unwrap(), "final.mp4");
    }

    #[tokio::test]
    async fn test_empty_edit_is_nothing_to_process() {
        let base = tempfile::tempdir().unwrap();
        let video = write_source(base.path());

        let media = media_mock(10.0);
        let err = pipeline(base.path(), media)
            .run_trim(&video, "garbage line without delimiter\n")
            .await
            .unwrap_err();

        assert!(matches!(err, ScriptCutError::Reassembly(_)));
        assert!(err.to_string().contains("nothing to process"));
    }

    #[tokio::test]
    async fn test_all_segments_failing_extraction_is_fatal() {
        let base = tempfile::tempdir().unwrap();
        let video = write_source(base.path());

        let mut media = media_mock(10.0);
        media
            .expect_cut_segment()
            .returning(|_, _, _| Err(ScriptCutError::Media("cut exploded".to_string())));

        let err = pipeline(base.path(), media)
            .run_trim(&video, THREE_LINES)
            .await
            .unwrap_err();

        assert!(matches!(err, ScriptCutError::Reassembly(_)));
        assert!(err.to_string().contains("no valid segments"));
        // The per-segment failure reasons must survive into the error.
        assert!(err.to_string().contains("cut exploded"));
    }

    #[tokio::test]
    async fn test_resync_falls_back_to_original_audio_on_synthesis_failure() {
        let base = tempfile::tempdir().unwrap();
        let video = write_source(base.path());

        let mut media = media_mock(10.0);
        media.expect_cut_segment().times(3).returning(|_, _, _| Ok(()));
        // The failed segment must concatenate as its unpatched clip.
        media
            .expect_concatenate()
            .withf(|paths, _, _| {
                paths.len() == 3 && paths[1].file_name().unwrap() == "clip_1.mp4"
            })
            .returning(|_, _, _| Ok(()));

        let mut synthesizer = MockVoiceSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .times(1)
            .returning(|_, _, _| Err(ScriptCutError::SynthesisTimeout("gave up".to_string())));

        let edited = "\
[00:00:00.000 - 00:00:01.000] :|: a
[00:00:01.000 - 00:00:02.000] :|: b rewritten
[00:00:02.000 - 00:00:03.000] :|: c";

        let pipeline = Pipeline::new(
            test_config(base.path()),
            Box::new(media),
            Box::new(MockTranscriber::new()),
            Box::new(synthesizer),
        );

        let report = pipeline.run_resync(&video, THREE_LINES, edited).await.unwrap();

        assert_eq!(report.segments, 3);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("original audio kept"));
    }

    #[tokio::test]
    async fn test_resync_reconciles_voice_duration_and_patches_clip() {
        let base = tempfile::tempdir().unwrap();
        let video = write_source(base.path());

        let mut media = media_mock(10.0);
        media.expect_cut_segment().times(2).returning(|_, _, _| Ok(()));
        // Synthesized voice probes at 1.6s against a 1.0s clip, so it must
        // be fitted before muxing.
        media
            .expect_probe_duration()
            .with(predicate::function(|p: &Path| {
                p.extension().is_some_and(|e| e == "mp3")
            }))
            .returning(|_| Ok(1.6));
        media
            .expect_fit_audio()
            .withf(|audio, target, volume, fitted| {
                audio.file_name().unwrap() == "voice_1.mp3"
                    && (*target - 1.0).abs() < 1e-9
                    && (*volume - 1.5).abs() < 1e-9
                    && fitted.file_name().unwrap() == "voice_1_fitted.mp3"
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        media
            .expect_replace_audio()
            .withf(|clip, voice, patched| {
                clip.file_name().unwrap() == "clip_1.mp4"
                    && voice.file_name().unwrap() == "voice_1_fitted.mp3"
                    && patched.file_name().unwrap() == "clip_1_patched.mp4"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        media
            .expect_concatenate()
            .withf(|paths, _, _| {
                paths.len() == 2 && paths[1].file_name().unwrap() == "clip_1_patched.mp4"
            })
            .returning(|_, _, _| Ok(()));

        let mut synthesizer = MockVoiceSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .withf(|_, reference, target| reference.contains("a b") && target == "b rewritten")
            .times(1)
            .returning(|_, _, _| Ok(b"voice bytes".to_vec()));

        let original = "\
[00:00:00.000 - 00:00:01.000] :|: a
[00:00:01.000 - 00:00:02.000] :|: b";
        let edited = "\
[00:00:00.000 - 00:00:01.000] :|: a
[00:00:01.000 - 00:00:02.000] :|: b rewritten";

        let pipeline = Pipeline::new(
            test_config(base.path()),
            Box::new(media),
            Box::new(MockTranscriber::new()),
            Box::new(synthesizer),
        );

        let report = pipeline.run_resync(&video, original, edited).await.unwrap();

        assert_eq!(report.segments, 2);
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_resync_rejects_line_count_mismatch() {
        let base = tempfile::tempdir().unwrap();
        let video = write_source(base.path());

        let media = media_mock(10.0);
        let err = pipeline(base.path(), media)
            .run_resync(&video, THREE_LINES, "[00:00:00.000 - 00:00:01.000] :|: a")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("line count mismatch"));
    }

    #[tokio::test]
    async fn test_bloopers_run_extracts_complement() {
        let base = tempfile::tempdir().unwrap();
        let video = write_source(base.path());

        let mut media = media_mock(10.0);
        media
            .expect_cut_segment()
            .withf(|_, range, _| (range.start - 1.0).abs() < 1e-9 && (range.end - 2.0).abs() < 1e-9)
            .times(1)
            .returning(|_, _, _| Ok(()));
        media
            .expect_concatenate()
            .withf(|paths, _, _| paths.len() == 1)
            .returning(|_, _, _| Ok(()));

        let kept = "\
[00:00:00.000 - 00:00:01.000] :|: a
[00:00:02.000 - 00:00:03.000] :|: c";

        let report = pipeline(base.path(), media)
            .run_bloopers(&video, THREE_LINES, kept)
            .await
            .unwrap();

        assert_eq!(report.segments, 1);
    }

    #[tokio::test]
    async fn test_transcribe_video_builds_transcript() {
        let base = tempfile::tempdir().unwrap();
        let video = write_source(base.path());

        let media = media_mock(10.0);
        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().returning(|_| {
            Ok(vec![
                TimedText {
                    start: 0.0,
                    end: 0.5,
                    text: "hello".to_string(),
                },
                // Zero-length unit, dropped
                TimedText {
                    start: 0.5,
                    end: 0.5,
                    text: ",".to_string(),
                },
                TimedText {
                    start: 0.5,
                    end: 1.0,
                    text: "world".to_string(),
                },
            ])
        });

        let pipeline = Pipeline::new(
            test_config(base.path()),
            Box::new(media),
            Box::new(transcriber),
            Box::new(MockVoiceSynthesizer::new()),
        );

        let transcript = pipeline.transcribe_video(&video).await.unwrap();

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.lines[0].text, "hello");
        assert_eq!(
            transcript.lines[1].encode(),
            "[00:00:00.500 - 00:00:01.000] :|: world"
        );
    }

    #[tokio::test]
    async fn test_oversized_source_is_rejected() {
        let base = tempfile::tempdir().unwrap();
        let video = write_source(base.path());

        let mut config = test_config(base.path());
        config.workspace.max_upload_bytes = 1;

        let pipeline = Pipeline::new(
            config,
            Box::new(media_mock(10.0)),
            Box::new(MockTranscriber::new()),
            Box::new(MockVoiceSynthesizer::new()),
        );

        let err = pipeline.run_trim(&video, THREE_LINES).await.unwrap_err();
        assert!(err.to_string().contains("byte limit"));
    }
}
