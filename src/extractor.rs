use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::error::{Result, ScriptCutError};
use crate::media::MediaProcessor;
use crate::planner::EditDirective;
use crate::workspace::RunWorkspace;

/// An immutable reference to an uploaded source file, its probed duration
/// and its extracted audio track. Read-only for the duration of a run.
#[derive(Debug, Clone)]
pub struct SourceMedia {
    pub path: PathBuf,
    pub duration: f64,
    pub audio_path: PathBuf,
}

/// One intermediate clip, tied to exactly one directive. `path` points at
/// the clip currently carrying this segment's content; audio replacement
/// swaps it for the patched file.
#[derive(Debug, Clone)]
pub struct Clip {
    pub index: usize,
    pub path: PathBuf,
    pub directive: EditDirective,
}

/// Cuts one clip per directive out of the source media, in directive
/// order, into the run workspace.
pub struct SegmentExtractor<'a> {
    media: &'a dyn MediaProcessor,
}

impl<'a> SegmentExtractor<'a> {
    pub fn new(media: &'a dyn MediaProcessor) -> Self {
        Self { media }
    }

    /// Extract clips for all directives. The clips directory is cleared
    /// first so no stale ordinal-named file can leak into this run.
    ///
    /// Failure policy: a directive whose range is degenerate or outside
    /// the source is rejected with `InvalidRange` before the cut capability
    /// is ever invoked; an external cut failure is logged. Either way the
    /// directive is skipped with a warning and the run continues.
    pub async fn extract(
        &self,
        source: &SourceMedia,
        directives: &[EditDirective],
        workspace: &RunWorkspace,
    ) -> Result<(Vec<Clip>, Vec<String>)> {
        workspace.clear_clips()?;

        let mut clips = Vec::with_capacity(directives.len());
        let mut warnings = Vec::new();

        let progress = ProgressBar::new(directives.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress.set_message("Extracting segments");

        for (index, directive) in directives.iter().enumerate() {
            match self.extract_one(source, directive, index, workspace).await {
                Ok(clip) => clips.push(clip),
                Err(e) => {
                    warn!("Skipping segment {}: {}", index, e);
                    warnings.push(format!("segment {}: {}", index, e));
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        Ok((clips, warnings))
    }

    async fn extract_one(
        &self,
        source: &SourceMedia,
        directive: &EditDirective,
        index: usize,
        workspace: &RunWorkspace,
    ) -> Result<Clip> {
        let range = directive.range;

        // Range sanity comes before the external cut.
        if range.duration() <= 0.0 {
            return Err(ScriptCutError::InvalidRange(format!(
                "non-positive duration for [{} - {})",
                range.start, range.end
            )));
        }
        // Half a frame of slack for container duration rounding.
        if range.end > source.duration + 0.02 {
            return Err(ScriptCutError::InvalidRange(format!(
                "range [{} - {}) exceeds source duration {}",
                range.start, range.end, source.duration
            )));
        }

        let clip_path = workspace.clip_path(index);
        debug!(
            "Extracting segment {} [{} - {}) -> {}",
            index,
            range.start,
            range.end,
            clip_path.display()
        );

        self.media
            .cut_segment(&source.path, range, &clip_path)
            .await
            .map_err(|e| ScriptCutError::Extraction(e.to_string()))?;

        Ok(Clip {
            index,
            path: clip_path,
            directive: directive.clone(),
        })
    }
}
