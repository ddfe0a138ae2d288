use chrono::{Duration, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::Result;

/// Per-run scratch directory holding intermediate clips and synthesized
/// voice assets. Each run gets its own uuid-named directory under the
/// configured base, so concurrent runs never collide on ordinal-named
/// files. The tree is removed on drop unless [`RunWorkspace::keep`] was
/// called.
pub struct RunWorkspace {
    root: PathBuf,
    keep: bool,
}

impl RunWorkspace {
    pub fn create<P: AsRef<Path>>(base: P) -> Result<Self> {
        let root = base.as_ref().join(Uuid::new_v4().to_string());
        std::fs::create_dir_all(root.join("clips"))?;
        std::fs::create_dir_all(root.join("voices"))?;

        debug!("Created run workspace at {}", root.display());
        Ok(Self { root, keep: false })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn clips_dir(&self) -> PathBuf {
        self.root.join("clips")
    }

    pub fn voices_dir(&self) -> PathBuf {
        self.root.join("voices")
    }

    /// Clip file for a directive ordinal
    pub fn clip_path(&self, index: usize) -> PathBuf {
        self.clips_dir().join(format!("clip_{}.mp4", index))
    }

    /// Patched clip (audio replaced) for a directive ordinal
    pub fn patched_clip_path(&self, index: usize) -> PathBuf {
        self.clips_dir().join(format!("clip_{}_patched.mp4", index))
    }

    /// Raw synthesized voice for a directive ordinal
    pub fn voice_path(&self, index: usize) -> PathBuf {
        self.voices_dir().join(format!("voice_{}.mp3", index))
    }

    /// Duration-fitted voice for a directive ordinal
    pub fn fitted_voice_path(&self, index: usize) -> PathBuf {
        self.voices_dir().join(format!("voice_{}_fitted.mp3", index))
    }

    /// Extracted source audio track
    pub fn audio_path(&self) -> PathBuf {
        self.root.join("audio.wav")
    }

    /// Final muxed output
    pub fn output_path(&self) -> PathBuf {
        self.root.join("final.mp4")
    }

    /// Remove any stale clip files so ordinals from an aborted earlier pass
    /// can never leak into this run's concatenation.
    pub fn clear_clips(&self) -> Result<()> {
        let clips = self.clips_dir();
        if clips.exists() {
            std::fs::remove_dir_all(&clips)?;
        }
        std::fs::create_dir_all(&clips)?;
        Ok(())
    }

    /// Keep the workspace on disk after the run (the final output lives
    /// inside it).
    pub fn keep(&mut self) {
        self.keep = true;
    }

    /// Explicit teardown; also happens on drop.
    pub fn close(mut self) -> Result<()> {
        self.keep = true; // disarm the drop handler
        std::fs::remove_dir_all(&self.root)?;
        Ok(())
    }
}

impl Drop for RunWorkspace {
    fn drop(&mut self) {
        if !self.keep && self.root.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.root) {
                warn!("Failed to remove workspace {}: {}", self.root.display(), e);
            }
        }
    }
}

/// Remove run workspaces older than `max_age_hours`. Returns the number of
/// workspaces removed.
pub fn sweep<P: AsRef<Path>>(base: P, max_age_hours: u64) -> Result<usize> {
    let base = base.as_ref();
    if !base.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now() - Duration::hours(max_age_hours as i64);
    let mut removed = 0;

    for entry in WalkDir::new(base)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_dir() {
            continue;
        }
        let modified = match entry.metadata().ok().and_then(|m| m.modified().ok()) {
            Some(time) => chrono::DateTime::<Utc>::from(time),
            None => {
                warn!("Skipping {}: no modification time", entry.path().display());
                continue;
            }
        };

        if modified < cutoff {
            match std::fs::remove_dir_all(entry.path()) {
                Ok(_) => {
                    info!("Swept stale workspace {}", entry.path().display());
                    removed += 1;
                }
                Err(e) => warn!("Failed to sweep {}: {}", entry.path().display(), e),
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_layout() {
        let base = tempfile::tempdir().unwrap();
        let ws = RunWorkspace::create(base.path()).unwrap();

        assert!(ws.clips_dir().is_dir());
        assert!(ws.voices_dir().is_dir());
        assert_eq!(ws.clip_path(3).file_name().unwrap(), "clip_3.mp4");
        assert_eq!(ws.voice_path(3).file_name().unwrap(), "voice_3.mp3");
    }

    #[test]
    fn test_workspace_removed_on_drop() {
        let base = tempfile::tempdir().unwrap();
        let root = {
            let ws = RunWorkspace::create(base.path()).unwrap();
            ws.root().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[test]
    fn test_keep_preserves_workspace() {
        let base = tempfile::tempdir().unwrap();
        let root = {
            let mut ws = RunWorkspace::create(base.path()).unwrap();
            ws.keep();
            ws.root().to_path_buf()
        };
        assert!(root.exists());
    }

    #[test]
    fn test_clear_clips_removes_stale_files() {
        let base = tempfile::tempdir().unwrap();
        let ws = RunWorkspace::create(base.path()).unwrap();

        std::fs::write(ws.clip_path(0), b"stale").unwrap();
        ws.clear_clips().unwrap();

        assert!(ws.clips_dir().is_dir());
        assert!(!ws.clip_path(0).exists());
    }

    #[test]
    fn test_sweep_ignores_fresh_workspaces() {
        let base = tempfile::tempdir().unwrap();
        let mut ws = RunWorkspace::create(base.path()).unwrap();
        ws.keep();

        let removed = sweep(base.path(), 1).unwrap();
        assert_eq!(removed, 0);
        assert!(ws.root().exists());
    }
}
