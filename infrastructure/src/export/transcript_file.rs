//! Transcript export to `context_<YYYYmmdd_HHMMSS>.json` files.

use chrono::Local;
use panel_application::{ExportError, TranscriptSink, render_transcript};
use panel_domain::TranscriptEntry;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PREFIX: &str = "context_";
const SUFFIX: &str = ".json";

pub struct FileTranscriptSink {
    directory: PathBuf,
    /// Newest exports kept after each write; 0 keeps everything
    keep: usize,
}

impl FileTranscriptSink {
    pub fn new(directory: impl Into<PathBuf>, keep: usize) -> Self {
        Self {
            directory: directory.into(),
            keep,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// A free file name for this second; `_2`, `_3`, ... on collision.
    fn target_path(&self) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let first = self.directory.join(format!("{PREFIX}{stamp}{SUFFIX}"));
        if !first.exists() {
            return first;
        }
        (2..)
            .map(|n| self.directory.join(format!("{PREFIX}{stamp}_{n}{SUFFIX}")))
            .find(|path| !path.exists())
            .unwrap_or(first)
    }

    /// Existing exports, oldest first.
    fn exports(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.directory)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(PREFIX) && n.ends_with(SUFFIX))
            })
            .collect();
        paths.sort_by_cached_key(|path| {
            fs::metadata(path)
                .and_then(|m| m.modified())
                .ok()
                .map(|modified| (modified, path.clone()))
        });
        Ok(paths)
    }

    fn prune(&self) {
        if self.keep == 0 {
            return;
        }
        let exports = match self.exports() {
            Ok(exports) => exports,
            Err(e) => {
                warn!("Could not list transcript exports: {}", e);
                return;
            }
        };
        let excess = exports.len().saturating_sub(self.keep);
        for path in exports.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed old transcript {}", path.display()),
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }
    }
}

impl TranscriptSink for FileTranscriptSink {
    fn export(&self, transcript: &[TranscriptEntry]) -> Result<String, ExportError> {
        fs::create_dir_all(&self.directory)?;
        let json = render_transcript(transcript)?;
        let path = self.target_path();
        fs::write(&path, json)?;
        self.prune();
        Ok(path.display().to_string())
    }
}
