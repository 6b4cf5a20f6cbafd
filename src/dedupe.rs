//! Decides whether a classified video was already handled by an earlier run.

use std::path::{Path, PathBuf};

use crate::archiver::archive_path_for;
use crate::config::CompressionMode;
use crate::media::VideoRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipDecision {
    /// Not seen before: download it.
    Proceed,
    /// Its per-video archive already exists.
    AlreadyArchived(PathBuf),
    /// The raw file is already in the download directory. `rebuffer` is set
    /// in batched mode, where the file still has to go into a batch.
    AlreadyDownloaded { rebuffer: bool },
}

impl SkipDecision {
    pub fn should_skip(&self) -> bool {
        !matches!(self, SkipDecision::Proceed)
    }
}

/// Existence checks only; nothing is read or written.
///
/// Individual mode trusts the archive alone, so a stale raw file left next
/// to it does not matter. Batched and download-only modes have no per-video
/// archive name and trust the raw file instead.
pub fn check(record: &VideoRecord, mode: CompressionMode, archive_dir: &Path) -> SkipDecision {
    match mode {
        CompressionMode::Individual => {
            let archive = archive_path_for(&record.path, archive_dir);
            if archive.exists() {
                SkipDecision::AlreadyArchived(archive)
            } else {
                SkipDecision::Proceed
            }
        }
        CompressionMode::Batched | CompressionMode::Off => {
            if record.path.exists() {
                SkipDecision::AlreadyDownloaded {
                    rebuffer: mode == CompressionMode::Batched,
                }
            } else {
                SkipDecision::Proceed
            }
        }
    }
}
