//! Video classification and file naming

use std::path::{Path, PathBuf};

use crate::source::DiscoveredMessage;

pub const VIDEO_MIME_PREFIX: &str = "video/";
pub const FILE_PREFIX: &str = "video";
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mov", "mkv"];
pub const DEFAULT_EXTENSION: &str = "mp4";

/// A message that carries a video, with its on-disk name resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRecord {
    /// 1-based position among the videos seen this run.
    pub sequence: u64,
    pub message_id: i64,
    pub file_name: String,
    pub extension: String,
    /// Destination inside the download directory.
    pub path: PathBuf,
}

impl VideoRecord {
    /// File name without extension; also names the per-video archive.
    pub fn base_name(&self) -> String {
        format!("{}_{}_{}", FILE_PREFIX, self.message_id, self.sequence)
    }
}

/// Extension for a video content type: the subtype if it is one we know,
/// `mp4` otherwise.
pub fn resolve_extension(mime_type: &str) -> &'static str {
    let subtype = mime_type.rsplit('/').next().unwrap_or_default();
    ALLOWED_EXTENSIONS
        .iter()
        .copied()
        .find(|ext| *ext == subtype)
        .unwrap_or(DEFAULT_EXTENSION)
}

/// Classify a message. Returns `None` (and leaves `video_count` untouched)
/// for anything that is not a video; otherwise bumps the counter and names
/// the file after the message id and the new count.
pub fn classify<M: DiscoveredMessage>(
    message: &M,
    video_count: &mut u64,
    download_dir: &Path,
) -> Option<VideoRecord> {
    let mime_type = message.mime_type()?;
    if !mime_type.starts_with(VIDEO_MIME_PREFIX) {
        return None;
    }

    *video_count += 1;
    let extension = resolve_extension(&mime_type).to_string();
    let file_name = format!(
        "{}_{}_{}.{}",
        FILE_PREFIX,
        message.id(),
        video_count,
        extension
    );

    Some(VideoRecord {
        sequence: *video_count,
        message_id: message.id(),
        path: download_dir.join(&file_name),
        file_name,
        extension,
    })
}
