//! Download, dedupe and archive pipeline.
//!
//! Messages are pulled one at a time from a [`MessageSource`]. Each video
//! is classified, checked against what earlier runs left on disk,
//! downloaded, and then either archived on its own or parked in the batch
//! buffer until `batch_size` files are waiting. Whatever is still buffered
//! when the stream ends goes into one final archive.
//!
//! Originals are only ever deleted after the archiver reported success.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::archiver::{Archiver, ARCHIVE_EXTENSION};
use crate::config::{ArchiveSettings, CompressionMode};
use crate::dedupe::{self, SkipDecision};
use crate::error::Result;
use crate::media::{self, VideoRecord};
use crate::metrics;
use crate::source::MessageSource;

pub const BATCH_PREFIX: &str = "batch";
pub const FINAL_BATCH_PREFIX: &str = "batch_final";
pub const PARTIAL_SUFFIX: &str = ".part";

/// Per-run tallies for the summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    /// Video messages seen.
    pub found: u64,
    /// Videos downloaded, plus those already satisfied by an earlier run.
    pub downloaded: u64,
    /// Archives created.
    pub compressed: u64,
}

/// Raw files waiting to be archived together.
#[derive(Debug)]
pub struct BatchBuffer {
    files: Vec<PathBuf>,
    capacity: usize,
}

impl BatchBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            files: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append a file; returns `true` once the buffer is full.
    pub fn push(&mut self, file: PathBuf) -> bool {
        self.files.push(file);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.files.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Drain the buffer.
    pub fn take(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.files)
    }
}

/// Where a download is written before it is renamed into place.
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Download into a `.part` file and rename on success, so an interrupted
/// download never looks like a finished one to the next run.
async fn download_to<S: MessageSource>(
    source: &S,
    message: &S::Message,
    dest: &Path,
) -> Result<()> {
    let partial = partial_path(dest);
    if let Err(err) = source.download(message, &partial).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(err);
    }
    tokio::fs::rename(&partial, dest).await?;
    Ok(())
}

async fn remove_original(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(err) => {
            warn!(file = %path.display(), "Failed to remove original: {}", err);
            false
        }
    }
}

/// One download run over one group.
pub struct Pipeline<'a> {
    settings: &'a ArchiveSettings,
    archiver: Option<&'a dyn Archiver>,
    mode: CompressionMode,
    buffer: BatchBuffer,
    counters: RunCounters,
}

impl<'a> Pipeline<'a> {
    /// Without an archiver the run is download-only, whatever the settings say.
    pub fn new(settings: &'a ArchiveSettings, archiver: Option<&'a dyn Archiver>) -> Self {
        let mode = match archiver {
            Some(_) => settings.mode(),
            None => CompressionMode::Off,
        };

        Self {
            settings,
            archiver,
            mode,
            buffer: BatchBuffer::new(settings.batch_size),
            counters: RunCounters::default(),
        }
    }

    pub fn mode(&self) -> CompressionMode {
        self.mode
    }

    /// Consume the whole message stream.
    pub async fn run<S: MessageSource>(mut self, source: &mut S) -> Result<RunCounters> {
        tokio::fs::create_dir_all(&self.settings.download_dir).await?;
        if self.mode != CompressionMode::Off {
            tokio::fs::create_dir_all(&self.settings.archive_dir).await?;
        }

        info!(mode = %self.mode, "Scanning group messages...");

        while let Some(message) = source.next_message().await? {
            let Some(record) = media::classify(
                &message,
                &mut self.counters.found,
                &self.settings.download_dir,
            ) else {
                continue;
            };
            metrics::record_video_found();

            match dedupe::check(&record, self.mode, &self.settings.archive_dir) {
                SkipDecision::Proceed => self.download_and_archive(&*source, &message, record).await,
                SkipDecision::AlreadyArchived(archive) => {
                    info!(archive = %archive.display(), "Already archived, skipping");
                    self.mark_satisfied();
                }
                SkipDecision::AlreadyDownloaded { rebuffer } => {
                    info!(file = %record.file_name, "Already downloaded, skipping");
                    self.mark_satisfied();
                    if rebuffer {
                        self.buffer_file(record.path).await;
                    }
                }
            }
        }

        if !self.buffer.is_empty() {
            self.flush_batch(FINAL_BATCH_PREFIX).await;
        }

        Ok(self.counters)
    }

    fn mark_satisfied(&mut self) {
        self.counters.downloaded += 1;
        metrics::record_video_downloaded(true);
    }

    async fn download_and_archive<S: MessageSource>(
        &mut self,
        source: &S,
        message: &S::Message,
        record: VideoRecord,
    ) {
        info!(
            video = record.sequence,
            file = %record.file_name,
            "Downloading video"
        );

        if let Err(err) = download_to(source, message, &record.path).await {
            error!(file = %record.file_name, "✗ Download failed: {}", err);
            metrics::record_download_failure();
            return;
        }

        self.counters.downloaded += 1;
        metrics::record_video_downloaded(false);
        info!(file = %record.file_name, "✓ Download complete");

        match self.mode {
            CompressionMode::Individual => self.archive_individually(&record.path).await,
            CompressionMode::Batched => self.buffer_file(record.path).await,
            CompressionMode::Off => {}
        }

        // Keep request rate under the platform's limits
        if !self.settings.download_delay.is_zero() {
            tokio::time::sleep(self.settings.download_delay).await;
        }
    }

    async fn archive_individually(&mut self, file: &Path) {
        let Some(archiver) = self.archiver else {
            return;
        };

        let ok = archiver
            .compress_one(file, &self.settings.archive_dir)
            .await;
        metrics::record_archive("individual", ok);

        if !ok {
            warn!(file = %file.display(), "Archive failed, original kept");
            return;
        }

        self.counters.compressed += 1;
        if self.settings.delete_originals && remove_original(file).await {
            metrics::record_originals_deleted(1);
            info!(file = %file.display(), "  → Original removed");
        }
    }

    async fn buffer_file(&mut self, file: PathBuf) {
        if self.buffer.push(file) {
            self.flush_batch(BATCH_PREFIX).await;
        }
    }

    /// Archive everything buffered. The buffer is emptied whatever the
    /// outcome; on failure the raw files stay on disk and a later run
    /// buffers them again.
    async fn flush_batch(&mut self, prefix: &'static str) {
        let files = self.buffer.take();
        let Some(archiver) = self.archiver else {
            return;
        };
        if files.is_empty() {
            return;
        }

        let name = format!(
            "{}_{}.{}",
            prefix,
            self.counters.compressed + 1,
            ARCHIVE_EXTENSION
        );
        let output = self.settings.archive_dir.join(name);

        let ok = archiver.compress_batch(&files, &output).await;
        let kind = if prefix == FINAL_BATCH_PREFIX {
            "final_batch"
        } else {
            "batch"
        };
        metrics::record_archive(kind, ok);

        if !ok {
            warn!(
                archive = %output.display(),
                count = files.len(),
                "Batch archive failed, originals kept"
            );
            return;
        }

        self.counters.compressed += 1;
        if self.settings.delete_originals {
            let mut removed = 0;
            for file in &files {
                if remove_original(file).await {
                    removed += 1;
                }
            }
            metrics::record_originals_deleted(removed);
            info!(count = removed, "  → Originals removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_buffer_reports_full_at_capacity() {
        let mut buffer = BatchBuffer::new(2);
        assert!(buffer.is_empty());
        assert!(!buffer.push(PathBuf::from("a.mp4")));
        assert!(buffer.push(PathBuf::from("b.mp4")));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.files()[0], PathBuf::from("a.mp4"));
    }

    #[test]
    fn batch_buffer_take_empties_it() {
        let mut buffer = BatchBuffer::new(3);
        buffer.push(PathBuf::from("a.mp4"));
        buffer.push(PathBuf::from("b.mp4"));

        let files = buffer.take();
        assert_eq!(files.len(), 2);
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
    }

    #[test]
    fn zero_capacity_behaves_like_one() {
        let mut buffer = BatchBuffer::new(0);
        assert!(buffer.push(PathBuf::from("a.mp4")));
    }

    #[test]
    fn huge_capacity_does_not_allocate_up_front() {
        let mut buffer = BatchBuffer::new(usize::MAX);
        assert!(!buffer.push(PathBuf::from("a.mp4")));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("raw/video_1_1.mp4")),
            PathBuf::from("raw/video_1_1.mp4.part")
        );
    }

    #[test]
    fn pipeline_without_archiver_is_download_only() {
        let settings = ArchiveSettings::default();
        let pipeline = Pipeline::new(&settings, None);
        assert_eq!(pipeline.mode(), CompressionMode::Off);
    }
}
