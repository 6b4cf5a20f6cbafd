//! End-of-run summary and disk space accounting

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::archiver::ARCHIVE_EXTENSION;
use crate::config::{ArchiveSettings, CompressionMode};
use crate::error::{Error, Result};
use crate::pipeline::RunCounters;

/// Bytes left in the download directory versus bytes in archives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SpaceReport {
    pub raw_bytes: u64,
    pub archive_bytes: u64,
}

impl SpaceReport {
    /// Percentage saved relative to the raw size; `None` when nothing raw remains.
    pub fn savings_percent(&self) -> Option<f64> {
        if self.raw_bytes == 0 {
            return None;
        }
        let raw = self.raw_bytes as f64;
        Some((raw - self.archive_bytes as f64) / raw * 100.0)
    }

    /// Signed difference `raw - archive`.
    pub fn savings_bytes(&self) -> i128 {
        i128::from(self.raw_bytes) - i128::from(self.archive_bytes)
    }
}

impl fmt::Display for SpaceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.archive_bytes == 0 {
            return write!(f, "No archives found");
        }

        match self.savings_percent() {
            Some(percent) => {
                let saved = self.savings_bytes();
                let sign = if saved < 0 { "-" } else { "" };
                writeln!(f, "💾 SPACE SAVINGS:")?;
                writeln!(f, "Original size:   {}", format_bytes(self.raw_bytes))?;
                writeln!(f, "Compressed size: {}", format_bytes(self.archive_bytes))?;
                write!(
                    f,
                    "Saved: {}{} ({:.1}%)",
                    sign,
                    format_bytes(saved.unsigned_abs() as u64),
                    percent
                )
            }
            None => write!(
                f,
                "💾 Total compressed size: {}",
                format_bytes(self.archive_bytes)
            ),
        }
    }
}

/// Human-readable size with binary scaling and one decimal.
pub fn format_bytes(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} PB", size)
}

/// Total size of the regular files directly inside `dir`, optionally only
/// those with the given extension. A missing directory counts as empty.
pub fn directory_size(dir: &Path, extension: Option<&str>) -> Result<u64> {
    if !dir.is_dir() {
        return Ok(0);
    }

    let mut total = 0;
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| Error::IoError(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(ext) = extension {
            if entry.path().extension().and_then(|e| e.to_str()) != Some(ext) {
                continue;
            }
        }
        total += entry.metadata().map_err(|e| Error::IoError(e.into()))?.len();
    }
    Ok(total)
}

/// Measure what is left in the download area against the archive area.
pub fn measure(raw_dir: &Path, archive_dir: &Path) -> Result<SpaceReport> {
    Ok(SpaceReport {
        raw_bytes: directory_size(raw_dir, None)?,
        archive_bytes: directory_size(archive_dir, Some(ARCHIVE_EXTENSION))?,
    })
}

/// Everything printed at the end of a download run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub counters: RunCounters,
    pub mode: CompressionMode,
    pub batch_size: usize,
    pub delete_originals: bool,
    pub download_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub space: Option<SpaceReport>,
}

impl RunSummary {
    pub fn new(counters: RunCounters, settings: &ArchiveSettings) -> Self {
        Self {
            counters,
            mode: settings.mode(),
            batch_size: settings.batch_size,
            delete_originals: settings.delete_originals,
            download_dir: settings.download_dir.clone(),
            archive_dir: settings.archive_dir.clone(),
            space: None,
        }
    }

    /// Space is only worth reporting once this run produced an archive.
    pub fn should_measure_space(&self) -> bool {
        self.mode != CompressionMode::Off && self.counters.compressed > 0
    }

    pub fn with_space(mut self, space: SpaceReport) -> Self {
        self.space = Some(space);
        self
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== SUMMARY ===")?;
        writeln!(f, "Videos found: {}", self.counters.found)?;
        writeln!(f, "Videos downloaded: {}", self.counters.downloaded)?;

        match self.mode {
            CompressionMode::Off => {}
            CompressionMode::Individual | CompressionMode::Batched => {
                writeln!(f, "Archives created: {}", self.counters.compressed)?;
                if self.mode == CompressionMode::Batched {
                    writeln!(f, "Mode: batched ({} videos per archive)", self.batch_size)?;
                } else {
                    writeln!(f, "Mode: {}", self.mode)?;
                }
                writeln!(f, "Archive folder: {}", self.archive_dir.display())?;
                if self.delete_originals {
                    writeln!(f, "✓ Originals removed after archiving")?;
                }
            }
        }

        write!(f, "Download folder: {}", self.download_dir.display())?;

        if let Some(space) = &self.space {
            write!(f, "\n\n{}", space)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn format_bytes_scales_by_1024() {
        assert_eq!(format_bytes(0), "0.0 B");
        assert_eq!(format_bytes(1023), "1023.0 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
        assert_eq!(format_bytes(2 * 1024u64.pow(4)), "2.0 TB");
        assert_eq!(format_bytes(7 * 1024u64.pow(5)), "7.0 PB");
    }

    #[test]
    fn savings_percent_is_relative_to_raw_size() {
        let report = SpaceReport {
            raw_bytes: 1000,
            archive_bytes: 250,
        };
        assert_eq!(report.savings_percent(), Some(75.0));
        assert_eq!(report.savings_bytes(), 750);
    }

    #[test]
    fn savings_percent_absent_without_raw_bytes() {
        let report = SpaceReport {
            raw_bytes: 0,
            archive_bytes: 250,
        };
        assert!(report.savings_percent().is_none());
        assert!(report.to_string().contains("Total compressed size: 250.0 B"));
    }

    #[test]
    fn display_shows_negative_savings_with_sign() {
        let report = SpaceReport {
            raw_bytes: 1024,
            archive_bytes: 2048,
        };
        let text = report.to_string();
        assert!(text.contains("Saved: -1.0 KB (-100.0%)"));
    }

    #[test]
    fn display_without_archives() {
        assert_eq!(SpaceReport::default().to_string(), "No archives found");
    }

    #[test]
    fn directory_size_counts_only_top_level_files() {
        let temp = tempdir().expect("tempdir");
        std::fs::write(temp.path().join("a.mp4"), vec![0u8; 100]).unwrap();
        std::fs::write(temp.path().join("b.mkv"), vec![0u8; 50]).unwrap();
        std::fs::create_dir(temp.path().join("nested")).unwrap();
        std::fs::write(temp.path().join("nested").join("c.mp4"), vec![0u8; 999]).unwrap();

        assert_eq!(directory_size(temp.path(), None).unwrap(), 150);
    }

    #[test]
    fn directory_size_filters_by_extension() {
        let temp = tempdir().expect("tempdir");
        std::fs::write(temp.path().join("batch_1.rar"), vec![0u8; 40]).unwrap();
        std::fs::write(temp.path().join("notes.txt"), vec![0u8; 10]).unwrap();

        assert_eq!(directory_size(temp.path(), Some("rar")).unwrap(), 40);
    }

    #[test]
    fn missing_directories_measure_as_zero() {
        let temp = tempdir().expect("tempdir");
        let report = measure(&temp.path().join("raw"), &temp.path().join("rar")).unwrap();
        assert_eq!(report, SpaceReport::default());
    }

    #[test]
    fn summary_text_for_batched_run() {
        let settings = ArchiveSettings {
            individual: false,
            batch_size: 3,
            ..ArchiveSettings::default()
        };
        let counters = RunCounters {
            found: 7,
            downloaded: 7,
            compressed: 3,
        };
        let summary = RunSummary::new(counters, &settings);
        assert!(summary.should_measure_space());

        let text = summary.to_string();
        assert!(text.contains("Videos found: 7"));
        assert!(text.contains("Archives created: 3"));
        assert!(text.contains("batched (3 videos per archive)"));
        assert!(text.contains("Originals removed"));
    }

    #[test]
    fn summary_for_download_only_run_skips_archive_lines() {
        let settings = ArchiveSettings::default().without_compression();
        let summary = RunSummary::new(RunCounters::default(), &settings);

        assert!(!summary.should_measure_space());
        let text = summary.to_string();
        assert!(!text.contains("Archives created"));
        assert!(text.contains("Download folder"));
    }

    #[test]
    fn summary_serializes_to_json() {
        let summary = RunSummary::new(
            RunCounters {
                found: 2,
                downloaded: 1,
                compressed: 1,
            },
            &ArchiveSettings::default(),
        )
        .with_space(SpaceReport {
            raw_bytes: 0,
            archive_bytes: 10,
        });

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["counters"]["found"], 2);
        assert_eq!(json["mode"], "individual");
        assert_eq!(json["space"]["archive_bytes"], 10);
    }
}
