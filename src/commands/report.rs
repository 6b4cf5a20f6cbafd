//! Standalone space-savings report over the configured folders.

use crate::config::ArchiveSettings;
use crate::error::Result;
use crate::report::{self, SpaceReport};

pub fn run(settings: &ArchiveSettings) -> Result<SpaceReport> {
    let space = report::measure(&settings.download_dir, &settings.archive_dir)?;
    tracing::info!(
        raw_bytes = space.raw_bytes,
        archive_bytes = space.archive_bytes,
        "Measured folders"
    );
    Ok(space)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_configured_folders() {
        let temp = tempfile::tempdir().expect("tempdir");
        let settings = ArchiveSettings {
            download_dir: temp.path().join("raw"),
            archive_dir: temp.path().join("rar"),
            ..ArchiveSettings::default()
        };
        std::fs::create_dir_all(&settings.download_dir).unwrap();
        std::fs::create_dir_all(&settings.archive_dir).unwrap();
        std::fs::write(settings.download_dir.join("video_1_1.mp4"), vec![0u8; 300]).unwrap();
        std::fs::write(settings.archive_dir.join("batch_1.rar"), vec![0u8; 100]).unwrap();

        let space = run(&settings).unwrap();
        assert_eq!(space.raw_bytes, 300);
        assert_eq!(space.archive_bytes, 100);
        assert_eq!(space.savings_percent().map(|p| p.round()), Some(67.0));
    }
}
