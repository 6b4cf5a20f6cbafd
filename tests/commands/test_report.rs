//! Tests for report command

use telegram_video_archiver::commands::report_run;
use telegram_video_archiver::ArchiveSettings;

#[test]
fn test_report_on_missing_folders_is_empty() {
    let temp = tempfile::tempdir().expect("tempdir");
    let settings = ArchiveSettings {
        download_dir: temp.path().join("nothing"),
        archive_dir: temp.path().join("nothing_either"),
        ..ArchiveSettings::default()
    };

    let space = report_run(&settings).unwrap();
    assert_eq!(space.raw_bytes, 0);
    assert_eq!(space.archive_bytes, 0);
    assert_eq!(space.to_string(), "No archives found");
}

#[test]
fn test_report_ignores_non_archive_files() {
    let temp = tempfile::tempdir().expect("tempdir");
    let settings = ArchiveSettings {
        download_dir: temp.path().join("raw"),
        archive_dir: temp.path().join("rar"),
        ..ArchiveSettings::default()
    };
    std::fs::create_dir_all(&settings.archive_dir).unwrap();
    std::fs::write(settings.archive_dir.join("video_1_1.rar"), vec![0u8; 64]).unwrap();
    std::fs::write(settings.archive_dir.join("rar.log"), vec![0u8; 999]).unwrap();

    let space = report_run(&settings).unwrap();
    assert_eq!(space.archive_bytes, 64);
    assert!(space.to_string().contains("Total compressed size"));
}
