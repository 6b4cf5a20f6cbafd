//! Tests for download command

use std::time::Duration;

use telegram_video_archiver::commands::download::{
    parse_compression_answer, prepare_archiver, resolve_settings,
};
use telegram_video_archiver::commands::{DownloadArgs, SettingsOverrides, SummaryFormat};
use telegram_video_archiver::{ArchiveSettings, CompressionMode, Config, RunCounters, RunSummary};

fn config_with(archive: ArchiveSettings) -> Config {
    let mut config = Config::default();
    config.archive = archive;
    config
}

#[test]
fn test_download_answer_yes_by_default() {
    assert!(parse_compression_answer(""));
    assert!(parse_compression_answer("y"));
    assert!(parse_compression_answer("yes\n"));
}

#[test]
fn test_download_answer_no() {
    assert!(!parse_compression_answer("n"));
    assert!(!parse_compression_answer("NO"));
}

#[test]
fn test_download_batch_overrides() {
    let config = config_with(ArchiveSettings::default());
    let args = DownloadArgs {
        assume_yes: true,
        overrides: SettingsOverrides {
            individual: Some(false),
            batch_size: Some(4),
            level: Some(3),
            delay_ms: Some(250),
            ..SettingsOverrides::default()
        },
        ..DownloadArgs::default()
    };

    let settings = resolve_settings(&config, &args).unwrap();
    assert_eq!(settings.mode(), CompressionMode::Batched);
    assert_eq!(settings.batch_size, 4);
    assert_eq!(settings.level, 3);
    assert_eq!(settings.download_delay, Duration::from_millis(250));
    assert!(settings.delete_originals);
}

#[test]
fn test_download_rejects_out_of_range_level() {
    let config = config_with(ArchiveSettings::default());
    let args = DownloadArgs {
        assume_yes: true,
        overrides: SettingsOverrides {
            level: Some(9),
            ..SettingsOverrides::default()
        },
        ..DownloadArgs::default()
    };

    assert!(resolve_settings(&config, &args).is_err());
}

#[test]
fn test_download_only_needs_no_archiver() {
    let settings = ArchiveSettings::default().without_compression();
    let (settings, archiver) = prepare_archiver(settings);
    assert!(archiver.is_none());
    assert_eq!(settings.mode(), CompressionMode::Off);
}

#[test]
fn test_download_summary_json() {
    let summary = RunSummary::new(
        RunCounters {
            found: 7,
            downloaded: 7,
            compressed: 3,
        },
        &ArchiveSettings {
            individual: false,
            batch_size: 3,
            ..ArchiveSettings::default()
        },
    );

    let json = SummaryFormat::Json.render(&summary).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["counters"]["compressed"], 3);
    assert_eq!(value["mode"], "batched");
    assert_eq!(value["batch_size"], 3);
    assert!(value["space"].is_null());
}

#[tokio::test]
async fn test_download_rejects_empty_group_before_connecting() {
    let mut config = config_with(ArchiveSettings::default());
    config.group_url = String::new();
    let args = DownloadArgs {
        group: Some("   ".to_string()),
        assume_yes: true,
        ..DownloadArgs::default()
    };

    let result = telegram_video_archiver::commands::download_run(&config, args).await;
    assert!(matches!(
        result,
        Err(telegram_video_archiver::Error::InvalidGroupReference(_))
    ));
}
