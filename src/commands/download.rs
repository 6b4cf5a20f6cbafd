//! Download every video of a group, archiving as configured.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::archiver::{Archiver, RarArchiver};
use crate::config::{ArchiveSettings, CompressionMode, Config};
use crate::error::{Error, Result};
use crate::group::{peer_name, resolve_group, GroupRef};
use crate::pipeline::{Pipeline, RunCounters};
use crate::report::{self, RunSummary};
use crate::session::{self, SessionLock, TelegramClient};
use crate::source::TelegramSource;

/// CLI overrides applied on top of config.yml before the run starts.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub compression: Option<bool>,
    pub individual: Option<bool>,
    pub batch_size: Option<usize>,
    pub keep_originals: bool,
    pub level: Option<u8>,
    pub archiver_path: Option<PathBuf>,
    pub download_dir: Option<PathBuf>,
    pub archive_dir: Option<PathBuf>,
    pub delay_ms: Option<u64>,
}

impl SettingsOverrides {
    pub fn apply(&self, mut settings: ArchiveSettings) -> ArchiveSettings {
        if let Some(compression) = self.compression {
            settings.compression = compression;
        }
        if let Some(individual) = self.individual {
            settings.individual = individual;
        }
        if let Some(batch_size) = self.batch_size {
            settings.batch_size = batch_size;
        }
        if self.keep_originals {
            settings.delete_originals = false;
        }
        if let Some(level) = self.level {
            settings.level = level;
        }
        if let Some(path) = &self.archiver_path {
            settings.archiver_path = Some(path.clone());
        }
        if let Some(dir) = &self.download_dir {
            settings.download_dir = dir.clone();
        }
        if let Some(dir) = &self.archive_dir {
            settings.archive_dir = dir.clone();
        }
        if let Some(ms) = self.delay_ms {
            settings.download_delay = Duration::from_millis(ms);
        }
        settings
    }
}

/// How the end-of-run summary is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryFormat {
    #[default]
    Text,
    Json,
}

impl SummaryFormat {
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "text" => Ok(SummaryFormat::Text),
            "json" => Ok(SummaryFormat::Json),
            other => Err(Error::InvalidArgument(format!(
                "unknown summary format '{}', expected text or json",
                other
            ))),
        }
    }

    pub fn render(&self, summary: &RunSummary) -> Result<String> {
        match self {
            SummaryFormat::Text => Ok(summary.to_string()),
            SummaryFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DownloadArgs {
    /// Group link or handle; falls back to the configured one.
    pub group: Option<String>,
    pub overrides: SettingsOverrides,
    /// Skip the interactive compression question.
    pub assume_yes: bool,
}

/// Answer to "use compression? (Y/n)": anything but an explicit no is yes.
pub fn parse_compression_answer(input: &str) -> bool {
    !matches!(input.trim().to_lowercase().as_str(), "n" | "no")
}

fn ask_compression() -> Result<bool> {
    println!("🗜️  Use automatic compression with the RAR archiver?");
    println!("   Saves a lot of space but needs rar/WinRAR installed.");
    print!("   (Y/n): ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(parse_compression_answer(&input))
}

/// The operator is asked about compression unless `--yes` or an explicit
/// `--compress`/`--no-compress` settled it. The configured value is only
/// the default answer.
pub fn needs_compression_prompt(args: &DownloadArgs) -> bool {
    args.overrides.compression.is_none() && !args.assume_yes
}

/// Settings for this run: config, then CLI overrides, then the prompt.
pub fn resolve_settings(config: &Config, args: &DownloadArgs) -> Result<ArchiveSettings> {
    let mut settings = args.overrides.apply(config.archive.clone());

    if needs_compression_prompt(args) {
        settings.compression = ask_compression()?;
    }

    settings.validate()?;
    Ok(settings)
}

/// Locate the archiver when compression is on. A missing archiver turns
/// compression off for the run instead of failing it.
pub fn prepare_archiver(settings: ArchiveSettings) -> (ArchiveSettings, Option<RarArchiver>) {
    if !settings.compression {
        return (settings, None);
    }

    match RarArchiver::locate(settings.archiver_path.as_deref(), settings.level) {
        Ok(archiver) => (settings, Some(archiver)),
        Err(err) => {
            warn!("⚠️ {}", err);
            warn!("Continuing without compression...");
            (settings.without_compression(), None)
        }
    }
}

fn print_banner(settings: &ArchiveSettings, archiver: Option<&RarArchiver>) {
    match settings.mode() {
        CompressionMode::Off => println!("📁 Download only (no compression)"),
        mode => {
            println!("🗜️  Automatic compression ENABLED");
            println!("   Compression level: {}/5", settings.level);
            match mode {
                CompressionMode::Batched => {
                    println!("   Mode: batches ({} videos per archive)", settings.batch_size)
                }
                _ => println!("   Mode: {}", mode),
            }
            println!(
                "   Delete originals: {}",
                if settings.delete_originals { "yes" } else { "no" }
            );
            if let Some(archiver) = archiver {
                println!("   Archiver: {}", archiver.executable().display());
            }
        }
    }
}

async fn download_group(
    client: &TelegramClient,
    group: &GroupRef,
    settings: &ArchiveSettings,
    archiver: Option<&RarArchiver>,
) -> Result<RunCounters> {
    let peer = resolve_group(client, group).await?;
    info!(title = %peer_name(&peer), "Group found");

    let mut source = TelegramSource::new(client, &peer);
    let pipeline = Pipeline::new(settings, archiver.map(|a| a as &dyn Archiver));
    pipeline.run(&mut source).await
}

/// Run a full download over the configured (or given) group.
pub async fn run(config: &Config, args: DownloadArgs) -> Result<RunSummary> {
    let reference = args
        .group
        .clone()
        .unwrap_or_else(|| config.group_url.clone());
    let group = GroupRef::parse(&reference)?;

    let settings = resolve_settings(config, &args)?;
    let (settings, archiver) = prepare_archiver(settings);
    print_banner(&settings, archiver.as_ref());

    let _lock = SessionLock::acquire(&config.lock_file)?;
    let client = session::get_client(config).await?;

    info!("Starting video download...");
    let result = download_group(&client, &group, &settings, archiver.as_ref()).await;
    client.disconnect().await;

    let mut summary = RunSummary::new(result?, &settings);
    if summary.should_measure_space() {
        match report::measure(&settings.download_dir, &settings.archive_dir) {
            Ok(space) => summary = summary.with_space(space),
            Err(err) => warn!("Failed to measure space savings: {}", err),
        }
    }

    Ok(summary)
}
