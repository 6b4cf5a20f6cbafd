//! Telegram Video Archiver CLI - main entry point

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use telegram_video_archiver::{commands, metrics, Config};
use tracing::{error, warn};

#[derive(Parser)]
#[command(name = "telegram_video_archiver")]
#[command(about = "Download videos from a Telegram group and archive them to save space", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config.yml (default: ./config.yml, then ../config.yml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download every video in a group and archive it
    Download {
        /// Group link (https://t.me/c/<id>/..., https://t.me/<handle>) or @handle.
        /// Falls back to group.url from config or GROUP_URL
        group: Option<String>,

        /// Download only, never run the archiver
        #[arg(long, conflicts_with = "compress")]
        no_compress: bool,

        /// Compress without asking
        #[arg(long)]
        compress: bool,

        /// Archive videos in batches instead of one archive per video
        #[arg(long, conflicts_with = "individual")]
        batch: bool,

        /// One archive per video
        #[arg(long)]
        individual: bool,

        /// Videos per batch archive
        #[arg(long)]
        batch_size: Option<usize>,

        /// Keep the raw videos after archiving
        #[arg(long, default_value_t = false)]
        keep_originals: bool,

        /// Compression level passed to the archiver (0-5)
        #[arg(long)]
        level: Option<u8>,

        /// Path to the rar/WinRAR executable
        #[arg(long)]
        archiver: Option<PathBuf>,

        /// Folder for downloaded videos
        #[arg(long)]
        download_dir: Option<PathBuf>,

        /// Folder for archives
        #[arg(long)]
        archive_dir: Option<PathBuf>,

        /// Pause after each download, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Do not ask whether to compress
        #[arg(short, long, default_value_t = false)]
        yes: bool,

        /// Summary output format: text | json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show how much space the archives save over the raw videos
    Report {
        /// Folder with downloaded videos
        #[arg(long)]
        download_dir: Option<PathBuf>,

        /// Folder with archives
        #[arg(long)]
        archive_dir: Option<PathBuf>,
    },

    /// Sign in and create the session file
    InitSession,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Download { .. } => "download",
            Commands::Report { .. } => "report",
            Commands::InitSession => "init_session",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("telegram_video_archiver=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    let command_name = cli.command.name();
    metrics::record_command_start(command_name);
    let start = Instant::now();

    let result = execute_command(cli.config, cli.command).await;

    metrics::record_command_result(command_name, start.elapsed(), result.is_ok());

    // Logged here only; returning the error would print it again
    if let Err(err) = result {
        error!("Run failed: {:#}", err);
        std::process::exit(1);
    }
    Ok(())
}

async fn execute_command(config_path: Option<PathBuf>, command: Commands) -> anyhow::Result<()> {
    let config = Config::load(config_path.as_deref())?;

    match command {
        Commands::Download {
            group,
            no_compress,
            compress,
            batch,
            individual,
            batch_size,
            keep_originals,
            level,
            archiver,
            download_dir,
            archive_dir,
            delay_ms,
            yes,
            format,
        } => {
            let format = commands::SummaryFormat::parse(&format)?;

            let compression = match (no_compress, compress) {
                (true, _) => Some(false),
                (_, true) => Some(true),
                _ => None,
            };
            let individual = match (batch, individual) {
                (true, _) => Some(false),
                (_, true) => Some(true),
                _ => None,
            };

            let args = commands::DownloadArgs {
                group,
                overrides: commands::SettingsOverrides {
                    compression,
                    individual,
                    batch_size,
                    keep_originals,
                    level,
                    archiver_path: archiver,
                    download_dir,
                    archive_dir,
                    delay_ms,
                },
                assume_yes: yes,
            };

            println!("=== TELEGRAM VIDEO DOWNLOADER ===");
            println!("Downloads every video of the group, optionally archived with RAR.\n");

            let summary = commands::download_run(&config, args).await?;
            println!("\n{}", format.render(&summary)?);
        }
        Commands::Report {
            download_dir,
            archive_dir,
        } => {
            let overrides = commands::SettingsOverrides {
                download_dir,
                archive_dir,
                ..Default::default()
            };
            let settings = overrides.apply(config.archive.clone());
            let space = commands::report_run(&settings)?;
            println!("{}", space);
        }
        Commands::InitSession => {
            commands::init_session_run(&config).await?;
        }
    }

    Ok(())
}
