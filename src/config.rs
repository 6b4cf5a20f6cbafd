//! Configuration for Telegram API access and the archive pipeline
//!
//! Loads configuration from config.yml file, with environment overrides

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default constants (fallback if config.yml not found)
pub const SESSION_NAME: &str = "telegram_session";
pub const LOCK_FILE: &str = "telegram_session.lock";
pub const DEFAULT_DOWNLOAD_DIR: &str = "./telegram_videos";
pub const DEFAULT_ARCHIVE_DIR: &str = "./telegram_videos_compressed";
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_COMPRESSION_LEVEL: u8 = 5;
pub const MAX_COMPRESSION_LEVEL: u8 = 5;
pub const DEFAULT_DOWNLOAD_DELAY_MS: u64 = 1000;

/// How downloaded videos are archived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMode {
    /// Download only.
    Off,
    /// One archive per video, right after its download.
    Individual,
    /// Videos accumulate until `batch_size` and share one archive.
    Batched,
}

impl std::fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressionMode::Off => write!(f, "download only"),
            CompressionMode::Individual => write!(f, "individual (1 archive per video)"),
            CompressionMode::Batched => write!(f, "batched"),
        }
    }
}

/// Per-run archive pipeline settings. Frozen before the run starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveSettings {
    pub download_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub compression: bool,
    pub individual: bool,
    pub batch_size: usize,
    pub delete_originals: bool,
    pub level: u8,
    pub archiver_path: Option<PathBuf>,
    pub download_delay: Duration,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            archive_dir: PathBuf::from(DEFAULT_ARCHIVE_DIR),
            compression: true,
            individual: true,
            batch_size: DEFAULT_BATCH_SIZE,
            delete_originals: true,
            level: DEFAULT_COMPRESSION_LEVEL,
            archiver_path: None,
            download_delay: Duration::from_millis(DEFAULT_DOWNLOAD_DELAY_MS),
        }
    }
}

impl ArchiveSettings {
    pub fn mode(&self) -> CompressionMode {
        match (self.compression, self.individual) {
            (false, _) => CompressionMode::Off,
            (true, true) => CompressionMode::Individual,
            (true, false) => CompressionMode::Batched,
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidArgument(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.level > MAX_COMPRESSION_LEVEL {
            return Err(Error::InvalidArgument(format!(
                "compression level must be between 0 and {}, got {}",
                MAX_COMPRESSION_LEVEL, self.level
            )));
        }
        Ok(())
    }

    /// Same settings with compression switched off (archiver unavailable).
    pub fn without_compression(self) -> Self {
        Self {
            compression: false,
            ..self
        }
    }
}

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    telegram: Option<TelegramConfig>,
    group: Option<GroupConfig>,
    archive: Option<ArchiveConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramConfig {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    api_id: Option<String>,
    api_hash: Option<String>,
    phone: Option<String>,
    session_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GroupConfig {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ArchiveConfig {
    download_dir: Option<PathBuf>,
    archive_dir: Option<PathBuf>,
    compression: Option<bool>,
    individual: Option<bool>,
    batch_size: Option<usize>,
    delete_originals: Option<bool>,
    level: Option<u8>,
    archiver_path: Option<String>,
    download_delay_ms: Option<u64>,
}

/// Deserialize a value that can be either a string or a number
fn deserialize_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_yaml::Value> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {:?}",
            other
        ))),
    }
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub phone: String,
    pub api_id: i32,
    pub api_hash: String,
    pub session_name: String,
    pub lock_file: String,
    pub group_url: String,
    pub archive: ArchiveSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults
    /// Environment variables take precedence over config.yml values
    pub fn new() -> Self {
        Self::load_from_file("config.yml")
            .or_else(|_| Self::load_from_file("../config.yml"))
            .unwrap_or_else(|_| Self::defaults())
    }

    /// Load from an explicit path, or fall back to the default search.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::new()),
        }
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> String {
        if let Some(ref v) = value {
            if v.starts_with("${") && v.ends_with('}') {
                let var_name = &v[2..v.len() - 1];
                if let Ok(env_val) = std::env::var(var_name) {
                    return env_val;
                }
            }
        }
        // Also check explicit env_key as fallback
        if let Ok(env_val) = std::env::var(env_key) {
            return env_val;
        }
        match value {
            // Unresolved placeholder
            Some(v) if v.starts_with("${") => String::new(),
            other => other.unwrap_or_default(),
        }
    }

    /// Resolve an integer value from string config or env var
    fn resolve_env_i32(value: Option<String>, env_key: &str) -> i32 {
        if let Some(ref v) = value {
            if v.starts_with("${") && v.ends_with('}') {
                let var_name = &v[2..v.len() - 1];
                if let Ok(env_val) = std::env::var(var_name) {
                    if let Ok(parsed) = env_val.parse::<i32>() {
                        return parsed;
                    }
                }
            }
            // Try parsing directly if it's a number
            if let Ok(parsed) = v.parse::<i32>() {
                return parsed;
            }
        }
        if let Ok(env_val) = std::env::var(env_key) {
            if let Ok(parsed) = env_val.parse::<i32>() {
                return parsed;
            }
        }
        0
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref())?;
        let yaml: YamlConfig = serde_yaml::from_str(&content).map_err(|e| {
            Error::SerializationError(format!("Failed to parse config file: {}", e))
        })?;

        Ok(Self::from_yaml(yaml))
    }

    fn from_yaml(yaml: YamlConfig) -> Self {
        let telegram = yaml.telegram.unwrap_or_default();
        let group = yaml.group.unwrap_or_default();
        let archive = yaml.archive.unwrap_or_default();
        let defaults = ArchiveSettings::default();

        let session_name = telegram
            .session_name
            .unwrap_or_else(|| SESSION_NAME.to_string());
        let archiver_path = Self::resolve_env_string(archive.archiver_path, "ARCHIVER_PATH");

        Self {
            phone: Self::resolve_env_string(telegram.phone, "TELEGRAM_PHONE"),
            api_id: Self::resolve_env_i32(telegram.api_id, "TELEGRAM_API_ID"),
            api_hash: Self::resolve_env_string(telegram.api_hash, "TELEGRAM_API_HASH"),
            lock_file: format!("{}.lock", session_name),
            session_name,
            group_url: Self::resolve_env_string(group.url, "GROUP_URL"),
            archive: ArchiveSettings {
                download_dir: archive.download_dir.unwrap_or(defaults.download_dir),
                archive_dir: archive.archive_dir.unwrap_or(defaults.archive_dir),
                compression: archive.compression.unwrap_or(defaults.compression),
                individual: archive.individual.unwrap_or(defaults.individual),
                batch_size: archive.batch_size.unwrap_or(defaults.batch_size),
                delete_originals: archive.delete_originals.unwrap_or(defaults.delete_originals),
                level: archive.level.unwrap_or(defaults.level),
                archiver_path: (!archiver_path.is_empty()).then(|| PathBuf::from(archiver_path)),
                download_delay: archive
                    .download_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.download_delay),
            },
        }
    }

    /// Config with built-in defaults plus whatever the environment provides.
    fn defaults() -> Self {
        Self::load_dotenv();
        Self::from_yaml(YamlConfig::default())
    }

    /// Session file path used by the SQLite session storage.
    pub fn session_file(&self) -> String {
        format!("{}.session", self.session_name)
    }
}
