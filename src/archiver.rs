//! External archiver adapter.
//!
//! Compression is delegated to a RAR-compatible executable invoked as
//! `<exe> a -m<level> -ep1 -y <archive> <inputs...>`. A nonzero exit is
//! reported as `false`, never as an error, so the caller can keep the
//! originals and move on.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::error::{Error, Result};

pub const ARCHIVE_EXTENSION: &str = "rar";

#[cfg(windows)]
pub const DEFAULT_EXECUTABLE: &str = "winrar.exe";
#[cfg(not(windows))]
pub const DEFAULT_EXECUTABLE: &str = "rar";

#[cfg(windows)]
pub const FALLBACK_LOCATIONS: &[&str] = &[
    r"C:\Program Files (x86)\WinRAR\WinRAR.exe",
    r"C:\Program Files\WinRAR\WinRAR.exe",
];
#[cfg(not(windows))]
pub const FALLBACK_LOCATIONS: &[&str] = &["/usr/local/bin/rar", "/usr/bin/rar", "/opt/homebrew/bin/rar"];

/// Something that can pack files into archives.
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Archive a single file as `<output_dir>/<base name>.rar`.
    async fn compress_one(&self, file: &Path, output_dir: &Path) -> bool;

    /// Archive all `files` into `output`. An empty list is a no-op returning `false`.
    async fn compress_batch(&self, files: &[PathBuf], output: &Path) -> bool;
}

/// Archive path used for a single file: same base name, `.rar` extension.
pub fn archive_path_for(file: &Path, output_dir: &Path) -> PathBuf {
    let stem = file.file_stem().unwrap_or_else(|| file.as_os_str());
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(ARCHIVE_EXTENSION);
    output_dir.join(name)
}

/// Look for `name` in each directory of a PATH-style list.
fn search_path(name: &str, path_var: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Find the archiver: the configured path first, then the usual install
/// locations, then `PATH`.
pub fn locate_executable(configured: Option<&Path>) -> Result<PathBuf> {
    let mut tried: Vec<String> = Vec::new();

    if let Some(path) = configured {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        tried.push(path.display().to_string());
    }

    for candidate in FALLBACK_LOCATIONS {
        let path = Path::new(candidate);
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        tried.push(candidate.to_string());
    }

    if let Some(found) = std::env::var_os("PATH").and_then(|p| search_path(DEFAULT_EXECUTABLE, &p)) {
        return Ok(found);
    }
    tried.push(format!("{} in PATH", DEFAULT_EXECUTABLE));

    Err(Error::ArchiverNotFound(tried.join(", ")))
}

/// Archiver backed by the `rar`/WinRAR command line.
#[derive(Debug, Clone)]
pub struct RarArchiver {
    executable: PathBuf,
    level: u8,
}

impl RarArchiver {
    pub fn new(executable: impl Into<PathBuf>, level: u8) -> Self {
        Self {
            executable: executable.into(),
            level,
        }
    }

    /// Locate the executable and build the archiver.
    pub fn locate(configured: Option<&Path>, level: u8) -> Result<Self> {
        let executable = locate_executable(configured)?;
        info!(path = %executable.display(), "Archiver found");
        Ok(Self::new(executable, level))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn command_args(&self, output: &Path, inputs: &[PathBuf]) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "a".into(),
            format!("-m{}", self.level).into(),
            "-ep1".into(),
            "-y".into(),
            output.as_os_str().to_os_string(),
        ];
        args.extend(inputs.iter().map(|p| p.as_os_str().to_os_string()));
        args
    }

    async fn run(&self, output: &Path, inputs: &[PathBuf]) -> Result<()> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        debug!(
            archive = %output.display(),
            files = inputs.len(),
            "Running archiver"
        );

        let out = Command::new(&self.executable)
            .args(self.command_args(output, inputs))
            .output()
            .await
            .map_err(|e| {
                Error::Compression(format!(
                    "failed to run {}: {}",
                    self.executable.display(),
                    e
                ))
            })?;

        if !out.status.success() {
            return Err(Error::Compression(format!(
                "{} exited with {}: {}",
                self.executable.display(),
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        Ok(())
    }

    /// Run the archiver, logging any failure. Only a zero exit counts.
    async fn run_logged(&self, output: &Path, inputs: &[PathBuf]) -> bool {
        match self.run(output, inputs).await {
            Ok(()) => true,
            Err(err) => {
                error!(archive = %output.display(), "Archiver failed: {}", err);
                false
            }
        }
    }
}

#[async_trait]
impl Archiver for RarArchiver {
    async fn compress_one(&self, file: &Path, output_dir: &Path) -> bool {
        if !file.is_file() {
            error!(file = %file.display(), "Nothing to compress, file is missing");
            return false;
        }

        let output = archive_path_for(file, output_dir);
        let ok = self.run_logged(&output, &[file.to_path_buf()]).await;
        if ok {
            info!(archive = %output.display(), "✓ Compressed");
        }
        ok
    }

    async fn compress_batch(&self, files: &[PathBuf], output: &Path) -> bool {
        if files.is_empty() {
            return false;
        }

        let ok = self.run_logged(output, files).await;
        if ok {
            info!(archive = %output.display(), count = files.len(), "✓ Batch compressed");
        }
        ok
    }
}
