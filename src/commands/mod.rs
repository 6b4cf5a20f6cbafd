//! Command implementations
//!
//! Each module corresponds to a subcommand in the CLI.

pub mod download;
pub mod init_session;
pub mod report;

// Re-export commonly used types
pub use download::{run as download_run, DownloadArgs, SettingsOverrides, SummaryFormat};
pub use init_session::run as init_session_run;
pub use report::run as report_run;
