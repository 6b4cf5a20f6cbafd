//! Telegram Video Archiver Library
//!
//! This library provides tools to:
//! - Authenticate to Telegram and resolve a group from a link or handle
//! - Walk the group's messages and download every video attachment
//! - Skip videos already handled by an earlier run
//! - Archive videos with an external RAR tool, one per video or in batches
//! - Report how much disk space the archives saved

pub mod archiver;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod group;
pub mod media;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod session;
pub mod source;

// Re-export common types
pub use archiver::{Archiver, RarArchiver};
pub use config::{ArchiveSettings, CompressionMode, Config};
pub use error::{Error, Result};
pub use group::GroupRef;
pub use pipeline::{Pipeline, RunCounters};
pub use report::{RunSummary, SpaceReport};
pub use session::{get_client, SessionLock};
pub use source::{DiscoveredMessage, MessageSource};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
