//! Session management for Telegram client
//!
//! Provides:
//! - File-based session locking to prevent parallel runs
//! - Client creation over a SQLite session
//! - Interactive authorization (login code and two-factor password)

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use fs2::FileExt;
use grammers_client::{Client, SignInError};
use grammers_mtsender::{SenderPool, SenderPoolHandle};
use grammers_session::storages::SqliteSession;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

/// Session lock guard that ensures exclusive access to the Telegram session.
pub struct SessionLock {
    path: PathBuf,
    lock_file: Option<File>,
}

impl SessionLock {
    /// Acquire an exclusive lock on the session.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::LockError(format!("Failed to open lock file: {}", e)))?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                lock_file: Some(lock_file),
            }),
            Err(_) => {
                eprintln!(
                    r#"
⚠️  ERROR: the Telegram session is already in use by another run!

Telegram sessions must not be shared by parallel processes.
Wait for the other run to finish and try again.
"#
                );
                Err(Error::SessionLocked)
            }
        }
    }

    /// Release the lock manually
    pub fn release(&mut self) {
        if let Some(ref file) = self.lock_file {
            let _ = file.unlock();
        }
        if self.lock_file.take().is_some() {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// Open (or create) the SQLite session file.
pub fn open_session(config: &Config) -> Result<Arc<SqliteSession>> {
    let session_file = config.session_file();
    let session = SqliteSession::open(&session_file)
        .map_err(|e| Error::SessionError(format!("Failed to open {}: {}", session_file, e)))?;
    Ok(Arc::new(session))
}

/// Holder for SenderPool components and Client
pub struct TelegramClient {
    pub client: Client,
    handle: SenderPoolHandle,
    runner: tokio::task::JoinHandle<()>,
}

impl TelegramClient {
    /// Create a new TelegramClient from session
    pub async fn connect(config: &Config) -> Result<Self> {
        let session = open_session(config)?;
        let pool = SenderPool::new(session, config.api_id);

        let client = Client::new(&pool);

        // Updates are not consumed by this tool
        let SenderPool { runner, handle, .. } = pool;

        let runner = tokio::spawn(async move {
            runner.run().await;
        });

        Ok(Self {
            client,
            handle,
            runner,
        })
    }

    /// Stop the sender pool and wait for its runner to finish.
    pub async fn disconnect(self) {
        self.handle.quit();
        if let Err(err) = self.runner.await {
            warn!("Sender pool runner ended abnormally: {}", err);
        }
        info!("Disconnected from Telegram");
    }
}

// Implement Deref to allow using TelegramClient as &Client
impl std::ops::Deref for TelegramClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Make sure the session is signed in, asking the operator for the login
/// code (and the two-factor password when the account has one).
pub async fn authorize(client: &Client, config: &Config) -> Result<()> {
    if client.is_authorized().await? {
        info!("Session already authorized");
        return Ok(());
    }

    if config.phone.is_empty() || config.api_hash.is_empty() {
        return Err(Error::AuthorizationRequired);
    }

    info!(phone = %config.phone, "Sending verification code");
    let token = client
        .request_login_code(&config.phone, &config.api_hash)
        .await
        .map_err(|e| Error::TelegramError(format!("Failed to request code: {}", e)))?;

    let code = prompt("Enter the verification code: ")?;

    let user = match client.sign_in(&token, &code).await {
        Ok(user) => user,
        Err(SignInError::PasswordRequired(password_token)) => {
            let label = match password_token.hint() {
                Some(hint) => format!("Enter your two-step password (hint: {}): ", hint),
                None => "Enter your two-step password: ".to_string(),
            };
            let password = prompt(&label)?;
            client
                .check_password(password_token, password.as_bytes())
                .await
                .map_err(|e| Error::TelegramError(format!("Failed to check password: {}", e)))?
        }
        Err(e) => return Err(Error::TelegramError(format!("Failed to sign in: {}", e))),
    };

    info!(name = %user.full_name(), "Authenticated successfully");
    Ok(())
}

/// Connect a client and make sure it is authorized.
pub async fn get_client(config: &Config) -> Result<TelegramClient> {
    let client = TelegramClient::connect(config).await?;
    if let Err(err) = authorize(&client, config).await {
        client.disconnect().await;
        return Err(err);
    }
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lock_file_is_created_on_acquire() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("telegram_session.lock");

        assert!(!path.exists());
        let mut lock = SessionLock::acquire(&path).expect("lock");
        assert!(path.exists());
        lock.release();
    }

    #[test]
    fn release_removes_lock_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("session.lock");

        let mut lock = SessionLock::acquire(&path).expect("lock");
        lock.release();
        assert!(!path.exists());
    }

    #[test]
    fn lock_dropped_releases_automatically() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("session.lock");

        {
            let _lock = SessionLock::acquire(&path).expect("lock");
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn double_release_is_safe() {
        let temp = tempdir().expect("tempdir");
        let mut lock = SessionLock::acquire(temp.path().join("session.lock")).expect("lock");
        lock.release();
        lock.release(); // Should not panic
    }

    #[test]
    fn lock_can_be_reacquired_after_release() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("session.lock");

        let mut first = SessionLock::acquire(&path).expect("first lock");
        first.release();

        let second = SessionLock::acquire(&path);
        assert!(second.is_ok());
    }

    #[test]
    fn acquire_in_missing_directory_is_lock_error() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("missing").join("session.lock");

        let result = SessionLock::acquire(path);
        assert!(matches!(result, Err(Error::LockError(_))));
    }
}
