//! Session initialization command
//!
//! Signs in ahead of time so later download runs start without prompts.

use grammers_client::Client;

use crate::config::Config;
use crate::error::Result;
use crate::session::{self, SessionLock, TelegramClient};

async fn print_profile(client: &Client) -> Result<()> {
    let me = client.get_me().await?;
    println!(
        r#"
╔═══════════════════════════════════════════════════════════════╗
║  ✅ SESSION READY                                             ║
╚═══════════════════════════════════════════════════════════════╝

Profile:
  Name: {}
  Username: @{}
"#,
        me.full_name(),
        me.username().unwrap_or("not set"),
    );
    Ok(())
}

pub async fn run(config: &Config) -> Result<()> {
    let _lock = SessionLock::acquire(&config.lock_file)?;

    println!("\n🔄 Connecting to Telegram as {}...", config.phone);
    let client = TelegramClient::connect(config).await?;

    let result = match session::authorize(&client, config).await {
        Ok(()) => print_profile(&client).await,
        Err(err) => Err(err),
    };
    client.disconnect().await;
    result?;

    println!("Session file: {}", config.session_file());
    Ok(())
}
