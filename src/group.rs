//! Group references and their resolution to Telegram peers

use std::fmt;

use grammers_client::types::peer::Peer;
use grammers_client::Client;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

/// Prefix Telegram puts in front of channel ids in their "marked" form.
pub const CHANNEL_MARKER: &str = "-100";

static PRIVATE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/c/(\d+)").expect("private link pattern is valid"));

/// A human-supplied group reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupRef {
    /// Internal channel id taken from a `t.me/c/<id>/...` link
    Channel(i64),
    /// Public handle (without @)
    Username(String),
}

impl GroupRef {
    /// Parse a link such as `https://t.me/c/1234567890/42`,
    /// `https://t.me/some_group` or a bare `@some_group`.
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(Error::InvalidGroupReference(
                "group reference is empty".to_string(),
            ));
        }

        if let Some(caps) = PRIVATE_LINK.captures(reference) {
            let id = caps[1].parse::<i64>().map_err(|e| {
                Error::InvalidGroupReference(format!("{}: {}", reference, e))
            })?;
            return Ok(GroupRef::Channel(id));
        }

        let handle = reference
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(reference);
        let handle = handle.strip_prefix('@').unwrap_or(handle);

        if handle.is_empty() {
            return Err(Error::InvalidGroupReference(reference.to_string()));
        }

        Ok(GroupRef::Username(handle.to_string()))
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupRef::Channel(id) => write!(f, "{}{}", CHANNEL_MARKER, id),
            GroupRef::Username(name) => write!(f, "@{}", name),
        }
    }
}

/// Raw id of a channel-backed peer (broadcast channel or megagroup).
fn channel_id(peer: &Peer) -> Option<i64> {
    match peer {
        Peer::Channel(channel) => Some(channel.raw.id),
        Peer::Group(group) => match &group.raw {
            grammers_tl_types::enums::Chat::Channel(c) => Some(c.id),
            grammers_tl_types::enums::Chat::ChannelForbidden(c) => Some(c.id),
            _ => None,
        },
        Peer::User(_) => None,
    }
}

/// Resolve a GroupRef to an actual Peer
pub async fn resolve_group(client: &Client, group: &GroupRef) -> Result<Peer> {
    match group {
        GroupRef::Channel(target_id) => {
            // Private channels are only reachable through the account's dialogs
            let mut dialogs = client.iter_dialogs();

            while let Some(dialog) = dialogs
                .next()
                .await
                .map_err(|e| Error::TelegramError(e.to_string()))?
            {
                if channel_id(&dialog.peer) == Some(*target_id) {
                    return Ok(dialog.peer.clone());
                }
            }

            Err(Error::GroupNotFound(format!(
                "Channel {} not found in dialogs",
                group
            )))
        }
        GroupRef::Username(username) => client
            .resolve_username(username)
            .await
            .map_err(|e| Error::TelegramError(e.to_string()))?
            .ok_or_else(|| Error::GroupNotFound(format!("Username @{} not found", username))),
    }
}

/// Get the display name for a peer
pub fn peer_name(peer: &Peer) -> String {
    peer.name()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}
