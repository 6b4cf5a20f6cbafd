//! Message sources the pipeline pulls videos from.
//!
//! The pipeline only needs a forward-only stream of messages and a way to
//! write one message's attachment to disk. [`TelegramSource`] provides both
//! on top of grammers; tests plug in their own in-memory source.

use std::path::Path;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use grammers_client::types::peer::Peer;
use grammers_client::types::{Media, Message};
use grammers_client::Client;
use tokio::sync::Mutex;

use crate::error::{Error, Result};

/// One message as seen by the classifier.
pub trait DiscoveredMessage {
    /// Platform message id.
    fn id(&self) -> i64;

    /// Declared content type of the attached document, if any.
    fn mime_type(&self) -> Option<String>;
}

/// Single-pass, forward-only sequence of messages with media download.
#[async_trait]
pub trait MessageSource: Send {
    type Message: DiscoveredMessage + Send + Sync;

    /// Next message, or `None` once the stream is exhausted.
    async fn next_message(&mut self) -> Result<Option<Self::Message>>;

    /// Write the message's attachment to `dest`.
    async fn download(&self, message: &Self::Message, dest: &Path) -> Result<()>;
}

/// Message wrapper exposing what the pipeline needs from a grammers message.
pub struct TelegramMessage(pub Message);

impl DiscoveredMessage for TelegramMessage {
    fn id(&self) -> i64 {
        i64::from(self.0.id())
    }

    fn mime_type(&self) -> Option<String> {
        match self.0.media() {
            Some(Media::Document(document)) => document.mime_type().map(str::to_string),
            _ => None,
        }
    }
}

/// Messages of one group, newest first, as returned by Telegram.
pub struct TelegramSource {
    client: Client,
    // Only polled through `&mut self`; the mutex makes the source `Sync`.
    messages: Mutex<BoxStream<'static, Result<TelegramMessage>>>,
}

impl TelegramSource {
    pub fn new(client: &Client, group: &Peer) -> Self {
        let iter = client.iter_messages(group);
        let messages = futures::stream::unfold(iter, |mut iter| async move {
            match iter.next().await {
                Ok(Some(message)) => Some((Ok(TelegramMessage(message)), iter)),
                Ok(None) => None,
                Err(err) => Some((Err(Error::from(err)), iter)),
            }
        })
        .boxed();

        Self {
            client: client.clone(),
            messages: Mutex::new(messages),
        }
    }
}

#[async_trait]
impl MessageSource for TelegramSource {
    type Message = TelegramMessage;

    async fn next_message(&mut self) -> Result<Option<TelegramMessage>> {
        self.messages.get_mut().next().await.transpose()
    }

    async fn download(&self, message: &TelegramMessage, dest: &Path) -> Result<()> {
        let media = message
            .0
            .media()
            .ok_or_else(|| Error::Download(format!("message {} has no media", message.id())))?;

        self.client
            .download_media(&media, dest)
            .await
            .map_err(|e| Error::Download(format!("{}: {}", dest.display(), e)))
    }
}
