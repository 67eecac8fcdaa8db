//! Channel-neutral message types

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A file attached to an inbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAttachment {
    /// Channel-specific reference used to download the file
    pub attachment_id: String,
    /// Original file name, if the client sent one
    pub file_name: Option<String>,
    /// MIME type reported by the channel
    pub mime_type: Option<String>,
    /// Size in bytes
    pub size: Option<u64>,
}

impl MessageAttachment {
    pub fn new(attachment_id: impl Into<String>, file_name: Option<String>) -> Self {
        Self {
            attachment_id: attachment_id.into(),
            file_name,
            mime_type: None,
            size: None,
        }
    }
}

/// Message received from a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Channel name (e.g. "telegram")
    pub channel: String,
    /// Sender ID
    pub sender_id: String,
    /// Chat ID (channel-specific)
    pub chat_id: String,
    /// Text content; empty for pure attachments
    pub content: String,
    /// Channel-specific message ID
    pub channel_message_id: String,
    /// Timestamp in milliseconds
    pub timestamp: i64,
    /// Attached files
    pub attachments: Vec<MessageAttachment>,
}

impl InboundMessage {
    /// Create a text message
    pub fn new(channel: &str, sender_id: &str, chat_id: &str, content: &str) -> Self {
        Self {
            channel: channel.to_string(),
            sender_id: sender_id.to_string(),
            chat_id: chat_id.to_string(),
            content: content.to_string(),
            channel_message_id: String::new(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            attachments: Vec::new(),
        }
    }

    /// Attach a file
    pub fn with_attachment(mut self, attachment: MessageAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Text content, if the message carries any
    pub fn text(&self) -> Option<&str> {
        if self.content.is_empty() {
            None
        } else {
            Some(&self.content)
        }
    }
}

/// Suggested replies shown under an outbound message
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyMarkup {
    /// Leave whatever the client shows
    #[default]
    Keep,
    /// Show these buttons, one row per inner vector
    Suggest(Vec<Vec<String>>),
    /// Hide the reply keyboard
    Remove,
}

impl ReplyMarkup {
    /// One button per row
    pub fn column<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Suggest(labels.into_iter().map(|l| vec![l.into()]).collect())
    }

    /// Flattened button labels
    pub fn labels(&self) -> Vec<&str> {
        match self {
            Self::Suggest(rows) => rows.iter().flatten().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

/// Text message to send to a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Channel name
    pub channel: String,
    /// Target chat ID
    pub chat_id: String,
    /// Text content
    pub content: String,
    /// Suggested replies
    pub markup: ReplyMarkup,
}

impl OutboundMessage {
    pub fn new(channel: &str, chat_id: &str, content: &str) -> Self {
        Self {
            channel: channel.to_string(),
            chat_id: chat_id.to_string(),
            content: content.to_string(),
            markup: ReplyMarkup::Keep,
        }
    }

    /// Set suggested replies
    pub fn with_markup(mut self, markup: ReplyMarkup) -> Self {
        self.markup = markup;
        self
    }
}

/// File to send to a channel
#[derive(Debug, Clone)]
pub struct OutboundDocument {
    /// Channel name
    pub channel: String,
    /// Target chat ID
    pub chat_id: String,
    /// File name shown to the user
    pub file_name: String,
    /// File contents
    pub content: Bytes,
}

impl OutboundDocument {
    pub fn new(channel: &str, chat_id: &str, file_name: &str, content: impl Into<Bytes>) -> Self {
        Self {
            channel: channel.to_string(),
            chat_id: chat_id.to_string(),
            file_name: file_name.to_string(),
            content: content.into(),
        }
    }
}
