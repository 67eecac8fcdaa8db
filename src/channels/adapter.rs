//! Channel adapter trait and shared adapter plumbing

use super::message::{InboundMessage, MessageAttachment, OutboundDocument, OutboundMessage};
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::RwLock;
use tokio::sync::mpsc;

/// Events emitted by channel adapters
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// A user sent something
    Message(InboundMessage),
    /// The adapter connected to its platform
    Connected { channel: String },
    /// The adapter disconnected
    Disconnected { channel: String, reason: String },
    /// A non-fatal adapter error
    Error { channel: String, error: String },
}

/// Adapter lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Messaging platform adapter.
///
/// Everything the conversation engine needs from a chat transport: sending
/// text with suggested replies, sending files and downloading attachments.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Channel name
    fn name(&self) -> &str;

    /// Connect and start delivering events to `event_tx`
    async fn start(&self, event_tx: mpsc::Sender<ChannelEvent>) -> Result<()>;

    /// Disconnect
    async fn stop(&self) -> Result<()>;

    /// Send a text message, returning the platform message ID
    async fn send_message(&self, message: OutboundMessage) -> Result<String>;

    /// Send a file, returning the platform message ID
    async fn send_document(&self, document: OutboundDocument) -> Result<String>;

    /// Download an attachment's contents
    async fn fetch_attachment(&self, attachment: &MessageAttachment) -> Result<Bytes>;

    /// Whether the adapter is running
    fn is_connected(&self) -> bool;
}

/// Name and status bookkeeping shared by adapters
#[derive(Debug)]
pub struct AdapterBase {
    name: String,
    status: RwLock<AdapterStatus>,
}

impl AdapterBase {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: RwLock::new(AdapterStatus::Stopped),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> AdapterStatus {
        *self.status.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_status(&self, status: AdapterStatus) {
        *self.status.write().unwrap_or_else(|e| e.into_inner()) = status;
    }

    pub fn is_running(&self) -> bool {
        self.status() == AdapterStatus::Running
    }
}
