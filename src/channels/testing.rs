//! In-memory adapter that records everything sent through it

use super::adapter::{AdapterBase, AdapterStatus, ChannelAdapter, ChannelEvent};
use super::message::{MessageAttachment, OutboundDocument, OutboundMessage};
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Something the adapter was asked to deliver
#[derive(Debug, Clone)]
pub enum Sent {
    Text(OutboundMessage),
    Document(OutboundDocument),
}

impl Sent {
    pub fn text(&self) -> Option<&OutboundMessage> {
        match self {
            Sent::Text(m) => Some(m),
            Sent::Document(_) => None,
        }
    }

    pub fn document(&self) -> Option<&OutboundDocument> {
        match self {
            Sent::Document(d) => Some(d),
            Sent::Text(_) => None,
        }
    }
}

pub struct RecordingAdapter {
    base: AdapterBase,
    sent: Mutex<Vec<Sent>>,
    files: Mutex<HashMap<String, Bytes>>,
    failing_starts: AtomicU32,
    failing_messages: AtomicU32,
    fail_documents: AtomicBool,
}

impl RecordingAdapter {
    pub fn new(name: &str) -> Self {
        Self {
            base: AdapterBase::new(name),
            sent: Mutex::new(Vec::new()),
            files: Mutex::new(HashMap::new()),
            failing_starts: AtomicU32::new(0),
            failing_messages: AtomicU32::new(0),
            fail_documents: AtomicBool::new(false),
        }
    }

    /// Make the next `count` calls to `start` fail
    pub fn fail_starts(&self, count: u32) {
        self.failing_starts.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` calls to `send_message` fail without recording
    pub fn fail_messages(&self, count: u32) {
        self.failing_messages.store(count, Ordering::SeqCst);
    }

    /// Make `send_document` fail
    pub fn fail_documents(&self, fail: bool) {
        self.fail_documents.store(fail, Ordering::SeqCst);
    }

    /// Register a downloadable attachment
    pub fn put_file(&self, attachment_id: &str, content: impl Into<Bytes>) {
        self.files
            .lock()
            .unwrap()
            .insert(attachment_id.to_string(), content.into());
    }

    /// Drain everything sent so far
    pub fn take_sent(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    /// Drain and keep only text contents
    pub fn take_texts(&self) -> Vec<String> {
        self.take_sent()
            .iter()
            .filter_map(Sent::text)
            .map(|m| m.content.clone())
            .collect()
    }
}

#[async_trait]
impl ChannelAdapter for RecordingAdapter {
    fn name(&self) -> &str {
        self.base.name()
    }

    async fn start(&self, event_tx: mpsc::Sender<ChannelEvent>) -> Result<()> {
        let remaining = self.failing_starts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_starts.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Channel("connection refused".to_string()));
        }
        self.base.set_status(AdapterStatus::Running);
        let _ = event_tx
            .send(ChannelEvent::Connected {
                channel: self.name().to_string(),
            })
            .await;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.base.set_status(AdapterStatus::Stopped);
        Ok(())
    }

    async fn send_message(&self, message: OutboundMessage) -> Result<String> {
        let remaining = self.failing_messages.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_messages.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Channel("send rejected".to_string()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(Sent::Text(message));
        Ok(format!("rec-{}", sent.len()))
    }

    async fn send_document(&self, document: OutboundDocument) -> Result<String> {
        if self.fail_documents.load(Ordering::SeqCst) {
            return Err(Error::Channel("upload rejected".to_string()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(Sent::Document(document));
        Ok(format!("rec-{}", sent.len()))
    }

    async fn fetch_attachment(&self, attachment: &MessageAttachment) -> Result<Bytes> {
        self.files
            .lock()
            .unwrap()
            .get(&attachment.attachment_id)
            .cloned()
            .ok_or_else(|| Error::Channel(format!("no such file: {}", attachment.attachment_id)))
    }

    fn is_connected(&self) -> bool {
        self.base.is_running()
    }
}
