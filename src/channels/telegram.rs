//! Telegram channel adapter
//!
//! Talks to the Bot API directly: `getMe` on start, a long-polling
//! `getUpdates` task for inbound messages, `sendMessage` with reply
//! keyboards, multipart `sendDocument`, and `getFile` for attachments.

use super::adapter::{AdapterBase, AdapterStatus, ChannelAdapter, ChannelEvent};
use super::message::{
    InboundMessage, MessageAttachment, OutboundDocument, OutboundMessage, ReplyMarkup,
};
use crate::config::TelegramConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

const CHANNEL: &str = "telegram";

/// Pause after a failed poll before trying again
const POLL_ERROR_DELAY: Duration = Duration::from_secs(5);

// =============================================================================
// Bot API wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &str) -> Result<T> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(Error::Channel(format!(
                "Telegram {} failed: {}",
                method,
                self.description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgChat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgDocument {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgMessage {
    pub message_id: i64,
    pub date: i64,
    pub chat: TgChat,
    #[serde(default)]
    pub from: Option<TgUser>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub document: Option<TgDocument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgFile {
    #[serde(default)]
    file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgSentMessage {
    message_id: i64,
}

// =============================================================================
// Bot API client
// =============================================================================

/// Authenticated Bot API client
#[derive(Clone)]
struct BotApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl BotApi {
    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url.trim_end_matches('/'), self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.base_url.trim_end_matches('/'),
            self.token,
            file_path
        )
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: serde_json::Value) -> Result<T> {
        let response: ApiResponse<T> = self
            .client
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        response.into_result(method)
    }

    async fn get_me(&self) -> Result<TgUser> {
        self.call("getMe", json!({})).await
    }

    async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<TgUpdate>> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    async fn send_document(&self, document: OutboundDocument) -> Result<TgSentMessage> {
        let part = reqwest::multipart::Part::bytes(document.content.to_vec())
            .file_name(document.file_name.clone());
        let form = reqwest::multipart::Form::new()
            .text("chat_id", document.chat_id.clone())
            .part("document", part);

        let response: ApiResponse<TgSentMessage> = self
            .client
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;
        response.into_result("sendDocument")
    }

    async fn download(&self, file_id: &str) -> Result<Bytes> {
        let file: TgFile = self.call("getFile", json!({ "file_id": file_id })).await?;
        let path = file
            .file_path
            .ok_or_else(|| Error::Channel(format!("Telegram file {} has no path", file_id)))?;

        let bytes = self
            .client
            .get(self.file_url(&path))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes)
    }
}

// =============================================================================
// Conversions
// =============================================================================

/// Render suggested replies as a Bot API `reply_markup`
pub fn render_markup(markup: &ReplyMarkup) -> Option<serde_json::Value> {
    match markup {
        ReplyMarkup::Keep => None,
        ReplyMarkup::Suggest(rows) => {
            let keyboard: Vec<Vec<serde_json::Value>> = rows
                .iter()
                .map(|row| row.iter().map(|label| json!({ "text": label })).collect())
                .collect();
            Some(json!({ "keyboard": keyboard, "resize_keyboard": true }))
        }
        ReplyMarkup::Remove => Some(json!({ "remove_keyboard": true })),
    }
}

/// Convert an update into an inbound message, dropping users not allowed
pub fn parse_update(update: &TgUpdate, allowed_users: &[i64]) -> Option<InboundMessage> {
    let message = update.message.as_ref()?;
    let sender_id = message.from.as_ref().map_or(message.chat.id, |u| u.id);
    if !allowed_users.is_empty() && !allowed_users.contains(&sender_id) {
        tracing::debug!("Dropping Telegram update from unlisted user {}", sender_id);
        return None;
    }

    let mut inbound = InboundMessage::new(
        CHANNEL,
        &sender_id.to_string(),
        &message.chat.id.to_string(),
        message.text.as_deref().unwrap_or_default(),
    );
    inbound.channel_message_id = message.message_id.to_string();
    inbound.timestamp = message.date * 1000;
    if let Some(document) = &message.document {
        inbound.attachments.push(MessageAttachment {
            attachment_id: document.file_id.clone(),
            file_name: document.file_name.clone(),
            mime_type: document.mime_type.clone(),
            size: document.file_size,
        });
    }
    Some(inbound)
}

async fn poll_updates(api: BotApi, config: TelegramConfig, event_tx: mpsc::Sender<ChannelEvent>) {
    let mut offset = 0i64;
    loop {
        match api.get_updates(offset, config.poll_timeout_secs).await {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    if let Some(message) = parse_update(&update, &config.allowed_users) {
                        if event_tx.send(ChannelEvent::Message(message)).await.is_err() {
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Telegram polling failed: {}", e);
                let event = ChannelEvent::Error {
                    channel: CHANNEL.to_string(),
                    error: e.to_string(),
                };
                if event_tx.send(event).await.is_err() {
                    return;
                }
                tokio::time::sleep(POLL_ERROR_DELAY).await;
            }
        }
    }
}

// =============================================================================
// Adapter
// =============================================================================

/// Telegram channel adapter
pub struct TelegramAdapter {
    config: TelegramConfig,
    base: AdapterBase,
    client: reqwest::Client,
    api: RwLock<Option<BotApi>>,
    event_tx: Arc<RwLock<Option<mpsc::Sender<ChannelEvent>>>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl TelegramAdapter {
    /// Create a new Telegram adapter
    pub fn new(config: TelegramConfig) -> Self {
        // Long polls hold the request open for poll_timeout_secs
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            base: AdapterBase::new(CHANNEL),
            client,
            api: RwLock::new(None),
            event_tx: Arc::new(RwLock::new(None)),
            poller: Mutex::new(None),
        }
    }

    fn resolve_token(&self) -> Result<String> {
        std::env::var(&self.config.bot_token_ref).map_err(|_| {
            Error::Config(format!(
                "Telegram bot token variable {} is not set",
                self.config.bot_token_ref
            ))
        })
    }

    async fn api(&self) -> Result<BotApi> {
        if !self.base.is_running() {
            return Err(Error::Channel("Telegram adapter not running".to_string()));
        }
        self.api
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::Channel("Telegram adapter not connected".to_string()))
    }
}

#[async_trait]
impl ChannelAdapter for TelegramAdapter {
    fn name(&self) -> &str {
        self.base.name()
    }

    async fn start(&self, event_tx: mpsc::Sender<ChannelEvent>) -> Result<()> {
        self.base.set_status(AdapterStatus::Starting);

        let connect = async {
            let api = BotApi {
                client: self.client.clone(),
                base_url: self.config.api_base_url.clone(),
                token: self.resolve_token()?,
            };
            let me = api.get_me().await?;
            Ok::<_, Error>((api, me))
        };
        let (api, me) = match connect.await {
            Ok(connected) => connected,
            Err(e) => {
                self.base.set_status(AdapterStatus::Stopped);
                return Err(e);
            }
        };

        tracing::info!(
            "Telegram adapter connected as @{}",
            me.username.as_deref().unwrap_or("unknown")
        );

        *self.api.write().await = Some(api.clone());
        *self.event_tx.write().await = Some(event_tx.clone());
        *self.poller.lock().await = Some(tokio::spawn(poll_updates(
            api,
            self.config.clone(),
            event_tx.clone(),
        )));

        let _ = event_tx
            .send(ChannelEvent::Connected {
                channel: CHANNEL.to_string(),
            })
            .await;

        self.base.set_status(AdapterStatus::Running);

        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.base.set_status(AdapterStatus::Stopping);

        if let Some(poller) = self.poller.lock().await.take() {
            poller.abort();
        }

        if let Some(tx) = self.event_tx.read().await.as_ref() {
            let _ = tx
                .send(ChannelEvent::Disconnected {
                    channel: CHANNEL.to_string(),
                    reason: "Adapter stopped".to_string(),
                })
                .await;
        }

        *self.event_tx.write().await = None;
        *self.api.write().await = None;
        self.base.set_status(AdapterStatus::Stopped);

        tracing::info!("Telegram adapter stopped");

        Ok(())
    }

    async fn send_message(&self, message: OutboundMessage) -> Result<String> {
        let api = self.api().await?;

        tracing::debug!(
            "Sending message to Telegram chat {}: {}",
            message.chat_id,
            message.content
        );

        let mut body = json!({
            "chat_id": message.chat_id,
            "text": message.content,
        });
        if let Some(markup) = render_markup(&message.markup) {
            body["reply_markup"] = markup;
        }

        let sent: TgSentMessage = api.call("sendMessage", body).await?;
        Ok(sent.message_id.to_string())
    }

    async fn send_document(&self, document: OutboundDocument) -> Result<String> {
        let api = self.api().await?;

        tracing::debug!(
            "Sending document {} ({} bytes) to Telegram chat {}",
            document.file_name,
            document.content.len(),
            document.chat_id
        );

        let sent = api.send_document(document).await?;
        Ok(sent.message_id.to_string())
    }

    async fn fetch_attachment(&self, attachment: &MessageAttachment) -> Result<Bytes> {
        let api = self.api().await?;
        api.download(&attachment.attachment_id).await
    }

    fn is_connected(&self) -> bool {
        self.base.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> TelegramConfig {
        TelegramConfig {
            bot_token_ref: "HERITAGEBOT_TEST_TOKEN_UNSET".to_string(),
            allowed_users: vec![123456789],
            ..Default::default()
        }
    }

    fn update(json: serde_json::Value) -> TgUpdate {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_adapter_creation() {
        let adapter = TelegramAdapter::new(create_test_config());

        assert_eq!(adapter.name(), "telegram");
        assert!(!adapter.is_connected());
    }

    #[test]
    fn test_parse_text_update() {
        let update = update(json!({
            "update_id": 10,
            "message": {
                "message_id": 5,
                "date": 1700000000,
                "chat": { "id": 42, "type": "private" },
                "from": { "id": 123456789, "is_bot": false, "first_name": "A" },
                "text": "Sort"
            }
        }));

        let message = parse_update(&update, &[]).unwrap();
        assert_eq!(message.channel, "telegram");
        assert_eq!(message.chat_id, "42");
        assert_eq!(message.sender_id, "123456789");
        assert_eq!(message.content, "Sort");
        assert_eq!(message.channel_message_id, "5");
        assert_eq!(message.timestamp, 1_700_000_000_000);
        assert!(message.attachments.is_empty());
    }

    #[test]
    fn test_parse_document_update() {
        let update = update(json!({
            "update_id": 11,
            "message": {
                "message_id": 6,
                "date": 1700000000,
                "chat": { "id": 42 },
                "document": {
                    "file_id": "BQACAgI",
                    "file_name": "objects.csv",
                    "mime_type": "text/csv",
                    "file_size": 2048
                }
            }
        }));

        let message = parse_update(&update, &[]).unwrap();
        assert_eq!(message.text(), None);
        assert_eq!(message.sender_id, "42");
        assert_eq!(
            message.attachments,
            vec![MessageAttachment {
                attachment_id: "BQACAgI".to_string(),
                file_name: Some("objects.csv".to_string()),
                mime_type: Some("text/csv".to_string()),
                size: Some(2048),
            }]
        );
    }

    #[test]
    fn test_parse_update_filters_users() {
        let from_other = update(json!({
            "update_id": 12,
            "message": {
                "message_id": 7,
                "date": 0,
                "chat": { "id": 42 },
                "from": { "id": 987654321 },
                "text": "hi"
            }
        }));
        assert!(parse_update(&from_other, &[123456789]).is_none());
        assert!(parse_update(&from_other, &[987654321]).is_some());

        // Empty list means all users allowed
        assert!(parse_update(&from_other, &[]).is_some());

        let without_message = update(json!({ "update_id": 13 }));
        assert!(parse_update(&without_message, &[]).is_none());
    }

    #[test]
    fn test_render_markup() {
        assert!(render_markup(&ReplyMarkup::Keep).is_none());
        assert_eq!(
            render_markup(&ReplyMarkup::Remove).unwrap(),
            json!({ "remove_keyboard": true })
        );
        assert_eq!(
            render_markup(&ReplyMarkup::column(["CSV", "JSON"])).unwrap(),
            json!({
                "keyboard": [[{ "text": "CSV" }], [{ "text": "JSON" }]],
                "resize_keyboard": true
            })
        );
    }

    #[tokio::test]
    async fn test_start_without_token_fails() {
        let adapter = TelegramAdapter::new(create_test_config());
        let (tx, _rx) = mpsc::channel(10);

        let err = adapter.start(tx).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!adapter.is_connected());
    }

    #[tokio::test]
    async fn test_send_requires_running() {
        let adapter = TelegramAdapter::new(create_test_config());
        let result = adapter
            .send_message(OutboundMessage::new("telegram", "42", "hi"))
            .await;
        assert!(matches!(result, Err(Error::Channel(_))));
    }
}
