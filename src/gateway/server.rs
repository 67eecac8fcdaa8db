//! Gateway server implementation

use crate::channels::supervisor::{self, Backoff};
use crate::channels::{ChannelAdapter, ChannelEvent, InboundMessage, OutboundMessage, ReplyMarkup, TelegramAdapter};
use crate::config::{HeritageBotConfig, TelegramConfig};
use crate::conversation::{prompts, ConversationEngine};
use crate::error::{Error, Result};
use crate::session::SessionStore;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

type ChannelMap = Arc<RwLock<HashMap<String, Arc<dyn ChannelAdapter>>>>;

const EVENT_QUEUE_SIZE: usize = 1000;

/// Gateway server state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    /// Not started
    Stopped,
    /// Starting up
    Starting,
    /// Running
    Running,
    /// Shutting down
    ShuttingDown,
}

/// HeritageBot gateway: owns the channels and feeds their events to the
/// conversation engine
pub struct Gateway {
    config: HeritageBotConfig,
    state: Arc<RwLock<GatewayState>>,
    engine: Arc<ConversationEngine>,
    channels: ChannelMap,
    /// Replaced on every start; the previous processor exits with it
    event_tx: RwLock<mpsc::Sender<ChannelEvent>>,
    /// Background tasks aborted on stop
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Gateway {
    /// Create a new gateway with the given configuration
    pub fn new(config: HeritageBotConfig) -> Self {
        let (event_tx, _) = mpsc::channel(EVENT_QUEUE_SIZE);
        let engine = Arc::new(ConversationEngine::new(Arc::new(SessionStore::new())));

        Self {
            config,
            state: Arc::new(RwLock::new(GatewayState::Stopped)),
            engine,
            channels: Arc::new(RwLock::new(HashMap::new())),
            event_tx: RwLock::new(event_tx),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Get current state
    pub async fn state(&self) -> GatewayState {
        *self.state.read().await
    }

    /// Add a channel adapter.
    ///
    /// Channels registered before `start` are started with it; later ones are
    /// started right away.
    pub async fn register_channel(&self, adapter: Arc<dyn ChannelAdapter>) {
        let name = adapter.name().to_string();
        self.channels.write().await.insert(name.clone(), adapter.clone());
        tracing::debug!("Registered channel {}", name);

        if self.state().await == GatewayState::Running {
            let event_tx = self.event_tx.read().await.clone();
            let handle = supervisor::spawn_supervised(adapter, event_tx, self.backoff());
            self.tasks.lock().await.push(handle);
        }
    }

    /// Start the gateway
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if *state != GatewayState::Stopped {
            return Err(Error::Internal("Gateway already running".to_string()));
        }
        *state = GatewayState::Starting;
        drop(state);

        tracing::info!("Starting HeritageBot Gateway");

        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        *self.event_tx.write().await = event_tx;
        self.start_event_processor(event_rx).await;
        self.init_channels().await;
        self.start_session_sweeper().await;

        *self.state.write().await = GatewayState::Running;

        tracing::info!(
            channels = ?self.active_channel_names().await,
            "HeritageBot Gateway started"
        );

        Ok(())
    }

    /// Stop the gateway.
    ///
    /// Everyone with a session is told the bot is paused before the channels
    /// go down.
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if *state != GatewayState::Running {
            return Ok(());
        }
        *state = GatewayState::ShuttingDown;
        drop(state);

        tracing::info!("Stopping HeritageBot Gateway");

        self.notify_paused().await;

        let channels: Vec<Arc<dyn ChannelAdapter>> = {
            let channels = self.channels.read().await;
            channels.values().cloned().collect()
        };

        for channel in channels {
            if let Err(e) = channel.stop().await {
                tracing::warn!("Failed to stop channel {}: {}", channel.name(), e);
            }
        }

        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }

        *self.state.write().await = GatewayState::Stopped;

        tracing::info!("HeritageBot Gateway stopped");

        Ok(())
    }

    fn backoff(&self) -> Backoff {
        Backoff::from(&self.config.supervisor)
    }

    /// Create configured adapters and start every channel under supervision
    async fn init_channels(&self) {
        if let Some(config) = &self.config.channels.telegram {
            let adapter: Arc<dyn ChannelAdapter> = Arc::new(TelegramAdapter::new(config.clone()));
            self.channels
                .write()
                .await
                .insert(adapter.name().to_string(), adapter);
        }

        let channels: Vec<Arc<dyn ChannelAdapter>> =
            self.channels.read().await.values().cloned().collect();
        let event_tx = self.event_tx.read().await.clone();
        let mut tasks = self.tasks.lock().await;
        for adapter in channels {
            tasks.push(supervisor::spawn_supervised(
                adapter,
                event_tx.clone(),
                self.backoff(),
            ));
        }
    }

    /// Start the event processor
    async fn start_event_processor(&self, mut rx: mpsc::Receiver<ChannelEvent>) {
        let engine = self.engine.clone();
        let channels = self.channels.clone();

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = Self::handle_event(event, &engine, &channels).await {
                    tracing::error!("Error handling event: {}", e);
                }
            }
        });
        self.tasks.lock().await.push(handle);
    }

    /// Periodically drop idle sessions, if an idle limit is configured
    async fn start_session_sweeper(&self) {
        let max_idle_secs = self.config.session.max_idle_secs;
        if max_idle_secs == 0 {
            return;
        }
        let period = Duration::from_secs(self.config.session.sweep_interval_secs.max(1));
        let max_idle_ms = i64::try_from(max_idle_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        let sessions = self.engine.sessions().clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                sessions.cleanup_inactive(max_idle_ms).await;
            }
        });
        self.tasks.lock().await.push(handle);
    }

    /// Handle a channel event
    async fn handle_event(
        event: ChannelEvent,
        engine: &ConversationEngine,
        channels: &ChannelMap,
    ) -> Result<()> {
        match event {
            ChannelEvent::Message(message) => {
                tracing::debug!(
                    "Received message from {} on {}: {}",
                    message.sender_id,
                    message.channel,
                    message.content
                );
                let channel = channels.read().await.get(&message.channel).cloned();
                match channel {
                    Some(channel) => engine.handle(channel.as_ref(), &message).await?,
                    None => tracing::warn!("Message for unknown channel {}", message.channel),
                }
            }
            ChannelEvent::Connected { channel } => {
                tracing::info!("Channel {} connected", channel);
            }
            ChannelEvent::Disconnected { channel, reason } => {
                tracing::warn!("Channel {} disconnected: {}", channel, reason);
            }
            ChannelEvent::Error { channel, error } => {
                tracing::error!("Channel {} error: {}", channel, error);
            }
        }

        Ok(())
    }

    /// Tell every user with a session that the bot is going away
    async fn notify_paused(&self) {
        let users = self.engine.sessions().active_users().await;
        let channels = self.channels.read().await;

        futures::future::join_all(users.iter().filter_map(|user| {
            let channel = channels.get(&user.channel)?;
            let message = OutboundMessage::new(&user.channel, &user.chat_id, prompts::BOT_PAUSED)
                .with_markup(ReplyMarkup::Remove);
            Some(async move {
                if let Err(e) = channel.send_message(message).await {
                    tracing::warn!("Failed to notify {} of shutdown: {}", user, e);
                }
            })
        }))
        .await;
    }

    /// Run one inbound message through the conversation directly, bypassing
    /// the event queue
    pub async fn process_message(&self, message: InboundMessage) -> Result<()> {
        let channel = self
            .channels
            .read()
            .await
            .get(&message.channel)
            .cloned()
            .ok_or_else(|| Error::Channel(format!("Unknown channel: {}", message.channel)))?;
        self.engine.handle(channel.as_ref(), &message).await
    }

    /// Get the conversation engine
    pub fn engine(&self) -> &Arc<ConversationEngine> {
        &self.engine
    }

    /// Get configuration
    pub fn config(&self) -> &HeritageBotConfig {
        &self.config
    }

    /// Get active channel names
    pub async fn active_channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get event sender for injecting external events.
    ///
    /// The sender belongs to the current run; events sent through it after
    /// a stop are dropped.
    pub async fn event_sender(&self) -> mpsc::Sender<ChannelEvent> {
        self.event_tx.read().await.clone()
    }

    /// Get gateway status information
    pub async fn status(&self) -> GatewayStatus {
        let state = *self.state.read().await;
        let session_count = self.engine.sessions().session_count().await;
        let channels = self.active_channel_names().await;

        GatewayStatus {
            state: format!("{:?}", state),
            session_count,
            channels,
        }
    }
}

/// Gateway status information
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    /// Current state
    pub state: String,
    /// Number of active sessions
    pub session_count: usize,
    /// Active channel names
    pub channels: Vec<String>,
}

/// Builder for Gateway
pub struct GatewayBuilder {
    config: HeritageBotConfig,
}

impl GatewayBuilder {
    /// Create a new builder with default config
    pub fn new() -> Self {
        Self {
            config: HeritageBotConfig::default(),
        }
    }

    /// Set the configuration
    pub fn config(mut self, config: HeritageBotConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable the Telegram channel
    pub fn telegram(mut self, telegram: TelegramConfig) -> Self {
        self.config.channels.telegram = Some(telegram);
        self
    }

    /// Evict sessions idle for this long (0 = never)
    pub fn max_idle_secs(mut self, secs: u64) -> Self {
        self.config.session.max_idle_secs = secs;
        self
    }

    /// Build the gateway
    pub fn build(self) -> Gateway {
        Gateway::new(self.config)
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::testing::RecordingAdapter;
    use crate::session::{Stage, UserKey};

    async fn wait_for_texts(adapter: &RecordingAdapter, count: usize) -> Vec<String> {
        let mut texts = Vec::new();
        for _ in 0..100 {
            texts.extend(adapter.take_texts());
            if texts.len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        texts
    }

    #[tokio::test]
    async fn test_gateway_creation() {
        let gateway = GatewayBuilder::new()
            .telegram(TelegramConfig::default())
            .max_idle_secs(600)
            .build();

        assert_eq!(gateway.state().await, GatewayState::Stopped);
        assert!(gateway.config().channels.telegram.is_some());
        assert_eq!(gateway.config().session.max_idle_secs, 600);
    }

    #[tokio::test]
    async fn test_gateway_lifecycle() {
        let gateway = GatewayBuilder::new().build();
        let adapter = Arc::new(RecordingAdapter::new("test"));
        gateway.register_channel(adapter.clone()).await;

        gateway.start().await.unwrap();
        assert_eq!(gateway.state().await, GatewayState::Running);
        assert!(gateway.start().await.is_err());

        for _ in 0..100 {
            if adapter.is_connected() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(adapter.is_connected());

        gateway.stop().await.unwrap();
        assert_eq!(gateway.state().await, GatewayState::Stopped);
        assert!(!adapter.is_connected());
        gateway.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_events_reach_the_conversation() {
        let gateway = GatewayBuilder::new().build();
        let adapter = Arc::new(RecordingAdapter::new("test"));
        gateway.register_channel(adapter.clone()).await;
        gateway.start().await.unwrap();

        gateway
            .event_sender()
            .await
            .send(ChannelEvent::Message(InboundMessage::new("test", "7", "42", "hi")))
            .await
            .unwrap();

        let texts = wait_for_texts(&adapter, 2).await;
        assert_eq!(texts, [prompts::WELCOME, prompts::CHOOSE_FORMAT]);

        let session = gateway
            .engine()
            .sessions()
            .get(&UserKey::new("test", "42"))
            .await;
        assert_eq!(session.lock().await.stage, Stage::AwaitFormat);

        gateway.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_restart_resumes_event_processing() {
        let gateway = GatewayBuilder::new().build();
        let adapter = Arc::new(RecordingAdapter::new("test"));
        gateway.register_channel(adapter.clone()).await;

        gateway.start().await.unwrap();
        gateway.stop().await.unwrap();
        gateway.start().await.unwrap();
        assert_eq!(gateway.state().await, GatewayState::Running);

        gateway
            .event_sender()
            .await
            .send(ChannelEvent::Message(InboundMessage::new("test", "8", "43", "hi")))
            .await
            .unwrap();

        let texts = wait_for_texts(&adapter, 2).await;
        assert_eq!(texts, [prompts::WELCOME, prompts::CHOOSE_FORMAT]);

        gateway.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_process_message() {
        let gateway = GatewayBuilder::new().build();
        let adapter = Arc::new(RecordingAdapter::new("test"));
        gateway.register_channel(adapter.clone()).await;

        gateway
            .process_message(InboundMessage::new("test", "7", "42", "/start"))
            .await
            .unwrap();
        assert_eq!(adapter.take_texts(), [prompts::WELCOME, prompts::CHOOSE_FORMAT]);

        let unknown = gateway
            .process_message(InboundMessage::new("nowhere", "7", "42", "hi"))
            .await;
        assert!(matches!(unknown, Err(Error::Channel(_))));
    }

    #[tokio::test]
    async fn test_stop_notifies_active_users() {
        let gateway = GatewayBuilder::new().build();
        let adapter = Arc::new(RecordingAdapter::new("test"));
        gateway.register_channel(adapter.clone()).await;
        gateway.start().await.unwrap();

        for chat in ["1", "2"] {
            gateway
                .process_message(InboundMessage::new("test", chat, chat, "hi"))
                .await
                .unwrap();
        }
        adapter.take_sent();

        gateway.stop().await.unwrap();

        let notices: Vec<OutboundMessage> = adapter
            .take_sent()
            .iter()
            .filter_map(|s| s.text().cloned())
            .collect();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|m| m.content == prompts::BOT_PAUSED));
        assert!(notices.iter().all(|m| m.markup == ReplyMarkup::Remove));
        assert_eq!(notices[0].chat_id, "1");
        assert_eq!(notices[1].chat_id, "2");
    }

    #[tokio::test]
    async fn test_status() {
        let gateway = GatewayBuilder::new().build();
        gateway
            .register_channel(Arc::new(RecordingAdapter::new("test")))
            .await;
        gateway
            .process_message(InboundMessage::new("test", "7", "42", "hi"))
            .await
            .unwrap();

        let status = gateway.status().await;
        assert_eq!(status.state, "Stopped");
        assert_eq!(status.session_count, 1);
        assert_eq!(status.channels, ["test"]);
    }
}
