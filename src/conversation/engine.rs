//! Conversation state machine
//!
//! One inbound message resolves to a single stage transition and the
//! replies that go with it. The per-user session lock is held for the whole
//! event, so two messages from the same chat never interleave.

use super::command::{Command, Input, MenuAction, Utterance};
use super::prompts;
use crate::channels::{
    ChannelAdapter, InboundMessage, MessageAttachment, OutboundDocument, OutboundMessage,
    ReplyMarkup,
};
use crate::dataset::DataFormat;
use crate::error::{Error, Result};
use crate::query::{distinct_values, filter_by_field, sort_by_object_name};
use crate::session::{FilterStep, Session, SessionStore, Stage, UserKey};
use std::sync::Arc;

/// Replies for one chat
struct Outbox<'a> {
    channel: &'a dyn ChannelAdapter,
    chat_id: &'a str,
}

impl Outbox<'_> {
    async fn send(&self, content: &str, markup: ReplyMarkup) -> Result<()> {
        let message =
            OutboundMessage::new(self.channel.name(), self.chat_id, content).with_markup(markup);
        self.channel.send_message(message).await?;
        Ok(())
    }

    async fn text(&self, content: &str) -> Result<()> {
        self.send(content, ReplyMarkup::Keep).await
    }

    async fn menu(&self) -> Result<()> {
        self.send(prompts::CHOOSE_MENU, prompts::menu_keyboard()).await
    }

    async fn format_prompt(&self) -> Result<()> {
        self.send(prompts::CHOOSE_FORMAT, prompts::format_keyboard())
            .await
    }

    async fn document(&self, file_name: &str, content: Vec<u8>) -> Result<()> {
        let document = OutboundDocument::new(self.channel.name(), self.chat_id, file_name, content);
        self.channel.send_document(document).await?;
        Ok(())
    }
}

/// Flows that recover to the menu when they fail
#[derive(Debug, Clone, Copy)]
enum Flow {
    Menu,
    Sort,
    Filter,
    Export,
}

impl Flow {
    fn failure_text(&self) -> &'static str {
        match self {
            Flow::Menu => prompts::MENU_FAILED,
            Flow::Sort => prompts::SORT_FAILED,
            Flow::Filter => prompts::FILTER_FAILED,
            Flow::Export => prompts::EXPORT_FAILED,
        }
    }
}

impl std::fmt::Display for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Flow::Menu => "menu",
            Flow::Sort => "sort",
            Flow::Filter => "filter",
            Flow::Export => "export",
        };
        write!(f, "{}", name)
    }
}

/// Drives every user's conversation
pub struct ConversationEngine {
    sessions: Arc<SessionStore>,
}

impl ConversationEngine {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }

    /// Session store backing this engine
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Handle one inbound message, replying through `channel`.
    ///
    /// Errors returned here are delivery failures that even the recovery
    /// replies could not get past.
    pub async fn handle(&self, channel: &dyn ChannelAdapter, message: &InboundMessage) -> Result<()> {
        let key = UserKey::new(&message.channel, &message.chat_id);
        let out = Outbox {
            channel,
            chat_id: &message.chat_id,
        };

        match Input::decode(message) {
            Input::Text(utterance) => {
                if utterance.command == Command::Restart {
                    self.sessions.remove(&key).await;
                }
                let handle = self.sessions.get(&key).await;
                let mut session = handle.lock().await;
                session.touch();
                self.on_text(&out, &mut session, &utterance).await
            }
            Input::Document(attachment) => {
                if let Some(handle) = self.sessions.find(&key).await {
                    let mut session = handle.lock().await;
                    if session.stage == Stage::AwaitFile {
                        session.touch();
                        return self.on_document(&out, &mut session, &attachment).await;
                    }
                }
                tracing::debug!("Ignoring unexpected attachment from {}", key);
                out.text(prompts::CHOOSE_FROM_OPTIONS).await
            }
            Input::Unsupported => out.text(prompts::CHOOSE_FROM_OPTIONS).await,
        }
    }

    async fn on_text(&self, out: &Outbox<'_>, session: &mut Session, utterance: &Utterance) -> Result<()> {
        let flow = match session.stage {
            Stage::New => {
                session.stage = Stage::AwaitFormat;
                out.text(prompts::WELCOME).await?;
                return out.format_prompt().await;
            }
            Stage::AwaitFormat => return self.choose_format(out, session, utterance).await,
            Stage::AwaitFile => return out.text(prompts::SEND_THE_FILE).await,
            Stage::Menu => Flow::Menu,
            Stage::Sorting => Flow::Sort,
            Stage::Filtering(_) => Flow::Filter,
            Stage::Exporting => Flow::Export,
        };

        let result = match flow {
            Flow::Menu => self.on_menu(out, session, utterance).await,
            Flow::Sort => self.on_sort(out, session, utterance).await,
            Flow::Filter => self.on_filter(out, session, utterance).await,
            Flow::Export => self.on_export(out, session, utterance).await,
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!("Failed to run {} for {}: {}", flow, session.user_id, e);
                session.back_to_menu();
                out.text(flow.failure_text()).await?;
                out.menu().await
            }
        }
    }

    async fn choose_format(&self, out: &Outbox<'_>, session: &mut Session, utterance: &Utterance) -> Result<()> {
        let Command::Format(format) = utterance.command else {
            return out.format_prompt().await;
        };
        session.format = Some(format);
        session.stage = Stage::AwaitFile;
        out.send(&prompts::send_file_of(format), ReplyMarkup::Remove)
            .await
    }

    async fn on_document(
        &self,
        out: &Outbox<'_>,
        session: &mut Session,
        attachment: &MessageAttachment,
    ) -> Result<()> {
        let Some(format) = session.format else {
            session.stage = Stage::AwaitFormat;
            return out.format_prompt().await;
        };
        let file_name = attachment.file_name.clone().unwrap_or_default();
        if !format.matches_file_name(&file_name) {
            return out.text(prompts::WRONG_EXTENSION).await;
        }

        let loaded = match out.channel.fetch_attachment(attachment).await {
            Ok(payload) => format.parse(&payload),
            Err(e) => Err(e),
        };

        match loaded {
            Ok(records) => {
                tracing::info!(
                    user = %session.user_id,
                    count = records.len(),
                    "Loaded {} dataset from {}",
                    format,
                    file_name
                );
                session.records = Some(records);
                session.file_base_name = Some(format.base_name(&file_name).to_string());
                session.back_to_menu();
                out.menu().await
            }
            Err(e) if e.is_parse_failure() => {
                tracing::warn!(user = %session.user_id, "Rejected {}: {}", file_name, e);
                out.text(prompts::INVALID_DATA).await?;
                match format {
                    DataFormat::Tabular => {
                        session.format = None;
                        session.stage = Stage::AwaitFormat;
                        out.format_prompt().await
                    }
                    DataFormat::Structured => {
                        out.send(&prompts::send_file_of(format), ReplyMarkup::Remove)
                            .await
                    }
                }
            }
            Err(e) => {
                tracing::error!("Failed to read {} for {}: {}", file_name, session.user_id, e);
                session.format = None;
                session.stage = Stage::AwaitFormat;
                out.text(prompts::READ_FAILED).await?;
                out.format_prompt().await
            }
        }
    }

    async fn on_menu(&self, out: &Outbox<'_>, session: &mut Session, utterance: &Utterance) -> Result<()> {
        let Command::Menu(action) = utterance.command else {
            return out.menu().await;
        };

        match action {
            MenuAction::LoadNewFile => {
                session.reset();
                out.format_prompt().await
            }
            _ if session.records.is_none() => {
                out.text(prompts::NO_DATA).await?;
                out.menu().await
            }
            MenuAction::Sort => {
                session.stage = Stage::Sorting;
                out.send(prompts::CHOOSE_OPTION, prompts::sort_keyboard())
                    .await
            }
            MenuAction::Filter => {
                session.stage = Stage::Filtering(FilterStep::ChooseField);
                out.send(prompts::CHOOSE_OPTION, prompts::filter_field_keyboard())
                    .await
            }
            MenuAction::Download => {
                session.stage = Stage::Exporting;
                out.format_prompt().await
            }
        }
    }

    async fn on_sort(&self, out: &Outbox<'_>, session: &mut Session, utterance: &Utterance) -> Result<()> {
        let Some(records) = session.records.as_deref() else {
            return self.no_data(out, session).await;
        };
        let Command::Sort(order) = utterance.command else {
            return out
                .send(prompts::CHOOSE_OPTION, prompts::sort_keyboard())
                .await;
        };

        session.records = Some(sort_by_object_name(records, order.is_ascending()));
        session.back_to_menu();
        out.menu().await
    }

    async fn on_filter(&self, out: &Outbox<'_>, session: &mut Session, utterance: &Utterance) -> Result<()> {
        let step = match &session.stage {
            Stage::Filtering(step) => step.clone(),
            _ => FilterStep::ChooseField,
        };
        let Some(records) = session.records.as_deref() else {
            return self.no_data(out, session).await;
        };

        match step {
            FilterStep::ChooseField => {
                let Command::Filter(mode) = utterance.command else {
                    return out
                        .send(prompts::CHOOSE_OPTION, prompts::filter_field_keyboard())
                        .await;
                };
                let values = distinct_values(records, mode.first_field());
                session.stage = Stage::Filtering(FilterStep::FirstValue { mode });
                self.offer_values(out, session, values).await
            }
            FilterStep::FirstValue { mode } => {
                let field = mode.first_field();
                let values = distinct_values(records, field);
                let Some(chosen) = resolve_value(&values, &utterance.text) else {
                    return self.reject_value(out, session, values).await;
                };

                match mode.second_field() {
                    Some(second) => {
                        let narrowed = filter_by_field(records, field, &chosen);
                        let values = distinct_values(&narrowed, second);
                        session.stage = Stage::Filtering(FilterStep::SecondValue {
                            mode,
                            first: chosen,
                        });
                        self.offer_values(out, session, values).await
                    }
                    None => {
                        session.records = Some(filter_by_field(records, field, &chosen));
                        session.back_to_menu();
                        out.menu().await
                    }
                }
            }
            FilterStep::SecondValue { mode, first } => {
                let second = mode.second_field().ok_or_else(|| {
                    Error::Session(format!("{} has no second filter field", mode.label()))
                })?;
                let narrowed = filter_by_field(records, mode.first_field(), &first);
                let values = distinct_values(&narrowed, second);
                let Some(chosen) = resolve_value(&values, &utterance.text) else {
                    return self.reject_value(out, session, values).await;
                };

                session.records = Some(filter_by_field(&narrowed, second, &chosen));
                session.back_to_menu();
                out.menu().await
            }
        }
    }

    async fn on_export(&self, out: &Outbox<'_>, session: &mut Session, utterance: &Utterance) -> Result<()> {
        let Command::Format(format) = utterance.command else {
            return out.format_prompt().await;
        };
        let Some(records) = session.records.as_deref() else {
            return self.no_data(out, session).await;
        };

        let content = format.serialize(records)?;
        let base_name = session
            .file_base_name
            .as_deref()
            .unwrap_or(prompts::FALLBACK_BASE_NAME);
        let file_name = format!("{}{}", base_name, format.extension());
        session.format = Some(format);

        out.send(&prompts::export_caption(format), ReplyMarkup::Remove)
            .await?;
        out.document(&file_name, content).await?;
        tracing::debug!(user = %session.user_id, "Sent {}", file_name);

        session.back_to_menu();
        out.menu().await
    }

    /// Show candidate values, or abort the filter when there are none
    async fn offer_values(&self, out: &Outbox<'_>, session: &mut Session, values: Vec<String>) -> Result<()> {
        if values.is_empty() {
            session.back_to_menu();
            out.text(prompts::NOTHING_TO_SELECT).await?;
            return out.menu().await;
        }
        out.send(prompts::CHOOSE_OPTION, prompts::values_keyboard(&values))
            .await
    }

    async fn reject_value(&self, out: &Outbox<'_>, session: &mut Session, values: Vec<String>) -> Result<()> {
        if !values.is_empty() {
            out.text(prompts::NO_SUCH_VALUE).await?;
        }
        self.offer_values(out, session, values).await
    }

    async fn no_data(&self, out: &Outbox<'_>, session: &mut Session) -> Result<()> {
        session.back_to_menu();
        out.text(prompts::NO_DATA).await?;
        out.menu().await
    }
}

/// Match a reply against candidate values, reading the blank-value label
/// back as the empty string
fn resolve_value(values: &[String], text: &str) -> Option<String> {
    if values.iter().any(|v| v == text) {
        return Some(text.to_string());
    }
    if text == prompts::EMPTY_VALUE && values.iter().any(String::is_empty) {
        return Some(String::new());
    }
    None
}
