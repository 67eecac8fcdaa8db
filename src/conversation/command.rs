//! Decoding inbound messages into commands
//!
//! Raw text is matched against button labels exactly once, here. Everything
//! downstream switches on [`Command`].

use crate::channels::{InboundMessage, MessageAttachment};
use crate::dataset::DataFormat;
use crate::query::{FilterMode, SortOrder};

const RESTART: &str = "/start";

/// Main menu entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Filter,
    Sort,
    Download,
    LoadNewFile,
}

impl MenuAction {
    pub const ALL: [MenuAction; 4] = [
        MenuAction::Filter,
        MenuAction::Sort,
        MenuAction::Download,
        MenuAction::LoadNewFile,
    ];

    /// Button label shown to users
    pub fn label(&self) -> &'static str {
        match self {
            Self::Filter => "Filter",
            Self::Sort => "Sort",
            Self::Download => "Download",
            Self::LoadNewFile => "Load new file",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.label() == label)
    }
}

/// What a text reply means, independent of the current stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Drop the session and start over
    Restart,
    /// A format button (`CSV` / `JSON`)
    Format(DataFormat),
    /// A main menu button
    Menu(MenuAction),
    /// A sort direction button
    Sort(SortOrder),
    /// A filter field button
    Filter(FilterMode),
    /// Free text, e.g. a filter value
    Other,
}

impl Command {
    pub fn parse(text: &str) -> Self {
        if text == RESTART || text.starts_with("/start@") {
            return Self::Restart;
        }
        if let Some(format) = DataFormat::from_label(text) {
            return Self::Format(format);
        }
        if let Some(action) = MenuAction::from_label(text) {
            return Self::Menu(action);
        }
        if let Some(order) = SortOrder::from_label(text) {
            return Self::Sort(order);
        }
        if let Some(mode) = FilterMode::from_label(text) {
            return Self::Filter(mode);
        }
        Self::Other
    }
}

/// A text reply: the decoded command plus the raw text, which filter steps
/// compare against dataset values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub command: Command,
}

impl Utterance {
    pub fn parse(text: &str) -> Self {
        Self {
            text: text.to_string(),
            command: Command::parse(text),
        }
    }
}

/// One inbound event, as the conversation engine sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Text(Utterance),
    Document(MessageAttachment),
    /// Neither text nor a file (stickers, photos, ...)
    Unsupported,
}

impl Input {
    /// Text wins over attachments
    pub fn decode(message: &InboundMessage) -> Self {
        if let Some(text) = message.text() {
            return Self::Text(Utterance::parse(text));
        }
        match message.attachments.first() {
            Some(attachment) => Self::Document(attachment.clone()),
            None => Self::Unsupported,
        }
    }
}
