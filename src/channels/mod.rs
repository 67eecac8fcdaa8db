//! Chat channel adapters
//!
//! Provides a unified interface for receiving user input and sending
//! prompts and files across messaging platforms.

mod adapter;
mod message;
pub mod supervisor;
mod telegram;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{AdapterBase, AdapterStatus, ChannelAdapter, ChannelEvent};
pub use message::{
    InboundMessage, MessageAttachment, OutboundDocument, OutboundMessage, ReplyMarkup,
};
pub use telegram::TelegramAdapter;
