//! Per-user conversation flow
//!
//! Inbound messages are decoded into commands ([`command`]), dispatched on
//! the session's stage ([`ConversationEngine`]) and answered with the texts
//! and keyboards in [`prompts`].

pub mod command;
mod engine;
pub mod prompts;

pub use command::{Command, Input, MenuAction, Utterance};
pub use engine::ConversationEngine;
