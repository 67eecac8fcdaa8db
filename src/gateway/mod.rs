//! Gateway server for HeritageBot
//!
//! Starts the configured channels under supervision, feeds their events to
//! the conversation engine and pauses every conversation on shutdown.

mod server;

pub use server::{Gateway, GatewayBuilder, GatewayState, GatewayStatus};
