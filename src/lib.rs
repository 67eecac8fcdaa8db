//! HeritageBot - Conversational Assistant for Cultural Heritage Datasets
//!
//! HeritageBot lets a chat user upload a register of cultural heritage
//! objects as CSV or JSON, narrow it down with guided filters, sort it by
//! object name and download the result in either format.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       HeritageBot Gateway                        │
//! │  ┌────────────────────────────────────────────────────────────┐  │
//! │  │                   Channels (supervised)                    │  │
//! │  │  ┌──────────┐  ┌────────────────────────────────────────┐  │  │
//! │  │  │ Telegram │  │ any other ChannelAdapter               │  │  │
//! │  │  └────┬─────┘  └──────────────────┬─────────────────────┘  │  │
//! │  └───────┼───────────────────────────┼────────────────────────┘  │
//! │          └─────────────┬─────────────┘                           │
//! │                        │ ChannelEvent                            │
//! │  ┌─────────────────────▼──────────────────────────────────────┐  │
//! │  │                  Conversation Engine                       │  │
//! │  │  - Decode replies into commands                            │  │
//! │  │  - Dispatch on the user's stage                            │  │
//! │  │  - Recover failed flows back to the menu                   │  │
//! │  └───────┬──────────────────┬─────────────────────┬───────────┘  │
//! │          │                  │                     │              │
//! │  ┌───────▼──────┐   ┌───────▼──────┐   ┌──────────▼──────────┐   │
//! │  │ Session Store│   │ Query Engine │   │   Dataset Codec     │   │
//! │  │ per-user lock│   │ filter, sort │   │   CSV / JSON        │   │
//! │  └──────────────┘   └──────────────┘   └─────────────────────┘   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`gateway`]: Channel wiring, event loop and shutdown
//! - [`channels`]: Chat channel adapters
//! - [`conversation`]: Per-user conversation state machine
//! - [`session`]: Session state and store
//! - [`dataset`]: Records and the CSV/JSON codecs
//! - [`query`]: Filtering and sorting
//! - [`convert`]: Offline file conversion
//! - [`config`]: Configuration management

pub mod channels;
pub mod config;
pub mod conversation;
pub mod convert;
pub mod dataset;
pub mod error;
pub mod gateway;
pub mod query;
pub mod session;

pub use config::HeritageBotConfig;
pub use error::{Error, Result};
