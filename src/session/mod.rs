//! Per-user session state and storage

mod state;
mod store;

pub use state::{FilterStep, Session, Stage};
pub use store::{SessionHandle, SessionStore, UserKey};
