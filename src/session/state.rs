//! Per-user conversation state

use crate::dataset::{DataFormat, Record};
use crate::query::FilterMode;

/// Where a conversation currently stands.
///
/// Sort, filter and export flows are variants, so at most one of them can
/// be in progress.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Stage {
    /// Nothing said yet; the next message gets the welcome
    #[default]
    New,
    /// Waiting for the user to pick a file format
    AwaitFormat,
    /// Format chosen, waiting for the file itself
    AwaitFile,
    /// Dataset loaded, main menu shown
    Menu,
    /// Waiting for a sort direction
    Sorting,
    /// Inside a filter flow
    Filtering(FilterStep),
    /// Waiting for an export format
    Exporting,
}

/// Position inside a filter flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterStep {
    /// Waiting for the field (or field pair) to filter on
    ChooseField,
    /// Waiting for the value of the first field
    FirstValue { mode: FilterMode },
    /// Two-stage flow: first value chosen, waiting for the `Category` value
    SecondValue { mode: FilterMode, first: String },
}

/// A user session
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session ID, new on every restart
    pub id: String,
    /// Store key this session lives under
    pub user_id: String,
    /// Format the session is bound to
    pub format: Option<DataFormat>,
    /// Working dataset; `None` until a file is ingested
    pub records: Option<Vec<Record>>,
    /// Uploaded file name with its extension text removed
    pub file_base_name: Option<String>,
    /// Current stage
    pub stage: Stage,
    /// Creation timestamp
    pub created_at: i64,
    /// Last activity timestamp
    last_activity: i64,
}

impl Session {
    /// Create a new session
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            format: None,
            records: None,
            file_base_name: None,
            stage: Stage::New,
            created_at: now,
            last_activity: now,
        }
    }

    /// Clear everything a user has chosen or loaded, keeping identity.
    ///
    /// The session goes back to format selection.
    pub fn reset(&mut self) {
        self.format = None;
        self.records = None;
        self.file_base_name = None;
        self.stage = Stage::AwaitFormat;
    }

    /// Active filter flow, once a field has been chosen
    pub fn filter_mode(&self) -> Option<FilterMode> {
        match &self.stage {
            Stage::Filtering(FilterStep::FirstValue { mode })
            | Stage::Filtering(FilterStep::SecondValue { mode, .. }) => Some(*mode),
            _ => None,
        }
    }

    /// Value chosen at the first step of a two-stage flow
    pub fn first_filter_value(&self) -> Option<&str> {
        match &self.stage {
            Stage::Filtering(FilterStep::SecondValue { first, .. }) => Some(first),
            _ => None,
        }
    }

    /// Leave any sort, filter or export flow
    pub fn back_to_menu(&mut self) {
        self.stage = Stage::Menu;
    }

    /// Update last activity
    pub fn touch(&mut self) {
        self.last_activity = chrono::Utc::now().timestamp_millis();
    }

    /// Get last activity timestamp
    pub fn last_activity(&self) -> i64 {
        self.last_activity
    }
}
