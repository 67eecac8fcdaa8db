//! User-facing texts and reply keyboards

use super::command::MenuAction;
use crate::channels::ReplyMarkup;
use crate::dataset::DataFormat;
use crate::query::{FilterMode, SortOrder};

pub const WELCOME: &str = "Welcome to the cultural heritage data bot!";
pub const CHOOSE_FORMAT: &str = "Choose a file type:";
pub const CHOOSE_MENU: &str = "Choose a menu item:";
pub const CHOOSE_OPTION: &str = "Choose an option:";
pub const SEND_THE_FILE: &str = "Send the file.";
pub const CHOOSE_FROM_OPTIONS: &str = "Choose one of the suggested options!";

pub const NO_DATA: &str = "No data!";
pub const NO_SUCH_VALUE: &str = "No such value!";
pub const NOTHING_TO_SELECT: &str = "Nothing to select, there are no values!";
pub const WRONG_EXTENSION: &str = "Send a file with the correct format!";
pub const INVALID_DATA: &str = "Send a file with correct data!";

pub const READ_FAILED: &str = "An error occurred while reading the file.";
pub const SORT_FAILED: &str = "An error occurred while sorting the data.";
pub const FILTER_FAILED: &str = "An error occurred while filtering the data.";
pub const EXPORT_FAILED: &str = "An error occurred while writing the file.";
pub const MENU_FAILED: &str = "An error occurred, please try again.";

pub const BOT_PAUSED: &str = "The bot has been paused!\nSend anything once it is back.";

/// Button label standing in for a blank field value
pub const EMPTY_VALUE: &str = "(empty)";

/// Base name used when a session never recorded an uploaded file name
pub const FALLBACK_BASE_NAME: &str = "dataset.";

pub fn send_file_of(format: DataFormat) -> String {
    format!("Send a {} file.", format.label())
}

pub fn export_caption(format: DataFormat) -> String {
    format!("Resulting {} file.", format.extension())
}

pub fn format_keyboard() -> ReplyMarkup {
    ReplyMarkup::column(DataFormat::ALL.iter().map(DataFormat::label))
}

pub fn menu_keyboard() -> ReplyMarkup {
    ReplyMarkup::column(MenuAction::ALL.iter().map(MenuAction::label))
}

pub fn sort_keyboard() -> ReplyMarkup {
    ReplyMarkup::column(SortOrder::ALL.iter().map(SortOrder::label))
}

pub fn filter_field_keyboard() -> ReplyMarkup {
    ReplyMarkup::column(FilterMode::ALL.iter().map(FilterMode::label))
}

pub fn values_keyboard(values: &[String]) -> ReplyMarkup {
    ReplyMarkup::column(values.iter().map(|v| {
        if v.is_empty() {
            EMPTY_VALUE
        } else {
            v.as_str()
        }
    }))
}
