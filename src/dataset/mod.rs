//! Cultural heritage datasets and their wire formats
//!
//! A dataset is an ordered list of [`Record`]s. Two wire formats are
//! supported:
//!
//! - [`DataFormat::Tabular`]: semicolon-separated values with a canonical
//!   English header row and a human-readable Russian header row
//! - [`DataFormat::Structured`]: an indented JSON array of objects keyed by
//!   the canonical column identifiers

mod record;
mod structured;
mod tabular;

pub use record::{Record, COLUMN_IDS, COLUMN_TITLES};
pub use structured::{parse_structured, serialize_structured};
pub use tabular::{parse_tabular, serialize_tabular};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Byte order mark some editors prepend to UTF-8 files
const UTF8_BOM: char = '\u{feff}';

/// Wire format a session is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
    /// Semicolon-separated text (CSV)
    Tabular,
    /// Self-describing JSON
    Structured,
}

impl DataFormat {
    /// All formats, in the order they are offered to users
    pub const ALL: [DataFormat; 2] = [DataFormat::Tabular, DataFormat::Structured];

    /// Button label shown to users
    pub fn label(&self) -> &'static str {
        match self {
            Self::Tabular => "CSV",
            Self::Structured => "JSON",
        }
    }

    /// Lowercase file extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Tabular => "csv",
            Self::Structured => "json",
        }
    }

    /// Parse a user-facing label (`CSV` / `JSON`)
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.label() == label)
    }

    /// Whether a file name carries this format's extension
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        let suffix = format!(".{}", self.extension());
        file_name.to_ascii_lowercase().ends_with(&suffix)
    }

    /// Strip the extension text from an uploaded file name, keeping the dot.
    ///
    /// `objects.csv` becomes `objects.`, so appending another extension
    /// yields `objects.json`.
    pub fn base_name<'a>(&self, file_name: &'a str) -> &'a str {
        if self.matches_file_name(file_name) {
            &file_name[..file_name.len() - self.extension().len()]
        } else {
            file_name
        }
    }

    /// Infer the format of a local file from its extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        Self::ALL
            .into_iter()
            .find(|f| f.matches_file_name(name))
            .ok_or_else(|| {
                Error::FormatMismatch(format!(
                    "'{}' is neither a .csv nor a .json file",
                    path.display()
                ))
            })
    }

    /// Parse a raw payload in this format
    pub fn parse(&self, payload: &[u8]) -> Result<Vec<Record>> {
        match self {
            Self::Tabular => {
                let text = std::str::from_utf8(payload)
                    .map_err(|e| Error::Parse(format!("payload is not valid UTF-8: {}", e)))?;
                parse_tabular(text)
            }
            Self::Structured => parse_structured(payload),
        }
    }

    /// Serialize records into this format
    pub fn serialize(&self, records: &[Record]) -> Result<Vec<u8>> {
        match self {
            Self::Tabular => Ok(serialize_tabular(records).into_bytes()),
            Self::Structured => serialize_structured(records),
        }
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for DataFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" | "tabular" => Ok(Self::Tabular),
            "json" | "structured" => Ok(Self::Structured),
            other => Err(format!("unknown data format: {}", other)),
        }
    }
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix(UTF8_BOM).unwrap_or(text)
}
