//! Query engine over record sequences
//!
//! Pure functions: every operation returns a new sequence and leaves its
//! input untouched.

use crate::dataset::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Fields records can be filtered on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterField {
    SecurityStatus,
    Category,
    ObjectType,
}

impl FilterField {
    /// Canonical column identifier
    pub fn name(&self) -> &'static str {
        match self {
            Self::SecurityStatus => "SecurityStatus",
            Self::Category => "Category",
            Self::ObjectType => "ObjectType",
        }
    }

    fn value<'a>(&self, record: &'a Record) -> &'a str {
        match self {
            Self::SecurityStatus => &record.security_status,
            Self::Category => &record.category,
            Self::ObjectType => &record.object_type,
        }
    }
}

impl std::fmt::Display for FilterField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for FilterField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SecurityStatus" => Ok(Self::SecurityStatus),
            "Category" => Ok(Self::Category),
            "ObjectType" => Ok(Self::ObjectType),
            other => Err(format!("unknown filter field: {}", other)),
        }
    }
}

/// Filter flows a user can start from the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    /// Single selection on `SecurityStatus`
    SecurityStatus,
    /// Single selection on `ObjectType`
    ObjectType,
    /// `SecurityStatus` first, then `Category` among the remaining records
    SecurityStatusAndCategory,
}

impl FilterMode {
    pub const ALL: [FilterMode; 3] = [
        FilterMode::SecurityStatus,
        FilterMode::ObjectType,
        FilterMode::SecurityStatusAndCategory,
    ];

    /// Button label shown to users
    pub fn label(&self) -> &'static str {
        match self {
            Self::SecurityStatus => "SecurityStatus",
            Self::ObjectType => "ObjectType",
            Self::SecurityStatusAndCategory => "SecurityStatus and Category",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.label() == label)
    }

    /// Field selected first
    pub fn first_field(&self) -> FilterField {
        match self {
            Self::SecurityStatus | Self::SecurityStatusAndCategory => FilterField::SecurityStatus,
            Self::ObjectType => FilterField::ObjectType,
        }
    }

    /// Field selected second, for two-stage flows
    pub fn second_field(&self) -> Option<FilterField> {
        match self {
            Self::SecurityStatusAndCategory => Some(FilterField::Category),
            _ => None,
        }
    }
}

/// Sort direction on object name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub const ALL: [SortOrder; 2] = [SortOrder::Ascending, SortOrder::Descending];

    /// Button label shown to users
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ascending => "Sort ascending",
            Self::Descending => "Sort descending",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.label() == label)
    }

    pub fn is_ascending(&self) -> bool {
        matches!(self, Self::Ascending)
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

/// Keep records whose `field` equals `value` exactly
pub fn filter_by_field(records: &[Record], field: FilterField, value: &str) -> Vec<Record> {
    records
        .iter()
        .filter(|r| field.value(r) == value)
        .cloned()
        .collect()
}

/// Like [`filter_by_field`], addressed by column name; unknown names leave
/// the records unchanged.
pub fn filter_by_field_name(records: &[Record], field_name: &str, value: &str) -> Vec<Record> {
    match field_name.parse::<FilterField>() {
        Ok(field) => filter_by_field(records, field, value),
        Err(_) => records.to_vec(),
    }
}

/// Distinct values of `field`, ascending by ordinal comparison.
///
/// Empty strings are values like any other.
pub fn distinct_values(records: &[Record], field: FilterField) -> Vec<String> {
    records
        .iter()
        .map(|r| field.value(r))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Stable sort on object name
pub fn sort_by_object_name(records: &[Record], ascending: bool) -> Vec<Record> {
    let mut sorted = records.to_vec();
    if ascending {
        sorted.sort_by(|a, b| a.object_name.cmp(&b.object_name));
    } else {
        sorted.sort_by(|a, b| b.object_name.cmp(&a.object_name));
    }
    sorted
}
