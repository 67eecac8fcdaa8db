//! JSON codec

use super::record::Record;
use super::strip_bom;
use crate::error::{Error, Result};

/// Parse a JSON array of records.
///
/// Malformed input (including a bare `null`) is a parse failure, never an
/// empty dataset.
pub fn parse_structured(payload: &[u8]) -> Result<Vec<Record>> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| Error::Parse(format!("payload is not valid UTF-8: {}", e)))?;
    serde_json::from_str(strip_bom(text))
        .map_err(|e| Error::Parse(format!("invalid JSON dataset: {}", e)))
}

/// Serialize records as indented JSON; non-ASCII text is written as-is.
pub fn serialize_structured(records: &[Record]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(records)?)
}
