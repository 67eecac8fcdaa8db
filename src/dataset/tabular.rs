//! Semicolon-separated tabular codec

use super::record::{Record, COLUMN_IDS, COLUMN_TITLES};
use super::strip_bom;
use crate::error::{Error, Result};

const SEPARATOR: char = ';';

/// Parse a tabular payload.
///
/// The first line must carry the eight quoted canonical column identifiers
/// in order; the second (human-readable) line is skipped. Data lines with
/// fewer than eight fields are ignored.
pub fn parse_tabular(text: &str) -> Result<Vec<Record>> {
    let lines: Vec<&str> = strip_bom(text)
        .trim_matches('\n')
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    if !header_matches(lines[0]) {
        return Err(Error::Parse(
            "header row does not match the expected columns".to_string(),
        ));
    }
    if lines.len() < 3 {
        return Err(Error::Parse(format!(
            "expected a header, a sub-header and data rows, got {} line(s)",
            lines.len()
        )));
    }

    let records = lines[2..]
        .iter()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(SEPARATOR).collect();
            if fields.len() < COLUMN_IDS.len() {
                return None;
            }
            Some(Record::from_fields(std::array::from_fn(|i| {
                unquote(fields[i]).to_string()
            })))
        })
        .collect();

    Ok(records)
}

/// Serialize records with both header rows, every field quoted and each
/// line ending in a trailing separator.
pub fn serialize_tabular(records: &[Record]) -> String {
    let mut out = String::new();
    push_line(&mut out, COLUMN_IDS);
    push_line(&mut out, COLUMN_TITLES);
    for record in records {
        push_line(&mut out, record.fields());
    }
    out
}

fn header_matches(line: &str) -> bool {
    let fields: Vec<&str> = line.split(SEPARATOR).collect();
    fields.len() >= COLUMN_IDS.len()
        && COLUMN_IDS
            .iter()
            .zip(&fields)
            .all(|(expected, field)| unquote(field) == *expected)
}

/// Drop the first and last character of a field; shorter fields pass through.
fn unquote(field: &str) -> &str {
    let mut chars = field.chars();
    match (chars.next(), chars.next_back()) {
        (Some(_), Some(_)) => chars.as_str(),
        _ => field,
    }
}

fn push_line(out: &mut String, fields: [&str; 8]) {
    for field in fields {
        out.push('"');
        out.push_str(field);
        out.push('"');
        out.push(SEPARATOR);
    }
    out.push('\n');
}
