//! Extracts complete record objects from a broken or truncated array.
//!
//! Each top-level object span inside the records array parses in isolation;
//! one corrupt record never aborts the scan, and an empty result is a valid
//! outcome rather than an error.

use serde_json::Value;
use tracing::debug;

use crate::scan::{scan, ScanState};
use crate::types::RECORDS_KEY;

/// Index of the `[` opening the records array: the array field's key when the
/// input is an object wrapper, otherwise the first bracket in the text.
fn find_records_array(text: &str) -> Option<usize> {
    let trimmed = text.trim_start();
    let lead = text.len() - trimmed.len();
    if trimmed.starts_with('[') {
        return Some(lead);
    }
    if let Some(key) = text.find(&format!("\"{RECORDS_KEY}\"")) {
        if let Some(rel) = text[key..].find('[') {
            return Some(key + rel);
        }
    }
    text.find('[')
}

/// Cheap pre-filter applied before full validation: a salvageable record
/// must already carry a non-empty id, a non-empty title, and a priority.
fn has_min_fields(value: &Value) -> bool {
    let obj = match value.as_object() {
        Some(obj) => obj,
        None => return false,
    };
    let non_empty = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty())
    };
    non_empty("id") && non_empty("title") && obj.contains_key("priority")
}

fn consider(span: &str, accepted: &mut Vec<Value>) {
    match serde_json::from_str::<Value>(span) {
        Ok(value) if has_min_fields(&value) => accepted.push(value),
        Ok(_) => debug!(len = span.len(), "salvage: span missing required fields"),
        Err(err) => debug!(%err, len = span.len(), "salvage: span failed to parse"),
    }
}

/// Walks the records array and returns every complete object that parses and
/// carries the minimum fields, in source order. A trailing partial record is
/// closed with the repairer's bracket-closing rule and given one chance.
pub fn salvage_records(text: &str) -> Vec<Value> {
    let start = match find_records_array(text) {
        Some(start) => start,
        None => return Vec::new(),
    };

    let bytes = text.as_bytes();
    let mut state = ScanState::default();
    let mut record_start: Option<usize> = None;
    let mut accepted = Vec::new();

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        let was_in_string = state.in_string();
        state.step(b);
        if was_in_string {
            continue;
        }
        match b {
            // Depth 2 = the array plus this object: a top-level record.
            b'{' if state.depth() == 2 => {
                if record_start.is_none() {
                    record_start = Some(i);
                }
            }
            b'}' if state.depth() == 1 => {
                if let Some(s) = record_start.take() {
                    consider(&text[s..=i], &mut accepted);
                }
            }
            b']' if state.depth() == 0 => break,
            _ => {}
        }
    }

    // Truncated mid-record: close the partial span with brackets only. A
    // string cut mid-value stays open, the parse fails, and the tail is
    // dropped instead of gaining a fabricated value.
    if let Some(s) = record_start {
        let partial = &text[s..];
        let closers = scan(partial).closing_suffix();
        if !closers.is_empty() {
            consider(&format!("{partial}{closers}"), &mut accepted);
        }
    }

    accepted
}
