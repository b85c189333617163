//! Validates loosely-typed objects from any stage into fully-typed records.

use serde_json::Value;
use tracing::debug;

use crate::types::{TestCase, RECORDS_KEY};

/// One record excluded during validation; reported for logs, never blocking
/// an otherwise-successful batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub index: usize,
    pub reason: String,
}

/// Pulls the record values out of a parsed document: a root array, an object
/// wrapper's `testCases` array, or a single record-shaped object.
pub fn record_values(root: Value) -> Option<Vec<Value>> {
    fn objects(items: Vec<Value>) -> Vec<Value> {
        items.into_iter().filter(Value::is_object).collect()
    }
    match root {
        Value::Array(items) => Some(objects(items)),
        Value::Object(mut map) => match map.remove(RECORDS_KEY) {
            Some(Value::Array(items)) => Some(objects(items)),
            Some(_) | None => {
                if map.contains_key("id") {
                    Some(vec![Value::Object(map)])
                } else {
                    None
                }
            }
        },
        _ => None,
    }
}

fn check(case: &mut TestCase) -> Result<(), String> {
    if case.id.trim().is_empty() {
        return Err("id must be a non-empty string".into());
    }
    if case.title.trim().is_empty() {
        return Err("title must be a non-empty string".into());
    }
    if case.steps.is_empty() {
        return Err("steps must be a non-empty list".into());
    }
    for (i, step) in case.steps.iter_mut().enumerate() {
        if step.action.trim().is_empty() {
            return Err(format!("step {} has an empty action", i + 1));
        }
        if step.expected_result.trim().is_empty() {
            return Err(format!("step {} has an empty expected result", i + 1));
        }
        if step.id.trim().is_empty() {
            step.id = format!("step-{}", i + 1);
        }
    }
    Ok(())
}

/// Applies the record schema to each object independently. Deserialization
/// enforces types and the priority enumeration (unknown levels reject the
/// record, a missing one defaults to medium); the explicit checks enforce
/// non-empty required text.
pub fn validate_records(values: Vec<Value>) -> (Vec<TestCase>, Vec<Rejection>) {
    let mut accepted = Vec::with_capacity(values.len());
    let mut rejected = Vec::new();
    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<TestCase>(value) {
            Ok(mut case) => match check(&mut case) {
                Ok(()) => accepted.push(case),
                Err(reason) => {
                    debug!(index, %reason, "schema: record rejected");
                    rejected.push(Rejection { index, reason });
                }
            },
            Err(err) => {
                let reason = err.to_string();
                debug!(index, %reason, "schema: record failed to deserialize");
                rejected.push(Rejection { index, reason });
            }
        }
    }
    (accepted, rejected)
}
