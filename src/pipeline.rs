//! Recovery orchestrator: sequences Direct → Repair → Salvage and mediates
//! the single caller-supplied retry.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::RecoveryError;
use crate::extract::extract_candidate;
use crate::repair::{repair_candidate, rescue_flat_records};
use crate::salvage::salvage_records;
use crate::schema::{record_values, validate_records};
use crate::types::{RecoveryOutcome, Stage, TestCase};

/// Corrective instruction the caller appends to its upstream request for the
/// one permitted retry.
pub const RETRY_INSTRUCTION: &str = "Your previous reply could not be parsed. \
Respond with only a valid JSON object of the form {\"testCases\": [...]}: no \
prose, no markdown fences, and no trailing commas. Every test case needs \
\"id\", \"title\", \"steps\" and \"priority\" fields.";

struct AttemptFailure {
    reason: RecoveryError,
    diagnostics: Vec<String>,
}

/// Validates one stage's record objects; `Some` only when at least one
/// record survives.
fn accept(
    values: Vec<Value>,
    stage: Stage,
    saw_records: &mut bool,
    diagnostics: &mut Vec<String>,
) -> Option<Vec<TestCase>> {
    if values.is_empty() {
        diagnostics.push(format!("{stage}: no record objects found"));
        return None;
    }
    *saw_records = true;
    let total = values.len();
    let (cases, rejected) = validate_records(values);
    if cases.is_empty() {
        diagnostics.push(format!("{stage}: all {total} records failed validation"));
        return None;
    }
    debug!(%stage, accepted = cases.len(), rejected = rejected.len(), "batch validated");
    Some(cases)
}

fn attempt(raw: &str) -> Result<(Vec<TestCase>, Stage), AttemptFailure> {
    let mut diagnostics = Vec::new();
    // True once any stage produced structurally-valid record objects, which
    // turns a final failure into a schema problem rather than a structural
    // one.
    let mut saw_records = false;

    let extraction = match extract_candidate(raw) {
        Some(extraction) => extraction,
        None => {
            return Err(AttemptFailure {
                reason: RecoveryError::NoCandidateFound,
                diagnostics: vec!["extract: no brace or bracket in input".into()],
            })
        }
    };
    debug!(
        method = ?extraction.method,
        span = ?extraction.span,
        truncated = extraction.truncated,
        stripped = extraction.actions.len(),
        "candidate extracted"
    );

    // Direct: the span may already be well-formed.
    match serde_json::from_str::<Value>(&extraction.text) {
        Ok(root) => {
            let values = record_values(root).unwrap_or_default();
            if let Some(cases) = accept(values, Stage::Direct, &mut saw_records, &mut diagnostics)
            {
                return Ok((cases, Stage::Direct));
            }
        }
        Err(err) => diagnostics.push(format!("direct: {err}")),
    }

    // Repair: close strings and containers, drop dangling commas.
    let (repaired, actions) = repair_candidate(&extraction.text);
    debug!(repairs = actions.len(), "structural repair applied");
    match serde_json::from_str::<Value>(&repaired) {
        Ok(root) => {
            let values = record_values(root).unwrap_or_default();
            if let Some(cases) = accept(values, Stage::Repair, &mut saw_records, &mut diagnostics)
            {
                return Ok((cases, Stage::Repair));
            }
        }
        Err(err) => {
            diagnostics.push(format!("repair: {err}"));
            if let Some(rescued) = rescue_flat_records(&repaired) {
                if let Ok(Value::Array(values)) = serde_json::from_str::<Value>(&rescued) {
                    if let Some(cases) =
                        accept(values, Stage::Repair, &mut saw_records, &mut diagnostics)
                    {
                        return Ok((cases, Stage::Repair));
                    }
                }
            }
        }
    }

    // Salvage: pull complete records out of the unrepaired span.
    let values = salvage_records(&extraction.text);
    if let Some(cases) = accept(values, Stage::Salvage, &mut saw_records, &mut diagnostics) {
        return Ok((cases, Stage::Salvage));
    }

    let reason = if saw_records {
        RecoveryError::SchemaRejectedAll
    } else {
        RecoveryError::StructurallyIrreparable
    };
    Err(AttemptFailure {
        reason,
        diagnostics,
    })
}

/// Recovers a validated test-case batch from raw model output.
///
/// Runs the Direct → Repair → Salvage fallback chain; when a first attempt
/// exhausts every stage, `retry` is invoked exactly once with the corrective
/// instruction and must return the re-generated output, or `None` when the
/// caller cannot retry. `FnOnce` bounds the retry to one call by
/// construction. The pipeline itself performs no I/O.
pub fn recover<F>(raw: &str, retry: F) -> RecoveryOutcome
where
    F: FnOnce(&str) -> Option<String>,
{
    let first = match attempt(raw) {
        Ok((cases, stage)) => {
            return RecoveryOutcome::Success {
                cases,
                stage,
                retried: false,
            }
        }
        Err(failure) => failure,
    };

    // Retrying unstructured prose is unlikely to help; fail fast.
    if first.reason == RecoveryError::NoCandidateFound {
        return RecoveryOutcome::Failure {
            reason: first.reason,
            diagnostics: first.diagnostics,
        };
    }

    warn!(reason = %first.reason, "first attempt exhausted, requesting retry");
    let Some(second_raw) = retry(RETRY_INSTRUCTION) else {
        return RecoveryOutcome::Failure {
            reason: first.reason,
            diagnostics: first.diagnostics,
        };
    };

    match attempt(&second_raw) {
        Ok((cases, stage)) => RecoveryOutcome::Success {
            cases,
            stage,
            retried: true,
        },
        Err(second) => {
            let mut diagnostics = first.diagnostics;
            diagnostics.push(format!("retry failed: {}", second.reason));
            diagnostics.extend(second.diagnostics);
            RecoveryOutcome::Failure {
                reason: RecoveryError::ExhaustedAfterRetry,
                diagnostics,
            }
        }
    }
}
