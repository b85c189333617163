use std::cell::Cell;

use casesalvage::{recover, Priority, RecoveryError, RecoveryOutcome, Stage};

const VALID_ARRAY: &str = r#"[
  {"id":"TC-1","title":"Login with valid credentials",
   "preconditions":"User account exists",
   "steps":[{"id":"s1","action":"Open the login page","expectedResult":"Form is shown"},
            {"id":"s2","action":"Submit valid credentials","expectedResult":"Dashboard opens"}],
   "priority":"high","references":["PROJ-12"]},
  {"id":"TC-2","title":"Login with wrong password",
   "steps":[{"id":"s1","action":"Submit a wrong password","expectedResult":"Error is shown"}],
   "priority":"medium"}
]"#;

fn no_retry(_: &str) -> Option<String> {
    panic!("retry must not be invoked");
}

fn success(outcome: &RecoveryOutcome) -> (&[casesalvage::TestCase], Stage, bool) {
    match outcome {
        RecoveryOutcome::Success {
            cases,
            stage,
            retried,
        } => (cases, *stage, *retried),
        RecoveryOutcome::Failure {
            reason,
            diagnostics,
        } => panic!("expected success, got {reason:?}: {diagnostics:?}"),
    }
}

#[test]
fn fenced_array_with_prose_uses_direct_stage() {
    let raw = format!("Here are the test cases you asked for:\n```json\n{VALID_ARRAY}\n```\nLet me know if you need more.");
    let outcome = recover(&raw, no_retry);
    let (cases, stage, retried) = success(&outcome);
    assert_eq!(stage, Stage::Direct);
    assert!(!retried);
    assert_eq!(cases.len(), 2);
    assert_eq!(cases[0].id, "TC-1");
    assert_eq!(cases[0].references, vec!["PROJ-12".to_string()]);
    assert_eq!(cases[1].id, "TC-2");
    assert_eq!(cases[1].steps.len(), 1);
}

#[test]
fn bare_object_wrapper_uses_direct_stage() {
    let raw = format!(r#"{{"testCases":{VALID_ARRAY}}}"#);
    let outcome = recover(&raw, no_retry);
    let (cases, stage, _) = success(&outcome);
    assert_eq!(stage, Stage::Direct);
    assert_eq!(cases.len(), 2);
}

#[test]
fn truncated_fenced_wrapper_salvages_first_record() {
    // The model hit its output limit mid-way through the second record.
    let raw = "```json\n{\"testCases\":[{\"id\":\"TC-1\",\"title\":\"Login\",\"steps\":[{\"id\":\"s1\",\"action\":\"a\",\"expectedResult\":\"b\"}],\"priority\":\"high\"},{\"id\":\"TC-2\",\"title\":\"Log";
    let outcome = recover(raw, no_retry);
    let (cases, stage, retried) = success(&outcome);
    assert_eq!(stage, Stage::Salvage);
    assert!(!retried, "partial success must not trigger a retry");
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].id, "TC-1");
    assert_eq!(cases[0].title, "Login");
    assert_eq!(cases[0].priority, Priority::High);
}

#[test]
fn truncation_mid_string_keeps_earlier_records_only() {
    let raw = format!(
        "{},{{\"id\":\"TC-3\",\"title\":\"Pass",
        VALID_ARRAY.trim_end().trim_end_matches(']').trim_end()
    );
    let outcome = recover(&raw, no_retry);
    let (cases, stage, _) = success(&outcome);
    assert_eq!(stage, Stage::Salvage);
    let ids: Vec<&str> = cases.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["TC-1", "TC-2"]);
    // Nothing of the truncated tail may survive as a record.
    assert!(cases.iter().all(|c| c.id != "TC-3"));
}

#[test]
fn broken_middle_record_is_skipped_in_order() {
    let raw = r#"[
      {"id":"A","title":"first","steps":[{"action":"a","expectedResult":"b"}],"priority":"low"},
      {"id": ,"title":"broken"},
      {"id":"C","title":"third","steps":[{"action":"c","expectedResult":"d"}],"priority":"high"}
    ]"#;
    let outcome = recover(raw, no_retry);
    let (cases, stage, _) = success(&outcome);
    assert_eq!(stage, Stage::Salvage);
    let ids: Vec<&str> = cases.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["A", "C"]);
}

#[test]
fn trailing_comma_is_repaired() {
    let raw = r#"{"id":"TC-9","title":"Logout","steps":[{"action":"Click logout","expectedResult":"Session ends"}],"priority":"low",}"#;
    let outcome = recover(raw, no_retry);
    let (cases, stage, _) = success(&outcome);
    assert_eq!(stage, Stage::Repair);
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].id, "TC-9");
    assert_eq!(cases[0].priority, Priority::Low);
}

#[test]
fn plain_prose_fails_without_retry() {
    let calls = Cell::new(0u32);
    let outcome = recover("I am sorry, I cannot produce test cases for that.", |_| {
        calls.set(calls.get() + 1);
        None
    });
    assert_eq!(calls.get(), 0, "NoCandidateFound must not trigger a retry");
    match outcome {
        RecoveryOutcome::Failure { reason, .. } => {
            assert_eq!(reason, RecoveryError::NoCandidateFound)
        }
        RecoveryOutcome::Success { .. } => panic!("expected failure"),
    }
}

#[test]
fn retry_is_invoked_once_and_its_result_is_used() {
    let calls = Cell::new(0u32);
    let outcome = recover("{{{{", |instruction| {
        calls.set(calls.get() + 1);
        assert!(instruction.contains("valid JSON"));
        Some(format!("```json\n{VALID_ARRAY}\n```"))
    });
    assert_eq!(calls.get(), 1);
    let (cases, stage, retried) = success(&outcome);
    assert_eq!(stage, Stage::Direct);
    assert!(retried);
    assert_eq!(cases.len(), 2);
}

#[test]
fn second_failure_is_exhausted_after_retry() {
    let calls = Cell::new(0u32);
    let outcome = recover("{{{{", |_| {
        calls.set(calls.get() + 1);
        Some("[[[".to_string())
    });
    assert_eq!(calls.get(), 1);
    match outcome {
        RecoveryOutcome::Failure {
            reason,
            diagnostics,
        } => {
            assert_eq!(reason, RecoveryError::ExhaustedAfterRetry);
            assert!(!diagnostics.is_empty());
        }
        RecoveryOutcome::Success { .. } => panic!("expected failure"),
    }
}

#[test]
fn declined_retry_keeps_first_failure_reason() {
    let outcome = recover("{{{{", |_| None);
    match outcome {
        RecoveryOutcome::Failure { reason, .. } => {
            assert_eq!(reason, RecoveryError::StructurallyIrreparable)
        }
        RecoveryOutcome::Success { .. } => panic!("expected failure"),
    }
}

#[test]
fn schema_rejecting_every_record_reports_schema_failure() {
    // Well-formed JSON, but no record carries steps.
    let raw = r#"{"testCases":[{"id":"TC-1","title":"No steps","priority":"high"},
                               {"id":"","title":"Empty id","steps":[],"priority":"low"}]}"#;
    let outcome = recover(raw, |_| None);
    match outcome {
        RecoveryOutcome::Failure { reason, .. } => {
            assert_eq!(reason, RecoveryError::SchemaRejectedAll)
        }
        RecoveryOutcome::Success { .. } => panic!("expected failure"),
    }
}

#[test]
fn invalid_records_do_not_block_a_partial_batch() {
    let raw = r#"[
      {"id":"OK-1","title":"kept","steps":[{"action":"a","expectedResult":"b"}],"priority":"high"},
      {"id":"BAD-1","title":"no steps","priority":"high"}
    ]"#;
    let outcome = recover(raw, no_retry);
    let (cases, stage, _) = success(&outcome);
    assert_eq!(stage, Stage::Direct);
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].id, "OK-1");
}

#[test]
fn recover_is_idempotent() {
    let raw = "```json\n{\"testCases\":[{\"id\":\"TC-1\",\"title\":\"Login\",\"steps\":[{\"id\":\"s1\",\"action\":\"a\",\"expectedResult\":\"b\"}],\"priority\":\"high\"},{\"id\":\"TC-2\",\"title\":\"Log";
    let first = recover(raw, no_retry);
    let second = recover(raw, no_retry);
    assert_eq!(first, second);
}
