use serde::{Deserialize, Serialize};

use crate::error::RecoveryError;

/// Key holding the record array when the model wraps its answer in an object.
pub const RECORDS_KEY: &str = "testCases";

/// One recovered test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<String>,
    pub steps: Vec<TestStep>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub references: Vec<String>,
}

/// One action/expected-result pair within a test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStep {
    #[serde(default)]
    pub id: String,
    pub action: String,
    pub expected_result: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// Recovery technique that produced a batch, kept for observability only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Direct,
    Repair,
    Salvage,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Direct => write!(f, "direct"),
            Stage::Repair => write!(f, "repair"),
            Stage::Salvage => write!(f, "salvage"),
        }
    }
}

/// One mutation applied to candidate text on the way to a parseable document.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairAction {
    pub op: &'static str,
    pub at: Option<usize>,
    pub note: Option<String>,
}

impl RepairAction {
    pub fn at(op: &'static str, at: usize) -> Self {
        Self {
            op,
            at: Some(at),
            note: None,
        }
    }
}

/// Result of one `recover` call.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryOutcome {
    Success {
        cases: Vec<TestCase>,
        stage: Stage,
        /// Whether the single permitted retry was used.
        retried: bool,
    },
    Failure {
        reason: RecoveryError,
        /// Per-stage notes for logs and debugging; never shown to end users.
        diagnostics: Vec<String>,
    },
}

impl RecoveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RecoveryOutcome::Success { .. })
    }

    pub fn cases(&self) -> Option<&[TestCase]> {
        match self {
            RecoveryOutcome::Success { cases, .. } => Some(cases),
            RecoveryOutcome::Failure { .. } => None,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            RecoveryOutcome::Success { stage, .. } => Some(*stage),
            RecoveryOutcome::Failure { .. } => None,
        }
    }
}
