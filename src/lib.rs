//! Fault-tolerant recovery of structured test cases from LLM output.

pub mod error;
pub mod extract;
pub mod pipeline;
pub mod repair;
pub mod salvage;
pub mod scan;
pub mod schema;
pub mod types;

pub use error::RecoveryError;
pub use extract::{extract_candidate, ExtractMethod, Extraction};
pub use pipeline::{recover, RETRY_INSTRUCTION};
pub use schema::{validate_records, Rejection};
pub use types::{Priority, RecoveryOutcome, RepairAction, Stage, TestCase, TestStep};
