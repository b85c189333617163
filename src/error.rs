//! Typed errors for the recovery pipeline.
//!
//! `thiserror` for library errors; the `Display` strings are the only
//! human-readable surface, stage internals stay in logs.

use thiserror::Error;

/// Why a `recover` call produced no records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecoveryError {
    /// No brace or bracket anywhere in the output. Terminal without retry:
    /// a model that answered in prose will likely do so again.
    #[error("model output contained no JSON candidate")]
    NoCandidateFound,

    /// Repair and salvage both produced nothing usable.
    #[error("model output was structurally irreparable")]
    StructurallyIrreparable,

    /// Structurally valid objects existed but none satisfied the
    /// required-field rules.
    #[error("no test case in the model output passed schema validation")]
    SchemaRejectedAll,

    /// The one permitted retry also failed.
    #[error("test cases could not be recovered from the model output, even after a retry")]
    ExhaustedAfterRetry,
}
