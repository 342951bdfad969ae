//! Cross-cutting error types for the SmileBASIC Source data model.
//!
//! Nothing in this crate is fatal on its own: decoding, validation, and
//! resume handling return structured results. `CoreError` is what the strict
//! helpers (`Decoded::into_strict`, `Resolved::require`,
//! `ResumeState::check_token`) return when a caller wants a hard failure.
//! Transport errors live in `sbs-client`.

use thiserror::Error;

use crate::contract::ContractViolation;
use crate::decode::DecodeError;
use crate::ids::Id;
use crate::refs::DanglingReference;

/// Errors that can be raised by any crate built on `sbs-core`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A record did not match its kind's shape.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A record decoded but broke one or more documented constraints.
    #[error("{} contract violation(s), first: {}", .0.len(), first_violation(.0))]
    Contract(Vec<ContractViolation>),

    /// A response carried a resume token older than the one already held.
    #[error("Stale resume token: held {held}, received {received}")]
    StaleResumeToken { held: Id, received: Id },

    /// A required reference points at a record that is not present.
    #[error(transparent)]
    DanglingReference(#[from] DanglingReference),

    /// Data failed validation outside the record contract.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn first_violation(violations: &[ContractViolation]) -> String {
    violations
        .first()
        .map_or_else(|| "none".to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_message_names_first_violation() {
        let err = CoreError::Contract(vec![ContractViolation::NegativeCount { count: -1 }]);
        assert_eq!(
            err.to_string(),
            "1 contract violation(s), first: count must be non-negative, got -1"
        );
    }

    #[test]
    fn stale_token_message() {
        let err = CoreError::StaleResumeToken {
            held: 10,
            received: 4,
        };
        assert_eq!(err.to_string(), "Stale resume token: held 10, received 4");
    }
}
