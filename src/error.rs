//! Error types for Innovation Intake.

use crate::submission::steps::{Position, StepId};
use crate::submission::validator::FieldErrors;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Failures writing the progress snapshot.
///
/// Read-side problems never surface as this type; a snapshot that cannot be
/// read or parsed is treated as absent.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Failed to serialize progress snapshot: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to write progress snapshot: {0}")]
    Database(#[from] DatabaseError),
}

/// Failures of the external "create submission" operation.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Submission endpoint rejected the record ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Submission request failed: {0}")]
    Transport(String),

    #[error("Invalid response from submission endpoint: {0}")]
    InvalidResponse(String),

    #[error("Failed to store submission: {0}")]
    Store(#[from] DatabaseError),
}

/// Wizard navigation and submission errors.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("Unknown step: {0}")]
    UnknownStep(String),

    #[error("Step {step} is locked until {missing} is complete")]
    Locked { step: StepId, missing: StepId },

    #[error("Submission is incomplete, continue at {next}")]
    Incomplete { next: StepId },

    #[error("Progress could not be saved: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Submission failed: {0}")]
    Submission(#[from] SubmissionError),

    #[error("Submission {submission_id} was created but saved progress could not be cleared: {source}")]
    ProgressNotCleared {
        submission_id: String,
        #[source]
        source: PersistenceError,
    },
}

/// Outcome of a rejected `advance` call.
#[derive(Debug, thiserror::Error)]
pub enum AdvanceError {
    #[error("Step {step} is locked until {missing} is complete")]
    Locked { step: StepId, missing: StepId },

    #[error("Validation failed: {0}")]
    Invalid(FieldErrors),

    /// The step was merged and the wizard moved on in memory, but the
    /// write-through failed.
    #[error("Step accepted but progress could not be saved: {source}")]
    ProgressNotSaved {
        next: Position,
        #[source]
        source: PersistenceError,
    },
}
