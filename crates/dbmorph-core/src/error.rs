//! Error types for dbmorph

use std::fmt;

use thiserror::Error;

use crate::warning::{EntityRef, Warning};

/// A malformed schema snapshot, identified by the offending entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputError {
    pub entity: EntityRef,
    pub reason: String,
}

impl InputError {
    pub fn new(entity: EntityRef, reason: impl Into<String>) -> Self {
        Self {
            entity,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity, self.reason)
    }
}

/// A statement that failed while a plan was being applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionFailure {
    /// Zero-based index of the failing step
    pub step_index: usize,
    /// Number of steps that succeeded before the failure
    pub completed: usize,
    pub statement: String,
    pub detail: String,
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step {} failed after {} successful step(s): {}",
            self.step_index + 1,
            self.completed,
            self.detail
        )
    }
}

/// Coarse classification of [`MorphError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Blocking warnings present and not forced
    Validation,
    /// Schema snapshot is malformed
    ComparisonInput,
    /// A statement failed during execution
    Execution,
    Other,
}

/// Core error type for dbmorph operations
#[derive(Error, Debug)]
pub enum MorphError {
    #[error("Validation error: {} blocking warning(s), use force to override", .blocking.len())]
    Validation { blocking: Vec<Warning> },

    #[error("Invalid schema input: {0}")]
    ComparisonInput(InputError),

    #[error("Execution error: {0}")]
    Execution(ExecutionFailure),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MorphError {
    pub fn input(entity: EntityRef, reason: impl Into<String>) -> Self {
        MorphError::ComparisonInput(InputError::new(entity, reason))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MorphError::Validation { .. } => ErrorKind::Validation,
            MorphError::ComparisonInput(_) => ErrorKind::ComparisonInput,
            MorphError::Execution(_) => ErrorKind::Execution,
            MorphError::Connection(_)
            | MorphError::Query(_)
            | MorphError::Io(_)
            | MorphError::Serialization(_) => ErrorKind::Other,
        }
    }
}

impl From<InputError> for MorphError {
    fn from(err: InputError) -> Self {
        MorphError::ComparisonInput(err)
    }
}

/// Result type alias for dbmorph operations
pub type Result<T> = std::result::Result<T, MorphError>;
