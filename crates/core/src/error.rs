//! Error types for the simulation core.

use thiserror::Error;

/// Errors surfaced by the simulation operations.
///
/// Safety blocks are not errors; they are reported as a normal turn outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// Unknown session, agent or classroom.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Input rejected before any mutation took place.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Aggregate agent failure or a broken session invariant.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SimulationError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Wraps a backend failure, keeping the full cause chain in the message.
    pub fn from_backend(context: &str, err: &anyhow::Error) -> Self {
        Self::Internal(format!("{context}: {err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_not_found_display() {
        let err = SimulationError::not_found("session", "abc");
        assert_eq!(err.to_string(), "session 'abc' not found");
    }

    #[test]
    fn test_backend_error_keeps_cause_chain() {
        let root = anyhow!("connection reset").context("completion request failed");
        let err = SimulationError::from_backend("teacher run", &root);
        let message = err.to_string();
        assert!(message.contains("teacher run"));
        assert!(message.contains("completion request failed"));
        assert!(message.contains("connection reset"));
    }
}
