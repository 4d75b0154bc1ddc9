// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The error kinds shared across every crate in the workspace. The HTTP
//! surface maps each variant to a status code; nothing downstream of
//! `rooster-core` should need to invent its own.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("job {0} not found")]
    NotFound(String),

    #[error("job {0} already exists")]
    Conflict(String),

    #[error("job {0} is already running")]
    InProgress(String),

    #[error("invalid job definition: {0}")]
    Invalid(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to spawn job {job}: {source}")]
    Spawn {
        job: String,
        #[source]
        source: std::io::Error,
    },

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl EngineError {
    /// Short machine-readable tag, independent of the `Display` message.
    /// Used by the HTTP layer to pick a status code.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "not_found",
            EngineError::Conflict(_) => "conflict",
            EngineError::InProgress(_) => "in_progress",
            EngineError::Invalid(_) => "invalid",
            EngineError::Io(_) => "io",
            EngineError::Spawn { .. } => "spawn",
            EngineError::Runtime(_) => "runtime",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_stable_per_variant() {
        assert_eq!(EngineError::NotFound("x".into()).kind(), "not_found");
        assert_eq!(EngineError::Conflict("x".into()).kind(), "conflict");
        assert_eq!(EngineError::InProgress("x".into()).kind(), "in_progress");
        assert_eq!(EngineError::Invalid("x".into()).kind(), "invalid");
    }
}
