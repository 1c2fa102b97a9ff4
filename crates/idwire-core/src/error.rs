// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for idwire.

use thiserror::Error;

use crate::types::FailureReason;

/// Top-level error type for all idwire operations.
#[derive(Debug, Error)]
pub enum IdwireError {
    // -- Transport errors --
    #[error("connection error: {0}")]
    Connection(String),

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    #[error("malformed payload: {0}")]
    Decode(String),

    #[error("timed out: {0}")]
    Timeout(String),

    // -- Engine lifecycle --
    #[error("engine initialization failed: {0}")]
    EngineInit(String),

    #[error("engine not initialized: {0}")]
    EngineNotInitialized(String),

    // -- Recognition --
    /// A failure reported by the engine binding itself, before it is wrapped
    /// into a [`IdwireError::Recognition`] by the orchestrator.
    #[error("engine error: {0}")]
    Engine(String),

    #[error("recognition failed: {0}")]
    Recognition(String),

    #[error("Not found")]
    NoDocumentDetected,

    // -- Configuration / local I/O --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IdwireError {
    /// The reason code reported to the client when this error ends a request.
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            Self::NoDocumentDetected => FailureReason::NoDocument,
            Self::EngineInit(_) | Self::EngineNotInitialized(_) => {
                FailureReason::EngineNotInitialized
            }
            Self::Decode(_) | Self::FrameTooLarge { .. } => FailureReason::BadRequest,
            _ => FailureReason::Recognition,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, IdwireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_document_keeps_legacy_description() {
        assert_eq!(IdwireError::NoDocumentDetected.to_string(), "Not found");
    }

    #[test]
    fn failure_reason_mapping() {
        assert_eq!(
            IdwireError::NoDocumentDetected.failure_reason(),
            FailureReason::NoDocument
        );
        assert_eq!(
            IdwireError::EngineNotInitialized("bundle missing".into()).failure_reason(),
            FailureReason::EngineNotInitialized
        );
        assert_eq!(
            IdwireError::Decode("unknown field".into()).failure_reason(),
            FailureReason::BadRequest
        );
        assert_eq!(
            IdwireError::Recognition("bad image".into()).failure_reason(),
            FailureReason::Recognition
        );
    }
}
