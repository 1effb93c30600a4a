//! Error kinds raised while scoring spatial relations.

use thiserror::Error;

/// Errors that can occur while evaluating a relation.
///
/// None of these cross the batch boundary: the resolver turns every failure into an
/// unsatisfied [`ScoreResult`](crate::ScoreResult) carrying the error text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RelationError {
    /// Degenerate or missing geometry (box, face frame, architectural element).
    #[error("degenerate geometry: {0}")]
    Geometry(String),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed relation descriptor.
    #[error("invalid relation descriptor: {0}")]
    Descriptor(String),

    /// Architecture document could not be parsed.
    #[error("failed to parse architecture: {0}")]
    Architecture(String),
}

/// Result type for relation evaluation.
pub type RelationResult<T> = Result<T, RelationError>;
