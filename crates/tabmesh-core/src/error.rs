//! Error types for tabmesh

use thiserror::Error;

/// Core tabmesh errors
#[derive(Error, Debug)]
pub enum MeshError {
    // Wire errors
    #[error("Invalid wire format: {0}")]
    InvalidWireFormat(String),

    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("Unknown envelope kind: {0}")]
    UnknownEnvelopeKind(u8),

    #[error("Name too long: {0} bytes")]
    NameTooLong(usize),

    #[error("Text value too long: {0} bytes")]
    TextTooLong(usize),

    // Coordinator errors
    #[error("A wait-broadcast for \"{0}\" is already pending")]
    WaitPending(String),
}

/// Result type for tabmesh operations
pub type MeshResult<T> = Result<T, MeshError>;
