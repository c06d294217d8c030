//! Error types for decoding, streaming and query validation

use thiserror::Error;

/// Structured-text payload could not be parsed
#[derive(Debug, Error)]
#[error("malformed payload: {0}")]
pub struct DecodeError(#[from] pub serde_json::Error);

/// Streaming buffer violates the tag/length/value encoding
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WireError {
    /// Buffer ended before a declared value was complete
    #[error("truncated wire buffer: need {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Varint ran past ten bytes without terminating
    #[error("malformed varint at offset {offset}")]
    MalformedVarint { offset: usize },

    /// Tag carried field number 0
    #[error("invalid tag at offset {offset}: field number 0")]
    InvalidTag { offset: usize },

    /// Group or reserved wire type
    #[error("unsupported wire type {wire_type} at offset {offset}")]
    UnsupportedWireType { wire_type: u8, offset: usize },

    /// Text frame payload is not valid base64
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Text frame is not a recognizable streaming envelope
    #[error("invalid streaming envelope: {0}")]
    Envelope(String),
}

/// Query expression rejected against a field schema
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    #[error("unknown field '{field}' for {instrument}")]
    UnknownField { field: String, instrument: String },

    #[error("invalid value '{value}' for field '{field}'")]
    UnknownValue { field: String, value: String },

    #[error("invalid operands for {operator}: {reason}")]
    InvalidOperands { operator: String, reason: String },

    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("query field cannot be empty")]
    EmptyField,

    #[error("{name} of {value} exceeds the limit of {limit}")]
    LimitExceeded {
        name: &'static str,
        value: usize,
        limit: usize,
    },
}

/// Provider payload has the wrong overall shape for a pipeline
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    /// Upstream returned an error object instead of data
    #[error("provider error [{code}]: {description}")]
    Chart { code: String, description: String },

    #[error("missing data: {0}")]
    MissingData(String),
}

/// Crate-level error
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

pub type Result<T> = std::result::Result<T, Error>;
