use thiserror::Error;

/// The main error type for condition set operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("condition sets must be of the same length: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("malformed input: {0}")]
    MalformedInput(#[from] DecodeError),

    #[error("destination buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("too many conditions: {0} (at most 65535 can be encoded)")]
    TooManyConditions(usize),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a binary condition set is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("input truncated: need {required} bytes, got {actual}")]
    Truncated { required: usize, actual: usize },

    #[error("unknown predicate code {code} at condition {index}")]
    UnknownPredicate { index: usize, code: u8 },

    #[error("unknown predicate code {0}")]
    InvalidPredicateCode(u8),

    #[error("trailing bytes: declared size is {expected} bytes, got {actual}")]
    TrailingBytes { expected: usize, actual: usize },
}

impl Error {
    /// Returns true if the error comes from rejected binary input
    pub fn is_format_error(&self) -> bool {
        matches!(self, Error::MalformedInput(_))
    }

    /// Returns true if the error is a caller-side size or length problem
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Error::LengthMismatch { .. }
                | Error::BufferSizeMismatch { .. }
                | Error::TooManyConditions(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
