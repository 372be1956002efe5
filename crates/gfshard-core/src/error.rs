use thiserror::Error;

/// Canonical error type exposed by the erasure coding core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ErasureError {
    /// Sharding parameters or field construction are invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Division (or inversion) by the zero element.
    #[error("division by zero in galois field")]
    DivideByZero,

    /// More positions were marked erased than the parity budget allows.
    #[error("too many erasures to correct: {erasures} > {capacity}")]
    TooManyErasures { erasures: usize, capacity: usize },

    /// The error locator degree exceeds what the remaining syndromes can
    /// correct.
    #[error("too many errors to correct: {errors} (capacity {capacity})")]
    TooManyErrors { errors: usize, capacity: usize },

    /// The Chien search found a different number of roots than the locator
    /// degree, i.e. the corruption is not correctable.
    #[error("could not locate errors: found {found}, expected {expected}")]
    ErrorLocationMismatch { found: usize, expected: usize },

    /// A codeword is too short for its parity or too long for the field.
    #[error("invalid codeword length {len} (expected {min}..={max})")]
    CodewordLength { len: usize, min: usize, max: usize },

    /// A polynomial longer than the field size was requested.
    #[error("polynomial order {order} exceeds field size {field_size}")]
    PolynomialOrder { order: usize, field_size: usize },

    /// `recombine` was handed the wrong number of shares.
    #[error("wrong share count: expected {expected}, got {got}")]
    ShareCount { expected: usize, got: usize },

    /// A share is not aligned to the block stride or differs in length
    /// from the first share.
    #[error("share {index} has length {len}, expected {expected}")]
    ShareLength {
        index: usize,
        len: usize,
        expected: usize,
    },

    /// The requested output length exceeds the decoded data.
    #[error("cannot truncate to {requested} bytes, only {available} decoded")]
    Truncation { requested: usize, available: usize },

    /// A block of a chunk could not be reconstructed.
    #[error("block {block} failed to decode: {source}")]
    BlockDecode {
        block: usize,
        #[source]
        source: Box<ErasureError>,
    },
}

impl ErasureError {
    /// Unwrap a [`ErasureError::BlockDecode`] to the codec error that
    /// caused it. Other variants are returned as-is.
    pub fn root_cause(&self) -> &ErasureError {
        match self {
            ErasureError::BlockDecode { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
