use thiserror::Error;

/// A specialized `Result` type for core data-model operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors raised while constructing or combining values in the data model.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum CoreError {
    /// A scalar value was NaN or infinite.
    #[error("non-finite scalar value: {0}")]
    NonFiniteValue(f64),

    /// Two metrics of different kinds were combined.
    #[error("cannot combine metrics of different kinds")]
    KindMismatch,
}
