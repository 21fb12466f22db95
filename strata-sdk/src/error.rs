use thiserror::Error;

/// A specialized `Result` type for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Errors an append to the registry can fail with. Both variants mean the
/// observation was dropped without being stored; neither poisons the
/// signal or the registry.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum RegistryError {
    /// The observation's variant does not match the kind the signal was
    /// pinned to by its first-ever observation.
    #[error("signal {signal:?} is {expected}, cannot append a {actual} observation")]
    KindMismatch {
        /// Name of the signal the append targeted.
        signal: String,
        /// Kind the signal was already pinned to.
        expected: strata_core::Kind,
        /// Kind of the rejected observation.
        actual: strata_core::Kind,
    },

    /// A scalar observation's value was NaN or infinite.
    #[error("signal {signal:?}: non-finite scalar value {value}")]
    NonFiniteValue {
        /// Name of the signal the append targeted.
        signal: String,
        /// The rejected value.
        value: f64,
    },
}
