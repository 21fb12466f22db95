use thiserror::Error;

/// Result alias for fallible framing/decoding operations.
pub type FramingResult<T> = Result<T, FramingError>;

/// Failures while decoding one frame's payload.
///
/// A frame whose `type` field names a message this server does not
/// recognize is deliberately NOT a [`FramingError`] — see
/// [`crate::wire::DecodedPayload::UnknownType`]; only a payload that is
/// malformed CBOR, or missing fields a recognized type requires, reaches
/// here.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FramingError {
    /// The frame length prefix exceeded [`crate::framing::MAX_FRAME_LEN`].
    #[error("frame of {0} bytes exceeds the maximum frame length")]
    FrameTooLarge(u32),
    /// The payload was not a well-formed CBOR value.
    #[error("malformed CBOR payload: {0}")]
    Cbor(#[from] serde_cbor::Error),
    /// The payload decoded but its shape did not match any recognized
    /// message.
    #[error("malformed wire message: {0}")]
    Malformed(&'static str),
    /// A recognized message type was missing a field it requires.
    #[error("wire message is missing required field `{0}`")]
    MissingField(&'static str),
    /// Reading the frame's length prefix or payload failed at the I/O
    /// layer, distinct from a clean EOF between frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for registering an observation received over the wire.
pub type IngestResult<T> = Result<T, IngestError>;

/// Failures while routing a decoded wire message into the registry.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum IngestError {
    /// Framing or decoding failed before a message could be produced.
    #[error(transparent)]
    Framing(#[from] FramingError),
    /// The registry rejected the observation (kind mismatch or a
    /// non-finite scalar).
    #[error(transparent)]
    Registry(#[from] strata_sdk::RegistryError),
    /// The connection's I/O failed.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
}
