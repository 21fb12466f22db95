/// The variant a signal is pinned to after its first observation.
///
/// A signal's kind is decided by whichever [`Value`](crate::Value) arrives
/// first and never changes afterward; every later append of a different kind
/// is rejected rather than silently coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Kind {
    /// Numeric samples.
    Scalar,
    /// Structured log records.
    Logger,
    /// Attribute-map events.
    Event,
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Kind::Scalar => "scalar",
            Kind::Logger => "logger",
            Kind::Event => "event",
        };
        f.write_str(name)
    }
}
