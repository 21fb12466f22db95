use std::collections::BTreeMap;

use crate::kind::Kind;
use crate::metric::LogLevel;

/// A single timestamped reading appended to a signal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Observation {
    /// Seconds since an arbitrary epoch; only relative ordering matters.
    pub timestamp: f64,
    /// The payload carried by this observation.
    pub value: Value,
}

impl Observation {
    /// Builds an observation from its two fields.
    pub fn new(timestamp: f64, value: Value) -> Self {
        Observation { timestamp, value }
    }
}

/// The three disjoint shapes an observation's payload can take.
///
/// All observations within one signal must carry the same variant; the kind
/// of the first one ever appended pins the signal for its whole lifetime.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// A numeric sample.
    Scalar(f64),
    /// A structured log line.
    Log {
        /// Severity of the record.
        level: LogLevel,
        /// Free-form message text.
        message: String,
    },
    /// A set of attribute bindings.
    Event(BTreeMap<String, String>),
}

impl Value {
    /// The [`Kind`] this value pins a signal to.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Scalar(_) => Kind::Scalar,
            Value::Log { .. } => Kind::Logger,
            Value::Event(_) => Kind::Event,
        }
    }
}
