use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult};
use crate::kind::Kind;
use crate::observation::Value;

/// Severity of a log record, used both as the payload tag and as the key
/// into a [`LogMetric`]'s per-level counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LogLevel {
    /// Informational message.
    Info,
    /// Warning message.
    Warning,
    /// Error message.
    Error,
}

impl LogLevel {
    const ALL: [LogLevel; 3] = [LogLevel::Info, LogLevel::Warning, LogLevel::Error];
}

/// Running summary of a scalar signal: count, extrema, endpoints, and the
/// mean/M2 pair used for Welford's online variance.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScalarMetric {
    /// Number of observations summarized.
    pub count: u64,
    /// Smallest observed value.
    pub min: f64,
    /// Largest observed value.
    pub max: f64,
    /// Value of the first observation, in insertion order.
    pub first: f64,
    /// Value of the most recent observation, in insertion order.
    pub last: f64,
    mean: f64,
    m2: f64,
}

impl ScalarMetric {
    fn singleton(value: f64) -> Self {
        ScalarMetric {
            count: 1,
            min: value,
            max: value,
            first: value,
            last: value,
            mean: value,
            m2: 0.0,
        }
    }

    fn combine(&self, other: &ScalarMetric) -> ScalarMetric {
        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        let mean = (self.mean * self.count as f64 + other.mean * other.count as f64)
            / count as f64;
        let m2 = self.m2
            + other.m2
            + delta * delta * (self.count as f64 * other.count as f64) / count as f64;
        ScalarMetric {
            count,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
            first: self.first,
            last: other.last,
            mean,
            m2,
        }
    }

    /// Arithmetic mean of the summarized values.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance (`m2 / count`); `0.0` for an empty metric.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    /// Population standard deviation.
    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// Running summary of a log signal: total count plus a per-level breakdown.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogMetric {
    /// Total number of log records summarized.
    pub count: u64,
    level_counts: BTreeMap<LogLevel, u64>,
}

impl LogMetric {
    fn empty() -> Self {
        LogMetric {
            count: 0,
            level_counts: BTreeMap::new(),
        }
    }

    fn singleton(level: LogLevel) -> Self {
        let mut level_counts = BTreeMap::new();
        level_counts.insert(level, 1);
        LogMetric {
            count: 1,
            level_counts,
        }
    }

    fn combine(&self, other: &LogMetric) -> LogMetric {
        let mut level_counts = self.level_counts.clone();
        for level in LogLevel::ALL {
            let merged = self.count_by_level(level) + other.count_by_level(level);
            if merged > 0 {
                level_counts.insert(level, merged);
            }
        }
        LogMetric {
            count: self.count + other.count,
            level_counts,
        }
    }

    /// Number of records observed at the given severity.
    pub fn count_by_level(&self, level: LogLevel) -> u64 {
        *self.level_counts.get(&level).unwrap_or(&0)
    }
}

/// Running summary of an event signal: just a count.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventMetric {
    /// Number of events summarized.
    pub count: u64,
}

/// The aggregate-algebra monoid: a variant-tagged summary of zero or more
/// observations, with an associative (but, for scalars, non-commutative)
/// `combine`.
///
/// Combine is associative because Welford's update and min/max/first/last
/// are associative; it is not commutative for scalars because `first` and
/// `last` depend on which operand is "earlier" in the combine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Metric {
    /// Summary of scalar observations.
    Scalar(ScalarMetric),
    /// Summary of log observations.
    Log(LogMetric),
    /// Summary of event observations.
    Event(EventMetric),
}

impl Metric {
    /// The identity element for `kind`: combining it with any metric of the
    /// same kind returns that metric unchanged.
    pub fn empty(kind: Kind) -> Metric {
        match kind {
            Kind::Scalar => Metric::Scalar(ScalarMetric {
                count: 0,
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
                first: 0.0,
                last: 0.0,
                mean: 0.0,
                m2: 0.0,
            }),
            Kind::Logger => Metric::Log(LogMetric::empty()),
            Kind::Event => Metric::Event(EventMetric { count: 0 }),
        }
    }

    /// Summarizes a single observation value.
    ///
    /// Scalar values must already be finite; the registry rejects
    /// non-finite scalars before they ever reach the algebra (see
    /// `strata-sdk`'s `RegistryError::NonFiniteValue`).
    pub fn of(value: &Value) -> CoreResult<Metric> {
        match value {
            Value::Scalar(v) => {
                if !v.is_finite() {
                    return Err(CoreError::NonFiniteValue(*v));
                }
                Ok(Metric::Scalar(ScalarMetric::singleton(*v)))
            }
            Value::Log { level, .. } => Ok(Metric::Log(LogMetric::singleton(*level))),
            Value::Event(_) => Ok(Metric::Event(EventMetric { count: 1 })),
        }
    }

    /// The [`Kind`] this metric summarizes.
    pub fn kind(&self) -> Kind {
        match self {
            Metric::Scalar(_) => Kind::Scalar,
            Metric::Log(_) => Kind::Logger,
            Metric::Event(_) => Kind::Event,
        }
    }

    /// Associatively combines two metrics of the same kind.
    ///
    /// # Panics
    ///
    /// Panics (via `debug_assert`) in debug builds if `self` and `other` are
    /// of different kinds; this is a programmer error, not a condition a
    /// well-behaved caller can hit once the registry has pinned a signal's
    /// kind. Release builds fall back to returning `self` unchanged rather
    /// than exhibiting undefined behavior.
    pub fn combine(&self, other: &Metric) -> Metric {
        debug_assert_eq!(
            self.kind(),
            other.kind(),
            "combined metrics must share a kind"
        );
        match (self, other) {
            (Metric::Scalar(a), Metric::Scalar(b)) => {
                if a.count == 0 {
                    return Metric::Scalar(*b);
                }
                if b.count == 0 {
                    return Metric::Scalar(*a);
                }
                Metric::Scalar(a.combine(b))
            }
            (Metric::Log(a), Metric::Log(b)) => Metric::Log(a.combine(b)),
            (Metric::Event(a), Metric::Event(b)) => Metric::Event(EventMetric {
                count: a.count + b.count,
            }),
            _ => self.clone(),
        }
    }

    /// Number of observations summarized, regardless of kind.
    pub fn count(&self) -> u64 {
        match self {
            Metric::Scalar(m) => m.count,
            Metric::Log(m) => m.count,
            Metric::Event(m) => m.count,
        }
    }

    /// The scalar summary, if this metric is of [`Kind::Scalar`].
    pub fn as_scalar(&self) -> Option<&ScalarMetric> {
        match self {
            Metric::Scalar(m) => Some(m),
            _ => None,
        }
    }

    /// The log summary, if this metric is of [`Kind::Logger`].
    pub fn as_log(&self) -> Option<&LogMetric> {
        match self {
            Metric::Log(m) => Some(m),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn scalar_metric_of(values: &[f64]) -> Metric {
        values
            .iter()
            .map(|v| Metric::of(&Value::Scalar(*v)).unwrap())
            .reduce(|a, b| a.combine(&b))
            .unwrap()
    }

    #[test]
    fn combine_with_empty_is_identity() {
        let m = scalar_metric_of(&[1.0, 2.0, 3.0]);
        let empty = Metric::empty(Kind::Scalar);
        assert_eq!(m.combine(&empty), m);
        assert_eq!(empty.combine(&m), m);
    }

    #[test]
    fn s1_scalar_chunk_matches_batch_statistics() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let m = scalar_metric_of(&values).as_scalar().unwrap().clone();
        assert_eq!(m.count, 5);
        assert_eq!(m.min, 1.0);
        assert_eq!(m.max, 5.0);
        assert_eq!(m.first, 1.0);
        assert_eq!(m.last, 5.0);
        assert!((m.mean() - 3.0).abs() < 1e-9);
        assert!((m.stddev() - 1.4142135623730951).abs() < 1e-9);
    }

    #[test]
    fn s4_combine_of_two_chunks_matches_batch_statistics() {
        let m1 = scalar_metric_of(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let m2 = scalar_metric_of(&[5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        let combined = m1.combine(&m2).as_scalar().unwrap().clone();
        assert_eq!(combined.count, 11);
        assert!((combined.mean() - 5.4545454545454541).abs() < 1e-9);
        assert!((combined.stddev() - 2.7424842300726747).abs() < 1e-9);
        assert_eq!(combined.min, 1.0);
        assert_eq!(combined.max, 10.0);
        assert_eq!(combined.first, 1.0);
        assert_eq!(combined.last, 10.0);
    }

    #[test]
    fn combine_is_associative() {
        let a = scalar_metric_of(&[1.0, 2.0]);
        let b = scalar_metric_of(&[3.0]);
        let c = scalar_metric_of(&[4.0, 5.0, 6.0]);
        let left = a.combine(&b).combine(&c);
        let right = a.combine(&b.combine(&c));
        let l = left.as_scalar().unwrap();
        let r = right.as_scalar().unwrap();
        assert_eq!(l.count, r.count);
        assert!((l.mean() - r.mean()).abs() < 1e-9);
        assert!((l.variance() - r.variance()).abs() < 1e-9);
    }

    #[rstest]
    #[case::nan(f64::NAN)]
    #[case::positive_infinity(f64::INFINITY)]
    #[case::negative_infinity(f64::NEG_INFINITY)]
    fn rejects_non_finite_scalar(#[case] value: f64) {
        let err = Metric::of(&Value::Scalar(value)).unwrap_err();
        assert!(matches!(err, CoreError::NonFiniteValue(v) if v.is_nan() || v == value));
    }

    #[test]
    fn log_metric_tracks_per_level_counts() {
        let a = Metric::of(&Value::Log {
            level: LogLevel::Warning,
            message: "low disk".into(),
        })
        .unwrap();
        let b = Metric::of(&Value::Log {
            level: LogLevel::Error,
            message: "disk full".into(),
        })
        .unwrap();
        let combined = a.combine(&b);
        let log = combined.as_log().unwrap();
        assert_eq!(log.count, 2);
        assert_eq!(log.count_by_level(LogLevel::Warning), 1);
        assert_eq!(log.count_by_level(LogLevel::Error), 1);
        assert_eq!(log.count_by_level(LogLevel::Info), 0);
    }

    #[test]
    fn event_metric_only_counts() {
        let mut attrs = BTreeMap::new();
        attrs.insert("key".to_string(), "value".to_string());
        let a = Metric::of(&Value::Event(attrs.clone())).unwrap();
        let b = Metric::of(&Value::Event(attrs)).unwrap();
        assert_eq!(a.combine(&b).count(), 2);
    }
}
