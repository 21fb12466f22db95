use crate::error::CoreResult;
use crate::kind::Kind;
use crate::metric::Metric;
use crate::observation::Observation;
use crate::timespan::Timespan;

/// A [`Timespan`] paired with the [`Metric`] summarizing everything that
/// occurred in it. This is the value cached at every node of a tree: leaves
/// cache the aggregation of their raw observations, internal nodes cache the
/// aggregation of their children's aggregations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aggregation {
    /// Interval covered by this aggregation.
    pub timespan: Timespan,
    /// Summary of everything in that interval.
    pub metric: Metric,
}

impl Aggregation {
    /// Builds an aggregation from its two already-known parts.
    pub fn new(timespan: Timespan, metric: Metric) -> Self {
        Aggregation { timespan, metric }
    }

    /// The aggregation of a single observation: a degenerate timespan and a
    /// singleton metric.
    pub fn from_sample(obs: &Observation) -> CoreResult<Aggregation> {
        Ok(Aggregation {
            timespan: Timespan::at(obs.timestamp),
            metric: Metric::of(&obs.value)?,
        })
    }

    /// The aggregation of a non-empty slice of observations, combined in
    /// order.
    pub fn from_samples(samples: &[Observation]) -> CoreResult<Aggregation> {
        let mut iter = samples.iter();
        let first = Self::from_sample(iter.next().expect("from_samples requires samples"))?;
        iter.try_fold(first, |acc, obs| {
            Ok(acc.combine(&Self::from_sample(obs)?))
        })
    }

    /// The aggregation of a non-empty slice of already-computed
    /// aggregations, combined in order.
    pub fn from_aggregations(aggregations: &[Aggregation]) -> Aggregation {
        let mut iter = aggregations.iter().cloned();
        let first = iter.next().expect("from_aggregations requires aggregations");
        iter.fold(first, |acc, agg| acc.combine(&agg))
    }

    /// Combines two aggregations: timespans combine to their enclosing
    /// interval, metrics combine via [`Metric::combine`].
    pub fn combine(&self, other: &Aggregation) -> Aggregation {
        Aggregation {
            timespan: self.timespan.combine(&other.timespan),
            metric: self.metric.combine(&other.metric),
        }
    }

    /// The [`Kind`] of the underlying metric.
    pub fn kind(&self) -> Kind {
        self.metric.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Value;

    fn sample(t: f64, v: f64) -> Observation {
        Observation::new(t, Value::Scalar(v))
    }

    #[test]
    fn from_samples_covers_full_span() {
        let samples = [sample(21.0, 1.0), sample(22.0, 2.0), sample(25.0, 5.0)];
        let agg = Aggregation::from_samples(&samples).unwrap();
        assert_eq!(agg.timespan, Timespan::new(21.0, 25.0));
        assert_eq!(agg.metric.count(), 3);
    }

    #[test]
    fn combine_matches_from_samples_of_concatenation() {
        let left = [sample(0.0, 1.0), sample(1.0, 2.0)];
        let right = [sample(2.0, 3.0), sample(3.0, 4.0)];
        let combined = Aggregation::from_samples(&left)
            .unwrap()
            .combine(&Aggregation::from_samples(&right).unwrap());
        let all: Vec<_> = left.iter().chain(right.iter()).cloned().collect();
        let direct = Aggregation::from_samples(&all).unwrap();
        assert_eq!(combined.timespan, direct.timespan);
        assert_eq!(
            combined.metric.as_scalar().unwrap().mean(),
            direct.metric.as_scalar().unwrap().mean()
        );
    }
}
