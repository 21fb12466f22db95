use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use strata_core::{Aggregation, Kind, Observation, Timespan, Value};
use tracing::{debug, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::subscription::{Listener, SubscriptionHandle, Subscriptions};
use crate::tree::{QueryResult, Tat};

/// One named, kind-pinned stream of observations: the kind decided by its
/// first-ever observation, and the tree summarizing everything appended
/// since.
#[derive(Debug)]
struct Signal {
    kind: Kind,
    tat: RwLock<Tat>,
}

impl Signal {
    fn new(kind: Kind) -> Self {
        Signal {
            kind,
            tat: RwLock::new(Tat::new()),
        }
    }
}

/// The process-wide mapping from signal name to its tree.
///
/// Constructed once at server start and dropped (taking every signal with
/// it) at server stop. A signal's map slot is protected by a read-mostly
/// lock shared by every lookup; each signal additionally has its own
/// exclusive-for-writers/shared-for-readers lock, so concurrent appends to
/// *different* signals never contend with each other, and concurrent reads
/// of the *same* signal never contend with each other either.
#[derive(Debug)]
pub struct Registry {
    signals: RwLock<HashMap<String, Arc<Signal>>>,
    subscriptions: Subscriptions,
}

impl Registry {
    /// An empty registry with no signals yet.
    pub fn new() -> Self {
        Registry {
            signals: RwLock::new(HashMap::new()),
            subscriptions: Subscriptions::new(),
        }
    }

    /// Sorted `(name, kind)` pairs for every signal that has received at
    /// least one observation.
    pub fn names_and_kinds(&self) -> Vec<(String, Kind)> {
        let signals = self.signals.read().expect("signals lock poisoned");
        let mut out: Vec<(String, Kind)> = signals
            .iter()
            .map(|(name, signal)| (name.clone(), signal.kind))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    fn get_or_create(&self, name: &str, kind: Kind) -> Arc<Signal> {
        if let Some(signal) = self.signals.read().expect("signals lock poisoned").get(name) {
            return Arc::clone(signal);
        }
        let mut signals = self.signals.write().expect("signals lock poisoned");
        // Re-check: another writer may have created it between the read
        // lock above being dropped and this write lock being taken.
        if let Some(signal) = signals.get(name) {
            return Arc::clone(signal);
        }
        debug!(signal = name, %kind, "creating new signal");
        let signal = Arc::new(Signal::new(kind));
        signals.insert(name.to_string(), Arc::clone(&signal));
        signal
    }

    fn get(&self, name: &str) -> Option<Arc<Signal>> {
        self.signals
            .read()
            .expect("signals lock poisoned")
            .get(name)
            .cloned()
    }

    /// Appends a single observation to `name`, creating the signal on first
    /// write. Fails without storing anything if `obs` does not match the
    /// signal's established kind, or if a scalar value is non-finite.
    pub fn append(&self, name: &str, obs: Observation) -> RegistryResult<()> {
        validate(name, &obs.value)?;
        let signal = self.get_or_create(name, obs.value.kind());
        if signal.kind != obs.value.kind() {
            warn!(signal = name, expected = %signal.kind, actual = %obs.value.kind(), "rejecting kind mismatch");
            return Err(RegistryError::KindMismatch {
                signal: name.to_string(),
                expected: signal.kind,
                actual: obs.value.kind(),
            });
        }
        signal
            .tat
            .write()
            .expect("signal lock poisoned")
            .append(obs);
        self.subscriptions.notify_changed();
        Ok(())
    }

    /// Appends a batch of observations to `name` in order.
    ///
    /// Each observation is appended independently: if one partway through
    /// the batch is rejected, every observation before it is already
    /// committed, and `Err` carries the first rejection encountered. The
    /// caller can resubmit the remainder after fixing the offending sample.
    pub fn append_batch(
        &self,
        name: &str,
        observations: impl IntoIterator<Item = Observation>,
    ) -> RegistryResult<()> {
        for obs in observations {
            self.append(name, obs)?;
        }
        Ok(())
    }

    /// The aggregation of the whole series if `span` is `None`, or the
    /// exact aggregation of the observations within `span` otherwise.
    /// `None` if the signal does not exist, or if `span` selects nothing.
    pub fn summary(&self, name: &str, span: Option<Timespan>) -> Option<Aggregation> {
        let signal = self.get(name)?;
        let tat = signal.tat.read().expect("signal lock poisoned");
        match span {
            None => tat.aggregation(),
            Some(span) => tat.query_metrics(span),
        }
    }

    /// Resolution-bounded range query against `name`. `None` if the signal
    /// does not exist.
    pub fn query(&self, name: &str, span: Timespan, min_count: usize) -> Option<QueryResult> {
        let signal = self.get(name)?;
        let tat = signal.tat.read().expect("signal lock poisoned");
        Some(tat.query(span, min_count))
    }

    /// Nearest observation at-or-before `t` on signal `name`. `None` if the
    /// signal does not exist or is empty.
    pub fn value_at(&self, name: &str, t: f64) -> Option<Observation> {
        let signal = self.get(name)?;
        let tat = signal.tat.read().expect("signal lock poisoned");
        tat.query_value(t)
    }

    /// Registers a "something changed" listener, fired (at most once per
    /// delivery round) after every successful append.
    pub fn subscribe(&self, listener: Listener) -> SubscriptionHandle {
        self.subscriptions.subscribe(listener)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(name: &str, value: &Value) -> RegistryResult<()> {
    if let Value::Scalar(v) = value {
        if !v.is_finite() {
            return Err(RegistryError::NonFiniteValue {
                signal: name.to_string(),
                value: *v,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scalar(t: f64, v: f64) -> Observation {
        Observation::new(t, Value::Scalar(v))
    }

    #[test]
    fn first_append_pins_kind() {
        let reg = Registry::new();
        reg.append("temp", scalar(0.0, 1.0)).unwrap();
        assert_eq!(reg.names_and_kinds(), vec![("temp".to_string(), Kind::Scalar)]);
    }

    #[test]
    fn mismatched_kind_is_rejected_and_not_stored() {
        let reg = Registry::new();
        reg.append("temp", scalar(0.0, 1.0)).unwrap();
        let event = Observation::new(0.0, Value::Event(Default::default()));
        let err = reg.append("temp", event).unwrap_err();
        assert!(matches!(err, RegistryError::KindMismatch { .. }));
        assert_eq!(reg.summary("temp", None).unwrap().metric.count(), 1);
    }

    #[rstest]
    #[case::nan(f64::NAN)]
    #[case::positive_infinity(f64::INFINITY)]
    #[case::negative_infinity(f64::NEG_INFINITY)]
    fn non_finite_scalar_is_rejected(#[case] value: f64) {
        let reg = Registry::new();
        let err = reg.append("temp", scalar(0.0, value)).unwrap_err();
        assert!(matches!(err, RegistryError::NonFiniteValue { .. }));
        assert!(reg.summary("temp", None).is_none());
    }

    #[test]
    fn unknown_signal_queries_return_none() {
        let reg = Registry::new();
        assert!(reg.summary("missing", None).is_none());
        assert!(reg.query("missing", Timespan::new(0.0, 1.0), 1).is_none());
        assert!(reg.value_at("missing", 0.0).is_none());
    }

    #[test]
    fn reversed_query_span_returns_empty_result() {
        let reg = Registry::new();
        reg.append("temp", scalar(0.0, 1.0)).unwrap();
        let result = reg.query("temp", Timespan::new(5.0, 1.0), 1).unwrap();
        assert!(result.is_empty());
        assert!(reg.summary("temp", Some(Timespan::new(5.0, 1.0))).is_none());
    }

    #[test]
    fn s5_wire_shaped_batch_matches_summary() {
        let reg = Registry::new();
        let samples = (0..4).map(|i| scalar(i as f64 * 0.1, i as f64));
        reg.append_batch("S", samples).unwrap();
        let summary = reg.summary("S", None).unwrap();
        assert_eq!(summary.metric.count(), 4);
        assert_eq!(summary.timespan.begin, 0.0);
        assert!((summary.timespan.end - 0.3).abs() < 1e-9);
    }

    #[test]
    fn subscribers_see_notifications_on_append() {
        let reg = Registry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let _handle = reg.subscribe(Box::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));
        reg.append("temp", scalar(0.0, 1.0)).unwrap();
        assert!(count.load(Ordering::SeqCst) >= 1);
    }
}
