//! Multi-task ingest plus concurrent query against a shared registry:
//! two writer threads append to distinct signals while a reader thread
//! polls both, none of them ever observing a torn or over-counted summary.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Barrier};
use std::thread;

use strata_core::{Observation, Value};
use strata_sdk::Registry;

fn scalar(t: f64, v: f64) -> Observation {
    Observation::new(t, Value::Scalar(v))
}

#[test]
fn concurrent_writers_on_distinct_signals_never_lose_or_leak_counts() {
    let reg = Arc::new(Registry::new());
    let barrier = Arc::new(Barrier::new(3));
    let n = 20_000usize;

    let writer = |reg: Arc<Registry>, barrier: Arc<Barrier>, name: &'static str| {
        barrier.wait();
        for i in 0..n {
            reg.append(name, scalar(i as f64, i as f64)).unwrap();
        }
    };

    let reg_a = Arc::clone(&reg);
    let barrier_a = Arc::clone(&barrier);
    let handle_a = thread::spawn(move || writer(reg_a, barrier_a, "A"));

    let reg_b = Arc::clone(&reg);
    let barrier_b = Arc::clone(&barrier);
    let handle_b = thread::spawn(move || writer(reg_b, barrier_b, "B"));

    let reg_reader = Arc::clone(&reg);
    let barrier_reader = Arc::clone(&barrier);
    let reader = thread::spawn(move || {
        barrier_reader.wait();
        for _ in 0..1000 {
            if let Some(agg) = reg_reader.summary("A", None) {
                assert!(agg.metric.count() <= n as u64);
            }
            if let Some(agg) = reg_reader.summary("B", None) {
                assert!(agg.metric.count() <= n as u64);
            }
        }
    });

    handle_a.join().unwrap();
    handle_b.join().unwrap();
    reader.join().unwrap();

    assert_eq!(reg.summary("A", None).unwrap().metric.count(), n as u64);
    assert_eq!(reg.summary("B", None).unwrap().metric.count(), n as u64);
}

#[test]
fn a_burst_of_appends_during_delivery_coalesces_into_one_follow_up_round() {
    use std::sync::atomic::AtomicUsize;

    let reg = Arc::new(Registry::new());
    let deliveries = Arc::new(AtomicUsize::new(0));
    let deliveries_clone = Arc::clone(&deliveries);
    let _handle = reg.subscribe(Box::new(move || {
        deliveries_clone.fetch_add(1, Ordering::SeqCst);
    }));

    let barrier = Arc::new(Barrier::new(4));
    let mut writers = Vec::new();
    for i in 0..3 {
        let reg = Arc::clone(&reg);
        let barrier = Arc::clone(&barrier);
        writers.push(thread::spawn(move || {
            barrier.wait();
            for j in 0..50 {
                reg.append("burst", scalar((i * 50 + j) as f64, j as f64)).unwrap();
            }
        }));
    }
    barrier.wait();
    for w in writers {
        w.join().unwrap();
    }

    assert_eq!(reg.summary("burst", None).unwrap().metric.count(), 150);
    assert!(deliveries.load(Ordering::SeqCst) >= 1);
}
