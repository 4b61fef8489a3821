//! Run statistics: comparison counters and stage timings.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Counters and timings collected during a run.
///
/// Counters are atomic so parallel scoring can update them directly.
#[derive(Debug, Default)]
pub struct Statistics {
    name: String,
    compared_batches: AtomicU64,
    compared_pairs: AtomicU64,
    compared_fields: AtomicU64,
    timings: Mutex<BTreeMap<String, Vec<Duration>>>,
}

/// Serializable snapshot of [`Statistics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub name: String,
    pub compared_batches: u64,
    pub compared_pairs: u64,
    pub compared_fields: u64,
    /// Average number of contributing fields per compared pair
    pub compared_fields_avg: f64,
    /// Total seconds per timed stage
    pub timings: BTreeMap<String, f64>,
}

impl Statistics {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_batch(&self) {
        self.compared_batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pair(&self, fields: usize) {
        self.compared_pairs.fetch_add(1, Ordering::Relaxed);
        self.compared_fields.fetch_add(fields as u64, Ordering::Relaxed);
    }

    pub fn compared_batches(&self) -> u64 {
        self.compared_batches.load(Ordering::Relaxed)
    }

    pub fn compared_pairs(&self) -> u64 {
        self.compared_pairs.load(Ordering::Relaxed)
    }

    pub fn compared_fields(&self) -> u64 {
        self.compared_fields.load(Ordering::Relaxed)
    }

    pub fn record_timing(&self, stage: &str, elapsed: Duration) {
        if let Ok(mut timings) = self.timings.lock() {
            timings.entry(stage.to_string()).or_default().push(elapsed);
        }
    }

    /// Run `f`, recording how long it took under `stage`.
    pub fn time<T>(&self, stage: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        tracing::debug!("{} took {:.3} seconds", stage, elapsed.as_secs_f64());
        self.record_timing(stage, elapsed);
        result
    }

    pub fn summary(&self) -> StatsSummary {
        let pairs = self.compared_pairs();
        let fields = self.compared_fields();
        let timings: BTreeMap<String, f64> = self
            .timings
            .lock()
            .map(|t| {
                t.iter()
                    .map(|(k, v)| (k.clone(), v.iter().map(Duration::as_secs_f64).sum::<f64>()))
                    .collect()
            })
            .unwrap_or_default();

        StatsSummary {
            name: self.name.clone(),
            compared_batches: self.compared_batches(),
            compared_pairs: pairs,
            compared_fields: fields,
            compared_fields_avg: if pairs > 0 { fields as f64 / pairs as f64 } else { 0.0 },
            timings,
        }
    }

    /// Log timings and comparison counts.
    pub fn report(&self) {
        let timing_str = {
            let Ok(timings) = self.timings.lock() else {
                return;
            };
            if timings.is_empty() {
                return;
            }

            let mut s = String::from("Timings:\n");
            for (stage, runs) in timings.iter() {
                let total: f64 = runs.iter().map(Duration::as_secs_f64).sum();
                if runs.len() == 1 {
                    let _ = writeln!(s, "{stage}: {total:.5} seconds");
                } else {
                    let _ = writeln!(s, "{stage}");
                    let _ = writeln!(s, "\taverage: {:.5}", total / runs.len() as f64);
                    let _ = writeln!(s, "\tnumbers called: {}", runs.len());
                    let _ = writeln!(s, "\ttotal duration: {total:.5}");
                }
            }
            s
        };
        tracing::info!("[{}] {}", self.name, timing_str);

        let summary = self.summary();
        tracing::info!(
            "[{}] Comparisons: {} batches, {} pairs, {:.2} fields per pair",
            self.name,
            summary.compared_batches,
            summary.compared_pairs,
            summary.compared_fields_avg
        );
    }
}
