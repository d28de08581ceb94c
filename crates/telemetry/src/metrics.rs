//! In-memory metric primitives and a name-keyed registry.
//!
//! No external exporter ships here; a caller wanting Prometheus/OTel
//! export reads the registry's current values and pushes them out on its
//! own cadence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
pub struct Counter {
    value: Arc<AtomicU64>,
}

impl Counter {
    #[must_use]
    pub fn new() -> Self {
        Self { value: Arc::new(AtomicU64::new(0)) }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct Gauge {
    value: Arc<AtomicI64>,
}

impl Gauge {
    #[must_use]
    pub fn new() -> Self {
        Self { value: Arc::new(AtomicI64::new(0)) }
    }

    pub fn set(&self, v: i64) {
        self.value.store(v, Ordering::Relaxed);
    }

    #[must_use]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for Gauge {
    fn default() -> Self {
        Self::new()
    }
}

/// Records raw observations. Fine for a single run's node-duration
/// samples; not meant to hold millions of points.
#[derive(Debug, Clone)]
pub struct Histogram {
    observations: Arc<RwLock<Vec<f64>>>,
}

impl Histogram {
    #[must_use]
    pub fn new() -> Self {
        Self { observations: Arc::new(RwLock::new(Vec::new())) }
    }

    pub fn observe(&self, value: f64) {
        self.observations.write().expect("histogram lock poisoned").push(value);
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.observations.read().expect("histogram lock poisoned").len()
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.observations.read().expect("histogram lock poisoned").iter().sum()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Get-or-create registry of named counters/gauges/histograms, shared by
/// clone across every node execution within one run.
#[derive(Debug, Clone, Default)]
pub struct MetricsRegistry {
    counters: Arc<RwLock<HashMap<String, Counter>>>,
    gauges: Arc<RwLock<HashMap<String, Gauge>>>,
    histograms: Arc<RwLock<HashMap<String, Histogram>>>,
}

impl MetricsRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> Counter {
        self.counters.write().expect("counter lock poisoned").entry(name.to_owned()).or_default().clone()
    }

    pub fn gauge(&self, name: &str) -> Gauge {
        self.gauges.write().expect("gauge lock poisoned").entry(name.to_owned()).or_default().clone()
    }

    pub fn histogram(&self, name: &str) -> Histogram {
        self.histograms.write().expect("histogram lock poisoned").entry(name.to_owned()).or_default().clone()
    }
}
