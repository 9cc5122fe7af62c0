//! User-registered custom metrics
//!
//! A custom metric pairs a name with a [`Sampler`] and a set of thresholds.
//! Metrics are identified by their registration slot, not by name: two
//! metrics registered under the same name keep separate histories.

use crate::error::{MonitorError, MonitorResult};
use perf::Thresholds;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;

/// Reason a sampler could not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SampleError(pub String);

impl SampleError {
    /// Create a new sample error.
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Capability that produces one reading per call.
///
/// Any `FnMut() -> f64` closure is a sampler. Use [`fallible`] to wrap a
/// closure that can report failure.
pub trait Sampler {
    /// Produce the current value.
    fn sample(&mut self) -> Result<f64, SampleError>;
}

impl<F> Sampler for F
where
    F: FnMut() -> f64,
{
    fn sample(&mut self) -> Result<f64, SampleError> {
        Ok(self())
    }
}

/// Sampler built from a closure returning `Result`.
pub struct Fallible<F>(F);

impl<F> Sampler for Fallible<F>
where
    F: FnMut() -> Result<f64, SampleError>,
{
    fn sample(&mut self) -> Result<f64, SampleError> {
        (self.0)()
    }
}

/// Wrap a fallible closure as a [`Sampler`].
pub fn fallible<F>(f: F) -> Fallible<F>
where
    F: FnMut() -> Result<f64, SampleError>,
{
    Fallible(f)
}

/// Slot of a registered metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricId(usize);

impl MetricId {
    /// Registration index.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A named measurement with its own sampler, thresholds and history.
pub struct CustomMetric {
    name: String,
    sampler: Box<dyn Sampler>,
    thresholds: Thresholds,
    history: VecDeque<f64>,
    history_limit: Option<usize>,
}

impl std::fmt::Debug for CustomMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomMetric")
            .field("name", &self.name)
            .field("thresholds", &self.thresholds)
            .field("history_len", &self.history.len())
            .field("history_limit", &self.history_limit)
            .finish_non_exhaustive()
    }
}

impl CustomMetric {
    /// Create a metric with an unbounded history.
    pub fn new(name: impl Into<String>, sampler: impl Sampler + 'static, thresholds: Thresholds) -> Self {
        Self {
            name: name.into(),
            sampler: Box::new(sampler),
            thresholds,
            history: VecDeque::new(),
            history_limit: None,
        }
    }

    /// Keep at most `limit` samples, dropping the oldest.
    pub fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit;
        self
    }

    /// Metric name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Metric thresholds.
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Recorded samples, oldest first.
    pub fn history(&self) -> &VecDeque<f64> {
        &self.history
    }

    /// Discard all recorded samples.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Take one sample and append it to the history.
    ///
    /// Errors, panics and non-finite values from the sampler are all
    /// reported as [`MonitorError::Sampling`] and leave the history untouched.
    pub fn sample(&mut self) -> MonitorResult<f64> {
        let sampler = &mut self.sampler;
        let outcome = catch_unwind(AssertUnwindSafe(|| sampler.sample()));

        let value = match outcome {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => return Err(self.failure(err.0)),
            Err(_) => return Err(self.failure("sampler panicked")),
        };
        if !value.is_finite() {
            return Err(self.failure(format!("non-finite value {}", value)));
        }

        if let Some(limit) = self.history_limit {
            if limit == 0 {
                return Ok(value);
            }
            while self.history.len() >= limit {
                self.history.pop_front();
            }
        }
        self.history.push_back(value);
        Ok(value)
    }

    fn failure(&self, reason: impl Into<String>) -> MonitorError {
        MonitorError::Sampling {
            metric: self.name.clone(),
            reason: reason.into(),
        }
    }

    /// Mean of the history, if any.
    pub fn average(&self) -> Option<f64> {
        if self.history.is_empty() {
            return None;
        }
        Some(self.history.iter().sum::<f64>() / self.history.len() as f64)
    }

    /// Largest value in the history, if any.
    pub fn peak(&self) -> Option<f64> {
        self.history.iter().copied().reduce(f64::max)
    }
}

/// Ordered collection of custom metrics.
#[derive(Debug, Default)]
pub struct MetricRegistry {
    metrics: Vec<CustomMetric>,
    history_limit: Option<usize>,
}

impl MetricRegistry {
    /// Create an empty registry with unbounded histories.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry whose metrics keep at most `limit` samples.
    pub fn with_history_limit(limit: Option<usize>) -> Self {
        Self {
            metrics: Vec::new(),
            history_limit: limit,
        }
    }

    /// Register a lower-is-worse metric.
    ///
    /// Names are not required to be unique.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        sampler: impl Sampler + 'static,
        warning_threshold: f64,
        critical_threshold: f64,
    ) -> MetricId {
        self.register_with_thresholds(
            name,
            sampler,
            Thresholds::lower_is_worse(warning_threshold, critical_threshold),
        )
    }

    /// Register a metric with explicit thresholds and direction.
    pub fn register_with_thresholds(
        &mut self,
        name: impl Into<String>,
        sampler: impl Sampler + 'static,
        thresholds: Thresholds,
    ) -> MetricId {
        let metric = CustomMetric::new(name, sampler, thresholds).with_history_limit(self.history_limit);
        tracing::debug!(
            target: "perf_monitor::registry",
            name = metric.name(),
            index = self.metrics.len(),
            "custom metric registered"
        );
        self.metrics.push(metric);
        MetricId(self.metrics.len() - 1)
    }

    /// Get a metric by id.
    pub fn get(&self, id: MetricId) -> Option<&CustomMetric> {
        self.metrics.get(id.0)
    }

    /// Every metric registered under `name`, in registration order.
    pub fn by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a CustomMetric> + 'a {
        self.metrics.iter().filter(move |m| m.name == name)
    }

    /// Iterate over all metrics in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &CustomMetric> {
        self.metrics.iter()
    }

    /// Iterate mutably over all metrics in registration order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CustomMetric> {
        self.metrics.iter_mut()
    }

    /// Clear every metric's history.
    pub fn clear_histories(&mut self) {
        for metric in &mut self.metrics {
            metric.clear_history();
        }
    }

    /// Number of registered metrics.
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Check if no metrics are registered.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_sampler() {
        let mut n = 0.0;
        let mut metric = CustomMetric::new(
            "counter",
            move || {
                n += 1.0;
                n
            },
            Thresholds::lower_is_worse(10.0, 5.0),
        );

        assert_eq!(metric.sample().unwrap(), 1.0);
        assert_eq!(metric.sample().unwrap(), 2.0);
        assert_eq!(metric.history().iter().copied().collect::<Vec<_>>(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_fallible_sampler_error() {
        let mut metric = CustomMetric::new(
            "gpu_temp",
            fallible(|| Err(SampleError::new("sensor offline"))),
            Thresholds::higher_is_worse(80.0, 95.0),
        );

        let err = metric.sample().unwrap_err();
        assert!(matches!(err, MonitorError::Sampling { ref metric, .. } if metric == "gpu_temp"));
        assert!(metric.history().is_empty());
    }

    #[test]
    fn test_panicking_sampler_is_contained() {
        let mut metric = CustomMetric::new(
            "explodes",
            || -> f64 { panic!("boom") },
            Thresholds::lower_is_worse(1.0, 0.0),
        );

        assert!(matches!(metric.sample(), Err(MonitorError::Sampling { .. })));
        assert!(metric.history().is_empty());
    }

    #[test]
    fn test_non_finite_sample_rejected() {
        let mut metric = CustomMetric::new("nan", || f64::NAN, Thresholds::lower_is_worse(1.0, 0.0));
        assert!(metric.sample().is_err());
        assert!(metric.history().is_empty());
    }

    #[test]
    fn test_average_and_peak() {
        let values = [10.0, 20.0, 30.0];
        let mut i = 0;
        let mut metric = CustomMetric::new(
            "load",
            move || {
                let v = values[i];
                i += 1;
                v
            },
            Thresholds::lower_is_worse(15.0, 5.0),
        );
        assert_eq!(metric.average(), None);
        assert_eq!(metric.peak(), None);

        for _ in 0..3 {
            metric.sample().unwrap();
        }
        assert_eq!(metric.average(), Some(20.0));
        assert_eq!(metric.peak(), Some(30.0));
    }

    #[test]
    fn test_history_limit() {
        let mut n = 0.0;
        let mut metric = CustomMetric::new(
            "ring",
            move || {
                n += 1.0;
                n
            },
            Thresholds::lower_is_worse(0.0, 0.0),
        )
        .with_history_limit(Some(2));

        for _ in 0..5 {
            metric.sample().unwrap();
        }
        assert_eq!(metric.history().iter().copied().collect::<Vec<_>>(), vec![4.0, 5.0]);
    }

    #[test]
    fn test_duplicate_names_keep_separate_histories() {
        let mut registry = MetricRegistry::new();
        let a = registry.register("frame_budget", || 1.0, 0.5, 0.25);
        let b = registry.register("frame_budget", || 2.0, 0.5, 0.25);
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);

        for metric in registry.iter_mut() {
            metric.sample().unwrap();
            metric.sample().unwrap();
        }

        assert_eq!(registry.get(a).unwrap().history().iter().copied().collect::<Vec<_>>(), vec![1.0, 1.0]);
        assert_eq!(registry.get(b).unwrap().history().iter().copied().collect::<Vec<_>>(), vec![2.0, 2.0]);
        assert_eq!(registry.by_name("frame_budget").count(), 2);
    }

    #[test]
    fn test_registry_clear_histories() {
        let mut registry = MetricRegistry::with_history_limit(Some(10));
        registry.register("a", || 1.0, 0.0, 0.0);
        for metric in registry.iter_mut() {
            metric.sample().unwrap();
        }
        registry.clear_histories();
        assert!(registry.iter().all(|m| m.history().is_empty()));
    }

    #[test]
    fn test_register_direction() {
        let mut registry = MetricRegistry::new();
        let id = registry.register_with_thresholds("temp", || 70.0, Thresholds::higher_is_worse(80.0, 95.0));
        assert_eq!(id.index(), 0);
        assert_eq!(registry.get(id).unwrap().thresholds().direction, perf::Direction::HigherIsWorse);
    }
}
