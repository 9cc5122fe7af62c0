//! Timed benchmark runs over custom metrics
//!
//! A run starts with [`BenchmarkController::start`], samples every registered
//! custom metric once per tick, and ends either when the configured duration
//! has elapsed or on an explicit [`BenchmarkController::end`]. Ending produces
//! a [`ComparisonResult`] that is appended to the benchmark history.
//!
//! Starting while a run is active restarts it and discards the old run's
//! samples. [`BenchmarkController::cancel`] discards without restarting.

use crate::error::MonitorError;
use crate::registry::{MetricId, MetricRegistry, Sampler};
use chrono::{DateTime, Utc};
use perf::{ThresholdEvaluator, Thresholds};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use uuid::Uuid;

/// Settings for one benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkConfig {
    /// Name used in the result and report file name
    pub benchmark_name: String,
    /// Run length in seconds of host time
    pub benchmark_duration: f64,
    /// Write a text report when the run completes
    pub generate_detailed_report: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            benchmark_name: "Benchmark".to_string(),
            benchmark_duration: 60.0,
            generate_detailed_report: true,
        }
    }
}

impl BenchmarkConfig {
    /// Create a config with a name and duration.
    pub fn new(name: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            benchmark_name: name.into(),
            benchmark_duration: duration_secs,
            ..Self::default()
        }
    }

    /// Builder method to toggle the text report.
    pub fn with_detailed_report(mut self, enabled: bool) -> Self {
        self.generate_detailed_report = enabled;
        self
    }
}

/// Lifecycle state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchmarkState {
    /// No run has started, or the last run was cancelled
    Idle,
    /// A run is collecting samples
    Running,
    /// The last run finished and produced a result
    Completed,
}

/// Summary of one finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub benchmark_name: String,
    /// Unique id of the run; distinguishes same-named runs
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    /// Mean of each metric's history
    pub average_metrics: BTreeMap<String, f64>,
    /// Largest value in each metric's history
    pub peak_metrics: BTreeMap<String, f64>,
    /// One line per metric whose average exceeded its warning threshold
    pub alerts: Vec<String>,
}

impl ComparisonResult {
    /// Check if the run raised any end-of-run alerts.
    pub fn has_alerts(&self) -> bool {
        !self.alerts.is_empty()
    }

    /// Change in each average relative to `baseline`, for metrics present in both.
    pub fn compare_to(&self, baseline: &ComparisonResult) -> Vec<MetricDelta> {
        self.average_metrics
            .iter()
            .filter_map(|(name, &current)| {
                baseline.average_metrics.get(name).map(|&before| MetricDelta {
                    name: name.clone(),
                    baseline: before,
                    current,
                    percent_change: (before != 0.0).then(|| (current - before) / before.abs() * 100.0),
                })
            })
            .collect()
    }
}

/// Change in one metric's average between two runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDelta {
    pub name: String,
    pub baseline: f64,
    pub current: f64,
    /// `None` when the baseline average is zero
    pub percent_change: Option<f64>,
}

impl MetricDelta {
    /// Absolute change.
    pub fn difference(&self) -> f64 {
        self.current - self.baseline
    }
}

/// Append-only list of completed results.
///
/// Unbounded by default; a long-running process that benchmarks repeatedly
/// should set a limit.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkHistory {
    results: VecDeque<ComparisonResult>,
    limit: Option<usize>,
}

impl BenchmarkHistory {
    /// Create an empty history.
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            results: VecDeque::new(),
            limit,
        }
    }

    /// Append a result, dropping the oldest if over the limit.
    pub fn push(&mut self, result: ComparisonResult) {
        if let Some(limit) = self.limit {
            if limit == 0 {
                return;
            }
            while self.results.len() >= limit {
                self.results.pop_front();
            }
        }
        self.results.push_back(result);
    }

    /// Results in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ComparisonResult> {
        self.results.iter()
    }

    /// All results, most recent timestamp first.
    ///
    /// Results with equal timestamps are ordered latest-inserted first.
    pub fn most_recent_first(&self) -> Vec<ComparisonResult> {
        let mut results: Vec<ComparisonResult> = self.results.iter().rev().cloned().collect();
        results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        results
    }

    /// The last result appended.
    pub fn latest(&self) -> Option<&ComparisonResult> {
        self.results.back()
    }

    /// Number of stored results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check if the history is empty.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// What one benchmark tick produced.
#[derive(Debug, Default)]
pub struct BenchmarkTick {
    /// Metrics that were sampled successfully
    pub sampled: usize,
    /// Metrics whose sampler failed this tick
    pub failures: Vec<MonitorError>,
    /// Set when this tick completed the run
    pub completed: Option<ComparisonResult>,
}

#[derive(Debug, Clone)]
struct BenchmarkRun {
    start_time: f64,
}

/// Drives benchmark runs over a [`MetricRegistry`].
#[derive(Debug)]
pub struct BenchmarkController {
    registry: MetricRegistry,
    config: Option<BenchmarkConfig>,
    run: Option<BenchmarkRun>,
    state: BenchmarkState,
    history: BenchmarkHistory,
}

impl Default for BenchmarkController {
    fn default() -> Self {
        Self::new(MetricRegistry::new(), BenchmarkHistory::default())
    }
}

impl BenchmarkController {
    /// Create a controller over a registry and history.
    pub fn new(registry: MetricRegistry, history: BenchmarkHistory) -> Self {
        Self {
            registry,
            config: None,
            run: None,
            state: BenchmarkState::Idle,
            history,
        }
    }

    /// Register a lower-is-worse custom metric.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        sampler: impl Sampler + 'static,
        warning_threshold: f64,
        critical_threshold: f64,
    ) -> MetricId {
        self.registry.register(name, sampler, warning_threshold, critical_threshold)
    }

    /// Register a custom metric with explicit thresholds and direction.
    pub fn register_with_thresholds(
        &mut self,
        name: impl Into<String>,
        sampler: impl Sampler + 'static,
        thresholds: Thresholds,
    ) -> MetricId {
        self.registry.register_with_thresholds(name, sampler, thresholds)
    }

    /// Begin a run at host time `now`.
    ///
    /// Clears every metric's history. A run already in progress is discarded.
    pub fn start(&mut self, config: BenchmarkConfig, now: f64) {
        if self.run.is_some() {
            tracing::debug!(
                target: "perf_monitor::benchmark",
                name = %config.benchmark_name,
                "benchmark restarted, in-flight samples discarded"
            );
        }

        self.registry.clear_histories();
        tracing::info!(
            target: "perf_monitor::benchmark",
            name = %config.benchmark_name,
            duration = config.benchmark_duration,
            metrics = self.registry.len(),
            "benchmark started"
        );
        self.config = Some(config);
        self.run = Some(BenchmarkRun { start_time: now });
        self.state = BenchmarkState::Running;
    }

    /// Sample every custom metric and check for completion.
    ///
    /// When `sample_metrics` is false the run still times out but records nothing.
    pub fn tick(&mut self, now: f64, evaluator: &mut ThresholdEvaluator, sample_metrics: bool) -> BenchmarkTick {
        let mut tick = BenchmarkTick::default();
        let Some(run) = &self.run else {
            return tick;
        };
        let start_time = run.start_time;

        if sample_metrics {
            for metric in self.registry.iter_mut() {
                match metric.sample() {
                    Ok(value) => {
                        evaluator.evaluate(metric.name(), value, metric.thresholds());
                        tick.sampled += 1;
                    }
                    Err(err) => {
                        tracing::warn!(target: "perf_monitor::benchmark", error = %err, "custom metric skipped");
                        tick.failures.push(err);
                    }
                }
            }
        }

        let duration = self.config.as_ref().map_or(0.0, |c| c.benchmark_duration);
        if now - start_time >= duration {
            tick.completed = self.end();
        }
        tick
    }

    /// Finish the current run now.
    ///
    /// Returns `None` and records nothing when no run is active.
    pub fn end(&mut self) -> Option<ComparisonResult> {
        self.end_at(Utc::now())
    }

    /// Finish the current run, stamping the result with `timestamp`.
    pub fn end_at(&mut self, timestamp: DateTime<Utc>) -> Option<ComparisonResult> {
        self.run.take()?;
        self.state = BenchmarkState::Completed;

        let benchmark_name = self
            .config
            .as_ref()
            .map(|c| c.benchmark_name.clone())
            .unwrap_or_default();

        let mut result = ComparisonResult {
            benchmark_name,
            run_id: Uuid::new_v4().to_string(),
            timestamp,
            average_metrics: BTreeMap::new(),
            peak_metrics: BTreeMap::new(),
            alerts: Vec::new(),
        };

        for metric in self.registry.iter() {
            let (Some(average), Some(peak)) = (metric.average(), metric.peak()) else {
                continue;
            };
            result.average_metrics.insert(metric.name().to_string(), average);
            result.peak_metrics.insert(metric.name().to_string(), peak);

            // Only the average is checked, and only against the warning level.
            if average > metric.thresholds().warning {
                result.alerts.push(format!("{} exceeded warning threshold", metric.name()));
            }
        }

        tracing::info!(
            target: "perf_monitor::benchmark",
            name = %result.benchmark_name,
            metrics = result.average_metrics.len(),
            alerts = result.alerts.len(),
            "benchmark completed"
        );

        self.history.push(result.clone());
        Some(result)
    }

    /// Abandon the current run without producing a result.
    ///
    /// Returns whether a run was active.
    pub fn cancel(&mut self) -> bool {
        if self.run.take().is_none() {
            return false;
        }
        self.state = BenchmarkState::Idle;
        tracing::info!(target: "perf_monitor::benchmark", "benchmark cancelled");
        true
    }

    /// Fraction of the run's duration elapsed at `now`, while running.
    pub fn progress(&self, now: f64) -> Option<f64> {
        let run = self.run.as_ref()?;
        let duration = self.config.as_ref()?.benchmark_duration;
        if duration <= 0.0 {
            return Some(1.0);
        }
        Some(((now - run.start_time) / duration).clamp(0.0, 1.0))
    }

    /// Check if a run is collecting samples.
    pub fn is_active(&self) -> bool {
        self.run.is_some()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BenchmarkState {
        self.state
    }

    /// Config of the current or most recent run.
    pub fn config(&self) -> Option<&BenchmarkConfig> {
        self.config.as_ref()
    }

    /// All completed results, most recent first.
    pub fn compare_benchmarks(&self) -> Vec<ComparisonResult> {
        self.history.most_recent_first()
    }

    /// The completed-result history.
    pub fn history(&self) -> &BenchmarkHistory {
        &self.history
    }

    /// The custom metric registry.
    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Mutable access to the custom metric registry.
    pub fn registry_mut(&mut self) -> &mut MetricRegistry {
        &mut self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use perf::Severity;
    use std::cell::Cell;
    use std::rc::Rc;

    fn sequence(values: Vec<f64>) -> impl FnMut() -> f64 {
        let mut i = 0;
        move || {
            let v = values[i % values.len()];
            i += 1;
            v
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_start_and_state() {
        let mut controller = BenchmarkController::default();
        assert_eq!(controller.state(), BenchmarkState::Idle);

        controller.start(BenchmarkConfig::new("boot", 60.0), 0.0);
        assert_eq!(controller.state(), BenchmarkState::Running);
        assert!(controller.is_active());
    }

    #[test]
    fn test_duration_boundary() {
        let mut controller = BenchmarkController::default();
        let mut evaluator = ThresholdEvaluator::new();
        controller.register("load", || 1.0, 0.0, 0.0);
        controller.start(BenchmarkConfig::new("boundary", 60.0), 10.0);

        let tick = controller.tick(69.999, &mut evaluator, true);
        assert!(tick.completed.is_none());
        assert!(controller.is_active());

        let tick = controller.tick(70.0, &mut evaluator, true);
        assert!(tick.completed.is_some());
        assert_eq!(controller.state(), BenchmarkState::Completed);
        assert!(!controller.is_active());
    }

    #[test]
    fn test_result_average_peak_and_alert() {
        let mut controller = BenchmarkController::default();
        let mut evaluator = ThresholdEvaluator::new();
        controller.register("latency", sequence(vec![10.0, 20.0, 30.0]), 15.0, 50.0);
        controller.start(BenchmarkConfig::new("summary", 100.0), 0.0);

        for t in 1..=3 {
            controller.tick(t as f64, &mut evaluator, true);
        }
        let result = controller.end_at(at(0)).unwrap();

        assert_eq!(result.average_metrics["latency"], 20.0);
        assert_eq!(result.peak_metrics["latency"], 30.0);
        assert_eq!(result.alerts, vec!["latency exceeded warning threshold".to_string()]);
    }

    #[test]
    fn test_alert_ignores_peak_and_critical() {
        let mut controller = BenchmarkController::default();
        let mut evaluator = ThresholdEvaluator::new();
        // peak 100 is far past critical, but the average stays under warning
        controller.register("spiky", sequence(vec![0.0, 0.0, 0.0, 100.0]), 30.0, 50.0);
        controller.start(BenchmarkConfig::new("spikes", 100.0), 0.0);

        for t in 1..=4 {
            controller.tick(t as f64, &mut evaluator, true);
        }
        let result = controller.end().unwrap();

        assert_eq!(result.average_metrics["spiky"], 25.0);
        assert_eq!(result.peak_metrics["spiky"], 100.0);
        assert!(result.alerts.is_empty());
    }

    #[test]
    fn test_tick_alerts_use_thresholds() {
        let mut controller = BenchmarkController::default();
        let mut evaluator = ThresholdEvaluator::new();
        controller.register("fps_budget", sequence(vec![29.0, 40.0, 50.0]), 45.0, 30.0);
        controller.start(BenchmarkConfig::new("alerts", 100.0), 0.0);

        for t in 1..=3 {
            controller.tick(t as f64, &mut evaluator, true);
        }
        let severities: Vec<Severity> = evaluator.drain().iter().map(|a| a.severity).collect();
        assert_eq!(severities, vec![Severity::Critical, Severity::Warning]);
    }

    #[test]
    fn test_end_while_idle_returns_none() {
        let mut controller = BenchmarkController::default();
        assert!(controller.end().is_none());
        assert!(controller.history().is_empty());
        assert_eq!(controller.state(), BenchmarkState::Idle);
    }

    #[test]
    fn test_metrics_with_empty_history_are_omitted() {
        let mut controller = BenchmarkController::default();
        controller.register("never_sampled", || 1.0, 0.0, 0.0);
        controller.start(BenchmarkConfig::new("empty", 10.0), 0.0);

        let result = controller.end().unwrap();
        assert!(result.average_metrics.is_empty());
        assert!(result.peak_metrics.is_empty());
        assert_eq!(controller.history().len(), 1);
    }

    #[test]
    fn test_restart_clears_history() {
        let mut controller = BenchmarkController::default();
        let mut evaluator = ThresholdEvaluator::new();
        let id = controller.register("load", || 5.0, 0.0, 0.0);

        controller.start(BenchmarkConfig::new("first", 100.0), 0.0);
        controller.tick(1.0, &mut evaluator, true);
        controller.tick(2.0, &mut evaluator, true);
        assert_eq!(controller.registry().get(id).unwrap().history().len(), 2);

        controller.start(BenchmarkConfig::new("second", 5.0), 3.0);
        assert!(controller.registry().get(id).unwrap().history().is_empty());
        assert_eq!(controller.config().unwrap().benchmark_name, "second");

        // Restarted run times out relative to its own start
        assert!(controller.tick(7.9, &mut evaluator, true).completed.is_none());
        assert!(controller.tick(8.0, &mut evaluator, true).completed.is_some());
        assert_eq!(controller.history().len(), 1);
    }

    #[test]
    fn test_cancel_discards_run() {
        let mut controller = BenchmarkController::default();
        let mut evaluator = ThresholdEvaluator::new();
        controller.register("load", || 5.0, 0.0, 0.0);

        assert!(!controller.cancel());

        controller.start(BenchmarkConfig::new("cancelled", 100.0), 0.0);
        controller.tick(1.0, &mut evaluator, true);
        assert!(controller.cancel());

        assert_eq!(controller.state(), BenchmarkState::Idle);
        assert!(controller.history().is_empty());
        assert!(controller.end().is_none());
    }

    #[test]
    fn test_sampling_failure_skips_metric() {
        let mut controller = BenchmarkController::default();
        let mut evaluator = ThresholdEvaluator::new();
        let good = controller.register("good", || 1.0, 0.0, 0.0);
        let bad = controller.register("bad", || f64::NAN, 0.0, 0.0);
        controller.start(BenchmarkConfig::new("failures", 100.0), 0.0);

        let tick = controller.tick(1.0, &mut evaluator, true);
        assert_eq!(tick.sampled, 1);
        assert_eq!(tick.failures.len(), 1);
        assert_eq!(controller.registry().get(good).unwrap().history().len(), 1);
        assert!(controller.registry().get(bad).unwrap().history().is_empty());

        let result = controller.end().unwrap();
        assert!(result.average_metrics.contains_key("good"));
        assert!(!result.average_metrics.contains_key("bad"));
    }

    #[test]
    fn test_sampling_disabled_still_times_out() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut controller = BenchmarkController::default();
        let mut evaluator = ThresholdEvaluator::new();
        controller.register(
            "counted",
            move || {
                counter.set(counter.get() + 1);
                1.0
            },
            0.0,
            0.0,
        );
        controller.start(BenchmarkConfig::new("disabled", 1.0), 0.0);

        let tick = controller.tick(2.0, &mut evaluator, false);
        assert_eq!(calls.get(), 0);
        assert!(tick.completed.unwrap().average_metrics.is_empty());
    }

    #[test]
    fn test_compare_benchmarks_most_recent_first() {
        let mut controller = BenchmarkController::default();
        controller.start(BenchmarkConfig::new("old", 10.0), 0.0);
        controller.end_at(at(10));
        controller.start(BenchmarkConfig::new("newest", 10.0), 0.0);
        controller.end_at(at(30));
        controller.start(BenchmarkConfig::new("middle", 10.0), 0.0);
        controller.end_at(at(20));

        let names: Vec<String> = controller
            .compare_benchmarks()
            .into_iter()
            .map(|r| r.benchmark_name)
            .collect();
        assert_eq!(names, vec!["newest", "middle", "old"]);

        // No intervening end: identical sequence
        assert_eq!(controller.compare_benchmarks(), controller.compare_benchmarks());
    }

    #[test]
    fn test_history_limit_drops_oldest() {
        let mut history = BenchmarkHistory::new(Some(2));
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            history.push(ComparisonResult {
                benchmark_name: name.to_string(),
                run_id: format!("run-{}", i),
                timestamp: at(i as i64),
                average_metrics: BTreeMap::new(),
                peak_metrics: BTreeMap::new(),
                alerts: Vec::new(),
            });
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.iter().next().unwrap().benchmark_name, "b");
        assert_eq!(history.latest().unwrap().benchmark_name, "c");
    }

    #[test]
    fn test_progress() {
        let mut controller = BenchmarkController::default();
        assert_eq!(controller.progress(5.0), None);

        controller.start(BenchmarkConfig::new("progress", 10.0), 2.0);
        assert_eq!(controller.progress(7.0), Some(0.5));
        assert_eq!(controller.progress(100.0), Some(1.0));
    }

    #[test]
    fn test_compare_to_baseline() {
        let mut before = BTreeMap::new();
        before.insert("fps".to_string(), 50.0);
        before.insert("zero".to_string(), 0.0);
        let mut after = BTreeMap::new();
        after.insert("fps".to_string(), 60.0);
        after.insert("zero".to_string(), 3.0);
        after.insert("new".to_string(), 1.0);

        let baseline = ComparisonResult {
            benchmark_name: "base".to_string(),
            run_id: "base".to_string(),
            timestamp: at(0),
            average_metrics: before,
            peak_metrics: BTreeMap::new(),
            alerts: Vec::new(),
        };
        let current = ComparisonResult {
            benchmark_name: "current".to_string(),
            run_id: "current".to_string(),
            timestamp: at(1),
            average_metrics: after,
            peak_metrics: BTreeMap::new(),
            alerts: Vec::new(),
        };

        let deltas = current.compare_to(&baseline);
        assert_eq!(deltas.len(), 2);
        let fps = deltas.iter().find(|d| d.name == "fps").unwrap();
        assert_eq!(fps.percent_change, Some(20.0));
        assert_eq!(fps.difference(), 10.0);
        let zero = deltas.iter().find(|d| d.name == "zero").unwrap();
        assert_eq!(zero.percent_change, None);
    }

    #[test]
    fn test_result_serialization() {
        let mut controller = BenchmarkController::default();
        let mut evaluator = ThresholdEvaluator::new();
        controller.register("load", || 4.0, 1.0, 0.0);
        controller.start(BenchmarkConfig::new("json", 10.0), 0.0);
        controller.tick(1.0, &mut evaluator, true);
        let result = controller.end().unwrap();

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"averageMetrics\""));
        let parsed: ComparisonResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }
}
