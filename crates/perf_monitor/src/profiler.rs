//! Tick-driven profiler state
//!
//! [`ProfilerState`] owns everything the monitor tracks and is driven by the
//! host: `init(config)`, then `tick(reading)` once per frame, then `shutdown()`.
//!
//! Each tick runs, in order:
//! 1. built-in channel sampling,
//! 2. the throttled platform refresh,
//! 3. threshold checks on the built-in channels,
//! 4. the throttled time-series log row,
//! 5. the benchmark step (custom metric sampling, thresholds, completion).
//!
//! A failure in any step is logged and returned in the [`TickOutcome`]; it
//! never prevents the remaining steps or later ticks from running.

use crate::benchmark::{BenchmarkConfig, BenchmarkController, BenchmarkHistory, ComparisonResult};
use crate::config::{ConfigStore, MonitorConfig};
use crate::error::{MonitorError, MonitorResult};
use crate::logger::{TimeSeriesLogger, DEFAULT_LOG_INTERVAL};
use crate::registry::{MetricId, MetricRegistry, Sampler};
use crate::report::ReportGenerator;
use crate::sink::{ArtifactSink, FsSink, QueuedSink};
use perf::{
    Alert, BuiltinChannels, Channel, ChannelKind, ChannelSampler, FrameReading, PlatformMetrics,
    PlatformMetricsProvider, PlatformSource, Severity, ThresholdEvaluator, Thresholds,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Runtime options that are not part of a stored profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilerOptions {
    /// Directory for time-series logs
    pub log_dir: PathBuf,
    /// Directory for benchmark reports
    pub report_dir: PathBuf,
    /// Directory for configuration profiles
    pub config_dir: PathBuf,
    /// Perform log and report writes on a background worker
    pub queued_writes: bool,
    /// Keep at most this many samples per custom metric
    pub custom_history_limit: Option<usize>,
    /// Keep at most this many benchmark results
    pub benchmark_history_limit: Option<usize>,
    /// Seconds between time-series rows
    pub log_interval: f64,
}

impl Default for ProfilerOptions {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("perf_logs"),
            report_dir: PathBuf::from("perf_reports"),
            config_dir: PathBuf::from("perf_profiles"),
            queued_writes: false,
            custom_history_limit: None,
            benchmark_history_limit: None,
            log_interval: DEFAULT_LOG_INTERVAL,
        }
    }
}

impl ProfilerOptions {
    /// Place logs, reports and profiles in subdirectories of `root`.
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            log_dir: root.join("logs"),
            report_dir: root.join("reports"),
            config_dir: root.join("profiles"),
            ..Self::default()
        }
    }

    /// Builder method to toggle background writes.
    pub fn with_queued_writes(mut self, queued: bool) -> Self {
        self.queued_writes = queued;
        self
    }

    /// Builder method to bound per-metric history.
    pub fn with_custom_history_limit(mut self, limit: usize) -> Self {
        self.custom_history_limit = Some(limit);
        self
    }

    /// Builder method to bound the benchmark history.
    pub fn with_benchmark_history_limit(mut self, limit: usize) -> Self {
        self.benchmark_history_limit = Some(limit);
        self
    }

    /// Builder method to set the time-series interval.
    pub fn with_log_interval(mut self, seconds: f64) -> Self {
        self.log_interval = seconds;
        self
    }
}

/// Host inputs for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReading {
    /// Host time in seconds, monotonically non-decreasing
    pub now: f64,
    /// Frame inputs for the built-in channels
    pub frame: FrameReading,
}

impl TickReading {
    /// Create a tick reading.
    pub fn new(now: f64, unscaled_delta: f64, process_memory_bytes: u64, system_memory_bytes: u64) -> Self {
        Self {
            now,
            frame: FrameReading::new(unscaled_delta, process_memory_bytes, system_memory_bytes),
        }
    }
}

/// Everything one tick produced.
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Threshold alerts from built-in channels and custom metrics
    pub alerts: Vec<Alert>,
    /// Sampling and write failures; none of them stopped the tick
    pub failures: Vec<MonitorError>,
    /// A time-series row was written
    pub logged: bool,
    /// Platform metrics were refreshed
    pub platform_updated: bool,
    /// Set when a benchmark completed on this tick
    pub completed: Option<ComparisonResult>,
}

/// A benchmark ended on request.
#[derive(Debug)]
pub struct BenchmarkEnd {
    pub result: ComparisonResult,
    /// Report write failures; the result is kept regardless
    pub failures: Vec<MonitorError>,
}

/// A channel with its current classification, for overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatus {
    pub channel: Channel,
    pub severity: Severity,
    pub color: String,
}

/// Serializable view of the profiler for external presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfSnapshot {
    pub time: f64,
    pub fps: ChannelStatus,
    pub gpu: ChannelStatus,
    pub memory: ChannelStatus,
    pub platform: PlatformMetrics,
    pub benchmark_active: bool,
    pub benchmark_progress: Option<f64>,
}

/// All monitor state, owned by one host.
pub struct ProfilerState {
    config: MonitorConfig,
    options: ProfilerOptions,
    sampler: ChannelSampler,
    channels: BuiltinChannels,
    platform: PlatformMetricsProvider,
    evaluator: ThresholdEvaluator,
    logger: TimeSeriesLogger,
    reports: ReportGenerator,
    store: ConfigStore,
    benchmark: BenchmarkController,
    sink: Arc<dyn ArtifactSink>,
    last_tick: f64,
}

impl std::fmt::Debug for ProfilerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfilerState")
            .field("config", &self.config)
            .field("options", &self.options)
            .field("channels", &self.channels)
            .field("platform", &self.platform)
            .field("benchmark", &self.benchmark)
            .field("last_tick", &self.last_tick)
            .finish_non_exhaustive()
    }
}

impl ProfilerState {
    /// Validate `config` and build the profiler.
    pub fn init(config: MonitorConfig, options: ProfilerOptions) -> MonitorResult<Self> {
        config.validate()?;

        let sink: Arc<dyn ArtifactSink> = if options.queued_writes {
            Arc::new(QueuedSink::spawn()?)
        } else {
            Arc::new(FsSink)
        };

        let registry = MetricRegistry::with_history_limit(options.custom_history_limit);
        let history = BenchmarkHistory::new(options.benchmark_history_limit);

        tracing::info!(
            target: "perf_monitor::profiler",
            profile = %config.profile_name,
            platform = config.platform_mode.name(),
            queued = options.queued_writes,
            "profiler initialized"
        );

        Ok(Self {
            sampler: ChannelSampler::from_time_to_converge(config.time_to_converge),
            channels: BuiltinChannels::new(),
            platform: PlatformMetricsProvider::new(
                config.platform_mode,
                config.tracking,
                config.display_update_interval,
            ),
            evaluator: ThresholdEvaluator::new(),
            logger: TimeSeriesLogger::new(&options.log_dir, options.log_interval, Arc::clone(&sink)),
            reports: ReportGenerator::new(&options.report_dir, Arc::clone(&sink)),
            store: ConfigStore::new(&options.config_dir),
            benchmark: BenchmarkController::new(registry, history),
            sink,
            config,
            options,
            last_tick: 0.0,
        })
    }

    /// Run one tick.
    pub fn tick(&mut self, reading: &TickReading, source: &dyn PlatformSource) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        let now = reading.now;
        self.last_tick = now;

        let updated = self
            .channels
            .update(&self.sampler, &reading.frame, self.config.enabled_channels());

        outcome.platform_updated = self.platform.update(now, source);

        if self.config.enable_fps && updated.fps {
            self.evaluator
                .evaluate(ChannelKind::Fps.name(), self.channels.fps.live, &self.config.fps_thresholds());
        }
        if self.config.enable_memory && updated.memory {
            self.evaluator.evaluate(
                ChannelKind::Memory.name(),
                self.channels.memory.live,
                &self.config.memory_thresholds(),
            );
        }

        match self.logger.log_sample(now, &self.channels) {
            Ok(logged) => outcome.logged = logged,
            Err(err) => {
                tracing::error!(target: "perf_monitor::profiler", error = %err, "time-series write failed");
                outcome.failures.push(err);
            }
        }

        if self.benchmark.is_active() {
            let step = self
                .benchmark
                .tick(now, &mut self.evaluator, self.config.enable_custom_metrics);
            outcome.failures.extend(step.failures);
            if let Some(result) = step.completed {
                outcome.failures.extend(self.write_reports(&result));
                outcome.completed = Some(result);
            }
        }

        outcome.alerts = self.evaluator.drain();
        outcome
    }

    /// Write the text report and its JSON export when the run asked for them.
    ///
    /// Both writes are attempted; every failure is logged and returned.
    fn write_reports(&self, result: &ComparisonResult) -> Vec<MonitorError> {
        let detailed = self
            .benchmark
            .config()
            .map_or(false, |c| c.generate_detailed_report);
        if !detailed {
            return Vec::new();
        }

        let writes = [
            self.reports.generate(result).map(|_| ()),
            self.reports.export_json(result).map(|_| ()),
        ];
        writes
            .into_iter()
            .filter_map(Result::err)
            .inspect(|err| {
                tracing::error!(target: "perf_monitor::profiler", error = %err, "benchmark report write failed");
            })
            .collect()
    }

    /// Begin a benchmark run at host time `now`, restarting any active run.
    pub fn start_benchmark(&mut self, config: BenchmarkConfig, now: f64) {
        tracing::info!(
            target: "perf_monitor::profiler",
            log_dir = %self.options.log_dir.display(),
            "benchmark logging to directory"
        );
        self.benchmark.start(config, now);
    }

    /// End the active benchmark now. `None` if no run is active.
    ///
    /// Report write failures are returned alongside the result, which is
    /// kept in the history either way.
    pub fn end_benchmark(&mut self) -> Option<BenchmarkEnd> {
        let result = self.benchmark.end()?;
        let failures = self.write_reports(&result);
        Some(BenchmarkEnd { result, failures })
    }

    /// Abandon the active benchmark without a result.
    pub fn cancel_benchmark(&mut self) -> bool {
        self.benchmark.cancel()
    }

    /// Register a lower-is-worse custom metric.
    pub fn register_custom_metric(
        &mut self,
        name: impl Into<String>,
        sampler: impl Sampler + 'static,
        warning_threshold: f64,
        critical_threshold: f64,
    ) -> MetricId {
        self.benchmark
            .register(name, sampler, warning_threshold, critical_threshold)
    }

    /// Register a custom metric with explicit thresholds and direction.
    pub fn register_custom_metric_with(
        &mut self,
        name: impl Into<String>,
        sampler: impl Sampler + 'static,
        thresholds: Thresholds,
    ) -> MetricId {
        self.benchmark.register_with_thresholds(name, sampler, thresholds)
    }

    /// All benchmark results, most recent first.
    pub fn compare_benchmarks(&self) -> Vec<ComparisonResult> {
        self.benchmark.compare_benchmarks()
    }

    /// Store the current configuration under `profile_name`.
    ///
    /// On success the in-memory profile name is updated to match.
    pub fn save_configuration(&mut self, profile_name: &str) -> MonitorResult<PathBuf> {
        let mut config = self.config.clone();
        config.profile_name = profile_name.to_string();
        let path = self.store.save(&config)?;
        self.config = config;
        Ok(path)
    }

    /// Load and adopt a stored profile.
    ///
    /// On any failure the current configuration is kept unchanged.
    pub fn load_configuration(&mut self, profile_name: &str) -> MonitorResult<()> {
        let config = self.store.load(profile_name).map_err(|err| {
            tracing::warn!(
                target: "perf_monitor::profiler",
                profile = profile_name,
                error = %err,
                "profile not loaded, keeping current configuration"
            );
            err
        })?;
        self.apply_config(config);
        Ok(())
    }

    /// Replace the configuration after validating it.
    pub fn set_config(&mut self, config: MonitorConfig) -> MonitorResult<()> {
        config.validate()?;
        self.apply_config(config);
        Ok(())
    }

    fn apply_config(&mut self, config: MonitorConfig) {
        self.sampler = ChannelSampler::from_time_to_converge(config.time_to_converge);
        self.platform
            .reconfigure(config.platform_mode, config.tracking, config.display_update_interval);
        self.config = config;
    }

    /// Current channels with their severity and advisory color.
    pub fn snapshot(&self) -> PerfSnapshot {
        let status = |channel: Channel, severity: Severity| ChannelStatus {
            channel,
            severity,
            color: self.config.colors.for_severity(severity).to_string(),
        };

        PerfSnapshot {
            time: self.last_tick,
            fps: status(self.channels.fps, self.config.fps_thresholds().classify(self.channels.fps.live)),
            gpu: status(self.channels.gpu, Severity::Nominal),
            memory: status(
                self.channels.memory,
                self.config.memory_thresholds().classify(self.channels.memory.live),
            ),
            platform: *self.platform.metrics(),
            benchmark_active: self.benchmark.is_active(),
            benchmark_progress: self.benchmark.progress(self.last_tick),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Runtime options.
    pub fn options(&self) -> &ProfilerOptions {
        &self.options
    }

    /// Built-in channels.
    pub fn channels(&self) -> &BuiltinChannels {
        &self.channels
    }

    /// Current platform metrics.
    pub fn platform_metrics(&self) -> &PlatformMetrics {
        self.platform.metrics()
    }

    /// The benchmark controller.
    pub fn benchmark(&self) -> &BenchmarkController {
        &self.benchmark
    }

    /// The time-series logger.
    pub fn logger(&self) -> &TimeSeriesLogger {
        &self.logger
    }

    /// The report generator.
    pub fn reports(&self) -> &ReportGenerator {
        &self.reports
    }

    /// Stop the profiler: cancel any active benchmark and finish pending writes.
    pub fn shutdown(mut self) -> MonitorResult<()> {
        if self.benchmark.cancel() {
            tracing::warn!(target: "perf_monitor::profiler", "benchmark still running at shutdown, discarded");
        }
        self.sink.shutdown()?;
        tracing::info!(target: "perf_monitor::profiler", "profiler shut down");
        Ok(())
    }
}
