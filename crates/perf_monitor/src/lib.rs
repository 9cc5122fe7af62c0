//! Performance Monitor
//!
//! This crate drives the channels from the `perf` crate once per host tick and
//! adds everything that touches the outside world:
//!
//! - Threshold alerts for frame rate, memory and custom metrics
//! - A throttled CSV time-series log of the built-in channels
//! - Timed benchmark runs over user-registered custom metrics
//! - Plain-text benchmark reports and an in-memory result history
//! - JSON configuration profiles with validation on load
//!
//! Writes go through an [`ArtifactSink`], either on the calling thread or on a
//! background writer so that a slow disk never stalls a tick.
//!
//! # Example
//!
//! ```rust
//! use perf::PlatformReadings;
//! use perf_monitor::{BenchmarkConfig, MonitorConfig, ProfilerOptions, ProfilerState, TickReading};
//!
//! let root = std::env::temp_dir().join("perf_monitor_doc");
//! let mut profiler = ProfilerState::init(MonitorConfig::default(), ProfilerOptions::in_dir(&root)).unwrap();
//!
//! // Custom metrics are sampled only while a benchmark runs
//! profiler.register_custom_metric("entities", || 250.0, 100.0, 50.0);
//! profiler.start_benchmark(BenchmarkConfig::new("spawn wave", 2.0).with_detailed_report(false), 0.0);
//!
//! let mut completed = None;
//! for frame in 1..=120 {
//!     let reading = TickReading::new(frame as f64 / 60.0, 1.0 / 60.0, 1 << 30, 8 << 30);
//!     let outcome = profiler.tick(&reading, &PlatformReadings::default());
//!     completed = completed.or(outcome.completed);
//! }
//!
//! let result = completed.unwrap();
//! assert_eq!(result.average_metrics["entities"], 250.0);
//! profiler.shutdown().unwrap();
//! ```
//!
//! # Modules
//!
//! - [`benchmark`] - Benchmark runs, results and history
//! - [`config`] - Configuration profiles and their store
//! - [`logger`] - Time-series CSV log
//! - [`profiler`] - Tick-driven state tying everything together
//! - [`registry`] - Custom metrics and samplers
//! - [`report`] - Benchmark report rendering
//! - [`sink`] - Synchronous and queued artifact writers

pub mod benchmark;
pub mod config;
mod error;
pub mod logger;
pub mod profiler;
pub mod registry;
pub mod report;
mod session;
pub mod sink;

pub use benchmark::{
    BenchmarkConfig, BenchmarkController, BenchmarkHistory, BenchmarkState, BenchmarkTick, ComparisonResult,
    MetricDelta,
};
pub use config::{AlertColors, ConfigStore, MonitorConfig};
pub use error::{MonitorError, MonitorResult};
pub use logger::{LogRecord, TimeSeriesLogger, DEFAULT_LOG_INTERVAL};
pub use profiler::{BenchmarkEnd, ChannelStatus, PerfSnapshot, ProfilerOptions, ProfilerState, TickOutcome, TickReading};
pub use registry::{fallible, CustomMetric, Fallible, MetricId, MetricRegistry, SampleError, Sampler};
pub use report::ReportGenerator;
pub use session::{sanitize_name, LogSession};
pub use sink::{ArtifactSink, FsSink, QueuedSink};
