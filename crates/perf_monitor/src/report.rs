//! Benchmark Report Generator
//!
//! Renders a [`ComparisonResult`] as a human-readable text report, keyed by
//! benchmark name and timestamp, and optionally as JSON alongside it.
//!
//! # Example
//!
//! ```rust
//! use perf_monitor::{ReportGenerator, ComparisonResult};
//! use std::collections::BTreeMap;
//!
//! let result = ComparisonResult {
//!     benchmark_name: "Boss Fight".to_string(),
//!     run_id: "4f1c2a9e".to_string(),
//!     timestamp: chrono::Utc::now(),
//!     average_metrics: BTreeMap::from([("draw_calls".to_string(), 1200.0)]),
//!     peak_metrics: BTreeMap::from([("draw_calls".to_string(), 1850.0)]),
//!     alerts: vec![],
//! };
//!
//! let text = ReportGenerator::render(&result);
//! assert!(text.contains("Benchmark Report: Boss Fight"));
//! ```

use crate::benchmark::ComparisonResult;
use crate::error::MonitorResult;
use crate::session::{artifact_stamp, sanitize_name};
use crate::sink::ArtifactSink;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Writes benchmark reports into a directory.
pub struct ReportGenerator {
    dir: PathBuf,
    sink: Arc<dyn ArtifactSink>,
}

impl std::fmt::Debug for ReportGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportGenerator")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl ReportGenerator {
    /// Create a generator writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>, sink: Arc<dyn ArtifactSink>) -> Self {
        Self {
            dir: dir.into(),
            sink,
        }
    }

    /// Directory receiving reports.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File stem shared by the text and JSON artifacts of a result.
    ///
    /// The run id suffix keeps same-named runs that end within the same
    /// second from sharing a file.
    fn stem(result: &ComparisonResult) -> String {
        let short_id: String = result.run_id.chars().take(8).collect();
        format!(
            "benchmark_{}_{}_{}",
            sanitize_name(&result.benchmark_name),
            artifact_stamp(&result.timestamp),
            sanitize_name(&short_id)
        )
    }

    /// Path of the text report for a result.
    pub fn report_path(&self, result: &ComparisonResult) -> PathBuf {
        self.dir.join(format!("{}.txt", Self::stem(result)))
    }

    /// Path of the JSON export for a result.
    pub fn json_path(&self, result: &ComparisonResult) -> PathBuf {
        self.dir.join(format!("{}.json", Self::stem(result)))
    }

    /// Render the report text.
    pub fn render(result: &ComparisonResult) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = writeln!(out, "Benchmark Report: {}", result.benchmark_name);
        let _ = writeln!(out, "Timestamp: {}", result.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
        let _ = writeln!(out);

        let _ = writeln!(out, "Average Metrics:");
        for (name, value) in &result.average_metrics {
            let _ = writeln!(out, "  {}: {:.2}", name, value);
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "Peak Metrics:");
        for (name, value) in &result.peak_metrics {
            let _ = writeln!(out, "  {}: {:.2}", name, value);
        }

        if !result.alerts.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Alerts:");
            for alert in &result.alerts {
                let _ = writeln!(out, "  - {}", alert);
            }
        }

        out
    }

    /// Write the text report. Returns its path.
    pub fn generate(&self, result: &ComparisonResult) -> MonitorResult<PathBuf> {
        let path = self.report_path(result);
        self.sink.write(&path, &Self::render(result))?;
        tracing::info!(
            target: "perf_monitor::report",
            name = %result.benchmark_name,
            path = %path.display(),
            "benchmark report written"
        );
        Ok(path)
    }

    /// Write the result as pretty JSON. Returns its path.
    pub fn export_json(&self, result: &ComparisonResult) -> MonitorResult<PathBuf> {
        let path = self.json_path(result);
        let json = serde_json::to_string_pretty(result)?;
        self.sink.write(&path, &json)?;
        Ok(path)
    }
}
