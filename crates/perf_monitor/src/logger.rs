//! Time-series CSV log of the built-in channels

use crate::error::MonitorResult;
use crate::session::LogSession;
use crate::sink::ArtifactSink;
use perf::{BuiltinChannels, Throttle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default seconds between log rows.
pub const DEFAULT_LOG_INTERVAL: f64 = 1.0;

/// One row of the time-series log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub time: f64,
    pub fps_live: f64,
    pub fps_average: f64,
    pub gpu_live: f64,
    pub gpu_average: f64,
    pub memory_live: f64,
    pub memory_average: f64,
}

impl LogRecord {
    /// Capture the channels at host time `time`.
    pub fn from_channels(time: f64, channels: &BuiltinChannels) -> Self {
        Self {
            time,
            fps_live: channels.fps.live,
            fps_average: channels.fps.average,
            gpu_live: channels.gpu.live,
            gpu_average: channels.gpu.average,
            memory_live: channels.memory.live,
            memory_average: channels.memory.average,
        }
    }

    /// Render as a CSV row without a trailing newline.
    ///
    /// Column order: time, fps_live, fps_avg, gpu_live, gpu_avg, mem_live, mem_avg.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4}",
            self.time,
            self.fps_live,
            self.fps_average,
            self.gpu_live,
            self.gpu_average,
            self.memory_live,
            self.memory_average
        )
    }
}

/// Appends a header-less CSV row at most once per interval.
pub struct TimeSeriesLogger {
    dir: PathBuf,
    throttle: Throttle,
    session: Option<LogSession>,
    sink: Arc<dyn ArtifactSink>,
    rows_written: u64,
}

impl std::fmt::Debug for TimeSeriesLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeSeriesLogger")
            .field("dir", &self.dir)
            .field("throttle", &self.throttle)
            .field("session", &self.session)
            .field("rows_written", &self.rows_written)
            .finish_non_exhaustive()
    }
}

impl TimeSeriesLogger {
    /// Create a logger writing into `dir` every `interval` seconds.
    pub fn new(dir: impl Into<PathBuf>, interval: f64, sink: Arc<dyn ArtifactSink>) -> Self {
        Self {
            dir: dir.into(),
            throttle: Throttle::new(interval),
            session: None,
            sink,
            rows_written: 0,
        }
    }

    /// Append a row if the interval has elapsed.
    ///
    /// The first row of a session creates its file. Returns whether a row
    /// was written; a failed write is returned as an error and the row is lost.
    pub fn log_sample(&mut self, now: f64, channels: &BuiltinChannels) -> MonitorResult<bool> {
        if !self.throttle.ready(now) {
            return Ok(false);
        }

        let path = self.current_path_or_start();
        let row = LogRecord::from_channels(now, channels).to_csv_row();
        self.sink.append(&path, &format!("{}\n", row))?;
        self.rows_written += 1;

        tracing::trace!(target: "perf_monitor::logger", path = %path.display(), now, "sample logged");
        Ok(true)
    }

    fn current_path_or_start(&mut self) -> PathBuf {
        let dir = &self.dir;
        let session = self.session.get_or_insert_with(|| {
            let session = LogSession::new();
            tracing::info!(
                target: "perf_monitor::logger",
                dir = %dir.display(),
                session = %session.session_id,
                "log session started"
            );
            session
        });
        dir.join(session.log_file_name())
    }

    /// Close the current session; the next row starts a new file.
    pub fn rotate(&mut self) {
        self.session = None;
    }

    /// Path of the current log file, if a session has started.
    pub fn current_path(&self) -> Option<PathBuf> {
        self.session
            .as_ref()
            .map(|session| self.dir.join(session.log_file_name()))
    }

    /// Directory receiving log files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Rows written over the logger's lifetime.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;
    use crate::sink::FsSink;
    use perf::Channel;
    use tempfile::tempdir;

    struct FailingSink;

    impl ArtifactSink for FailingSink {
        fn append(&self, path: &Path, _contents: &str) -> MonitorResult<()> {
            Err(MonitorError::Persistence {
                artifact: path.display().to_string(),
                reason: "disk full".to_string(),
            })
        }

        fn write(&self, path: &Path, contents: &str) -> MonitorResult<()> {
            self.append(path, contents)
        }
    }

    fn channels() -> BuiltinChannels {
        BuiltinChannels {
            fps: Channel { live: 59.5, average: 60.0, target: 60.0 },
            gpu: Channel { live: 16.8, average: 16.7, target: 16.7 },
            memory: Channel { live: 0.25, average: 0.2, target: 0.0 },
        }
    }

    #[test]
    fn test_csv_row_format() {
        let row = LogRecord::from_channels(12.5, &channels()).to_csv_row();
        assert_eq!(row, "12.5000,59.5000,60.0000,16.8000,16.7000,0.2500,0.2000");
    }

    #[test]
    fn test_logger_throttled_to_interval() {
        let dir = tempdir().unwrap();
        let mut logger = TimeSeriesLogger::new(dir.path(), 1.0, Arc::new(FsSink));

        assert!(!logger.log_sample(0.5, &channels()).unwrap());
        assert!(logger.current_path().is_none());

        assert!(logger.log_sample(1.0, &channels()).unwrap());
        assert!(!logger.log_sample(1.5, &channels()).unwrap());
        assert!(logger.log_sample(2.0, &channels()).unwrap());

        let content = std::fs::read_to_string(logger.current_path().unwrap()).unwrap();
        let rows: Vec<&str> = content.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("1.0000,"));
        assert!(rows[1].starts_with("2.0000,"));
        assert_eq!(logger.rows_written(), 2);
    }

    #[test]
    fn test_logger_file_is_header_less_csv() {
        let dir = tempdir().unwrap();
        let mut logger = TimeSeriesLogger::new(dir.path(), 0.0, Arc::new(FsSink));
        logger.log_sample(0.0, &channels()).unwrap();

        let path = logger.current_path().unwrap();
        assert_eq!(path.extension().unwrap(), "csv");
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().next().unwrap().split(',').count(), 7);
        assert!(!content.contains("fps"));
    }

    #[test]
    fn test_rotate_starts_new_file() {
        let dir = tempdir().unwrap();
        let mut logger = TimeSeriesLogger::new(dir.path(), 0.0, Arc::new(FsSink));
        logger.log_sample(0.0, &channels()).unwrap();
        let first = logger.current_path().unwrap();

        logger.rotate();
        assert!(logger.current_path().is_none());
        logger.log_sample(1.0, &channels()).unwrap();
        assert_ne!(logger.current_path().unwrap(), first);
    }

    #[test]
    fn test_write_failure_is_reported() {
        let mut logger = TimeSeriesLogger::new("unused", 0.0, Arc::new(FailingSink));
        let err = logger.log_sample(0.0, &channels()).unwrap_err();
        assert!(matches!(err, MonitorError::Persistence { .. }));
        assert_eq!(logger.rows_written(), 0);
    }
}
