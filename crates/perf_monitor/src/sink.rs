//! Artifact writers
//!
//! Logs and reports go through an [`ArtifactSink`]. [`FsSink`] writes on the
//! calling thread and reports failures directly. [`QueuedSink`] hands each
//! write to a single worker thread so a slow disk never stalls a tick; its
//! failures are logged by the worker. Either way, writes to the same artifact
//! land in the order they were issued.

use crate::error::{MonitorError, MonitorResult};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread::JoinHandle;
use tokio::sync::mpsc;

/// Destination for log rows and report files.
pub trait ArtifactSink: Send + Sync {
    /// Append `contents` to the artifact at `path`, creating it if needed.
    fn append(&self, path: &Path, contents: &str) -> MonitorResult<()>;

    /// Replace the artifact at `path` with `contents`.
    fn write(&self, path: &Path, contents: &str) -> MonitorResult<()>;

    /// Finish outstanding writes and stop accepting new ones.
    fn shutdown(&self) -> MonitorResult<()> {
        Ok(())
    }
}

fn persistence_error(path: &Path, err: std::io::Error) -> MonitorError {
    MonitorError::Persistence {
        artifact: path.display().to_string(),
        reason: err.to_string(),
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Synchronous filesystem sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSink;

impl ArtifactSink for FsSink {
    fn append(&self, path: &Path, contents: &str) -> MonitorResult<()> {
        let result = ensure_parent(path).and_then(|_| {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            file.write_all(contents.as_bytes())
        });
        result.map_err(|e| persistence_error(path, e))
    }

    fn write(&self, path: &Path, contents: &str) -> MonitorResult<()> {
        ensure_parent(path)
            .and_then(|_| std::fs::write(path, contents))
            .map_err(|e| persistence_error(path, e))
    }
}

/// One pending write.
#[derive(Debug)]
enum WriteJob {
    Append(PathBuf, String),
    Replace(PathBuf, String),
}

impl WriteJob {
    fn run(self, sink: &FsSink) -> MonitorResult<()> {
        match self {
            WriteJob::Append(path, contents) => sink.append(&path, &contents),
            WriteJob::Replace(path, contents) => sink.write(&path, &contents),
        }
    }
}

/// Sink that performs writes on a background worker thread.
#[derive(Debug)]
pub struct QueuedSink {
    sender: Mutex<Option<mpsc::UnboundedSender<WriteJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl QueuedSink {
    /// Start the worker thread.
    pub fn spawn() -> MonitorResult<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<WriteJob>();

        let worker = std::thread::Builder::new()
            .name("perf-monitor-writer".to_string())
            .spawn(move || {
                let sink = FsSink;
                while let Some(job) = receiver.blocking_recv() {
                    if let Err(err) = job.run(&sink) {
                        tracing::error!(target: "perf_monitor::sink", error = %err, "queued write failed");
                    }
                }
                tracing::debug!(target: "perf_monitor::sink", "writer drained");
            })?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    fn enqueue(&self, job: WriteJob) -> MonitorResult<()> {
        let guard = self.sender.lock().map_err(|_| MonitorError::SinkClosed)?;
        match guard.as_ref() {
            Some(sender) => sender.send(job).map_err(|_| MonitorError::SinkClosed),
            None => Err(MonitorError::SinkClosed),
        }
    }
}

impl ArtifactSink for QueuedSink {
    fn append(&self, path: &Path, contents: &str) -> MonitorResult<()> {
        self.enqueue(WriteJob::Append(path.to_path_buf(), contents.to_string()))
    }

    fn write(&self, path: &Path, contents: &str) -> MonitorResult<()> {
        self.enqueue(WriteJob::Replace(path.to_path_buf(), contents.to_string()))
    }

    fn shutdown(&self) -> MonitorResult<()> {
        // Dropping the sender ends the worker loop once the queue is empty.
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        let worker = self
            .worker
            .lock()
            .map_err(|_| MonitorError::SinkClosed)?
            .take();
        if let Some(handle) = worker {
            handle.join().map_err(|_| MonitorError::Persistence {
                artifact: "queued writer".to_string(),
                reason: "worker thread panicked".to_string(),
            })?;
        }
        Ok(())
    }
}

impl Drop for QueuedSink {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_fs_sink_append_creates_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("log.csv");

        FsSink.append(&path, "a\n").unwrap();
        FsSink.append(&path, "b\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_fs_sink_write_replaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.txt");

        FsSink.write(&path, "first").unwrap();
        FsSink.write(&path, "second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_fs_sink_reports_failure() {
        let dir = tempdir().unwrap();
        // A directory cannot be opened for appending
        let err = FsSink.append(dir.path(), "x").unwrap_err();
        assert!(matches!(err, MonitorError::Persistence { .. }));
    }

    #[test]
    fn test_queued_sink_preserves_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.csv");

        let sink = QueuedSink::spawn().unwrap();
        for i in 0..100 {
            sink.append(&path, &format!("{}\n", i)).unwrap();
        }
        sink.shutdown().unwrap();

        let expected: String = (0..100).map(|i| format!("{}\n", i)).collect();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), expected);
    }

    #[test]
    fn test_queued_sink_rejects_after_shutdown() {
        let sink = QueuedSink::spawn().unwrap();
        sink.shutdown().unwrap();
        assert!(matches!(
            sink.append(Path::new("ignored.csv"), "x"),
            Err(MonitorError::SinkClosed)
        ));
        // second shutdown is a no-op
        assert!(sink.shutdown().is_ok());
    }
}
