//! Log session identity and artifact naming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Timestamp format used in artifact file names.
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// One logging session: a single time-series file from creation to rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSession {
    /// Unique identifier for this session
    pub session_id: String,
    /// When the session started
    pub started_at: DateTime<Utc>,
}

impl LogSession {
    /// Start a new session now.
    pub fn new() -> Self {
        Self::started_at(Utc::now())
    }

    /// Start a session with a fixed start time.
    pub fn started_at(started_at: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            started_at,
        }
    }

    /// File name for this session's time-series log.
    ///
    /// The short id suffix keeps two sessions started within the same
    /// second from sharing a file.
    pub fn log_file_name(&self) -> String {
        let short_id: String = self.session_id.chars().take(8).collect();
        format!(
            "performance_log_{}_{}.csv",
            artifact_stamp(&self.started_at),
            short_id
        )
    }
}

impl Default for LogSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Compact timestamp for file names.
pub fn artifact_stamp(at: &DateTime<Utc>) -> String {
    at.format(STAMP_FORMAT).to_string()
}

/// Reduce a user-supplied name to a file-safe stem.
pub fn sanitize_name(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.is_empty() {
        "unnamed".to_string()
    } else {
        stem
    }
}
