//! Threshold classification and alert records

use serde::{Deserialize, Serialize};

/// Severity of a value relative to its thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Within acceptable range
    Nominal,
    /// Past the warning threshold
    Warning,
    /// Past the critical threshold
    Critical,
}

/// Which side of a threshold is the bad side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    /// Falling below a threshold is bad (frame rate)
    #[default]
    LowerIsWorse,
    /// Rising above a threshold is bad (memory usage)
    HigherIsWorse,
}

/// Classify a lower-is-worse value.
///
/// `value < critical` is Critical, otherwise `value < warning` is Warning.
/// Both comparisons are strict. Passing `critical > warning` inverts the
/// meaning of the two levels; that is not corrected here.
pub fn classify(value: f64, warning: f64, critical: f64) -> Severity {
    if value < critical {
        Severity::Critical
    } else if value < warning {
        Severity::Warning
    } else {
        Severity::Nominal
    }
}

/// Warning and critical levels for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
    pub direction: Direction,
}

impl Thresholds {
    /// Thresholds where values below the levels are bad.
    pub fn lower_is_worse(warning: f64, critical: f64) -> Self {
        Self {
            warning,
            critical,
            direction: Direction::LowerIsWorse,
        }
    }

    /// Thresholds where values above the levels are bad.
    pub fn higher_is_worse(warning: f64, critical: f64) -> Self {
        Self {
            warning,
            critical,
            direction: Direction::HigherIsWorse,
        }
    }

    /// Classify a value without recording an alert.
    pub fn classify(&self, value: f64) -> Severity {
        match self.direction {
            Direction::LowerIsWorse => classify(value, self.warning, self.critical),
            Direction::HigherIsWorse => {
                if value > self.critical {
                    Severity::Critical
                } else if value > self.warning {
                    Severity::Warning
                } else {
                    Severity::Nominal
                }
            }
        }
    }

    /// The level that a value of the given severity crossed.
    pub fn level_for(&self, severity: Severity) -> Option<f64> {
        match severity {
            Severity::Nominal => None,
            Severity::Warning => Some(self.warning),
            Severity::Critical => Some(self.critical),
        }
    }
}

/// A threshold crossing observed on one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Channel or custom metric name
    pub source: String,
    /// Observed value
    pub value: f64,
    /// Thresholds the value was checked against
    pub thresholds: Thresholds,
    /// Warning or Critical
    pub severity: Severity,
}

impl Alert {
    /// Check if this is a critical alert.
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

impl std::fmt::Display for Alert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let side = match self.thresholds.direction {
            Direction::LowerIsWorse => "below",
            Direction::HigherIsWorse => "above",
        };
        let (label, level) = match self.severity {
            Severity::Critical => ("critical", self.thresholds.critical),
            _ => ("warning", self.thresholds.warning),
        };
        write!(
            f,
            "{}: {:.2} {} {} threshold {:.2}",
            self.source, self.value, side, label, level
        )
    }
}

/// Classifies values and records an alert for every Warning or Critical result.
///
/// Alerts accumulate until drained, normally once per tick.
#[derive(Debug, Clone, Default)]
pub struct ThresholdEvaluator {
    pending: Vec<Alert>,
    total_emitted: u64,
}

impl ThresholdEvaluator {
    /// Create a new evaluator with no pending alerts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `value` and record an alert if it is not Nominal.
    ///
    /// Non-finite values are ignored and reported as Nominal.
    pub fn evaluate(&mut self, source: &str, value: f64, thresholds: &Thresholds) -> Severity {
        if !value.is_finite() {
            tracing::debug!(target: "perf::threshold", source, value, "non-finite value ignored");
            return Severity::Nominal;
        }

        let severity = thresholds.classify(value);
        match severity {
            Severity::Nominal => return severity,
            Severity::Warning => {
                tracing::warn!(target: "perf::threshold", source, value, level = thresholds.warning, "warning threshold crossed");
            }
            Severity::Critical => {
                tracing::error!(target: "perf::threshold", source, value, level = thresholds.critical, "critical threshold crossed");
            }
        }

        self.pending.push(Alert {
            source: source.to_string(),
            value,
            thresholds: *thresholds,
            severity,
        });
        self.total_emitted += 1;
        severity
    }

    /// Alerts recorded since the last drain.
    pub fn pending(&self) -> &[Alert] {
        &self.pending
    }

    /// Take every pending alert.
    pub fn drain(&mut self) -> Vec<Alert> {
        std::mem::take(&mut self.pending)
    }

    /// Alerts recorded over the evaluator's lifetime.
    pub fn total_emitted(&self) -> u64 {
        self.total_emitted
    }
}
