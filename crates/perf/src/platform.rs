//! Platform-specific metric sets
//!
//! Each platform mode owns a small set of extra metrics. The provider refreshes
//! whichever of them are enabled, at most once per display interval; in between,
//! the previous values are kept.

use crate::throttle::Throttle;
use serde::{Deserialize, Serialize};

/// Platform profile selecting the extra metric set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlatformMode {
    /// No extra metrics
    #[default]
    Generic,
    /// Draw calls and shader complexity
    Console,
    /// Battery and thermal throttling
    Mobile,
    /// Ray tracing load and GPU compute utilization
    HighEndPc,
}

impl PlatformMode {
    /// Mode name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            PlatformMode::Generic => "generic",
            PlatformMode::Console => "console",
            PlatformMode::Mobile => "mobile",
            PlatformMode::HighEndPc => "high_end_pc",
        }
    }
}

/// Per-field tracking flags for the platform metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformTracking {
    pub draw_calls: bool,
    pub shader_complexity: bool,
    pub battery_level: bool,
    pub thermal_throttling: bool,
    pub ray_tracing: bool,
    pub gpu_compute: bool,
}

impl PlatformTracking {
    /// Track every platform field.
    pub fn all() -> Self {
        Self {
            draw_calls: true,
            shader_complexity: true,
            battery_level: true,
            thermal_throttling: true,
            ray_tracing: true,
            gpu_compute: true,
        }
    }

    /// Track nothing.
    pub fn none() -> Self {
        Self {
            draw_calls: false,
            shader_complexity: false,
            battery_level: false,
            thermal_throttling: false,
            ray_tracing: false,
            gpu_compute: false,
        }
    }
}

impl Default for PlatformTracking {
    fn default() -> Self {
        Self::all()
    }
}

/// The extra metrics for the active platform mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "mode")]
pub enum PlatformMetrics {
    Generic,
    #[serde(rename_all = "camelCase")]
    Console {
        /// Estimated draw calls per frame
        draw_calls: f64,
        /// Synthetic shader complexity score
        shader_complexity: f64,
    },
    #[serde(rename_all = "camelCase")]
    Mobile {
        /// Battery charge in percent
        battery_percent: f64,
        /// Thermal throttling score
        thermal_throttle: f64,
    },
    #[serde(rename_all = "camelCase")]
    HighEndPc {
        /// Ray tracing load estimate
        ray_tracing_load: f64,
        /// GPU compute utilization estimate
        gpu_compute_utilization: f64,
    },
}

impl PlatformMetrics {
    /// Zeroed metrics for a mode.
    pub fn for_mode(mode: PlatformMode) -> Self {
        match mode {
            PlatformMode::Generic => PlatformMetrics::Generic,
            PlatformMode::Console => PlatformMetrics::Console {
                draw_calls: 0.0,
                shader_complexity: 0.0,
            },
            PlatformMode::Mobile => PlatformMetrics::Mobile {
                battery_percent: 0.0,
                thermal_throttle: 0.0,
            },
            PlatformMode::HighEndPc => PlatformMetrics::HighEndPc {
                ray_tracing_load: 0.0,
                gpu_compute_utilization: 0.0,
            },
        }
    }

    /// The mode these metrics belong to.
    pub fn mode(&self) -> PlatformMode {
        match self {
            PlatformMetrics::Generic => PlatformMode::Generic,
            PlatformMetrics::Console { .. } => PlatformMode::Console,
            PlatformMetrics::Mobile { .. } => PlatformMode::Mobile,
            PlatformMetrics::HighEndPc { .. } => PlatformMode::HighEndPc,
        }
    }

    /// Named field values, for display and export.
    pub fn fields(&self) -> Vec<(&'static str, f64)> {
        match *self {
            PlatformMetrics::Generic => Vec::new(),
            PlatformMetrics::Console {
                draw_calls,
                shader_complexity,
            } => vec![("draw_calls", draw_calls), ("shader_complexity", shader_complexity)],
            PlatformMetrics::Mobile {
                battery_percent,
                thermal_throttle,
            } => vec![("battery_percent", battery_percent), ("thermal_throttle", thermal_throttle)],
            PlatformMetrics::HighEndPc {
                ray_tracing_load,
                gpu_compute_utilization,
            } => vec![
                ("ray_tracing_load", ray_tracing_load),
                ("gpu_compute_utilization", gpu_compute_utilization),
            ],
        }
    }
}

/// Source of raw platform readings.
///
/// Every method defaults to `None` (unavailable), in which case the
/// corresponding metric keeps its previous value.
pub trait PlatformSource {
    /// Current draw-call estimate.
    fn draw_calls(&self) -> Option<f64> {
        None
    }

    /// Current shader complexity score.
    fn shader_complexity(&self) -> Option<f64> {
        None
    }

    /// Battery level as a fraction in `[0, 1]`.
    fn battery_level(&self) -> Option<f64> {
        None
    }

    /// Thermal throttling score.
    fn thermal_throttle(&self) -> Option<f64> {
        None
    }

    /// Ray tracing load estimate.
    fn ray_tracing_load(&self) -> Option<f64> {
        None
    }

    /// GPU compute utilization estimate.
    fn gpu_compute_utilization(&self) -> Option<f64> {
        None
    }
}

/// Plain values for a [`PlatformSource`], filled in by the host each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlatformReadings {
    pub draw_calls: Option<f64>,
    pub shader_complexity: Option<f64>,
    pub battery_level: Option<f64>,
    pub thermal_throttle: Option<f64>,
    pub ray_tracing_load: Option<f64>,
    pub gpu_compute_utilization: Option<f64>,
}

impl PlatformSource for PlatformReadings {
    fn draw_calls(&self) -> Option<f64> {
        self.draw_calls
    }

    fn shader_complexity(&self) -> Option<f64> {
        self.shader_complexity
    }

    fn battery_level(&self) -> Option<f64> {
        self.battery_level
    }

    fn thermal_throttle(&self) -> Option<f64> {
        self.thermal_throttle
    }

    fn ray_tracing_load(&self) -> Option<f64> {
        self.ray_tracing_load
    }

    fn gpu_compute_utilization(&self) -> Option<f64> {
        self.gpu_compute_utilization
    }
}

/// Overwrite `slot` when tracked and the reading is a finite number.
fn refresh(slot: &mut f64, tracked: bool, reading: Option<f64>) {
    if !tracked {
        return;
    }
    if let Some(value) = reading.filter(|v| v.is_finite()) {
        *slot = value;
    }
}

/// Keeps the platform metrics for one mode up to date.
#[derive(Debug, Clone)]
pub struct PlatformMetricsProvider {
    tracking: PlatformTracking,
    throttle: Throttle,
    metrics: PlatformMetrics,
}

impl PlatformMetricsProvider {
    /// Create a provider for `mode`, refreshing at most once per `interval` seconds.
    pub fn new(mode: PlatformMode, tracking: PlatformTracking, interval: f64) -> Self {
        Self {
            tracking,
            throttle: Throttle::new(interval),
            metrics: PlatformMetrics::for_mode(mode),
        }
    }

    /// Apply new settings. Switching modes discards the old mode's values.
    pub fn reconfigure(&mut self, mode: PlatformMode, tracking: PlatformTracking, interval: f64) {
        if mode != self.metrics.mode() {
            tracing::debug!(
                target: "perf::platform",
                from = self.metrics.mode().name(),
                to = mode.name(),
                "platform mode changed"
            );
            self.metrics = PlatformMetrics::for_mode(mode);
        }
        self.tracking = tracking;
        self.throttle.set_interval(interval);
    }

    /// Refresh the enabled fields if the interval has elapsed.
    ///
    /// Returns whether a refresh happened.
    pub fn update(&mut self, now: f64, source: &dyn PlatformSource) -> bool {
        if !self.throttle.ready(now) {
            return false;
        }

        let tracking = self.tracking;
        match &mut self.metrics {
            PlatformMetrics::Generic => {}
            PlatformMetrics::Console {
                draw_calls,
                shader_complexity,
            } => {
                refresh(draw_calls, tracking.draw_calls, source.draw_calls());
                refresh(shader_complexity, tracking.shader_complexity, source.shader_complexity());
            }
            PlatformMetrics::Mobile {
                battery_percent,
                thermal_throttle,
            } => {
                refresh(
                    battery_percent,
                    tracking.battery_level,
                    source.battery_level().map(|level| level * 100.0),
                );
                refresh(thermal_throttle, tracking.thermal_throttling, source.thermal_throttle());
            }
            PlatformMetrics::HighEndPc {
                ray_tracing_load,
                gpu_compute_utilization,
            } => {
                refresh(ray_tracing_load, tracking.ray_tracing, source.ray_tracing_load());
                refresh(
                    gpu_compute_utilization,
                    tracking.gpu_compute,
                    source.gpu_compute_utilization(),
                );
            }
        }

        tracing::trace!(
            target: "perf::platform",
            mode = self.metrics.mode().name(),
            now,
            "platform metrics refreshed"
        );
        true
    }

    /// Current platform metrics.
    pub fn metrics(&self) -> &PlatformMetrics {
        &self.metrics
    }

    /// The active platform mode.
    pub fn mode(&self) -> PlatformMode {
        self.metrics.mode()
    }

    /// The active tracking flags.
    pub fn tracking(&self) -> &PlatformTracking {
        &self.tracking
    }
}
