//! Monitor configuration profiles
//!
//! A profile is the full set of recognized options, stored as one JSON file
//! per profile name. Loading validates before anything is adopted, so a bad
//! file never replaces a working configuration.

use crate::error::{MonitorError, MonitorResult};
use crate::session::sanitize_name;
use perf::{EnabledChannels, PlatformMode, PlatformTracking, Severity, Thresholds};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Advisory colors for each severity, as `#RRGGBB` or `#RRGGBBAA`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertColors {
    pub nominal: String,
    pub warning: String,
    pub critical: String,
}

impl Default for AlertColors {
    fn default() -> Self {
        Self {
            nominal: "#00FF00".to_string(),
            warning: "#FFFF00".to_string(),
            critical: "#FF0000".to_string(),
        }
    }
}

impl AlertColors {
    /// Color for a severity.
    pub fn for_severity(&self, severity: Severity) -> &str {
        match severity {
            Severity::Nominal => &self.nominal,
            Severity::Warning => &self.warning,
            Severity::Critical => &self.critical,
        }
    }
}

fn is_hex_color(s: &str) -> bool {
    match s.strip_prefix('#') {
        Some(hex) => (hex.len() == 6 || hex.len() == 8) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Full monitor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    /// Profile name; also the stored file name
    pub profile_name: String,
    /// Sample the frame-rate channel
    pub enable_fps: bool,
    /// Sample the frame-time channel
    pub enable_gpu: bool,
    /// Sample the memory channel
    pub enable_memory: bool,
    /// Sample custom metrics during benchmark runs
    pub enable_custom_metrics: bool,
    /// Presentation colors per severity
    pub colors: AlertColors,
    /// Platform profile selecting the extra metric set
    pub platform_mode: PlatformMode,
    /// Per-field platform tracking flags
    pub tracking: PlatformTracking,
    /// Frame rate below this is critical
    pub fps_critical_threshold: f64,
    /// Frame rate below this is a warning.
    ///
    /// Expected to be above the critical threshold; not enforced.
    pub fps_warning_threshold: f64,
    /// Memory fraction above this is a warning
    pub memory_warning_threshold: f64,
    /// Smoothing time constant; the per-tick factor is its reciprocal
    pub time_to_converge: f64,
    /// Seconds between platform metric refreshes
    pub display_update_interval: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            profile_name: "Default".to_string(),
            enable_fps: true,
            enable_gpu: true,
            enable_memory: true,
            enable_custom_metrics: true,
            colors: AlertColors::default(),
            platform_mode: PlatformMode::Generic,
            tracking: PlatformTracking::all(),
            fps_critical_threshold: 30.0,
            fps_warning_threshold: 45.0,
            memory_warning_threshold: 0.8,
            time_to_converge: 10.0,
            display_update_interval: 0.5,
        }
    }
}

impl MonitorConfig {
    /// Create a default configuration under a profile name.
    pub fn new(profile_name: impl Into<String>) -> Self {
        Self {
            profile_name: profile_name.into(),
            ..Self::default()
        }
    }

    /// Preset tuned for a platform mode.
    pub fn for_platform(mode: PlatformMode) -> Self {
        let base = Self {
            profile_name: mode.name().to_string(),
            platform_mode: mode,
            ..Self::default()
        };
        match mode {
            PlatformMode::Generic => base,
            PlatformMode::Console => base.with_fps_thresholds(45.0, 55.0),
            PlatformMode::Mobile => Self {
                memory_warning_threshold: 0.6,
                display_update_interval: 1.0,
                ..base.with_fps_thresholds(20.0, 28.0)
            },
            PlatformMode::HighEndPc => base.with_fps_thresholds(60.0, 90.0),
        }
    }

    /// Builder method to set both FPS thresholds.
    pub fn with_fps_thresholds(mut self, critical: f64, warning: f64) -> Self {
        self.fps_critical_threshold = critical;
        self.fps_warning_threshold = warning;
        self
    }

    /// Builder method to set the memory warning threshold.
    pub fn with_memory_warning(mut self, threshold: f64) -> Self {
        self.memory_warning_threshold = threshold;
        self
    }

    /// Builder method to set the smoothing time constant.
    pub fn with_time_to_converge(mut self, time: f64) -> Self {
        self.time_to_converge = time;
        self
    }

    /// Builder method to set the platform refresh interval.
    pub fn with_display_update_interval(mut self, seconds: f64) -> Self {
        self.display_update_interval = seconds;
        self
    }

    /// Builder method to set the platform mode.
    pub fn with_platform_mode(mut self, mode: PlatformMode) -> Self {
        self.platform_mode = mode;
        self
    }

    /// Builder method to set the platform tracking flags.
    pub fn with_tracking(mut self, tracking: PlatformTracking) -> Self {
        self.tracking = tracking;
        self
    }

    /// Builder method to set the alert colors.
    pub fn with_colors(mut self, colors: AlertColors) -> Self {
        self.colors = colors;
        self
    }

    /// Which built-in channels are sampled.
    pub fn enabled_channels(&self) -> EnabledChannels {
        EnabledChannels {
            fps: self.enable_fps,
            gpu: self.enable_gpu,
            memory: self.enable_memory,
        }
    }

    /// Thresholds for the frame-rate channel.
    pub fn fps_thresholds(&self) -> Thresholds {
        Thresholds::lower_is_worse(self.fps_warning_threshold, self.fps_critical_threshold)
    }

    /// Thresholds for the memory channel. Memory has no critical level.
    pub fn memory_thresholds(&self) -> Thresholds {
        Thresholds::higher_is_worse(self.memory_warning_threshold, f64::INFINITY)
    }

    /// Check that every field holds a usable value.
    pub fn validate(&self) -> MonitorResult<()> {
        if self.profile_name.trim().is_empty() {
            return Err(MonitorError::InvalidConfig("profile name is empty".to_string()));
        }

        let thresholds = [
            ("fpsCriticalThreshold", self.fps_critical_threshold),
            ("fpsWarningThreshold", self.fps_warning_threshold),
            ("memoryWarningThreshold", self.memory_warning_threshold),
        ];
        for (field, value) in thresholds {
            if !value.is_finite() {
                return Err(MonitorError::InvalidConfig(format!("{} is not finite", field)));
            }
        }

        if !(self.time_to_converge.is_finite() && self.time_to_converge > 0.0) {
            return Err(MonitorError::InvalidConfig(format!(
                "timeToConverge must be positive, got {}",
                self.time_to_converge
            )));
        }

        if !(self.display_update_interval.is_finite() && self.display_update_interval >= 0.0) {
            return Err(MonitorError::InvalidConfig(format!(
                "displayUpdateInterval must be non-negative, got {}",
                self.display_update_interval
            )));
        }

        let colors = [
            ("nominal", &self.colors.nominal),
            ("warning", &self.colors.warning),
            ("critical", &self.colors.critical),
        ];
        for (name, color) in colors {
            if !is_hex_color(color) {
                return Err(MonitorError::InvalidConfig(format!(
                    "{} color '{}' is not #RRGGBB or #RRGGBBAA",
                    name, color
                )));
            }
        }

        if self.fps_critical_threshold >= self.fps_warning_threshold {
            tracing::warn!(
                target: "perf_monitor::config",
                critical = self.fps_critical_threshold,
                warning = self.fps_warning_threshold,
                "fps critical threshold is not below warning threshold; severities will be inverted"
            );
        }

        Ok(())
    }
}

/// Reads and writes configuration profiles in a directory.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the profiles.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file for a profile name.
    pub fn path_for(&self, profile_name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_name(profile_name)))
    }

    /// Path for a profile name that maps to its file unchanged.
    ///
    /// Names that sanitizing would alter are rejected so that two distinct
    /// names never share a file.
    fn checked_path(&self, profile_name: &str) -> MonitorResult<PathBuf> {
        if sanitize_name(profile_name) != profile_name {
            return Err(MonitorError::InvalidConfig(format!(
                "profile name '{}' may only contain ASCII letters, digits, '-' and '_'",
                profile_name
            )));
        }
        Ok(self.path_for(profile_name))
    }

    /// Write a profile under its own name, replacing any existing file.
    pub fn save(&self, config: &MonitorConfig) -> MonitorResult<PathBuf> {
        config.validate()?;
        let path = self.checked_path(&config.profile_name)?;

        std::fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(&path, content)?;

        tracing::info!(
            target: "perf_monitor::config",
            profile = %config.profile_name,
            path = %path.display(),
            "configuration saved"
        );
        Ok(path)
    }

    /// Read and validate a profile.
    pub fn load(&self, profile_name: &str) -> MonitorResult<MonitorConfig> {
        let path = self.checked_path(profile_name)?;
        if !path.exists() {
            return Err(MonitorError::ProfileNotFound(profile_name.to_string()));
        }

        let content = std::fs::read_to_string(&path)?;
        let config: MonitorConfig = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::info!(
            target: "perf_monitor::config",
            profile = %config.profile_name,
            path = %path.display(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Names of the stored profiles, sorted.
    pub fn list_profiles(&self) -> MonitorResult<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
