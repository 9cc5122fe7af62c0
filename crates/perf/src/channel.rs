//! Live/average channels and the exponential smoothing that feeds them

use serde::{Deserialize, Serialize};

/// Linear interpolation from `a` to `b` with `t` clamped to `[0, 1]`.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Per-tick smoothing weight for a given time-to-converge.
///
/// The weight is applied once per tick and is not rescaled by elapsed time,
/// so the effective half-life of the average depends on the tick rate.
/// A non-positive or non-finite time disables smoothing (factor `1.0`).
pub fn convergence_factor(time_to_converge: f64) -> f64 {
    if time_to_converge.is_finite() && time_to_converge > 0.0 {
        1.0 / time_to_converge
    } else {
        1.0
    }
}

/// A tracked metric: its instantaneous value, its smoothed average and the
/// value it was seeded with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Most recent reading
    pub live: f64,
    /// Exponentially smoothed average
    pub average: f64,
    /// Initial seed; never updated after construction
    pub target: f64,
}

impl Channel {
    /// Create a channel whose live value and average both start at `target`.
    pub fn new(target: f64) -> Self {
        Self {
            live: target,
            average: target,
            target,
        }
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Applies new readings to channels with a fixed convergence factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelSampler {
    factor: f64,
}

impl ChannelSampler {
    /// Create a sampler with an explicit per-tick factor.
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }

    /// Create a sampler from a time-to-converge setting.
    pub fn from_time_to_converge(time_to_converge: f64) -> Self {
        Self::new(convergence_factor(time_to_converge))
    }

    /// The per-tick smoothing weight.
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Set `live` and pull `average` toward it.
    ///
    /// Non-finite readings are rejected and leave the channel untouched;
    /// returns whether the channel was updated.
    pub fn update(&self, channel: &mut Channel, live: f64) -> bool {
        if !live.is_finite() {
            return false;
        }
        channel.live = live;
        channel.average = lerp(channel.average, channel.live, self.factor);
        true
    }
}

impl Default for ChannelSampler {
    fn default() -> Self {
        Self::from_time_to_converge(10.0)
    }
}

/// The built-in channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChannelKind {
    /// Frames per second
    Fps,
    /// Frame time in milliseconds
    GpuFrameTime,
    /// Process memory as a fraction of system memory
    Memory,
}

impl ChannelKind {
    /// Name used in alerts and logs.
    pub fn name(&self) -> &'static str {
        match self {
            ChannelKind::Fps => "fps",
            ChannelKind::GpuFrameTime => "gpu_frame_time",
            ChannelKind::Memory => "memory",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw per-frame inputs supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReading {
    /// Unscaled time since the previous frame, in seconds
    pub unscaled_delta: f64,
    /// Bytes allocated by the process
    pub process_memory_bytes: u64,
    /// Total bytes of system memory
    pub system_memory_bytes: u64,
}

impl FrameReading {
    /// Create a new frame reading.
    pub fn new(unscaled_delta: f64, process_memory_bytes: u64, system_memory_bytes: u64) -> Self {
        Self {
            unscaled_delta,
            process_memory_bytes,
            system_memory_bytes,
        }
    }

    fn has_valid_delta(&self) -> bool {
        self.unscaled_delta.is_finite() && self.unscaled_delta > 0.0
    }

    /// Instantaneous frame rate, or `None` for a zero, negative or non-finite delta.
    pub fn fps(&self) -> Option<f64> {
        self.has_valid_delta().then(|| 1.0 / self.unscaled_delta)
    }

    /// Frame time in milliseconds, or `None` for a degenerate delta.
    pub fn frame_time_ms(&self) -> Option<f64> {
        self.has_valid_delta().then(|| self.unscaled_delta * 1000.0)
    }

    /// Process memory over system memory. Unbounded above 1.
    pub fn memory_fraction(&self) -> Option<f64> {
        if self.system_memory_bytes == 0 {
            return None;
        }
        Some(self.process_memory_bytes as f64 / self.system_memory_bytes as f64)
    }
}

/// Which built-in channels are sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnabledChannels {
    pub fps: bool,
    pub gpu: bool,
    pub memory: bool,
}

impl EnabledChannels {
    /// Every built-in channel enabled.
    pub fn all() -> Self {
        Self {
            fps: true,
            gpu: true,
            memory: true,
        }
    }
}

impl Default for EnabledChannels {
    fn default() -> Self {
        Self::all()
    }
}

/// Which channels accepted a reading during one update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelUpdate {
    pub fps: bool,
    pub gpu: bool,
    pub memory: bool,
}

/// Frame rate, frame time and memory channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltinChannels {
    pub fps: Channel,
    pub gpu: Channel,
    pub memory: Channel,
}

impl BuiltinChannels {
    /// Seeds: 60fps, the matching 16.67ms frame time, no memory in use.
    pub fn new() -> Self {
        Self {
            fps: Channel::new(60.0),
            gpu: Channel::new(1000.0 / 60.0),
            memory: Channel::new(0.0),
        }
    }

    /// Get a channel by kind.
    pub fn get(&self, kind: ChannelKind) -> &Channel {
        match kind {
            ChannelKind::Fps => &self.fps,
            ChannelKind::GpuFrameTime => &self.gpu,
            ChannelKind::Memory => &self.memory,
        }
    }

    /// Apply one frame's readings to every enabled channel.
    ///
    /// A degenerate frame delta skips both the FPS and frame-time channels;
    /// zero system memory skips the memory channel.
    pub fn update(
        &mut self,
        sampler: &ChannelSampler,
        reading: &FrameReading,
        enabled: EnabledChannels,
    ) -> ChannelUpdate {
        let mut update = ChannelUpdate::default();

        if enabled.fps {
            update.fps = reading
                .fps()
                .map_or(false, |fps| sampler.update(&mut self.fps, fps));
        }
        if enabled.gpu {
            update.gpu = reading
                .frame_time_ms()
                .map_or(false, |ms| sampler.update(&mut self.gpu, ms));
        }
        if enabled.memory {
            update.memory = reading
                .memory_fraction()
                .map_or(false, |fraction| sampler.update(&mut self.memory, fraction));
        }

        if (enabled.fps && !update.fps) || (enabled.gpu && !update.gpu) {
            tracing::debug!(
                target: "perf::channel",
                delta = reading.unscaled_delta,
                "degenerate frame delta, frame channels skipped"
            );
        }

        tracing::trace!(
            target: "perf::channel",
            fps = self.fps.live,
            gpu_ms = self.gpu.live,
            memory = self.memory.live,
            "channels updated"
        );

        update
    }
}

impl Default for BuiltinChannels {
    fn default() -> Self {
        Self::new()
    }
}
