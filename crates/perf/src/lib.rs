//! Runtime Performance Channels
//!
//! This crate holds the numerical core of the performance monitor. It has no
//! I/O and no error type: degenerate readings are skipped, never propagated.
//!
//! - Live/average channels with exponential smoothing
//! - Threshold classification with explicit "lower is worse" / "higher is worse" direction
//! - Platform-specific metric sets refreshed on a throttled cadence
//!
//! # Example
//!
//! ```rust
//! use perf::{BuiltinChannels, ChannelSampler, EnabledChannels, FrameReading};
//! use perf::{Thresholds, ThresholdEvaluator, Severity};
//!
//! let sampler = ChannelSampler::from_time_to_converge(10.0);
//! let mut channels = BuiltinChannels::new();
//!
//! // One 60fps frame with 1GB of an 8GB machine in use
//! let reading = FrameReading::new(1.0 / 60.0, 1 << 30, 8 << 30);
//! channels.update(&sampler, &reading, EnabledChannels::all());
//!
//! let mut evaluator = ThresholdEvaluator::new();
//! let fps = Thresholds::lower_is_worse(45.0, 30.0);
//! assert_eq!(evaluator.evaluate("fps", channels.fps.live, &fps), Severity::Nominal);
//! ```

mod channel;
mod platform;
mod threshold;
mod throttle;

pub use channel::*;
pub use platform::*;
pub use threshold::*;
pub use throttle::*;
