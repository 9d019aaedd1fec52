//! Default configuration constants for litlisten.
//!
//! Shared by the config types, the tuner, and the player so that bounds and
//! defaults stay consistent across layers.

/// Default processing backend endpoint.
pub const BACKEND_URL: &str = "http://localhost:8080/api/audio";

/// Default timeout for a single processing request, in seconds.
///
/// Processing runs ffmpeg on the backend; long clips can take a while.
pub const BACKEND_TIMEOUT_SECS: u64 = 120;

/// Rewind step for the "rewind" transport action, in seconds.
pub const REWIND_SECS: f64 = 5.0;

/// Interval between time-advanced notifications from the clock decoder.
///
/// Also bounds the loop overshoot: a loop point can be passed by at most
/// one tick before the controller seeks back.
pub const TICK_MS: u64 = 50;

/// Playback rate bounds.
pub const MIN_RATE: f64 = 0.5;
pub const MAX_RATE: f64 = 2.0;
pub const DEFAULT_RATE: f64 = 1.0;

/// Volume bounds.
pub const MIN_VOLUME: f64 = 0.0;
pub const MAX_VOLUME: f64 = 1.0;
pub const DEFAULT_VOLUME: f64 = 1.0;

/// Capacity of the processed-notification bus.
pub const PROCESSED_BUS_CAPACITY: usize = 16;

/// A tuner parameter's default value and bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamBounds {
    pub default: f64,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl ParamBounds {
    /// Clamp `value` into `[min, max]`.
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

pub const PITCH_FACTOR: ParamBounds = ParamBounds {
    default: 1.0,
    min: 0.5,
    max: 2.0,
    step: 0.1,
};

pub const AMPLIFICATION_FACTOR: ParamBounds = ParamBounds {
    default: 1.0,
    min: 0.1,
    max: 3.0,
    step: 0.1,
};

/// Compressor threshold in dB.
pub const COMPRESSION_THRESHOLD: ParamBounds = ParamBounds {
    default: -20.0,
    min: -50.0,
    max: 0.0,
    step: 1.0,
};

pub const COMPRESSION_RATIO: ParamBounds = ParamBounds {
    default: 2.0,
    min: 1.0,
    max: 10.0,
    step: 0.1,
};

/// Band-pass center frequency in Hz.
pub const FILTER_FREQUENCY: ParamBounds = ParamBounds {
    default: 1000.0,
    min: 20.0,
    max: 20000.0,
    step: 100.0,
};

/// Band-pass width in Hz.
pub const FILTER_BANDWIDTH: ParamBounds = ParamBounds {
    default: 200.0,
    min: 10.0,
    max: 5000.0,
    step: 10.0,
};
