//! Playback state owned by the controller and the events it emits.

use crate::defaults;
use crate::region::Region;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportPhase {
    #[default]
    Idle,
    Playing,
    Paused,
    Stopped,
}

impl fmt::Display for TransportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportPhase::Idle => "idle",
            TransportPhase::Playing => "playing",
            TransportPhase::Paused => "paused",
            TransportPhase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Operator preferences that survive source swaps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSettings {
    pub rate: f64,
    pub volume: f64,
    pub looping: bool,
}

impl PlaybackSettings {
    /// Clamp rate and volume into their domains.
    pub fn clamped(self) -> Self {
        Self {
            rate: clamp_or(self.rate, defaults::MIN_RATE, defaults::MAX_RATE, defaults::DEFAULT_RATE),
            volume: clamp_or(
                self.volume,
                defaults::MIN_VOLUME,
                defaults::MAX_VOLUME,
                defaults::DEFAULT_VOLUME,
            ),
            looping: self.looping,
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            rate: defaults::DEFAULT_RATE,
            volume: defaults::DEFAULT_VOLUME,
            looping: false,
        }
    }
}

fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Point-in-time view of a controller, for status output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub source: Option<String>,
    pub phase: TransportPhase,
    pub position: f64,
    pub region: Region,
    pub settings: PlaybackSettings,
    pub ready: bool,
    pub decode_error: Option<String>,
}

/// Playback-state change notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    PhaseChanged(TransportPhase),
    Position(f64),
    RegionChanged(Region),
    SourceChanged(String),
    SettingsChanged(PlaybackSettings),
    /// The current source finished decoding.
    Ready { duration: f64 },
    DecodeFailed { locator: String, message: String },
    ProcessingFailed { message: String },
    /// A processed notification arrived for a request that no longer applies.
    StaleNotification { locator: String },
    /// A processed notification carried no usable locator.
    RejectedNotification,
}
