//! litlisten - Region-bounded audio auditioning with backend processing
//!
//! Play a section of an audio file at any speed, send the file through a
//! transformation backend, and keep listening to the processed result with
//! the same transport settings.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
#[cfg(feature = "cli")]
pub mod output;
pub mod player;
pub mod processing;
pub mod region;
pub mod session;

// Composition root for the binary
#[cfg(all(feature = "cli", feature = "http"))]
pub mod app;

// Core traits (decoder → controller ← processing service)
pub use player::decoder::AudioDecoder;
pub use processing::service::ProcessingService;

// Playback
pub use player::{PlaybackController, PlaybackSettings, PlayerEvent, TransportPhase};
pub use region::Region;

// Processing
pub use processing::{FileProcessed, ProcessedBus, ProcessingType, SwapOutcome, Tuner};

// Session
pub use session::{Session, SessionCommand, SessionReport};

// Error handling
pub use error::{LitlistenError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.3.0+abc1234"` when git hash is available, `"0.3.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_hash_suffix_matches_build_env() {
        let ver = version_string();
        match option_env!("GIT_HASH").filter(|h| !h.is_empty()) {
            Some(hash) => assert_eq!(ver, format!("{}+{}", env!("CARGO_PKG_VERSION"), hash)),
            None => assert_eq!(ver, env!("CARGO_PKG_VERSION")),
        }
    }
}
