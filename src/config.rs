use crate::defaults;
use crate::error::{LitlistenError, Result};
use crate::player::state::PlaybackSettings;
use crate::processing::request::ProcessingType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub player: PlayerConfig,
    pub tuner: TunerConfig,
}

/// Processing backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Player preferences applied at startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    pub rate: f64,
    pub volume: f64,
    pub looping: bool,
    pub rewind_secs: f64,
    pub tick_ms: u64,
    /// Local mount of the backend's audio directory, used to open the
    /// `http://` locators it returns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_dir: Option<PathBuf>,
}

/// Initial tuner parameter values
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TunerConfig {
    pub processing_type: ProcessingType,
    pub pitch_factor: f64,
    pub amplification_factor: f64,
    pub compression_threshold: f64,
    pub compression_ratio: f64,
    pub filter_frequency: f64,
    pub filter_bandwidth: f64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BACKEND_URL.to_string(),
            timeout_secs: defaults::BACKEND_TIMEOUT_SECS,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            rate: defaults::DEFAULT_RATE,
            volume: defaults::DEFAULT_VOLUME,
            looping: false,
            rewind_secs: defaults::REWIND_SECS,
            tick_ms: defaults::TICK_MS,
            media_dir: None,
        }
    }
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            processing_type: ProcessingType::default(),
            pitch_factor: defaults::PITCH_FACTOR.default,
            amplification_factor: defaults::AMPLIFICATION_FACTOR.default,
            compression_threshold: defaults::COMPRESSION_THRESHOLD.default,
            compression_ratio: defaults::COMPRESSION_RATIO.default,
            filter_frequency: defaults::FILTER_FREQUENCY.default,
            filter_bandwidth: defaults::FILTER_BANDWIDTH.default,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PlayerConfig {
    pub fn settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            rate: self.rate,
            volume: self.volume,
            looping: self.looping,
        }
        .clamped()
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only falls back to defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("Failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - LITLISTEN_BACKEND_URL → backend.base_url
    /// - LITLISTEN_TIMEOUT_SECS → backend.timeout_secs
    /// - LITLISTEN_MEDIA_DIR → player.media_dir
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("LITLISTEN_BACKEND_URL")
            && !url.is_empty()
        {
            self.backend.base_url = url;
        }

        if let Ok(timeout) = std::env::var("LITLISTEN_TIMEOUT_SECS")
            && let Ok(secs) = timeout.trim().parse::<u64>()
        {
            self.backend.timeout_secs = secs;
        }

        if let Ok(dir) = std::env::var("LITLISTEN_MEDIA_DIR")
            && !dir.is_empty()
        {
            self.player.media_dir = Some(PathBuf::from(dir));
        }

        self
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            return Err(invalid("backend.base_url", "must not be empty"));
        }
        if self.backend.timeout_secs == 0 {
            return Err(invalid("backend.timeout_secs", "must be positive"));
        }
        if !(defaults::MIN_RATE..=defaults::MAX_RATE).contains(&self.player.rate) {
            return Err(invalid(
                "player.rate",
                &format!("must be between {} and {}", defaults::MIN_RATE, defaults::MAX_RATE),
            ));
        }
        if !(defaults::MIN_VOLUME..=defaults::MAX_VOLUME).contains(&self.player.volume) {
            return Err(invalid(
                "player.volume",
                &format!(
                    "must be between {} and {}",
                    defaults::MIN_VOLUME,
                    defaults::MAX_VOLUME
                ),
            ));
        }
        if !(self.player.rewind_secs.is_finite() && self.player.rewind_secs > 0.0) {
            return Err(invalid("player.rewind_secs", "must be positive"));
        }
        if self.player.tick_ms == 0 {
            return Err(invalid("player.tick_ms", "must be positive"));
        }
        let tuner = [
            ("tuner.pitch_factor", self.tuner.pitch_factor, defaults::PITCH_FACTOR),
            (
                "tuner.amplification_factor",
                self.tuner.amplification_factor,
                defaults::AMPLIFICATION_FACTOR,
            ),
            (
                "tuner.compression_threshold",
                self.tuner.compression_threshold,
                defaults::COMPRESSION_THRESHOLD,
            ),
            (
                "tuner.compression_ratio",
                self.tuner.compression_ratio,
                defaults::COMPRESSION_RATIO,
            ),
            (
                "tuner.filter_frequency",
                self.tuner.filter_frequency,
                defaults::FILTER_FREQUENCY,
            ),
            (
                "tuner.filter_bandwidth",
                self.tuner.filter_bandwidth,
                defaults::FILTER_BANDWIDTH,
            ),
        ];
        for (key, value, bounds) in tuner {
            if !bounds.contains(value) {
                return Err(invalid(
                    key,
                    &format!("must be between {} and {}", bounds.min, bounds.max),
                ));
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/litlisten/config.toml on Linux
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("litlisten").join("config.toml"))
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn invalid(key: &str, message: &str) -> LitlistenError {
    LitlistenError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_litlisten_env() {
        remove_env("LITLISTEN_BACKEND_URL");
        remove_env("LITLISTEN_TIMEOUT_SECS");
        remove_env("LITLISTEN_MEDIA_DIR");
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.backend.base_url, "http://localhost:8080/api/audio");
        assert_eq!(config.backend.timeout_secs, 120);

        assert_eq!(config.player.rate, 1.0);
        assert_eq!(config.player.volume, 1.0);
        assert!(!config.player.looping);
        assert_eq!(config.player.rewind_secs, 5.0);

        assert_eq!(config.tuner.processing_type, ProcessingType::Pitch);
        assert_eq!(config.tuner.compression_threshold, -20.0);
        assert_eq!(config.tuner.filter_frequency, 1000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml_content = r#"
            [backend]
            base_url = "http://audio.local/api/audio"
            timeout_secs = 30

            [player]
            rate = 1.25
            volume = 0.5
            looping = true
            media_dir = "/app/audio"

            [tuner]
            processing_type = "compression"
            compression_ratio = 4.0
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.backend.base_url, "http://audio.local/api/audio");
        assert_eq!(config.backend.timeout(), Duration::from_secs(30));
        assert_eq!(config.player.rate, 1.25);
        assert!(config.player.looping);
        assert_eq!(config.player.rewind_secs, 5.0);
        assert_eq!(config.player.media_dir, Some(PathBuf::from("/app/audio")));
        assert_eq!(config.tuner.processing_type, ProcessingType::Compress);
        assert_eq!(config.tuner.compression_ratio, 4.0);
        assert_eq!(config.tuner.pitch_factor, 1.0);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[player]\nvolume = 0.2\n").unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.player.volume, 0.2);
        assert_eq!(config.backend, BackendConfig::default());
        assert_eq!(config.tuner, TunerConfig::default());
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[player\nrate = ").unwrap();
        assert!(Config::load(temp_file.path()).is_err());
        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/litlisten.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_env_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_litlisten_env();

        set_env("LITLISTEN_BACKEND_URL", "http://other:9000/api/audio");
        set_env("LITLISTEN_TIMEOUT_SECS", "15");
        set_env("LITLISTEN_MEDIA_DIR", "/srv/audio");
        let config = Config::default().with_env_overrides();
        assert_eq!(config.backend.base_url, "http://other:9000/api/audio");
        assert_eq!(config.backend.timeout_secs, 15);
        assert_eq!(config.player.media_dir, Some(PathBuf::from("/srv/audio")));

        clear_litlisten_env();
    }

    #[test]
    fn test_empty_env_is_ignored() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_litlisten_env();

        set_env("LITLISTEN_BACKEND_URL", "");
        set_env("LITLISTEN_TIMEOUT_SECS", "soon");
        let config = Config::default().with_env_overrides();
        assert_eq!(config.backend, BackendConfig::default());

        clear_litlisten_env();
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut config = Config::default();
        config.player.rate = 3.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("player.rate"));

        let mut config = Config::default();
        config.tuner.filter_frequency = 5.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tuner.filter_frequency"));

        let mut config = Config::default();
        config.backend.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip_preserves_values() {
        let mut config = Config::default();
        config.tuner.processing_type = ProcessingType::Denoise;
        config.player.looping = true;
        config.player.media_dir = Some(PathBuf::from("/app/audio"));

        let text = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_player_settings_are_clamped() {
        let mut player = PlayerConfig::default();
        player.volume = 7.0;
        assert_eq!(player.settings().volume, 1.0);
    }
}
