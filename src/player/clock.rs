//! Clock-driven decoder.
//!
//! Probes WAV headers with `hound` to learn the clip duration and simulates
//! the transport clock, emitting one `TimeAdvanced` event per poll while
//! playing. Nothing is rendered to an output device; this is the decoder
//! used by the CLI to audition regions and by tests that want real timing.
//!
//! The processing backend answers with `http://host/<name>` URLs for files
//! it wrote into its audio directory. When that directory is mounted
//! locally, `with_media_dir` resolves such URLs to `<media_dir>/<name>`.

use crate::error::{LitlistenError, Result};
use crate::player::decoder::{AudioDecoder, DecoderEvent, LoadId};
use crossbeam_channel::Sender;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Read the duration in seconds of a WAV file.
pub fn probe_wav_duration(path: &Path) -> Result<f64> {
    let reader = hound::WavReader::open(path).map_err(|e| LitlistenError::DecodeFailure {
        locator: path.display().to_string(),
        message: e.to_string(),
    })?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(LitlistenError::DecodeFailure {
            locator: path.display().to_string(),
            message: "sample rate is zero".to_string(),
        });
    }
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}

/// Map a locator to a local path.
///
/// Remote URLs resolve to their last path segment inside `media_dir`.
pub fn resolve_locator(locator: &str, media_dir: Option<&Path>) -> Result<PathBuf> {
    let Some(rest) = locator
        .strip_prefix("http://")
        .or_else(|| locator.strip_prefix("https://"))
    else {
        return Ok(PathBuf::from(locator.strip_prefix("file://").unwrap_or(locator)));
    };

    let Some(dir) = media_dir else {
        return Err(LitlistenError::DecodeFailure {
            locator: locator.to_string(),
            message: "remote source needs player.media_dir to be set".to_string(),
        });
    };
    let path = rest.split(['?', '#']).next().unwrap_or(rest);
    match path.rsplit('/').next().filter(|name| !name.is_empty() && path.contains('/')) {
        Some(name) => Ok(dir.join(name)),
        None => Err(LitlistenError::DecodeFailure {
            locator: locator.to_string(),
            message: "URL has no file name".to_string(),
        }),
    }
}

pub struct ClockDecoder {
    events: Sender<DecoderEvent>,
    media_dir: Option<PathBuf>,
    load_id: LoadId,
    loaded: bool,
    duration: f64,
    position: f64,
    rate: f64,
    volume: f64,
    playing: bool,
    last_poll: Instant,
}

impl ClockDecoder {
    pub fn new(events: Sender<DecoderEvent>) -> Self {
        Self {
            events,
            media_dir: None,
            load_id: 0,
            loaded: false,
            duration: 0.0,
            position: 0.0,
            rate: 1.0,
            volume: 1.0,
            playing: false,
            last_poll: Instant::now(),
        }
    }

    /// Resolve backend URLs against a local copy of its audio directory.
    pub fn with_media_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.media_dir = Some(dir.into());
        self
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Move the clock forward by `elapsed` wall time and report the position.
    pub fn advance(&mut self, elapsed: Duration) {
        if !self.playing {
            return;
        }
        self.position += elapsed.as_secs_f64() * self.rate;
        if self.position >= self.duration {
            self.position = self.duration;
            self.playing = false;
        }
        self.emit(DecoderEvent::TimeAdvanced {
            load_id: self.load_id,
            time: self.position,
        });
    }

    fn emit(&self, event: DecoderEvent) {
        if self.events.send(event).is_err() {
            log::debug!(target: "player::clock", "decoder event dropped, no receiver");
        }
    }
}

impl AudioDecoder for ClockDecoder {
    fn load(&mut self, locator: &str, load_id: LoadId) {
        self.load_id = load_id;
        self.loaded = false;
        self.duration = 0.0;
        self.position = 0.0;
        self.playing = false;

        let probed = resolve_locator(locator, self.media_dir.as_deref())
            .and_then(|path| probe_wav_duration(&path));
        match probed {
            Ok(duration) => {
                log::debug!(target: "player::clock", "decoded {} ({:.2}s)", locator, duration);
                self.loaded = true;
                self.duration = duration;
                self.emit(DecoderEvent::Ready { load_id, duration });
            }
            Err(e) => self.emit(DecoderEvent::Error {
                load_id,
                message: e.to_string(),
            }),
        }
    }

    fn empty(&mut self) {
        self.loaded = false;
        self.duration = 0.0;
        self.position = 0.0;
        self.playing = false;
    }

    fn play(&mut self, from: f64) {
        if !self.loaded {
            return;
        }
        self.position = from.clamp(0.0, self.duration);
        self.playing = true;
        self.last_poll = Instant::now();
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, time: f64) {
        self.position = time.clamp(0.0, self.duration);
    }

    fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn poll(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_poll);
        self.last_poll = now;
        self.advance(elapsed);
    }
}
