//! Region-bounded playback controller.
//!
//! The controller is the single owner of what is audible: it holds the
//! [`Region`], the transport phase and the operator's rate/volume/loop
//! preferences, drives an [`AudioDecoder`], and applies source swaps.
//!
//! Transport:
//!
//! ```text
//! Idle ──play──▶ Playing ──pause──▶ Paused ──play──▶ Playing
//!                  │  ▲                │
//!                stop │               stop
//!                  ▼  │                ▼
//!                Stopped ───play──────┘ (from region start)
//! ```
//!
//! Every swap (operator file selection or processed notification) goes
//! through one path: empty the decoder, assign the locator, reset the region,
//! reload. The phase returns to `Idle` until the decoder reports ready.

use crate::defaults;
use crate::error::{LitlistenError, Result};
use crate::player::decoder::{AudioDecoder, DecoderEvent, LoadId};
use crate::player::keyboard::{Key, KeyAction, KeyDispatcher, KeySubscription, SubscriptionId};
use crate::player::state::{PlaybackSettings, PlayerEvent, PlayerSnapshot, TransportPhase};
use crate::processing::request::RequestToken;
use crate::processing::sync::{FileProcessed, RequestOrigin, SwapOutcome};
use crate::region::Region;
use crossbeam_channel::Sender;

pub struct PlaybackController<D: AudioDecoder> {
    decoder: D,
    region: Region,
    source: Option<String>,
    settings: PlaybackSettings,
    phase: TransportPhase,
    ready: bool,
    load_id: LoadId,
    decode_error: Option<String>,
    pending: Option<RequestOrigin>,
    rewind_step: f64,
    key_subscription: Option<KeySubscription>,
    events: Option<Sender<PlayerEvent>>,
}

impl<D: AudioDecoder> PlaybackController<D> {
    pub fn new(decoder: D) -> Self {
        Self::with_settings(decoder, PlaybackSettings::default())
    }

    pub fn with_settings(decoder: D, settings: PlaybackSettings) -> Self {
        Self {
            decoder,
            region: Region::new(),
            source: None,
            settings: settings.clamped(),
            phase: TransportPhase::Idle,
            ready: false,
            load_id: 0,
            decode_error: None,
            pending: None,
            rewind_step: defaults::REWIND_SECS,
            key_subscription: None,
            events: None,
        }
    }

    /// Send playback-state changes to `events`.
    pub fn with_events(mut self, events: Sender<PlayerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_rewind_step(mut self, seconds: f64) -> Self {
        if seconds.is_finite() && seconds > 0.0 {
            self.rewind_step = seconds;
        }
        self
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut D {
        &mut self.decoder
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn settings(&self) -> PlaybackSettings {
        self.settings
    }

    pub fn phase(&self) -> TransportPhase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn position(&self) -> f64 {
        self.decoder.current_time()
    }

    pub fn decode_error(&self) -> Option<&str> {
        self.decode_error.as_deref()
    }

    pub fn pending_request(&self) -> Option<&RequestOrigin> {
        self.pending.as_ref()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            source: self.source.clone(),
            phase: self.phase,
            position: self.position(),
            region: self.region,
            settings: self.settings,
            ready: self.ready,
            decode_error: self.decode_error.clone(),
        }
    }

    // ── Source selection ──

    /// Select a new source (operator file selection).
    ///
    /// Any processing request started for the previous selection becomes
    /// stale. An empty locator is rejected and nothing changes.
    pub fn set_source(&mut self, locator: &str) -> SwapOutcome {
        if locator.trim().is_empty() {
            log::warn!(target: "player::sync", "rejected empty source selection");
            self.emit(PlayerEvent::RejectedNotification);
            return SwapOutcome::Rejected;
        }
        self.pending = None;
        self.swap(locator);
        SwapOutcome::Swapped
    }

    /// Apply a processed notification.
    pub fn notify_processed(&mut self, event: &FileProcessed) -> SwapOutcome {
        let Some(locator) = event.usable_locator() else {
            log::warn!(target: "player::sync", "rejected processed notification without locator");
            if event.origin.is_some() && event.origin == self.pending {
                self.pending = None;
            }
            self.emit(PlayerEvent::RejectedNotification);
            return SwapOutcome::Rejected;
        };

        if let Some(origin) = &event.origin
            && !self.is_current(origin)
        {
            log::warn!(
                target: "player::sync",
                "stale processed notification for request {} ({} -> {}), ignored",
                origin.token,
                origin.source,
                locator
            );
            self.emit(PlayerEvent::StaleNotification {
                locator: locator.to_string(),
            });
            return SwapOutcome::Stale;
        }

        let locator = locator.to_string();
        self.pending = None;
        self.swap(&locator);
        SwapOutcome::Swapped
    }

    fn is_current(&self, origin: &RequestOrigin) -> bool {
        self.pending.as_ref() == Some(origin) && self.source.as_deref() == Some(origin.source.as_str())
    }

    fn swap(&mut self, locator: &str) {
        log::info!(
            target: "player::sync",
            "swapping source {} -> {}",
            self.source.as_deref().unwrap_or("<none>"),
            locator
        );
        self.decoder.empty();
        self.source = Some(locator.to_string());
        self.region.reset();
        self.ready = false;
        self.decode_error = None;
        self.load_id += 1;
        self.set_phase(TransportPhase::Idle);
        self.emit(PlayerEvent::SourceChanged(locator.to_string()));
        self.emit(PlayerEvent::RegionChanged(self.region));
        self.decoder.load(locator, self.load_id);
    }

    // ── Processing coordination ──

    /// Pause for an upcoming processing request and remember its origin.
    ///
    /// Runs synchronously before the request is sent, so playback never
    /// continues against a source that is about to be replaced.
    pub fn prepare_for_processing(&mut self, origin: RequestOrigin) {
        if self.phase == TransportPhase::Playing {
            self.pause();
        }
        log::debug!(target: "player::sync", "awaiting processed file for request {}", origin.token);
        self.pending = Some(origin);
    }

    /// Forget a pending request that failed.
    pub fn abandon_processing(&mut self, token: RequestToken, message: &str) {
        if self.pending.as_ref().is_some_and(|p| p.token == token) {
            self.pending = None;
        }
        self.emit(PlayerEvent::ProcessingFailed {
            message: message.to_string(),
        });
    }

    // ── Decoder notifications ──

    pub fn handle_decoder_event(&mut self, event: DecoderEvent) {
        if event.load_id() != self.load_id {
            log::debug!(
                target: "player",
                "dropping decoder event for load {} (current {})",
                event.load_id(),
                self.load_id
            );
            return;
        }
        match event {
            DecoderEvent::Ready { duration, .. } => self.on_ready(duration),
            DecoderEvent::Error { message, .. } => self.on_decode_error(message),
            DecoderEvent::TimeAdvanced { time, .. } => self.on_tick(time),
        }
    }

    fn on_ready(&mut self, duration: f64) {
        self.region.on_duration_known(duration);
        self.ready = true;
        self.decoder.set_rate(self.settings.rate);
        self.decoder.set_volume(self.settings.volume);
        log::info!(target: "player", "ready: {:.2}s", self.region.duration());
        self.emit(PlayerEvent::Ready {
            duration: self.region.duration(),
        });
        self.emit(PlayerEvent::RegionChanged(self.region));
    }

    fn on_decode_error(&mut self, message: String) {
        let locator = self.source.clone().unwrap_or_default();
        log::warn!(target: "player", "failed to decode {}: {}", locator, message);
        self.decoder.empty();
        self.region.reset();
        self.ready = false;
        self.set_phase(TransportPhase::Idle);
        self.decode_error = Some(message.clone());
        self.emit(PlayerEvent::RegionChanged(self.region));
        self.emit(PlayerEvent::DecodeFailed { locator, message });
    }

    fn on_tick(&mut self, time: f64) {
        if self.phase != TransportPhase::Playing {
            return;
        }
        let end = self.region.effective_end();
        // A decoder that ran into the end of the media stops on its own and
        // reports exactly `end`.
        let halted = !self.decoder.is_playing();
        if self.settings.looping {
            if time > end || (halted && time >= end) {
                let start = self.region.start();
                self.decoder.seek(start);
                if !self.decoder.is_playing() {
                    self.decoder.play(start);
                }
                self.emit(PlayerEvent::Position(start));
                return;
            }
        } else if time >= end || halted {
            // One-shot playback ends at the region end.
            self.stop();
            return;
        }
        self.emit(PlayerEvent::Position(time));
    }

    // ── Transport ──

    /// Start or resume playback.
    ///
    /// Resumes from the current position when it lies inside the region,
    /// otherwise starts from the region start.
    pub fn play(&mut self) -> Result<()> {
        if !self.ready {
            return Err(LitlistenError::NoSource);
        }
        if self.phase == TransportPhase::Playing {
            return Ok(());
        }
        let position = self.decoder.current_time();
        let from = if self.phase == TransportPhase::Stopped || !self.region.contains(position) {
            self.region.start()
        } else {
            position
        };
        self.decoder.play(from);
        self.set_phase(TransportPhase::Playing);
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.phase != TransportPhase::Playing {
            return;
        }
        self.decoder.pause();
        self.set_phase(TransportPhase::Paused);
    }

    /// Stop and park the position at the region start.
    pub fn stop(&mut self) {
        if !matches!(self.phase, TransportPhase::Playing | TransportPhase::Paused) {
            return;
        }
        self.decoder.stop();
        let start = self.region.start();
        self.decoder.seek(start);
        self.set_phase(TransportPhase::Stopped);
        self.emit(PlayerEvent::Position(start));
    }

    /// Toggle between playing and paused.
    pub fn toggle_playback(&mut self) -> Result<()> {
        if self.phase == TransportPhase::Playing {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Jump back by the rewind step. Ignores region bounds.
    ///
    /// Returns `false` when there is nothing to rewind (phase `Idle`).
    pub fn rewind(&mut self) -> bool {
        self.rewind_by(self.rewind_step)
    }

    pub fn rewind_by(&mut self, seconds: f64) -> bool {
        if self.phase == TransportPhase::Idle || !seconds.is_finite() {
            return false;
        }
        let target = (self.decoder.current_time() - seconds.abs()).max(0.0);
        self.decoder.seek(target);
        self.emit(PlayerEvent::Position(target));
        true
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.settings.looping = !self.settings.looping;
        self.emit(PlayerEvent::SettingsChanged(self.settings));
        self.settings.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        if self.settings.looping != looping {
            self.toggle_loop();
        }
    }

    pub fn set_rate(&mut self, rate: f64) {
        if !rate.is_finite() {
            return;
        }
        self.settings.rate = rate.clamp(defaults::MIN_RATE, defaults::MAX_RATE);
        self.decoder.set_rate(self.settings.rate);
        self.emit(PlayerEvent::SettingsChanged(self.settings));
    }

    pub fn set_volume(&mut self, volume: f64) {
        if !volume.is_finite() {
            return;
        }
        self.settings.volume = volume.clamp(defaults::MIN_VOLUME, defaults::MAX_VOLUME);
        self.decoder.set_volume(self.settings.volume);
        self.emit(PlayerEvent::SettingsChanged(self.settings));
    }

    pub fn set_region_start(&mut self, seconds: f64) {
        self.region.set_start(seconds);
        self.emit(PlayerEvent::RegionChanged(self.region));
    }

    pub fn set_region_end(&mut self, seconds: f64) {
        self.region.set_end(seconds);
        self.emit(PlayerEvent::RegionChanged(self.region));
    }

    // ── Keyboard ──

    /// Bind the space bar to play/pause. Mounting twice keeps one binding.
    pub fn mount(&mut self, dispatcher: &KeyDispatcher) {
        if self.key_subscription.is_some() {
            return;
        }
        self.key_subscription = Some(dispatcher.subscribe(Key::Space, KeyAction::TogglePlayback));
    }

    /// Release the key binding.
    pub fn unmount(&mut self) {
        self.key_subscription = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.key_subscription.is_some()
    }

    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.key_subscription.as_ref().map(KeySubscription::id)
    }

    /// Run a dispatched key action if it targets this controller.
    ///
    /// Returns `true` when the action was addressed to us.
    pub fn handle_key_action(&mut self, target: SubscriptionId, action: KeyAction) -> bool {
        if self.subscription_id() != Some(target) {
            return false;
        }
        match action {
            KeyAction::TogglePlayback => {
                if let Err(e) = self.toggle_playback() {
                    log::debug!(target: "player::keyboard", "space ignored: {}", e);
                }
            }
        }
        true
    }

    fn set_phase(&mut self, phase: TransportPhase) {
        if self.phase != phase {
            log::debug!(target: "player", "{} -> {}", self.phase, phase);
            self.phase = phase;
            self.emit(PlayerEvent::PhaseChanged(phase));
        }
    }

    fn emit(&self, event: PlayerEvent) {
        if let Some(events) = &self.events
            && events.send(event).is_err()
        {
            log::debug!(target: "player", "player event dropped, no receiver");
        }
    }
}
