//! Decoder adapter contract.
//!
//! The playback controller never decodes audio itself. It drives an
//! [`AudioDecoder`] through transport primitives and reacts to the
//! [`DecoderEvent`]s the decoder reports back (ready, time advanced, error).

/// Identifies one `load` call. Events carry the id of the load that
/// produced them so that late events from a replaced source can be dropped.
pub type LoadId = u64;

/// Notifications emitted by a decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum DecoderEvent {
    /// The source finished decoding and its duration is known.
    Ready { load_id: LoadId, duration: f64 },
    /// Playback position moved (one tick).
    TimeAdvanced { load_id: LoadId, time: f64 },
    /// The source could not be decoded.
    Error { load_id: LoadId, message: String },
}

impl DecoderEvent {
    pub fn load_id(&self) -> LoadId {
        match self {
            DecoderEvent::Ready { load_id, .. }
            | DecoderEvent::TimeAdvanced { load_id, .. }
            | DecoderEvent::Error { load_id, .. } => *load_id,
        }
    }
}

/// Trait for audio decoding/transport backends.
///
/// This trait allows swapping implementations (clock-driven decoder vs mock).
pub trait AudioDecoder: Send {
    /// Start decoding `locator`. Completion is reported asynchronously as
    /// `Ready` or `Error` tagged with `load_id`.
    fn load(&mut self, locator: &str, load_id: LoadId);

    /// Drop the decoded buffer.
    fn empty(&mut self);

    /// Start or resume playback from `from` seconds.
    fn play(&mut self, from: f64);

    fn pause(&mut self);

    /// Halt playback. Position handling is left to the caller.
    fn stop(&mut self);

    fn seek(&mut self, time: f64);

    fn set_rate(&mut self, rate: f64);

    fn set_volume(&mut self, volume: f64);

    /// Duration of the decoded source, 0 when nothing is loaded.
    fn duration(&self) -> f64;

    fn current_time(&self) -> f64;

    fn is_playing(&self) -> bool;

    /// Give the decoder a chance to emit time-advanced notifications.
    ///
    /// Called by the session loop on every tick; decoders that push events
    /// from their own threads can leave this empty.
    fn poll(&mut self) {}
}

/// A transport call recorded by [`MockDecoder`].
#[derive(Debug, Clone, PartialEq)]
pub enum DecoderCall {
    Load { locator: String, load_id: LoadId },
    Empty,
    Play { from: f64 },
    Pause,
    Stop,
    Seek { time: f64 },
    SetRate { rate: f64 },
    SetVolume { volume: f64 },
}

/// Mock decoder for testing.
///
/// Records every transport call and keeps a simulated position. Events are
/// not pushed anywhere; tests build them with [`MockDecoder::ready`],
/// [`MockDecoder::advance`] and [`MockDecoder::fail`] and hand them to the
/// controller.
#[derive(Debug, Clone, Default)]
pub struct MockDecoder {
    calls: Vec<DecoderCall>,
    locator: Option<String>,
    load_id: LoadId,
    duration: f64,
    time: f64,
    rate: f64,
    volume: f64,
    playing: bool,
}

impl MockDecoder {
    pub fn new() -> Self {
        Self {
            rate: 1.0,
            volume: 1.0,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> &[DecoderCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn locator(&self) -> Option<&str> {
        self.locator.as_deref()
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Finish decoding the current load with the given duration.
    pub fn ready(&mut self, duration: f64) -> DecoderEvent {
        self.duration = duration;
        DecoderEvent::Ready {
            load_id: self.load_id,
            duration,
        }
    }

    /// Fail the current load.
    pub fn fail(&mut self, message: &str) -> DecoderEvent {
        self.duration = 0.0;
        DecoderEvent::Error {
            load_id: self.load_id,
            message: message.to_string(),
        }
    }

    /// Advance the simulated clock by `seconds` of wall time.
    pub fn advance(&mut self, seconds: f64) -> DecoderEvent {
        if self.playing {
            self.time += seconds * self.rate;
        }
        DecoderEvent::TimeAdvanced {
            load_id: self.load_id,
            time: self.time,
        }
    }
}

impl AudioDecoder for MockDecoder {
    fn load(&mut self, locator: &str, load_id: LoadId) {
        self.calls.push(DecoderCall::Load {
            locator: locator.to_string(),
            load_id,
        });
        self.locator = Some(locator.to_string());
        self.load_id = load_id;
        self.time = 0.0;
        self.playing = false;
    }

    fn empty(&mut self) {
        self.calls.push(DecoderCall::Empty);
        self.locator = None;
        self.duration = 0.0;
        self.time = 0.0;
        self.playing = false;
    }

    fn play(&mut self, from: f64) {
        self.calls.push(DecoderCall::Play { from });
        self.time = from;
        self.playing = true;
    }

    fn pause(&mut self) {
        self.calls.push(DecoderCall::Pause);
        self.playing = false;
    }

    fn stop(&mut self) {
        self.calls.push(DecoderCall::Stop);
        self.playing = false;
    }

    fn seek(&mut self, time: f64) {
        self.calls.push(DecoderCall::Seek { time });
        self.time = time;
    }

    fn set_rate(&mut self, rate: f64) {
        self.calls.push(DecoderCall::SetRate { rate });
        self.rate = rate;
    }

    fn set_volume(&mut self, volume: f64) {
        self.calls.push(DecoderCall::SetVolume { volume });
        self.volume = volume;
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_calls_in_order() {
        let mut decoder = MockDecoder::new();
        decoder.load("a.wav", 1);
        decoder.play(2.0);
        decoder.pause();

        assert_eq!(
            decoder.calls(),
            &[
                DecoderCall::Load {
                    locator: "a.wav".to_string(),
                    load_id: 1
                },
                DecoderCall::Play { from: 2.0 },
                DecoderCall::Pause,
            ]
        );
    }

    #[test]
    fn test_mock_advance_scales_with_rate() {
        let mut decoder = MockDecoder::new();
        decoder.load("a.wav", 4);
        decoder.set_rate(2.0);
        decoder.play(1.0);

        let event = decoder.advance(0.5);
        assert_eq!(
            event,
            DecoderEvent::TimeAdvanced {
                load_id: 4,
                time: 2.0
            }
        );
    }

    #[test]
    fn test_mock_advance_does_not_move_when_paused() {
        let mut decoder = MockDecoder::new();
        decoder.load("a.wav", 1);
        decoder.play(3.0);
        decoder.pause();
        decoder.advance(10.0);
        assert_eq!(decoder.current_time(), 3.0);
    }

    #[test]
    fn test_event_load_id() {
        let mut decoder = MockDecoder::new();
        decoder.load("a.wav", 9);
        assert_eq!(decoder.ready(3.0).load_id(), 9);
        assert_eq!(decoder.fail("bad").load_id(), 9);
    }
}
