//! Audition session: one controller, one tuner, one event loop.
//!
//! Everything that mutates playback state runs on the session loop, one
//! event at a time: operator commands, decoder notifications, processing
//! completions and processed-file events. The backend call is the only
//! suspension point; it runs on a spawned task and reports back through a
//! channel, so transport stays responsive while a request is outstanding.

use crate::error::{LitlistenError, Result};
use crate::player::controller::PlaybackController;
use crate::player::decoder::{AudioDecoder, DecoderEvent};
use crate::player::keyboard::{Key, KeyDispatcher, KeyEvent};
use crate::player::state::PlayerSnapshot;
use crate::processing::request::{ProcessingType, RequestToken};
use crate::processing::service::ProcessingService;
use crate::processing::sync::{FileProcessed, RequestOrigin, SwapOutcome};
use crate::processing::tuner::{Param, Tuner, TunerSnapshot};
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Operator input.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Open(String),
    Play,
    Pause,
    Stop,
    Rewind,
    ToggleLoop,
    Key(Key),
    SetStart(f64),
    SetEnd(f64),
    SetRate(f64),
    SetVolume(f64),
    SetType(ProcessingType),
    SetParam(Param, f64),
    Process,
    /// Processed notification from an external caller (no request context).
    Notify(Option<String>),
    Status,
    Quit,
}

/// Whether the loop keeps running after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Things the session reports back to whoever drives it.
#[derive(Debug)]
pub enum SessionReport {
    Status {
        player: PlayerSnapshot,
        tuner: TunerSnapshot,
    },
    Submitted {
        token: RequestToken,
        processing_type: ProcessingType,
    },
    Swap(SwapOutcome),
    Error(LitlistenError),
}

struct Completion {
    origin: RequestOrigin,
    outcome: Result<String>,
}

pub struct Session<D: AudioDecoder> {
    controller: PlaybackController<D>,
    tuner: Tuner,
    service: Arc<dyn ProcessingService>,
    keys: KeyDispatcher,
    decoder_events: Receiver<DecoderEvent>,
    processed: broadcast::Receiver<FileProcessed>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    reports: Vec<SessionReport>,
}

impl<D: AudioDecoder> Session<D> {
    /// Wire a session together and bind the controller's keyboard shortcut.
    pub fn new(
        mut controller: PlaybackController<D>,
        tuner: Tuner,
        service: Arc<dyn ProcessingService>,
        decoder_events: Receiver<DecoderEvent>,
    ) -> Self {
        let keys = KeyDispatcher::new();
        controller.mount(&keys);
        let processed = tuner.bus().subscribe();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            controller,
            tuner,
            service,
            keys,
            decoder_events,
            processed,
            completions_tx,
            completions_rx,
            reports: Vec::new(),
        }
    }

    pub fn controller(&self) -> &PlaybackController<D> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PlaybackController<D> {
        &mut self.controller
    }

    pub fn tuner(&self) -> &Tuner {
        &self.tuner
    }

    pub fn keys(&self) -> &KeyDispatcher {
        &self.keys
    }

    /// Reports collected since the last call.
    pub fn take_reports(&mut self) -> Vec<SessionReport> {
        std::mem::take(&mut self.reports)
    }

    /// Apply one operator command.
    pub fn handle(&mut self, command: SessionCommand) -> Result<Flow> {
        match command {
            SessionCommand::Open(locator) => {
                let outcome = self.controller.set_source(&locator);
                self.reports.push(SessionReport::Swap(outcome));
            }
            SessionCommand::Play => self.controller.play()?,
            SessionCommand::Pause => self.controller.pause(),
            SessionCommand::Stop => self.controller.stop(),
            SessionCommand::Rewind => {
                if !self.controller.rewind() {
                    return Err(LitlistenError::NoSource);
                }
            }
            SessionCommand::ToggleLoop => {
                self.controller.toggle_loop();
            }
            SessionCommand::Key(key) => {
                self.press(key);
            }
            SessionCommand::SetStart(seconds) => self.controller.set_region_start(seconds),
            SessionCommand::SetEnd(seconds) => self.controller.set_region_end(seconds),
            SessionCommand::SetRate(rate) => self.controller.set_rate(rate),
            SessionCommand::SetVolume(volume) => self.controller.set_volume(volume),
            SessionCommand::SetType(processing_type) => {
                self.tuner.set_processing_type(processing_type)
            }
            SessionCommand::SetParam(param, value) => {
                self.tuner.set(param, value);
            }
            SessionCommand::Process => {
                self.submit_processing()?;
            }
            SessionCommand::Notify(locator) => {
                let outcome = self.controller.notify_processed(&FileProcessed::new(locator));
                self.reports.push(SessionReport::Swap(outcome));
            }
            SessionCommand::Status => {
                self.reports.push(SessionReport::Status {
                    player: self.controller.snapshot(),
                    tuner: self.tuner.snapshot(),
                });
            }
            SessionCommand::Quit => return Ok(Flow::Quit),
        }
        self.pump();
        Ok(Flow::Continue)
    }

    /// Route a key press through the dispatcher.
    pub fn press(&mut self, key: Key) -> KeyEvent {
        let mut event = KeyEvent::new(key);
        for (target, action) in self.keys.dispatch(&mut event) {
            self.controller.handle_key_action(target, action);
        }
        event
    }

    /// Pause, freeze the tuner, and send the request on a background task.
    pub fn submit_processing(&mut self) -> Result<RequestToken> {
        let request = self.tuner.begin(&mut self.controller)?;
        let token = request.token();
        self.reports.push(SessionReport::Submitted {
            token,
            processing_type: request.processing_type(),
        });

        let service = Arc::clone(&self.service);
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let outcome = service.process(&request).await;
            let completion = Completion {
                origin: request.origin(),
                outcome,
            };
            if completions.send(completion).is_err() {
                log::debug!(target: "session", "session closed before request {} finished", token);
            }
        });
        Ok(token)
    }

    fn on_completion(&mut self, completion: Completion) {
        let token = completion.origin.token;
        match self.tuner.finish(completion.origin, completion.outcome) {
            Ok(_) => self.drain_notifications(),
            Err(e) => {
                self.controller.abandon_processing(token, &e.to_string());
                self.reports.push(SessionReport::Error(e));
            }
        }
    }

    /// Apply processed-file events published since the last call.
    pub fn drain_notifications(&mut self) {
        loop {
            match self.processed.try_recv() {
                Ok(event) => {
                    let outcome = self.controller.notify_processed(&event);
                    self.reports.push(SessionReport::Swap(outcome));
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    log::warn!(target: "session", "missed {} processed notifications", skipped);
                }
                Err(_) => break,
            }
        }
    }

    /// Let the decoder advance and apply whatever it reported.
    pub fn tick(&mut self) {
        self.controller.decoder_mut().poll();
        self.pump();
    }

    fn pump(&mut self) {
        while let Ok(event) = self.decoder_events.try_recv() {
            self.controller.handle_decoder_event(event);
        }
        self.drain_notifications();
    }

    /// Wait for the next processing completion and apply it.
    pub async fn next_completion(&mut self) -> bool {
        match self.completions_rx.recv().await {
            Some(completion) => {
                self.on_completion(completion);
                self.pump();
                true
            }
            None => false,
        }
    }

    /// Run until the command channel closes or a `Quit` arrives.
    ///
    /// `report` is called for every status, swap and error the session
    /// produces. Errors never end the loop.
    pub async fn run<F>(
        &mut self,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
        tick: Duration,
        mut report: F,
    ) where
        F: FnMut(SessionReport),
    {
        enum Step {
            Command(Option<SessionCommand>),
            Completion(Completion),
            Tick,
        }

        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            let step = tokio::select! {
                command = commands.recv() => Step::Command(command),
                Some(completion) = self.completions_rx.recv() => Step::Completion(completion),
                _ = interval.tick() => Step::Tick,
            };

            match step {
                Step::Command(None) => break,
                Step::Command(Some(command)) => match self.handle(command) {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {}
                    Err(e) => self.reports.push(SessionReport::Error(e)),
                },
                Step::Completion(completion) => {
                    self.on_completion(completion);
                    self.pump();
                }
                Step::Tick => self.tick(),
            }

            for item in self.take_reports() {
                report(item);
            }
        }

        for item in self.take_reports() {
            report(item);
        }
    }
}

/// Parse one line of the interactive session protocol.
///
/// Times are seconds; values are plain numbers.
pub fn parse_command(line: &str) -> std::result::Result<SessionCommand, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Err("empty command".to_string());
    };
    let arg = parts.next();
    let number = |name: &str| -> std::result::Result<f64, String> {
        let raw = arg.ok_or_else(|| format!("{} needs a value", name))?;
        raw.parse::<f64>()
            .map_err(|_| format!("'{}' is not a number", raw))
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "open" | "load" => SessionCommand::Open(
            arg.ok_or_else(|| "open needs a file".to_string())?
                .to_string(),
        ),
        "play" | "p" => SessionCommand::Play,
        "pause" => SessionCommand::Pause,
        "stop" | "s" => SessionCommand::Stop,
        "rewind" | "r" => SessionCommand::Rewind,
        "loop" | "l" => SessionCommand::ToggleLoop,
        "space" | " " => SessionCommand::Key(Key::Space),
        "start" => SessionCommand::SetStart(number("start")?),
        "end" => SessionCommand::SetEnd(number("end")?),
        "rate" | "speed" => SessionCommand::SetRate(number("rate")?),
        "volume" | "vol" => SessionCommand::SetVolume(number("volume")?),
        "type" => SessionCommand::SetType(
            arg.ok_or_else(|| "type needs a processing type".to_string())?
                .parse()?,
        ),
        "set" => {
            let param: Param = arg
                .ok_or_else(|| "set needs a parameter".to_string())?
                .parse()?;
            let raw = parts
                .next()
                .ok_or_else(|| format!("set {} needs a value", param))?;
            let value = raw
                .parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", raw))?;
            SessionCommand::SetParam(param, value)
        }
        "process" | "apply" => SessionCommand::Process,
        "notify" => SessionCommand::Notify(arg.map(str::to_string)),
        "status" | "?" => SessionCommand::Status,
        "quit" | "q" | "exit" => SessionCommand::Quit,
        other => return Err(format!("unknown command '{}'", other)),
    };
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::decoder::MockDecoder;
    use crate::player::state::TransportPhase;
    use crate::processing::service::MockProcessingService;
    use crate::processing::sync::ProcessedBus;

    fn session_with(service: MockProcessingService) -> Session<MockDecoder> {
        let (_tx, rx) = crossbeam_channel::unbounded();
        let controller = PlaybackController::new(MockDecoder::new());
        let tuner = Tuner::new(ProcessedBus::new());
        let mut session = Session::new(controller, tuner, Arc::new(service), rx);
        session.handle(SessionCommand::Open("clip.mp3".to_string())).unwrap();
        let ready = session.controller_mut().decoder_mut().ready(30.0);
        session.controller_mut().handle_decoder_event(ready);
        session
    }

    #[test]
    fn test_parse_transport_commands() {
        assert_eq!(parse_command("play"), Ok(SessionCommand::Play));
        assert_eq!(parse_command("  loop "), Ok(SessionCommand::ToggleLoop));
        assert_eq!(parse_command("space"), Ok(SessionCommand::Key(Key::Space)));
        assert_eq!(parse_command("start 2.5"), Ok(SessionCommand::SetStart(2.5)));
        assert_eq!(parse_command("vol 0.3"), Ok(SessionCommand::SetVolume(0.3)));
        assert_eq!(
            parse_command("open clips/a.wav"),
            Ok(SessionCommand::Open("clips/a.wav".to_string()))
        );
    }

    #[test]
    fn test_parse_tuner_commands() {
        assert_eq!(
            parse_command("type compress"),
            Ok(SessionCommand::SetType(ProcessingType::Compress))
        );
        assert_eq!(
            parse_command("set ratio 4"),
            Ok(SessionCommand::SetParam(Param::CompressionRatio, 4.0))
        );
        assert_eq!(parse_command("notify"), Ok(SessionCommand::Notify(None)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("").is_err());
        assert!(parse_command("start").is_err());
        assert!(parse_command("start soon").is_err());
        assert!(parse_command("type reverb").is_err());
        assert!(parse_command("set tempo 3").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[tokio::test]
    async fn test_processing_pauses_before_completion() {
        let service = MockProcessingService::new("clip_pitch.mp3").with_delay(Duration::from_millis(50));
        let mut session = session_with(service);
        session.handle(SessionCommand::Play).unwrap();

        session.handle(SessionCommand::Process).unwrap();
        assert_eq!(session.controller().phase(), TransportPhase::Paused);
        assert_eq!(session.controller().source(), Some("clip.mp3"));

        assert!(session.next_completion().await);
        assert_eq!(session.controller().source(), Some("clip_pitch.mp3"));
        assert_eq!(session.controller().phase(), TransportPhase::Idle);
    }

    #[tokio::test]
    async fn test_transport_usable_while_request_outstanding() {
        let service = MockProcessingService::new("clip_pitch.mp3").with_delay(Duration::from_millis(50));
        let mut session = session_with(service);
        session.handle(SessionCommand::Process).unwrap();

        session.handle(SessionCommand::Play).unwrap();
        assert_eq!(session.controller().phase(), TransportPhase::Playing);
        session.press(Key::Space);
        assert_eq!(session.controller().phase(), TransportPhase::Paused);

        assert!(session.next_completion().await);
        assert_eq!(session.controller().source(), Some("clip_pitch.mp3"));
    }

    #[tokio::test]
    async fn test_second_submission_rejected_while_in_flight() {
        let service = MockProcessingService::new("clip_pitch.mp3").with_delay(Duration::from_millis(50));
        let mut session = session_with(service);
        session.handle(SessionCommand::Process).unwrap();

        let err = session.handle(SessionCommand::Process).unwrap_err();
        assert!(matches!(err, LitlistenError::ProcessingInFlight { .. }));

        assert!(session.next_completion().await);
        assert!(session.handle(SessionCommand::Process).is_ok());
    }

    #[tokio::test]
    async fn test_late_completion_after_file_change_is_stale() {
        let service = MockProcessingService::new("clip_pitch.mp3").with_delay(Duration::from_millis(50));
        let mut session = session_with(service);
        session.handle(SessionCommand::Process).unwrap();
        session.handle(SessionCommand::Open("other.mp3".to_string())).unwrap();
        session.take_reports();

        assert!(session.next_completion().await);

        assert_eq!(session.controller().source(), Some("other.mp3"));
        let reports = session.take_reports();
        assert!(
            reports
                .iter()
                .any(|r| matches!(r, SessionReport::Swap(SwapOutcome::Stale)))
        );
    }

    #[tokio::test]
    async fn test_failed_processing_keeps_source_and_reports_error() {
        let mut session = session_with(MockProcessingService::failing("ffmpeg failed"));
        session.handle(SessionCommand::Play).unwrap();
        session.handle(SessionCommand::Process).unwrap();
        session.take_reports();

        assert!(session.next_completion().await);

        assert_eq!(session.controller().source(), Some("clip.mp3"));
        assert!(session.controller().is_ready());
        assert!(session.tuner().in_flight().is_none());
        let reports = session.take_reports();
        assert!(matches!(
            reports.as_slice(),
            [SessionReport::Error(LitlistenError::ProcessingFailure { .. })]
        ));
    }

    #[tokio::test]
    async fn test_space_prevents_default_and_toggles() {
        let mut session = session_with(MockProcessingService::new("x.mp3"));
        let event = session.press(Key::Space);
        assert!(event.default_prevented);
        assert_eq!(session.controller().phase(), TransportPhase::Playing);
        assert_eq!(session.keys().handler_count(Key::Space), 1);
    }

    #[tokio::test]
    async fn test_key_command_dispatches_through_bindings() {
        let mut session = session_with(MockProcessingService::new("x.mp3"));
        assert_eq!(
            session.handle(SessionCommand::Key(Key::Space)).unwrap(),
            Flow::Continue
        );
        assert_eq!(session.controller().phase(), TransportPhase::Playing);
        session.handle(SessionCommand::Key(Key::Space)).unwrap();
        assert_eq!(session.controller().phase(), TransportPhase::Paused);
    }

    #[tokio::test]
    async fn test_run_stops_on_quit_and_reports_status() {
        let mut session = session_with(MockProcessingService::new("x.mp3"));
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(SessionCommand::SetRate(1.5)).unwrap();
        tx.send(SessionCommand::Status).unwrap();
        tx.send(SessionCommand::Quit).unwrap();

        let mut statuses = Vec::new();
        session
            .run(rx, Duration::from_millis(5), |report| {
                if let SessionReport::Status { player, .. } = report {
                    statuses.push(player);
                }
            })
            .await;

        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].settings.rate, 1.5);
    }

    #[tokio::test]
    async fn test_external_notification_swaps_last_writer_wins() {
        let mut session = session_with(MockProcessingService::new("x.mp3"));
        session
            .handle(SessionCommand::Notify(Some("a.mp3".to_string())))
            .unwrap();
        session
            .handle(SessionCommand::Notify(Some("b.mp3".to_string())))
            .unwrap();
        assert_eq!(session.controller().source(), Some("b.mp3"));

        session.handle(SessionCommand::Notify(None)).unwrap();
        assert_eq!(session.controller().source(), Some("b.mp3"));
    }
}
