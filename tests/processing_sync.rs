//! End-to-end processing handoff: tuner → service → bus → controller.

use litlisten::player::{
    ClockDecoder, MockDecoder, PlaybackController, PlayerEvent, TransportPhase,
};
use litlisten::processing::{
    FileProcessed, MockProcessingService, Param, ProcessedBus, ProcessingType, SwapOutcome, Tuner,
};
use litlisten::session::{Session, SessionCommand, SessionReport};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn ready_controller(locator: &str, duration: f64) -> PlaybackController<MockDecoder> {
    let mut controller = PlaybackController::new(MockDecoder::new());
    controller.set_source(locator);
    let ready = controller.decoder_mut().ready(duration);
    controller.handle_decoder_event(ready);
    controller
}

#[tokio::test]
async fn processed_file_replaces_source_and_keeps_settings() {
    let bus = ProcessedBus::new();
    let mut rx = bus.subscribe();
    let mut tuner = Tuner::new(bus);
    tuner.set_processing_type(ProcessingType::Compress);
    tuner.set(Param::CompressionRatio, 4.0);

    let mut controller = ready_controller("take1.wav", 60.0);
    controller.set_rate(1.7);
    controller.set_volume(0.3);
    controller.set_looping(true);
    controller.set_region_start(10.0);
    controller.set_region_end(20.0);
    controller.play().unwrap();

    let service = MockProcessingService::new("take1_compressed.wav");
    let event = tuner.submit(&mut controller, &service).await.unwrap();
    assert_eq!(controller.phase(), TransportPhase::Paused);

    let published = rx.try_recv().unwrap();
    assert_eq!(published, event);
    assert_eq!(controller.notify_processed(&published), SwapOutcome::Swapped);

    assert_eq!(controller.source(), Some("take1_compressed.wav"));
    assert_eq!(controller.region().start(), 0.0);
    assert_eq!(controller.region().end(), None);

    let ready = controller.decoder_mut().ready(58.0);
    controller.handle_decoder_event(ready);
    assert_eq!(controller.region().end(), Some(58.0));

    let settings = controller.settings();
    assert_eq!(settings.rate, 1.7);
    assert_eq!(settings.volume, 0.3);
    assert!(settings.looping);
    assert_eq!(controller.decoder().rate(), 1.7);
    assert_eq!(controller.decoder().volume(), 0.3);

    let sent = service.requests();
    assert_eq!(sent.len(), 1);
    let wire = serde_json::to_value(sent[0].to_wire()).unwrap();
    assert_eq!(wire["type"], "compression");
    assert_eq!(wire["filePath"], "take1.wav");
    assert_eq!(wire["compressionRatio"], 4.0);
}

#[tokio::test]
async fn failed_processing_publishes_nothing_and_keeps_source() {
    let bus = ProcessedBus::new();
    let mut rx = bus.subscribe();
    let mut tuner = Tuner::new(bus);
    let (tx, events) = crossbeam_channel::unbounded();
    let mut controller = ready_controller("take1.wav", 60.0).with_events(tx);
    controller.play().unwrap();

    let service = MockProcessingService::failing("Unknown processing type");
    assert!(tuner.submit(&mut controller, &service).await.is_err());

    assert!(rx.try_recv().is_err());
    assert_eq!(controller.source(), Some("take1.wav"));
    assert_eq!(controller.phase(), TransportPhase::Paused);
    assert!(controller.pending_request().is_none());
    assert!(events.try_iter().any(|e| matches!(
        e,
        PlayerEvent::ProcessingFailed { message } if message.contains("Unknown processing type")
    )));

    // Playback resumes on the original source.
    controller.play().unwrap();
    assert_eq!(controller.phase(), TransportPhase::Playing);
}

#[tokio::test]
async fn late_result_for_previous_file_is_ignored() {
    let service =
        MockProcessingService::new("take1_pitch.wav").with_delay(Duration::from_millis(30));
    let controller = ready_controller("take1.wav", 60.0);
    let (_decoder_tx, decoder_rx) = crossbeam_channel::unbounded();
    let mut session = Session::new(
        controller,
        Tuner::new(ProcessedBus::new()),
        Arc::new(service),
        decoder_rx,
    );

    session.handle(SessionCommand::Process).unwrap();
    session
        .handle(SessionCommand::Open("take2.wav".to_string()))
        .unwrap();
    session.take_reports();

    assert!(session.next_completion().await);

    assert_eq!(session.controller().source(), Some("take2.wav"));
    let reports = session.take_reports();
    assert!(
        reports
            .iter()
            .any(|r| matches!(r, SessionReport::Swap(SwapOutcome::Stale)))
    );
}

fn write_wav(path: &Path, seconds: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..(8000 * seconds) {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
}

#[tokio::test]
async fn backend_url_result_is_playable_from_media_dir() {
    let media = tempfile::TempDir::new().unwrap();
    let original = media.path().join("clip.wav");
    write_wav(&original, 1);
    write_wav(&media.path().join("clip_pitch.wav"), 2);

    let (decoder_tx, decoder_rx) = crossbeam_channel::unbounded();
    let decoder = ClockDecoder::new(decoder_tx).with_media_dir(media.path());
    let mut session = Session::new(
        PlaybackController::new(decoder),
        Tuner::new(ProcessedBus::new()),
        Arc::new(MockProcessingService::new(
            "http://localhost:8080/clip_pitch.wav",
        )),
        decoder_rx,
    );
    session
        .handle(SessionCommand::Open(original.display().to_string()))
        .unwrap();
    assert!(session.controller().is_ready());

    session.handle(SessionCommand::Process).unwrap();
    assert!(session.next_completion().await);

    let controller = session.controller();
    assert_eq!(
        controller.source(),
        Some("http://localhost:8080/clip_pitch.wav")
    );
    assert!(controller.is_ready());
    assert!(controller.decode_error().is_none());
    assert_eq!(controller.region().end(), Some(2.0));
    session.handle(SessionCommand::Play).unwrap();
    assert_eq!(session.controller().phase(), TransportPhase::Playing);
}

#[tokio::test]
async fn bus_subscribers_all_see_the_result() {
    let bus = ProcessedBus::new();
    let mut first = bus.subscribe();
    let mut second = bus.subscribe();
    let mut tuner = Tuner::new(bus);
    let mut controller = ready_controller("take1.wav", 60.0);

    let service = MockProcessingService::new("take1_denoised.wav");
    tuner.set_processing_type(ProcessingType::Denoise);
    tuner.submit(&mut controller, &service).await.unwrap();

    let a = first.try_recv().unwrap();
    let b = second.try_recv().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.usable_locator(), Some("take1_denoised.wav"));
}

#[test]
fn bare_notifications_are_last_writer_wins() {
    let mut controller = ready_controller("take1.wav", 60.0);

    let first = FileProcessed::new(Some("a.wav".to_string()));
    let second = FileProcessed::new(Some("b.wav".to_string()));
    assert_eq!(controller.notify_processed(&first), SwapOutcome::Swapped);
    assert_eq!(controller.notify_processed(&second), SwapOutcome::Swapped);
    assert_eq!(controller.source(), Some("b.wav"));

    assert_eq!(
        controller.notify_processed(&FileProcessed::new(Some(String::new()))),
        SwapOutcome::Rejected
    );
    assert_eq!(
        controller.notify_processed(&FileProcessed::new(None)),
        SwapOutcome::Rejected
    );
    assert_eq!(controller.source(), Some("b.wav"));
}

#[test]
fn notification_before_any_file_loads_it() {
    let mut controller = PlaybackController::new(MockDecoder::new());
    let outcome = controller.notify_processed(&FileProcessed::new(Some("fresh.wav".to_string())));

    assert_eq!(outcome, SwapOutcome::Swapped);
    assert_eq!(controller.source(), Some("fresh.wav"));
    assert_eq!(controller.phase(), TransportPhase::Idle);
    assert!(!controller.is_ready());
}
