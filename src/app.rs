//! Application entry points for the CLI commands.
//!
//! Wires the clock decoder, the HTTP processing client and the session loop
//! together from a loaded [`Config`].

use crate::cli::PlaybackArgs;
use crate::config::Config;
use crate::error::{LitlistenError, Result};
use crate::output::{render_event, render_report};
use crate::player::clock::ClockDecoder;
use crate::player::controller::PlaybackController;
use crate::player::decoder::{AudioDecoder, DecoderEvent};
use crate::player::state::{PlayerEvent, TransportPhase};
use crate::processing::request::ProcessingType;
use crate::processing::service::{HttpProcessingService, ProcessingService};
use crate::processing::sync::ProcessedBus;
use crate::processing::tuner::{Param, Tuner};
use crate::session::{Session, SessionCommand, parse_command};
use crossbeam_channel::{Receiver, unbounded};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Fold CLI transport flags into the player config.
pub fn apply_playback_args(config: &mut Config, args: &PlaybackArgs) {
    if let Some(rate) = args.rate {
        config.player.rate = rate;
    }
    if let Some(volume) = args.volume {
        config.player.volume = volume;
    }
    if args.looping {
        config.player.looping = true;
    }
}

/// Parse a `NAME=VALUE` tuner override.
pub fn parse_param_override(raw: &str) -> Result<(Param, f64)> {
    let (name, value) = raw.split_once('=').ok_or_else(|| LitlistenError::ConfigInvalidValue {
        key: raw.to_string(),
        message: "expected NAME=VALUE".to_string(),
    })?;
    let param: Param = name
        .parse()
        .map_err(|message| LitlistenError::ConfigInvalidValue {
            key: name.to_string(),
            message,
        })?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|_| LitlistenError::ConfigInvalidValue {
            key: name.to_string(),
            message: format!("'{}' is not a number", value),
        })?;
    Ok((param, value))
}

/// Print player events on a background thread until the controller goes away.
fn spawn_event_printer(events: Receiver<PlayerEvent>, quiet: bool) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for event in events {
            if !quiet {
                render_event(&event);
            }
        }
    })
}

fn build_controller(
    config: &Config,
    quiet: bool,
) -> (
    PlaybackController<ClockDecoder>,
    Receiver<DecoderEvent>,
    JoinHandle<()>,
) {
    let (decoder_tx, decoder_rx) = unbounded();
    let (player_tx, player_rx) = unbounded();
    let mut decoder = ClockDecoder::new(decoder_tx);
    if let Some(dir) = &config.player.media_dir {
        decoder = decoder.with_media_dir(dir);
    }
    let controller = PlaybackController::with_settings(decoder, config.player.settings())
            .with_rewind_step(config.player.rewind_secs)
            .with_events(player_tx);
    let printer = spawn_event_printer(player_rx, quiet);
    (controller, decoder_rx, printer)
}

/// Play one region of a WAV file.
///
/// Returns when the region finishes, or on Ctrl-C when looping.
pub async fn run_play_command(
    mut config: Config,
    file: &Path,
    playback: PlaybackArgs,
    quiet: bool,
) -> Result<()> {
    apply_playback_args(&mut config, &playback);
    let (mut controller, decoder_events, printer) = build_controller(&config, quiet);

    controller.set_source(&file.display().to_string());
    while let Ok(event) = decoder_events.try_recv() {
        controller.handle_decoder_event(event);
    }
    if let Some(message) = controller.decode_error() {
        return Err(LitlistenError::DecodeFailure {
            locator: file.display().to_string(),
            message: message.to_string(),
        });
    }

    if let Some(start) = playback.start {
        controller.set_region_start(start);
    }
    if let Some(end) = playback.end {
        controller.set_region_end(end);
    }
    controller.play()?;

    let mut interval = tokio::time::interval(config.player.tick());
    loop {
        tokio::select! {
            _ = interval.tick() => {
                controller.decoder_mut().poll();
                while let Ok(event) = decoder_events.try_recv() {
                    controller.handle_decoder_event(event);
                }
                if controller.phase() == TransportPhase::Stopped {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                controller.stop();
                break;
            }
        }
    }

    drop(controller);
    if printer.join().is_err() {
        log::warn!(target: "app", "event printer panicked");
    }
    Ok(())
}

/// Send one file through the backend and print the processed locator.
pub async fn run_process_command(
    config: Config,
    file: &str,
    processing_type: Option<ProcessingType>,
    params: &[String],
    quiet: bool,
) -> Result<()> {
    let mut tuner = Tuner::from_config(&config.tuner, ProcessedBus::new());
    if let Some(processing_type) = processing_type {
        tuner.set_processing_type(processing_type);
    }
    for raw in params {
        let (param, value) = parse_param_override(raw)?;
        let stored = tuner.set(param, value);
        if stored != value {
            log::warn!(target: "app", "{} clamped to {}", param, stored);
        }
    }

    let service = HttpProcessingService::new(&config.backend.base_url, config.backend.timeout())?;
    let request = tuner.build_request(file);
    if !quiet {
        eprintln!(
            "Processing {} ({}) via {}...",
            file,
            request.processing_type(),
            service.endpoint()
        );
    }
    let url = service.process(&request).await?;
    println!("{}", url);
    Ok(())
}

/// Interactive session: commands on stdin, events on stderr.
pub async fn run_session_command(
    mut config: Config,
    file: Option<String>,
    playback: PlaybackArgs,
    quiet: bool,
) -> Result<()> {
    apply_playback_args(&mut config, &playback);
    let (controller, decoder_events, printer) = build_controller(&config, quiet);
    let tuner = Tuner::from_config(&config.tuner, ProcessedBus::new());
    let service: Arc<dyn ProcessingService> = Arc::new(HttpProcessingService::new(
        &config.backend.base_url,
        config.backend.timeout(),
    )?);
    let mut session = Session::new(controller, tuner, service, decoder_events);

    if let Some(file) = file {
        session.handle(SessionCommand::Open(file))?;
        if let Some(start) = playback.start {
            session.handle(SessionCommand::SetStart(start))?;
        }
        if let Some(end) = playback.end {
            session.handle(SessionCommand::SetEnd(end))?;
        }
    }
    for report in session.take_reports() {
        render_report(&report);
    }

    if !quiet {
        eprintln!("Commands: open FILE, play, pause, stop, space, rewind, loop, start S, end S,");
        eprintln!("          rate R, volume V, type T, set NAME VALUE, process, status, quit");
    }

    // std thread, not tokio stdin: a pending read must not delay exit.
    let (commands_tx, commands_rx) = tokio::sync::mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Ok(command) => {
                    if commands_tx.send(command).is_err() {
                        break;
                    }
                }
                Err(message) => eprintln!("{}", message),
            }
        }
    });

    session
        .run(commands_rx, config.player.tick(), |report| render_report(&report))
        .await;

    drop(session);
    if printer.join().is_err() {
        log::warn!(target: "app", "event printer panicked");
    }
    Ok(())
}
