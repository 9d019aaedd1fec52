//! Shared event rendering for terminal output.
//! Used by `litlisten play` and `litlisten session`.

use crate::error::LitlistenError;
use crate::player::state::{PlayerEvent, PlayerSnapshot, TransportPhase};
use crate::processing::sync::SwapOutcome;
use crate::processing::tuner::TunerSnapshot;
use crate::region::Region;
use crate::session::SessionReport;
use owo_colors::OwoColorize;

/// Format seconds as `m:ss.s`.
pub fn format_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let tenths = (seconds * 10.0).round() as u64;
    let minutes = tenths / 600;
    let rest = tenths % 600;
    format!("{}:{:02}.{}", minutes, rest / 10, rest % 10)
}

fn format_region(region: &Region) -> String {
    match region.end() {
        Some(end) => format!("{} - {}", format_time(region.start()), format_time(end)),
        None => format!("{} - ?", format_time(region.start())),
    }
}

fn format_phase(phase: TransportPhase) -> String {
    match phase {
        TransportPhase::Playing => phase.green().to_string(),
        TransportPhase::Paused => phase.yellow().to_string(),
        TransportPhase::Stopped | TransportPhase::Idle => phase.dimmed().to_string(),
    }
}

/// One line per event. Position ticks return `None` so the log stays readable.
pub fn format_event(event: &PlayerEvent) -> Option<String> {
    let line = match event {
        PlayerEvent::PhaseChanged(phase) => format!("[{}]", format_phase(*phase)),
        PlayerEvent::Position(_) => return None,
        PlayerEvent::RegionChanged(region) => format!("region {}", format_region(region)),
        PlayerEvent::SourceChanged(locator) => format!("source {}", locator.bold()),
        PlayerEvent::SettingsChanged(settings) => format!(
            "rate {:.2}x  volume {:.0}%  loop {}",
            settings.rate,
            settings.volume * 100.0,
            if settings.looping { "on" } else { "off" }
        ),
        PlayerEvent::Ready { duration } => {
            format!("{} ({})", "ready".green(), format_time(*duration))
        }
        PlayerEvent::DecodeFailed { locator, message } => {
            format!("Error: could not decode {}: {}", locator, message)
                .red()
                .to_string()
        }
        PlayerEvent::ProcessingFailed { message } => {
            format!("Error: {}", message).red().to_string()
        }
        PlayerEvent::StaleNotification { locator } => format!("ignored late result {}", locator)
            .dimmed()
            .to_string(),
        PlayerEvent::RejectedNotification => {
            "ignored processed notification without a file"
                .dimmed()
                .to_string()
        }
    };
    Some(line)
}

/// Print an event to stderr.
pub fn render_event(event: &PlayerEvent) {
    if let Some(line) = format_event(event) {
        eprintln!("{}", line);
    }
}

/// Multi-line status block.
pub fn format_status(snapshot: &PlayerSnapshot, tuner: Option<&TunerSnapshot>) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "source:   {}",
        snapshot.source.as_deref().unwrap_or("(none)")
    ));
    lines.push(format!(
        "state:    {}  {} / {}",
        format_phase(snapshot.phase),
        format_time(snapshot.position),
        if snapshot.region.duration() > 0.0 {
            format_time(snapshot.region.duration())
        } else {
            "?".to_string()
        }
    ));
    lines.push(format!("region:   {}", format_region(&snapshot.region)));
    lines.push(format!(
        "settings: rate {:.2}x  volume {:.0}%  loop {}",
        snapshot.settings.rate,
        snapshot.settings.volume * 100.0,
        if snapshot.settings.looping { "on" } else { "off" }
    ));
    if let Some(error) = &snapshot.decode_error {
        lines.push(format!("error:    {}", error.red()));
    }
    if let Some(tuner) = tuner {
        let params: Vec<String> = tuner
            .values
            .iter()
            .map(|(param, value)| format!("{}={}", param, value))
            .collect();
        lines.push(format!(
            "tuner:    {}  {}",
            tuner.processing_type.cyan(),
            params.join(" ")
        ));
        if let Some(token) = tuner.in_flight {
            lines.push(format!("          request {} in flight", token));
        }
    }
    lines.join("\n")
}

/// Format an error. Recoverable ones are warnings: the session keeps going.
pub fn format_error(error: &LitlistenError) -> String {
    if error.is_recoverable() {
        format!("Warning: {}", error).yellow().to_string()
    } else {
        format!("Error: {}", error).red().to_string()
    }
}

/// Print a session report. Swaps are already visible through player events.
pub fn render_report(report: &SessionReport) {
    match report {
        SessionReport::Status { player, tuner } => {
            println!("{}", format_status(player, Some(tuner)))
        }
        SessionReport::Submitted {
            token,
            processing_type,
        } => eprintln!("{} {} request {}", "→".cyan(), processing_type, token),
        SessionReport::Swap(SwapOutcome::Swapped) => {}
        SessionReport::Swap(outcome) => log::debug!(target: "session", "swap {:?}", outcome),
        SessionReport::Error(e) => eprintln!("{}", format_error(e)),
    }
}
