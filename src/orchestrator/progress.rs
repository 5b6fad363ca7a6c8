//! Translation of raw extractor callbacks into run events

use crate::extractor::{ProgressTick, TickStatus};
use crate::orchestrator::messages::RunEvent;
use crate::orchestrator::request::AudioFormat;

/// Parse a library percentage string such as `" 42.5%"`. Anything
/// unparseable counts as 0 rather than failing the run.
pub fn parse_percent(raw: &str) -> f64 {
    raw.trim()
        .trim_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Map one callback onto a `Progress` event.
///
/// The `Error` status is advisory; the retry loop decides on failures from
/// the error `fetch` returns.
pub fn translate_tick(tick: &ProgressTick, format: AudioFormat) -> RunEvent {
    match tick.status {
        TickStatus::Downloading => RunEvent::progress(
            format!("Downloading... {} at {}", tick.percent.trim(), tick.speed.trim()),
            parse_percent(&tick.percent),
        ),
        TickStatus::Finished => RunEvent::progress(
            format!(
                "Download complete. Converting to {}...",
                format.as_str().to_uppercase()
            ),
            100.0,
        ),
        TickStatus::Error => RunEvent::progress("Error occurred, retrying...", 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent("42.5%"), 42.5);
        assert_eq!(parse_percent("  7.0%"), 7.0);
        assert_eq!(parse_percent("100%"), 100.0);
        assert_eq!(parse_percent("N/A"), 0.0);
        assert_eq!(parse_percent(""), 0.0);
        assert_eq!(parse_percent("NaN%"), 0.0);
    }

    #[test]
    fn test_translate_downloading() {
        let event = translate_tick(
            &ProgressTick::downloading(" 12.5%", "1.23MiB/s"),
            AudioFormat::Mp3,
        );
        assert_eq!(
            event,
            RunEvent::progress("Downloading... 12.5% at 1.23MiB/s", 12.5)
        );
    }

    #[test]
    fn test_translate_finished_and_error() {
        assert_eq!(
            translate_tick(&ProgressTick::finished(), AudioFormat::Flac),
            RunEvent::progress("Download complete. Converting to FLAC...", 100.0)
        );
        assert_eq!(
            translate_tick(&ProgressTick::error(), AudioFormat::Mp3),
            RunEvent::progress("Error occurred, retrying...", 0.0)
        );
    }
}
