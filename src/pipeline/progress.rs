//! Stage progress events.
//!
//! Stage logic never touches UI state directly: it emits `StageEvent`s into
//! an `EventSink` the orchestrator's owner subscribes to. This replaces
//! callback parameters threaded through every stage function with a single
//! observer seam.

use crossbeam_channel::Sender;
use log::info;
use std::fmt;
use std::time::Duration;

/// Pipeline stage identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Asr,
    Clean,
    Translate,
    Tts,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Asr => "ASR",
            Stage::Clean => "Clean",
            Stage::Translate => "Translate",
            Stage::Tts => "TTS",
        };
        write!(f, "{}", name)
    }
}

/// One progress update from a running stage.
#[derive(Debug, Clone)]
pub struct StageEvent {
    pub stage: Stage,
    /// 0–100.
    pub percent: u8,
    pub message: String,
}

impl StageEvent {
    pub fn new(stage: Stage, percent: u8, message: impl Into<String>) -> Self {
        Self {
            stage,
            percent: percent.min(100),
            message: message.into(),
        }
    }
}

/// Observer for stage progress. Implementations must not block: emitting an
/// event happens inside stage timing loops.
pub trait EventSink: Send {
    fn emit(&self, event: StageEvent);
}

/// Discards all events.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: StageEvent) {}
}

/// Forwards events to the log.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: StageEvent) {
        info!("[{}] {}% {}", event.stage, event.percent, event.message);
    }
}

/// Forwards events into a channel (for a UI thread). Send failures are
/// ignored — a departed subscriber must not stall the pipeline.
pub struct ChannelSink {
    tx: Sender<StageEvent>,
}

impl ChannelSink {
    pub fn new(tx: Sender<StageEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: StageEvent) {
        let _ = self.tx.try_send(event);
    }
}

/// Format an elapsed duration for progress messages: `42s`, `3m 20s`,
/// `1h 4m 5s`.
pub fn secfmt(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    if total < 60 {
        return format!("{}s", total);
    }
    let (mins, secs) = (total / 60, total % 60);
    if mins < 60 {
        return format!("{}m {}s", mins, secs);
    }
    let (hours, mins) = (mins / 60, mins % 60);
    format!("{}h {}m {}s", hours, mins, secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn secfmt_formats_each_magnitude() {
        assert_eq!(secfmt(Duration::from_secs(42)), "42s");
        assert_eq!(secfmt(Duration::from_secs(200)), "3m 20s");
        assert_eq!(secfmt(Duration::from_secs(3845)), "1h 4m 5s");
        assert_eq!(secfmt(Duration::ZERO), "0s");
    }

    #[test]
    fn percent_is_clamped() {
        let event = StageEvent::new(Stage::Tts, 250, "overflow");
        assert_eq!(event.percent, 100);
    }

    #[test]
    fn channel_sink_delivers_events() {
        let (tx, rx) = unbounded();
        let sink = ChannelSink::new(tx);
        sink.emit(StageEvent::new(Stage::Asr, 50, "halfway"));
        let event = rx.try_recv().expect("event delivered");
        assert_eq!(event.stage, Stage::Asr);
        assert_eq!(event.percent, 50);
    }

    #[test]
    fn channel_sink_survives_dropped_receiver() {
        let (tx, rx) = unbounded();
        drop(rx);
        let sink = ChannelSink::new(tx);
        sink.emit(StageEvent::new(Stage::Clean, 10, "nobody listening"));
    }
}
