//! Default configuration constants for s2ts.
//!
//! This module provides shared constants used across different configuration
//! types to ensure consistency and eliminate duplication.

use std::time::Duration;

/// Default delay after launching a target surface before interacting with it.
///
/// Browser-hosted engines need several seconds to load, render the input box
/// and (when already authenticated) restore the previous conversation view.
pub const PAGE_READY_DELAY: Duration = Duration::from_secs(10);

/// Default overall deadline for one response, measured from submission.
///
/// Long-form translations of a full transcript can stream for minutes; three
/// minutes bounds the worst case without abandoning slow engines too early.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(180);

/// Default interval between capture polls while waiting for a response.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(1200);

/// Default warm-up interval between submission and the first capture poll.
///
/// Absorbs the input echo and initial render lag; polling earlier only
/// captures the outbound message reflected back by the page.
pub const WARMUP_DELAY: Duration = Duration::from_secs(8);

/// Default minimum elapsed time before a response may be accepted.
///
/// Guards against accepting a placeholder or a truncated first render before
/// generation has genuinely started streaming.
pub const MIN_STREAM_TIME: Duration = Duration::from_secs(6);

/// Default number of consecutive unchanged polls required for acceptance.
pub const STABLE_ROUNDS: u32 = 3;

/// Default duration without any content change after which a response is
/// accepted even below the round quorum.
///
/// Handles engines with slow or irregular render cadence where consecutive
/// identical polls are rare.
pub const STALE_AFTER: Duration = Duration::from_secs(10);

/// Default pause after writing the outbound message to the clipboard.
pub const CLIPBOARD_SETTLE: Duration = Duration::from_secs(2);

/// Default pause between pasting the outbound message and submitting it.
///
/// Large pastes take the page a moment to ingest; submitting immediately can
/// send a truncated message.
pub const PASTE_SETTLE: Duration = Duration::from_secs(5);

/// Default pause after clicking a copy button before reading the clipboard.
pub const COPY_SETTLE: Duration = Duration::from_millis(250);

/// Default deadline for the desktop transcription application to finish one
/// job. Transcription of long recordings is slow; two hours bounds it.
pub const ASR_COMPLETION_TIMEOUT: Duration = Duration::from_secs(7200);

/// Default interval between completion checks on the transcription surface.
pub const ASR_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default sample rate for synthesized audio output.
pub const TTS_SAMPLE_RATE: u32 = 24_000;

/// Default interval between resource monitor samples.
pub const MONITOR_INTERVAL: Duration = Duration::from_secs(5);

/// Subdirectory (under the data dir) where debug screenshots are written.
pub const SCREENSHOT_DIR: &str = "debug_screenshots";

/// Default instruction prompt for the text-cleanup stage.
pub const DEFAULT_CORRECTOR_PROMPT: &str = "You are a meticulous Tamil copy-editor for ASR output. \
     Fix mishears, punctuation, casing, numerals, and spacing. \
     Do NOT add or omit meaning. Return only cleaned Tamil text.";

/// Default instruction prompt for the translation stage.
pub const DEFAULT_TRANSLATOR_PROMPT: &str = "You are a professional translator. Translate the following **Tamil** text to the target language. \
     Use natural register, preserve proper nouns, avoid code-mixing, and return only the translation.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_stream_time_below_response_timeout() {
        assert!(MIN_STREAM_TIME < RESPONSE_TIMEOUT);
    }

    #[test]
    fn stale_after_exceeds_sample_interval() {
        // The stale branch must span several polls, or it would fire on the
        // first unchanged sample.
        assert!(STALE_AFTER > SAMPLE_INTERVAL * STABLE_ROUNDS);
    }
}
