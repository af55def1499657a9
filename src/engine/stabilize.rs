//! Response stabilization: deciding when a UI-rendered text stream is done.
//!
//! The target surfaces expose no API and no completion signal — text streams
//! into a page and the only observable is repeated clipboard capture. This
//! module infers completion from *absence of change* over a quorum of
//! samples, with a minimum elapsed-time floor so an empty or placeholder
//! render is never accepted as final.
//!
//! The engine never fails: it resolves to `Stabilized`, or degrades to
//! `TimedOut`/`Cancelled` carrying the best text observed so far.

use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::defaults;

/// Timing knobs for one stabilization run.
#[derive(Debug, Clone)]
pub struct StabilizeConfig {
    /// Wait between submission and the first capture poll.
    pub warmup: Duration,
    /// Interval between capture polls.
    pub sample_interval: Duration,
    /// Minimum elapsed time since submission before any acceptance.
    pub min_stream_time: Duration,
    /// Consecutive unchanged polls required for quorum acceptance.
    pub stable_rounds: u32,
    /// Accept after this long without any content change, even below quorum.
    pub stale_after: Duration,
    /// Overall deadline measured from submission.
    pub response_timeout: Duration,
}

impl Default for StabilizeConfig {
    fn default() -> Self {
        Self {
            warmup: defaults::WARMUP_DELAY,
            sample_interval: defaults::SAMPLE_INTERVAL,
            min_stream_time: defaults::MIN_STREAM_TIME,
            stable_rounds: defaults::STABLE_ROUNDS,
            stale_after: defaults::STALE_AFTER,
            response_timeout: defaults::RESPONSE_TIMEOUT,
        }
    }
}

/// How a stabilization run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The observed reply converged.
    Stabilized,
    /// The deadline elapsed; `final_text` is the best partial observation.
    TimedOut,
    /// Cancellation was requested; `final_text` is the best partial observation.
    Cancelled,
}

/// Result of one stabilization run. Produced once per session send.
#[derive(Debug, Clone)]
pub struct StabilizationResult {
    pub final_text: String,
    pub elapsed: Duration,
    pub outcome: Outcome,
}

/// Cooperative cancellation flag, checked at every poll iteration and every
/// sleep boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// SHA-256 digest of candidate text, used for cheap change detection.
fn content_digest(text: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.finalize().into()
}

/// Sleep for `duration`, waking early if cancellation is requested.
/// Returns false when the sleep was interrupted by cancellation.
fn sleep_unless_cancelled(duration: Duration, cancel: &CancelToken) -> bool {
    const SLICE: Duration = Duration::from_millis(100);
    let until = Instant::now() + duration;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= until {
            return true;
        }
        std::thread::sleep((until - now).min(SLICE));
    }
}

/// Poll `poll_fn` until the observed reply converges, the deadline passes or
/// cancellation is requested.
///
/// `poll_fn()` performs one capture-and-extract cycle and returns a candidate
/// reply (possibly empty). `sent_blob` is the exact outbound message; a
/// candidate identical to it is the page echoing the input back and counts
/// as "no new content yet", as does an empty candidate.
///
/// Acceptance requires the minimum stream time to have elapsed AND either
/// the unchanged-poll quorum to be reached or no content change for the
/// stale window. On acceptance and on timeout alike, the returned text is
/// the longest candidate observed across the whole run — a later transient
/// shorter render never displaces an earlier longer one.
pub fn stabilize<F>(
    config: &StabilizeConfig,
    sent_blob: &str,
    mut poll_fn: F,
    cancel: &CancelToken,
) -> StabilizationResult
where
    F: FnMut() -> String,
{
    let started = Instant::now();
    let deadline = started + config.response_timeout;

    let mut best_seen = String::new();
    let mut last_digest: Option<[u8; 32]> = None;
    let mut stable_count: u32 = 0;
    let mut last_change = Instant::now();

    // Absorb input echo and initial render lag before the first poll.
    if !sleep_unless_cancelled(config.warmup, cancel) {
        return cancelled_result(best_seen, started);
    }

    while Instant::now() < deadline {
        if cancel.is_cancelled() {
            return cancelled_result(best_seen, started);
        }

        let candidate = poll_fn();

        if candidate.is_empty() || candidate == sent_blob {
            // No new content yet (failed capture or self-echo). Leave the
            // stability counters untouched.
            debug!("poll yielded no new content");
            if !sleep_unless_cancelled(config.sample_interval, cancel) {
                return cancelled_result(best_seen, started);
            }
            continue;
        }

        // Longest-observed-wins: streaming UIs grow text incrementally, and
        // a later poll can catch a transient shorter render mid-repaint.
        if candidate.len() > best_seen.len() {
            best_seen = candidate.clone();
        }

        let digest = content_digest(&candidate);
        if last_digest == Some(digest) {
            stable_count += 1;
        } else {
            stable_count = 0;
            last_digest = Some(digest);
            last_change = Instant::now();
        }

        let elapsed = started.elapsed();
        let quorum_reached = stable_count >= config.stable_rounds;
        let gone_stale = last_change.elapsed() > config.stale_after;
        debug!(
            "poll: {} chars, stable {}/{}, {:.1}s since last change",
            candidate.len(),
            stable_count,
            config.stable_rounds,
            last_change.elapsed().as_secs_f32()
        );

        // Both branches sit behind the minimum stream time: without the
        // floor, the stale branch can accept a placeholder before the
        // engine has genuinely started streaming.
        if elapsed >= config.min_stream_time && (quorum_reached || gone_stale) {
            info!(
                "response stabilized after {:.1}s ({} chars)",
                elapsed.as_secs_f32(),
                best_seen.len()
            );
            return StabilizationResult {
                final_text: best_seen,
                elapsed,
                outcome: Outcome::Stabilized,
            };
        }

        if !sleep_unless_cancelled(config.sample_interval, cancel) {
            return cancelled_result(best_seen, started);
        }
    }

    let elapsed = started.elapsed();
    warn!(
        "response deadline reached after {:.1}s, returning best seen ({} chars)",
        elapsed.as_secs_f32(),
        best_seen.len()
    );
    StabilizationResult {
        final_text: best_seen,
        elapsed,
        outcome: Outcome::TimedOut,
    }
}

fn cancelled_result(best_seen: String, started: Instant) -> StabilizationResult {
    info!("stabilization cancelled, returning best seen");
    StabilizationResult {
        final_text: best_seen,
        elapsed: started.elapsed(),
        outcome: Outcome::Cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Poll function replaying a fixed script; repeats the last entry once
    /// the script is exhausted.
    fn scripted(entries: &[&str]) -> impl FnMut() -> String {
        let entries: Vec<String> = entries.iter().map(|s| s.to_string()).collect();
        let mut index = 0;
        move || {
            let value = entries
                .get(index)
                .or_else(|| entries.last())
                .cloned()
                .unwrap_or_default();
            index += 1;
            value
        }
    }

    /// Instant-resolution config for scripted tests.
    fn fast_config() -> StabilizeConfig {
        StabilizeConfig {
            warmup: Duration::ZERO,
            sample_interval: Duration::ZERO,
            min_stream_time: Duration::ZERO,
            stable_rounds: 3,
            stale_after: Duration::from_secs(3600),
            response_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn stabilizes_after_quorum_of_unchanged_polls() {
        let config = fast_config();
        let result = stabilize(&config, "sent", scripted(&["", "ab", "ab", "ab"]), &CancelToken::new());
        assert_eq!(result.outcome, Outcome::Stabilized);
        assert_eq!(result.final_text, "ab");
    }

    #[test]
    fn quorum_counts_only_consecutive_unchanged_polls() {
        let config = fast_config();
        let mut polls = 0;
        let script = ["a", "ab", "abc", "abc", "abc", "abc"];
        let result = stabilize(
            &config,
            "sent",
            || {
                let value = script[polls.min(script.len() - 1)].to_string();
                polls += 1;
                value
            },
            &CancelToken::new(),
        );
        assert_eq!(result.outcome, Outcome::Stabilized);
        assert_eq!(result.final_text, "abc");
        // "abc" first seen at poll 3; three unchanged polls follow.
        assert_eq!(polls, 6);
    }

    #[test]
    fn never_repeating_sequence_times_out_with_longest_candidate() {
        let config = StabilizeConfig {
            response_timeout: Duration::from_millis(200),
            sample_interval: Duration::from_millis(10),
            ..fast_config()
        };
        let mut n = 0;
        let result = stabilize(
            &config,
            "sent",
            || {
                n += 1;
                "x".repeat(n)
            },
            &CancelToken::new(),
        );
        assert_eq!(result.outcome, Outcome::TimedOut);
        assert_eq!(result.final_text, "x".repeat(n));
        assert!(result.elapsed >= config.response_timeout);
    }

    #[test]
    fn best_seen_keeps_longer_observation_over_newer_shorter_one() {
        let config = StabilizeConfig {
            response_timeout: Duration::from_millis(100),
            sample_interval: Duration::from_millis(5),
            stable_rounds: 1000, // never reached; force timeout
            ..fast_config()
        };
        let result = stabilize(&config, "sent", scripted(&["hello", "hi"]), &CancelToken::new());
        assert_eq!(result.outcome, Outcome::TimedOut);
        assert_eq!(result.final_text, "hello");
    }

    #[test]
    fn acceptance_returns_best_seen_not_latest_candidate() {
        // "hello" streams in, then the page repaints to a shorter "hi" which
        // stabilizes. The longer observation still wins.
        let config = fast_config();
        let result = stabilize(
            &config,
            "sent",
            scripted(&["hello", "hi", "hi", "hi", "hi"]),
            &CancelToken::new(),
        );
        assert_eq!(result.outcome, Outcome::Stabilized);
        assert_eq!(result.final_text, "hello");
    }

    #[test]
    fn empty_polls_do_not_advance_stability() {
        let config = fast_config();
        let result = stabilize(
            &config,
            "sent",
            scripted(&["ab", "", "ab", "", "ab", "", "ab"]),
            &CancelToken::new(),
        );
        // Empty polls are skipped entirely; the "ab" runs still converge.
        assert_eq!(result.outcome, Outcome::Stabilized);
        assert_eq!(result.final_text, "ab");
    }

    #[test]
    fn self_echo_is_treated_as_no_content() {
        let config = StabilizeConfig {
            response_timeout: Duration::from_millis(100),
            sample_interval: Duration::from_millis(5),
            ..fast_config()
        };
        let result = stabilize(&config, "the outbound message", scripted(&["the outbound message"]), &CancelToken::new());
        // Echo never counts as a reply: nothing observed, timeout with empty text.
        assert_eq!(result.outcome, Outcome::TimedOut);
        assert_eq!(result.final_text, "");
    }

    #[test]
    fn min_stream_time_defers_early_acceptance() {
        let config = StabilizeConfig {
            min_stream_time: Duration::from_millis(80),
            sample_interval: Duration::from_millis(10),
            stable_rounds: 1,
            response_timeout: Duration::from_secs(5),
            ..fast_config()
        };
        let started = Instant::now();
        let result = stabilize(&config, "sent", scripted(&["ok", "ok", "ok"]), &CancelToken::new());
        assert_eq!(result.outcome, Outcome::Stabilized);
        assert!(started.elapsed() >= config.min_stream_time);
    }

    #[test]
    fn stale_branch_accepts_without_quorum() {
        let config = StabilizeConfig {
            stale_after: Duration::from_millis(50),
            sample_interval: Duration::from_millis(10),
            stable_rounds: 1000,
            response_timeout: Duration::from_secs(5),
            ..fast_config()
        };
        // Quorum is unreachable; the stale window is what accepts it.
        let result = stabilize(&config, "sent", scripted(&["done"]), &CancelToken::new());
        assert_eq!(result.outcome, Outcome::Stabilized);
        assert_eq!(result.final_text, "done");
    }

    #[test]
    fn cancellation_interrupts_warmup() {
        let config = StabilizeConfig {
            warmup: Duration::from_secs(60),
            ..fast_config()
        };
        let cancel = CancelToken::new();
        cancel.cancel();
        let started = Instant::now();
        let result = stabilize(&config, "sent", scripted(&["never polled"]), &cancel);
        assert_eq!(result.outcome, Outcome::Cancelled);
        assert_eq!(result.final_text, "");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn cancellation_mid_run_returns_best_seen() {
        let config = StabilizeConfig {
            sample_interval: Duration::from_millis(10),
            stable_rounds: 1000,
            response_timeout: Duration::from_secs(60),
            ..fast_config()
        };
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let mut polls = 0;
        let result = stabilize(
            &config,
            "sent",
            move || {
                polls += 1;
                if polls == 3 {
                    trigger.cancel();
                }
                format!("partial {}", polls)
            },
            &cancel,
        );
        assert_eq!(result.outcome, Outcome::Cancelled);
        assert_eq!(result.final_text, "partial 3");
    }

    #[test]
    fn digest_differs_for_different_text() {
        assert_ne!(content_digest("a"), content_digest("b"));
        assert_eq!(content_digest("same"), content_digest("same"));
    }
}
