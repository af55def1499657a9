//! Driver for the desktop transcription application.
//!
//! The application exposes no API: it is driven as a sequence of scripted
//! input steps (stage the audio path on the clipboard, paste it into the
//! file dialog, queue the job) followed by a fixed-interval wait loop for
//! completion. Retrieval prefers the application's copy-to-clipboard
//! button; the fallback reads the newest transcript file from the
//! application's output directory.

use log::{info, warn};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant, SystemTime};

use crate::bridge::{CommandExecutor, InputBridge, KeyCombo};
use crate::config::AsrConfig;
use crate::defaults;
use crate::engine::stabilize::CancelToken;
use crate::error::{Result, S2tsError};

/// Result of one transcription run.
#[derive(Debug, Clone)]
pub struct AsrOutcome {
    pub text: String,
    pub elapsed: Duration,
}

/// Scripted driver for one transcription job.
pub struct AsrDriver<'a, E: CommandExecutor> {
    bridge: &'a InputBridge<E>,
    exe: PathBuf,
    output_dir: Option<PathBuf>,
    queue_button: Option<(i32, i32)>,
    copy_button: Option<(i32, i32)>,
    settle: Duration,
    completion_timeout: Duration,
    poll_interval: Duration,
}

impl<'a, E: CommandExecutor> AsrDriver<'a, E> {
    pub fn from_config(bridge: &'a InputBridge<E>, config: &AsrConfig) -> Result<Self> {
        let exe = config.exe.clone().ok_or_else(|| S2tsError::ConfigInvalidValue {
            key: "asr.exe".to_string(),
            message: "transcription application path not configured".to_string(),
        })?;
        Ok(Self {
            bridge,
            exe,
            output_dir: config.output_dir.clone(),
            queue_button: config.queue_button,
            copy_button: config.copy_button,
            settle: defaults::PAGE_READY_DELAY,
            completion_timeout: Duration::from_secs(config.completion_timeout_secs),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        })
    }

    /// Override the post-launch settle delay.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Run one transcription job to completion (or deadline).
    ///
    /// The surface is torn down on every exit path; teardown failures are
    /// logged and swallowed.
    pub fn run(&self, audio_path: &Path, cancel: &CancelToken) -> Result<AsrOutcome> {
        let started = Instant::now();
        let started_wall = SystemTime::now();

        let mut child = Command::new(&self.exe)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| S2tsError::Launch {
                address: self.exe.display().to_string(),
                message: e.to_string(),
            })?;
        std::thread::sleep(self.settle);

        let result = self.queue_and_wait(audio_path, started_wall, cancel);
        teardown(&mut child);

        let text = result?;
        let elapsed = started.elapsed();
        info!("transcription finished in {:.1}s ({} chars)", elapsed.as_secs_f32(), text.len());
        Ok(AsrOutcome { text, elapsed })
    }

    fn queue_and_wait(
        &self,
        audio_path: &Path,
        started_wall: SystemTime,
        cancel: &CancelToken,
    ) -> Result<String> {
        // Stage the audio path into the application's file dialog. The path
        // stays on the clipboard until a copy button is actually pressed, so
        // retrieval below must never accept it as a transcript.
        let staged = audio_path.display().to_string();
        self.bridge.copy_to_clipboard(&staged)?;
        self.bridge.send_keys(KeyCombo::Paste);
        std::thread::sleep(defaults::COPY_SETTLE);
        self.bridge.send_keys(KeyCombo::Submit);
        std::thread::sleep(defaults::CLIPBOARD_SETTLE);

        // Queue the job.
        match self.queue_button {
            Some((x, y)) => self.bridge.click(x, y),
            None => self.bridge.send_keys(KeyCombo::Submit),
        }
        info!("transcription job queued for {}", audio_path.display());

        let deadline = Instant::now() + self.completion_timeout;
        while Instant::now() < deadline {
            if cancel.is_cancelled() {
                return Err(S2tsError::Asr {
                    message: "transcription cancelled".to_string(),
                });
            }

            // Primary retrieval: the application's copy-to-clipboard button.
            // Until transcription finishes the click is a no-op and the
            // clipboard still holds the staged audio path; only fresh content
            // counts as a transcript.
            if let Some((x, y)) = self.copy_button {
                self.bridge.click(x, y);
                std::thread::sleep(defaults::COPY_SETTLE);
                let text = self.bridge.read_clipboard();
                let text = text.trim();
                if !text.is_empty() && text != staged {
                    return Ok(text.to_string());
                }
            }

            // Fallback: a transcript file written after we started.
            if let Some(dir) = &self.output_dir
                && let Some(path) = latest_transcript(dir)
                && file_modified_after(&path, started_wall)
            {
                let text = std::fs::read_to_string(&path)?;
                return Ok(text.trim().to_string());
            }

            std::thread::sleep(self.poll_interval);
        }

        // Deadline: take the newest transcript regardless of age rather
        // than returning nothing.
        if let Some(dir) = &self.output_dir
            && let Some(path) = latest_transcript(dir)
        {
            warn!("transcription deadline reached, using newest output file {}", path.display());
            let text = std::fs::read_to_string(&path)?;
            return Ok(text.trim().to_string());
        }

        Err(S2tsError::Asr {
            message: "no transcript produced before deadline".to_string(),
        })
    }
}

fn teardown(child: &mut Child) {
    match child.kill() {
        Ok(()) => {
            if let Err(e) = child.wait() {
                warn!("wait on transcription surface failed: {}", e);
            }
        }
        Err(e) => warn!("closing transcription surface failed: {}", e),
    }
}

/// Newest `.txt` under the output directory, one subdirectory deep (the
/// application writes one folder per job).
///
/// Modification-time ordering assumes the newest file belongs to our job;
/// under concurrent unrelated jobs this can pick the wrong file. Known
/// limitation, inherited behavior.
pub fn latest_transcript(dir: &Path) -> Option<PathBuf> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    let mut consider = |path: PathBuf| {
        if path.extension().is_some_and(|ext| ext == "txt")
            && let Ok(meta) = path.metadata()
            && let Ok(modified) = meta.modified()
            && newest.as_ref().is_none_or(|(t, _)| modified > *t)
        {
            newest = Some((modified, path));
        }
    };

    for entry in std::fs::read_dir(dir).ok()?.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if let Ok(children) = std::fs::read_dir(&path) {
                for child in children.flatten() {
                    consider(child.path());
                }
            }
        } else {
            consider(path);
        }
    }
    newest.map(|(_, path)| path)
}

fn file_modified_after(path: &Path, reference: SystemTime) -> bool {
    path.metadata()
        .and_then(|m| m.modified())
        .map(|t| t >= reference)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    /// Simulates the transcription surface: the staged path sits on the
    /// clipboard until enough copy-button clicks have landed, then the
    /// clipboard holds the transcript.
    struct TranscribingExecutor {
        clipboard: Mutex<String>,
        clicks: Mutex<u32>,
        ready_after_clicks: u32,
        transcript: &'static str,
    }

    impl TranscribingExecutor {
        fn new(ready_after_clicks: u32, transcript: &'static str) -> Self {
            Self {
                clipboard: Mutex::new(String::new()),
                clicks: Mutex::new(0),
                ready_after_clicks,
                transcript,
            }
        }
    }

    impl CommandExecutor for TranscribingExecutor {
        fn execute(&self, command: &str, args: &[&str]) -> Result<String> {
            match command {
                "wl-copy" => {
                    *self.clipboard.lock().expect("poisoned") = args[0].to_string();
                    Ok(String::new())
                }
                "wl-paste" => Ok(self.clipboard.lock().expect("poisoned").clone()),
                "ydotool" if args[0] == "click" => {
                    let mut clicks = self.clicks.lock().expect("poisoned");
                    *clicks += 1;
                    if *clicks >= self.ready_after_clicks {
                        *self.clipboard.lock().expect("poisoned") = self.transcript.to_string();
                    }
                    Ok(String::new())
                }
                _ => Ok(String::new()),
            }
        }
    }

    fn fast_driver<'a, E: CommandExecutor>(
        bridge: &'a InputBridge<E>,
        timeout_secs: u64,
    ) -> AsrDriver<'a, E> {
        let config = AsrConfig {
            exe: Some(PathBuf::from("/bin/sleep")),
            copy_button: Some((400, 300)),
            completion_timeout_secs: timeout_secs,
            poll_interval_secs: 0,
            ..AsrConfig::default()
        };
        AsrDriver::from_config(bridge, &config)
            .expect("driver builds")
            .with_settle(Duration::ZERO)
    }

    #[test]
    fn staged_audio_path_is_never_accepted_as_transcript() {
        // Transcription finishes after the second retrieval click; until
        // then the clipboard still holds the staged audio path.
        let executor = TranscribingExecutor::new(2, "நல்ல பதிவு");
        let bridge = InputBridge::new(executor, "/tmp/s2ts-asr-shots");
        let driver = fast_driver(&bridge, 30);

        let outcome = driver
            .run(Path::new("/recordings/talk.wav"), &CancelToken::new())
            .expect("transcript retrieved");
        assert_eq!(outcome.text, "நல்ல பதிவு");
    }

    #[test]
    fn unfinished_job_errors_instead_of_returning_audio_path() {
        // The copy button never produces a transcript; the clipboard holds
        // the staged path for the whole run.
        let executor = TranscribingExecutor::new(u32::MAX, "never ready");
        let bridge = InputBridge::new(executor, "/tmp/s2ts-asr-shots");
        let driver = fast_driver(&bridge, 1);

        let err = driver
            .run(Path::new("/recordings/talk.wav"), &CancelToken::new())
            .expect_err("no transcript before deadline");
        assert!(matches!(err, S2tsError::Asr { .. }));
    }

    #[test]
    fn latest_transcript_prefers_newest_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let older = dir.path().join("first.txt");
        fs::write(&older, "old").expect("write");
        std::thread::sleep(Duration::from_millis(20));
        let newer = dir.path().join("second.txt");
        fs::write(&newer, "new").expect("write");

        assert_eq!(latest_transcript(dir.path()), Some(newer));
    }

    #[test]
    fn latest_transcript_descends_into_job_folders() {
        let dir = tempfile::tempdir().expect("tempdir");
        let job = dir.path().join("job-1");
        fs::create_dir(&job).expect("mkdir");
        let transcript = job.join("result.txt");
        fs::write(&transcript, "text").expect("write");

        assert_eq!(latest_transcript(dir.path()), Some(transcript));
    }

    #[test]
    fn latest_transcript_ignores_non_txt() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("audio.wav"), "not text").expect("write");
        assert_eq!(latest_transcript(dir.path()), None);
    }

    #[test]
    fn latest_transcript_missing_dir_is_none() {
        assert_eq!(latest_transcript(Path::new("/nonexistent/out")), None);
    }

    #[test]
    fn driver_requires_configured_exe() {
        let bridge = InputBridge::new(crate::bridge::SystemCommandExecutor::new(), "/tmp/shots");
        let config = AsrConfig::default();
        assert!(AsrDriver::from_config(&bridge, &config).is_err());
    }
}
