//! Engine sessions: one exclusive, single-use interaction against a target
//! surface.
//!
//! A session launches the surface (browser at a URL, or an executable),
//! composes and submits one outbound message, runs the stabilization engine
//! over repeated captures, and tears the surface down. Teardown runs on
//! every exit path — explicitly on success and failure, and from `Drop` if
//! a panic unwinds through the interaction.
//!
//! Screen/input focus is process-global: two live automation surfaces would
//! fight over the same clipboard and input stream. A global lock held for
//! the lifetime of an Active session enforces "at most one at a time".

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::bridge::{CommandExecutor, InputBridge, KeyCombo};
use crate::defaults;
use crate::engine::extract::extract_reply;
use crate::engine::stabilize::{CancelToken, StabilizationResult, StabilizeConfig, stabilize};
use crate::error::{Result, S2tsError};

/// Serialized focus: while one session is Active, no other automation may
/// touch the screen, keyboard or clipboard.
static FOCUS_LOCK: Mutex<()> = Mutex::new(());

/// Configuration identifying one externally driven automation surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineTarget {
    /// URL opened via `launcher`, or a path executed directly when no
    /// launcher is set.
    pub address: String,
    /// Whether the surface expects an already-authenticated profile.
    #[serde(default = "default_requires_auth")]
    pub requires_auth: bool,
    /// Screen coordinates of the surface's copy-reply button, if it has one.
    #[serde(default)]
    pub copy_button: Option<(i32, i32)>,
    /// Command used to open `address` (typically a browser executable).
    #[serde(default)]
    pub launcher: Option<String>,
}

fn default_requires_auth() -> bool {
    true
}

/// Timed waits around one interaction. All suspension points in a session
/// are deliberate sleeps; none are event-driven.
#[derive(Debug, Clone)]
pub struct SessionTiming {
    /// Settle delay after launching the surface.
    pub page_ready: Duration,
    /// Pause after staging the outbound message on the clipboard.
    pub clipboard_settle: Duration,
    /// Pause between pasting and submitting.
    pub paste_settle: Duration,
    /// Pause between a copy action and the clipboard read.
    pub copy_settle: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            page_ready: defaults::PAGE_READY_DELAY,
            clipboard_settle: defaults::CLIPBOARD_SETTLE,
            paste_settle: defaults::PASTE_SETTLE,
            copy_settle: defaults::COPY_SETTLE,
        }
    }
}

/// Capability interface for capturing the rendered reply of a live surface.
///
/// Coordinate-based capture is brittle; keeping it behind this seam lets
/// alternate strategies (accessibility tree, browser extension) replace it
/// without touching the stabilization engine.
pub trait Surface {
    /// Capture the surface's current reply text. Empty string on failure.
    fn copy_reply(&mut self) -> String;
}

/// Clipboard-driven capture: click the surface's copy button when it has
/// one, fall back to select-all + copy when the button yields nothing.
pub struct ClipboardSurface<'a, E: CommandExecutor> {
    bridge: &'a InputBridge<E>,
    copy_button: Option<(i32, i32)>,
    copy_settle: Duration,
}

impl<'a, E: CommandExecutor> ClipboardSurface<'a, E> {
    pub fn new(
        bridge: &'a InputBridge<E>,
        copy_button: Option<(i32, i32)>,
        copy_settle: Duration,
    ) -> Self {
        Self {
            bridge,
            copy_button,
            copy_settle,
        }
    }
}

impl<E: CommandExecutor> Surface for ClipboardSurface<'_, E> {
    fn copy_reply(&mut self) -> String {
        if let Some((x, y)) = self.copy_button {
            self.bridge.click(x, y);
            std::thread::sleep(self.copy_settle);
            let content = self.bridge.read_clipboard();
            if !content.trim().is_empty() {
                return content.trim().to_string();
            }
        }

        // Fallback: select the whole page and copy it.
        self.bridge.send_keys(KeyCombo::SelectAll);
        std::thread::sleep(self.copy_settle);
        self.bridge.send_keys(KeyCombo::Copy);
        std::thread::sleep(self.copy_settle);
        self.bridge.read_clipboard().trim().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Unstarted,
    Active,
    Closed,
}

/// One exclusive, single-use interaction lifecycle against an EngineTarget.
pub struct Session<'a, E: CommandExecutor> {
    target: EngineTarget,
    bridge: &'a InputBridge<E>,
    timing: SessionTiming,
    stabilize_config: StabilizeConfig,
    state: SessionState,
    child: Option<Child>,
    focus_guard: Option<MutexGuard<'static, ()>>,
}

impl<'a, E: CommandExecutor> Session<'a, E> {
    pub fn new(target: EngineTarget, bridge: &'a InputBridge<E>) -> Self {
        Self {
            target,
            bridge,
            timing: SessionTiming::default(),
            stabilize_config: StabilizeConfig::default(),
            state: SessionState::Unstarted,
            child: None,
            focus_guard: None,
        }
    }

    pub fn with_timing(mut self, timing: SessionTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_stabilize_config(mut self, config: StabilizeConfig) -> Self {
        self.stabilize_config = config;
        self
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Launch the target surface and wait for it to settle.
    ///
    /// Blocks until exclusive screen/input focus is available. On launch
    /// failure the session never becomes Active and holds nothing to tear
    /// down; the error propagates to the caller.
    pub fn start(&mut self) -> Result<()> {
        if self.state != SessionState::Unstarted {
            return Err(S2tsError::SessionState {
                state: format!("{:?}", self.state),
                message: "sessions are single-use; start() requires Unstarted".to_string(),
            });
        }

        let guard = FOCUS_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

        let mut command = match &self.target.launcher {
            Some(launcher) => {
                let mut c = Command::new(launcher);
                c.arg(&self.target.address);
                c
            }
            None => Command::new(&self.target.address),
        };

        info!("launching target surface {}", self.target.address);
        let child = command
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| S2tsError::Launch {
                address: self.target.address.clone(),
                message: e.to_string(),
            })?;

        self.child = Some(child);
        self.focus_guard = Some(guard);
        self.state = SessionState::Active;
        std::thread::sleep(self.timing.page_ready);
        Ok(())
    }

    /// Compose and submit one outbound message, then wait for the reply to
    /// stabilize. The surface is torn down on every exit path.
    ///
    /// Timeout is not an error: the result carries the best partial text
    /// with a `TimedOut` outcome. Only clipboard staging failure (the send
    /// cannot proceed) propagates — after teardown.
    pub fn send_and_get(
        &mut self,
        prompt: &str,
        input_text: &str,
        target_lang: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<StabilizationResult> {
        if self.state != SessionState::Active {
            return Err(S2tsError::SessionState {
                state: format!("{:?}", self.state),
                message: "send_and_get() requires an Active session".to_string(),
            });
        }

        let message = compose_message(prompt, input_text, target_lang);
        let result = self.interact(&message, cancel);

        // Diagnostics must be captured while the surface is still on screen;
        // after teardown a screenshot only shows the bare desktop.
        match &result {
            Ok(res) if res.final_text.is_empty() => {
                warn!("no valid response captured before timeout");
                self.bridge.capture_screenshot("empty_response_timeout");
            }
            Err(e) => {
                warn!("send/observe sequence failed: {}", e);
                self.bridge.capture_screenshot("send_and_get_error");
            }
            Ok(_) => {}
        }

        self.stop();
        result
    }

    fn interact(&mut self, message: &str, cancel: &CancelToken) -> Result<StabilizationResult> {
        self.bridge.copy_to_clipboard(message)?;
        std::thread::sleep(self.timing.clipboard_settle);
        self.bridge.send_keys(KeyCombo::Paste);
        std::thread::sleep(self.timing.paste_settle);
        self.bridge.send_keys(KeyCombo::Submit);
        info!("outbound message submitted ({} chars)", message.len());

        let mut surface = ClipboardSurface::new(
            self.bridge,
            self.target.copy_button,
            self.timing.copy_settle,
        );
        let poll = || {
            let raw = surface.copy_reply();
            extract_reply(&raw, message)
        };
        Ok(stabilize(&self.stabilize_config, message, poll, cancel))
    }

    /// Tear down the surface. Idempotent; tolerates the process already
    /// being gone. Failures are logged and swallowed so teardown can never
    /// mask the primary result or error.
    pub fn stop(&mut self) {
        if self.state != SessionState::Active {
            return;
        }
        self.state = SessionState::Closed;

        if let Some(mut child) = self.child.take() {
            match child.kill() {
                Ok(()) => {
                    if let Err(e) = child.wait() {
                        warn!("wait on terminated surface failed: {}", e);
                    } else {
                        info!("target surface terminated");
                    }
                }
                Err(e) => warn!("terminating target surface failed: {}", e),
            }
        } else {
            warn!("stop called but no surface process was recorded");
        }

        // Focus is released only once the surface is gone.
        self.focus_guard = None;
    }
}

impl<E: CommandExecutor> Drop for Session<'_, E> {
    fn drop(&mut self) {
        // Covers panics unwinding through the interaction: the surface is
        // still torn down and focus released.
        self.stop();
    }
}

/// Construct the full outbound message.
///
/// The returned string is immutable for the rest of the interaction: it is
/// both what gets submitted and the anchor reply extraction trims against,
/// so the exact bytes must match.
pub fn compose_message(prompt: &str, input_text: &str, target_lang: Option<&str>) -> String {
    let mut composed = prompt.trim().to_string();
    if let Some(lang) = target_lang {
        composed.push_str(&format!("\n\nTarget language: {}", lang));
    }
    composed.push_str(&format!("\n\nInput:\n{}", input_text.trim()));
    composed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::SystemCommandExecutor;

    fn test_bridge() -> InputBridge<SystemCommandExecutor> {
        InputBridge::new(SystemCommandExecutor::new(), "/tmp/s2ts-test-shots")
    }

    fn instant_timing() -> SessionTiming {
        SessionTiming {
            page_ready: Duration::ZERO,
            clipboard_settle: Duration::ZERO,
            paste_settle: Duration::ZERO,
            copy_settle: Duration::ZERO,
        }
    }

    #[test]
    fn compose_message_with_target_language() {
        let message = compose_message("Clean this.", "  hello world  ", Some("Hindi"));
        assert_eq!(
            message,
            "Clean this.\n\nTarget language: Hindi\n\nInput:\nhello world"
        );
    }

    #[test]
    fn compose_message_without_target_language() {
        let message = compose_message("  Clean this.  ", "text", None);
        assert_eq!(message, "Clean this.\n\nInput:\ntext");
    }

    #[test]
    fn launch_failure_propagates_and_session_stays_unstarted() {
        let bridge = test_bridge();
        let target = EngineTarget {
            address: "/nonexistent/surface/binary".to_string(),
            requires_auth: false,
            copy_button: None,
            launcher: None,
        };
        let mut session = Session::new(target, &bridge).with_timing(instant_timing());
        let err = session.start().expect_err("launch must fail");
        assert!(matches!(err, S2tsError::Launch { .. }));
        assert!(!session.is_active());
        // stop() on a never-acquired surface is a no-op.
        session.stop();
        assert!(!session.is_active());
    }

    #[test]
    fn start_and_stop_transition_states() {
        let bridge = test_bridge();
        let target = EngineTarget {
            address: "/bin/sleep".to_string(),
            requires_auth: false,
            copy_button: None,
            launcher: None,
        };
        let mut session = Session::new(target, &bridge).with_timing(instant_timing());
        session.start().expect("sleep should launch");
        assert!(session.is_active());
        session.stop();
        assert!(!session.is_active());
        // Idempotent.
        session.stop();
        assert!(!session.is_active());
    }

    #[test]
    fn session_is_single_use() {
        let bridge = test_bridge();
        let target = EngineTarget {
            address: "/bin/sleep".to_string(),
            requires_auth: false,
            copy_button: None,
            launcher: None,
        };
        let mut session = Session::new(target, &bridge).with_timing(instant_timing());
        session.start().expect("sleep should launch");
        session.stop();
        let err = session.start().expect_err("restart must be rejected");
        assert!(matches!(err, S2tsError::SessionState { .. }));
    }

    #[test]
    fn send_on_unstarted_session_is_rejected() {
        let bridge = test_bridge();
        let target = EngineTarget {
            address: "/bin/sleep".to_string(),
            requires_auth: false,
            copy_button: None,
            launcher: None,
        };
        let mut session = Session::new(target, &bridge).with_timing(instant_timing());
        let err = session
            .send_and_get("prompt", "text", None, &CancelToken::new())
            .expect_err("must reject");
        assert!(matches!(err, S2tsError::SessionState { .. }));
    }

    #[test]
    fn launcher_opens_address_as_argument() {
        let bridge = test_bridge();
        let target = EngineTarget {
            address: "https://chat.example.com".to_string(),
            requires_auth: true,
            copy_button: Some((100, 200)),
            launcher: Some("/bin/true".to_string()),
        };
        let mut session = Session::new(target, &bridge).with_timing(instant_timing());
        session.start().expect("true should launch");
        session.stop();
    }

    #[test]
    fn engine_target_deserializes_with_defaults() {
        let target: EngineTarget = toml::from_str(
            r#"
            address = "https://chat.example.com"
            "#,
        )
        .expect("valid target");
        assert!(target.requires_auth);
        assert_eq!(target.copy_button, None);
        assert_eq!(target.launcher, None);
    }

    #[test]
    fn engine_target_deserializes_copy_button() {
        let target: EngineTarget = toml::from_str(
            r#"
            address = "https://chat.example.com"
            requires_auth = false
            copy_button = [1200, 640]
            "#,
        )
        .expect("valid target");
        assert_eq!(target.copy_button, Some((1200, 640)));
        assert!(!target.requires_auth);
    }
}
