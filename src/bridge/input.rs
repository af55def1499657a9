//! Input bridge primitives: clipboard exchange, key combos, pointer clicks
//! and debug screenshots.
//!
//! Backed by external Wayland tools through `CommandExecutor`:
//! - wl-copy / wl-paste (wl-clipboard) for the clipboard
//! - ydotool for key and pointer injection
//! - grim for screenshots
//!
//! Failure policy (one capture attempt must never abort a whole response
//! wait): only `copy_to_clipboard` is fatal — if the outbound message never
//! reaches the clipboard the send cannot proceed. Everything else degrades
//! to an empty/no-op result and logs.

use crate::error::{Result, S2tsError};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::executor::CommandExecutor;

/// A named key combination, expressed as ydotool press/release scancode
/// sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCombo {
    /// Ctrl+V
    Paste,
    /// Ctrl+A
    SelectAll,
    /// Ctrl+C
    Copy,
    /// Enter
    Submit,
}

impl KeyCombo {
    /// ydotool `key` arguments for this combo.
    ///
    /// Scancodes: 29 = left ctrl, 47 = v, 30 = a, 46 = c, 28 = enter.
    /// `:1` is press, `:0` is release.
    fn ydotool_args(self) -> &'static [&'static str] {
        match self {
            KeyCombo::Paste => &["key", "29:1", "47:1", "47:0", "29:0"],
            KeyCombo::SelectAll => &["key", "29:1", "30:1", "30:0", "29:0"],
            KeyCombo::Copy => &["key", "29:1", "46:1", "46:0", "29:0"],
            KeyCombo::Submit => &["key", "28:1", "28:0"],
        }
    }
}

/// Thin adapter over OS input-injection facilities.
pub struct InputBridge<E: CommandExecutor> {
    executor: E,
    screenshot_dir: PathBuf,
}

impl<E: CommandExecutor> InputBridge<E> {
    /// Create a bridge with the given executor. Screenshots land under
    /// `screenshot_dir` (created lazily on first capture).
    pub fn new(executor: E, screenshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            screenshot_dir: screenshot_dir.into(),
        }
    }

    /// Write text to the system clipboard.
    ///
    /// Fatal on failure: callers use this to stage the outbound message, and
    /// pasting an empty or stale clipboard would silently corrupt the send.
    pub fn copy_to_clipboard(&self, text: &str) -> Result<()> {
        self.executor
            .execute("wl-copy", &[text])
            .map_err(|e| match e {
                S2tsError::ToolNotFound { tool } if tool == "wl-copy" => S2tsError::ClipboardWrite {
                    message: "wl-copy not found. Install wl-clipboard:\n\
                        Ubuntu/Debian: sudo apt install wl-clipboard\n\
                        Arch: sudo pacman -S wl-clipboard"
                        .to_string(),
                },
                other => S2tsError::ClipboardWrite {
                    message: other.to_string(),
                },
            })?;
        Ok(())
    }

    /// Read the current clipboard contents.
    ///
    /// Returns an empty string on any failure — a failed capture poll is a
    /// recoverable event absorbed by the stabilization loop.
    pub fn read_clipboard(&self) -> String {
        match self.executor.execute("wl-paste", &["--no-newline"]) {
            Ok(text) => text,
            Err(e) => {
                debug!("clipboard read failed: {}", e);
                String::new()
            }
        }
    }

    /// Send a key combination to the focused surface. Failures are logged
    /// and otherwise ignored.
    pub fn send_keys(&self, combo: KeyCombo) {
        if let Err(e) = self.executor.execute("ydotool", combo.ydotool_args()) {
            warn!("key injection ({:?}) failed: {}", combo, e);
        }
    }

    /// Click at absolute screen coordinates. Failures are logged and
    /// otherwise ignored.
    pub fn click(&self, x: i32, y: i32) {
        let x = x.to_string();
        let y = y.to_string();
        let moved = self
            .executor
            .execute("ydotool", &["mousemove", "--absolute", "-x", &x, "-y", &y]);
        if let Err(e) = moved {
            warn!("pointer move to ({}, {}) failed: {}", x, y, e);
            return;
        }
        // 0xC0 = left button press + release
        if let Err(e) = self.executor.execute("ydotool", &["click", "0xC0"]) {
            warn!("pointer click at ({}, {}) failed: {}", x, y, e);
        }
    }

    /// Capture a screenshot for debugging, tagged with the given context.
    ///
    /// Returns the path on success, `None` on any failure. Never fatal —
    /// screenshots are diagnostics, not behavior.
    pub fn capture_screenshot(&self, tag: &str) -> Option<PathBuf> {
        if let Err(e) = std::fs::create_dir_all(&self.screenshot_dir) {
            warn!("screenshot dir creation failed: {}", e);
            return None;
        }
        let stamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = self.screenshot_dir.join(format!("{}_{}.png", tag, stamp));
        match path.to_str() {
            Some(p) => match self.executor.execute("grim", &[p]) {
                Ok(_) => {
                    debug!("screenshot captured: {}", path.display());
                    Some(path)
                }
                Err(e) => {
                    warn!("screenshot capture for '{}' failed: {}", tag, e);
                    None
                }
            },
            None => None,
        }
    }

    /// Directory screenshots are written to.
    pub fn screenshot_dir(&self) -> &Path {
        &self.screenshot_dir
    }

    /// The underlying executor.
    pub fn executor(&self) -> &E {
        &self.executor
    }
}
