//! Testable command execution for GUI automation.
//!
//! The `CommandExecutor` trait enables full testability without external
//! dependencies: every external tool invocation (clipboard, key injection,
//! pointer, screenshots) goes through it, so tests substitute scripted
//! implementations.

use crate::error::{Result, S2tsError};
use std::process::Command;

/// Trait for executing system commands.
///
/// Object-safe, Send + Sync for use behind shared references.
pub trait CommandExecutor: Send + Sync {
    /// Execute a command with arguments.
    ///
    /// Returns the stdout of the command on success.
    /// Returns an error if the command fails or is not found.
    fn execute(&self, command: &str, args: &[&str]) -> Result<String>;
}

/// Production command executor using std::process::Command.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandExecutor;

impl SystemCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn execute(&self, command: &str, args: &[&str]) -> Result<String> {
        let output = Command::new(command).args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                S2tsError::ToolNotFound {
                    tool: command.to_string(),
                }
            } else if e.kind() == std::io::ErrorKind::PermissionDenied {
                S2tsError::ToolPermissionDenied {
                    message: format!(
                        "Permission denied executing {}: {}.\n\
                        Hint: If using ydotool, ensure the ydotoold daemon is running and you have permissions.\n\
                        Try: sudo systemctl start ydotool",
                        command, e
                    ),
                }
            } else {
                S2tsError::Other(format!("Failed to execute {}: {}", command, e))
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(S2tsError::Other(format!(
                "{} failed with status {:?}: {}",
                command, output.status, stderr
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_command_maps_to_tool_not_found() {
        let executor = SystemCommandExecutor::new();
        let result = executor.execute("definitely-not-a-real-tool-42", &[]);
        match result {
            Err(S2tsError::ToolNotFound { tool }) => {
                assert_eq!(tool, "definitely-not-a-real-tool-42");
            }
            other => panic!("expected ToolNotFound, got {:?}", other),
        }
    }

    #[test]
    fn successful_command_returns_stdout() {
        let executor = SystemCommandExecutor::new();
        let output = executor
            .execute("echo", &["hello"])
            .expect("echo should succeed");
        assert_eq!(output.trim(), "hello");
    }

    #[test]
    fn failing_command_returns_error() {
        let executor = SystemCommandExecutor::new();
        let result = executor.execute("false", &[]);
        assert!(result.is_err());
    }
}
