//! The single place where vmctl spawns processes.
//!
//! Both the hypervisor control command and the process-table query go through
//! an [`Invoker`]. Nonzero exit is not an error here: it comes back in
//! [`CommandOutput::code`] and the caller decides what it means.

use std::path::Path;
use std::process::Command;

use crate::error::VmError;

/// Exit status and combined stdout+stderr of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: i32,
    pub text: String,
}

impl CommandOutput {
    /// Non-empty output lines, trimmed.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

pub trait Invoker {
    /// Run `command_line` through the shell and wait for it.
    fn run(&self, command_line: &str) -> Result<CommandOutput, VmError>;
}

/// Runs command lines with `sh -c`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellInvoker;

impl Invoker for ShellInvoker {
    fn run(&self, command_line: &str) -> Result<CommandOutput, VmError> {
        tracing::debug!(command = command_line, "running command");

        let output = Command::new("sh")
            .arg("-c")
            .arg(command_line)
            .output()
            .map_err(|e| VmError::Io {
                context: format!("spawning `{command_line}`"),
                source: e,
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        // Killed by a signal: no exit code, report a generic failure.
        let code = output.status.code().unwrap_or(-1);
        if code != 0 {
            tracing::debug!(command = command_line, code, "command exited nonzero");
        }

        Ok(CommandOutput { code, text })
    }
}

/// Escape a path for embedding in a shell command line.
pub fn escape_path(path: &Path) -> String {
    escape_arg(&path.to_string_lossy())
}

/// Quote a single argument for `sh -c`.
///
/// Arguments made only of shell-safe characters pass through unchanged.
/// Anything else is wrapped in single quotes, with each embedded `'` written
/// as `'\''`, so the shell hands the program the exact original bytes.
pub fn escape_arg(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:@%+,=".contains(c));
    if safe {
        return arg.to_string();
    }

    let mut out = String::with_capacity(arg.len() + 2);
    out.push('\'');
    for c in arg.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}
