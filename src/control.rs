//! Power and snapshot operations through the control command.
//!
//! Every operation resolves the VM's config file first (a failed resolution is
//! returned unchanged) and then runs
//! `<control-binary> <verb> <config-path> [args...]`.

use crate::error::VmError;
use crate::locator::Locator;
use crate::outcome::Outcome;
use crate::process::{Invoker, escape_arg, escape_path};

pub struct Control<'a, I> {
    locator: &'a Locator<'a, I>,
}

impl<'a, I: Invoker> Control<'a, I> {
    pub fn new(locator: &'a Locator<'a, I>) -> Self {
        Self { locator }
    }

    pub fn start(&self, name: &str, gui: bool) -> Result<Outcome<String>, VmError> {
        let mode = if gui { "gui" } else { "nogui" };
        self.run(name, "start", &[mode], "started")
    }

    pub fn stop(&self, name: &str, hard: bool) -> Result<Outcome<String>, VmError> {
        let mode = if hard { "hard" } else { "soft" };
        self.run(name, "stop", &[mode], "stopped")
    }

    pub fn suspend(&self, name: &str) -> Result<Outcome<String>, VmError> {
        self.run(name, "suspend", &[], "suspended")
    }

    pub fn reset(&self, name: &str) -> Result<Outcome<String>, VmError> {
        self.run(name, "reset", &[], "reset")
    }

    pub fn snapshot(&self, name: &str, snapshot: &str) -> Result<Outcome<String>, VmError> {
        self.run(name, "snapshot", &[snapshot], "snapshot created")
    }

    pub fn revert(&self, name: &str, snapshot: &str) -> Result<Outcome<String>, VmError> {
        self.run(name, "revertToSnapshot", &[snapshot], "reverted")
    }

    pub fn delete_snapshot(&self, name: &str, snapshot: &str) -> Result<Outcome<String>, VmError> {
        self.run(name, "deleteSnapshot", &[snapshot], "snapshot deleted")
    }

    /// Snapshot names, in the order the control command lists them.
    pub fn list_snapshots(&self, name: &str) -> Result<Outcome<Vec<String>>, VmError> {
        let outcome = self.run(name, "listSnapshots", &[], "")?;
        Ok(outcome.map(|text| parse_snapshot_list(&text)))
    }

    fn run(
        &self,
        name: &str,
        verb: &str,
        args: &[&str],
        default_message: &str,
    ) -> Result<Outcome<String>, VmError> {
        let config = self.locator.resolve_config_file(name);
        if !config.successful() {
            return Ok(config.failure_as());
        }
        let Some(config_path) = config.into_data() else {
            return Ok(Outcome::internal(format!("VM '{name}' has no config file")));
        };

        let mut command = format!(
            "{} {verb} {}",
            escape_path(&self.locator.settings().control_binary),
            escape_path(&config_path)
        );
        for arg in args {
            command.push(' ');
            command.push_str(&escape_arg(arg));
        }

        let output = self.locator.invoker().run(&command)?;
        let outcome = Outcome::from_output(output, default_message);
        if outcome.successful() {
            tracing::info!(name, verb, "control command succeeded");
        } else {
            tracing::warn!(name, verb, code = outcome.code(), "control command failed");
        }
        Ok(outcome)
    }
}

/// Parse `listSnapshots` output: a `Total snapshots: N` header followed by
/// one snapshot name per line.
pub fn parse_snapshot_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("Total snapshots"))
        .map(str::to_string)
        .collect()
}
