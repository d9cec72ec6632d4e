//! VM status classification.
//!
//! Status is never stored. It is rebuilt on every call from the control
//! command's running list and the suspend marker in the bundle.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::Settings;
use crate::error::VmError;
use crate::locator::Locator;
use crate::outcome::Outcome;
use crate::paths;
use crate::process::{Invoker, escape_arg};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmStatus {
    Running,
    Suspended,
    NotRunning,
}

impl VmStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VmStatus::Running => "running",
            VmStatus::Suspended => "suspended",
            VmStatus::NotRunning => "not running",
        }
    }
}

impl fmt::Display for VmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify one VM against an already-fetched running list.
///
/// Being in the running list wins over a leftover suspend marker.
pub fn detect_status(settings: &Settings, running: &[String], name: &str) -> VmStatus {
    if running.iter().any(|r| r == name) {
        VmStatus::Running
    } else if has_suspend_marker(settings, name) {
        VmStatus::Suspended
    } else {
        VmStatus::NotRunning
    }
}

/// Whether the bundle holds a suspend-state file.
pub fn has_suspend_marker(settings: &Settings, name: &str) -> bool {
    let bundle = paths::bundle_dir(settings, name);
    let Ok(entries) = std::fs::read_dir(&bundle) else {
        return false;
    };
    entries
        .filter_map(|e| e.ok())
        .any(|e| paths::has_extension(&e.path(), &settings.extensions.suspend))
}

pub fn status_of<I: Invoker>(
    locator: &Locator<'_, I>,
    name: &str,
) -> Result<Outcome<VmStatus>, VmError> {
    let running = locator.list_running()?;
    if !running.successful() {
        return Ok(running.failure_as());
    }
    let running = running.into_data().unwrap_or_default();
    Ok(Outcome::success(detect_status(
        locator.settings(),
        &running,
        name,
    )))
}

/// Status of every known VM, judged against a single running-list snapshot.
///
/// If either listing fails the whole report fails with that outcome.
pub fn status_of_all<I: Invoker>(
    locator: &Locator<'_, I>,
) -> Result<Outcome<BTreeMap<String, VmStatus>>, VmError> {
    let all = locator.list_all();
    if !all.successful() {
        return Ok(all.failure_as());
    }
    let running = locator.list_running()?;
    if !running.successful() {
        return Ok(running.failure_as());
    }

    let running = running.into_data().unwrap_or_default();
    let report = all
        .into_data()
        .unwrap_or_default()
        .into_iter()
        .map(|name| {
            let status = detect_status(locator.settings(), &running, &name);
            (name, status)
        })
        .collect::<BTreeMap<_, _>>();

    tracing::debug!(vms = report.len(), running = running.len(), "computed status report");
    Ok(Outcome::success(report))
}

/// Whether the hypervisor GUI process is in the process table.
pub fn gui_running<I: Invoker>(settings: &Settings, invoker: &I) -> Result<bool, VmError> {
    let command = format!("pgrep -x {}", escape_arg(&settings.gui_process));
    let output = invoker.run(&command)?;
    // pgrep exits 1 on no match; anything else nonzero means it could not run.
    Ok(output.code == 0 && output.lines().count() > 0)
}
