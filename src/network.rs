//! Network info for a VM: its adapter MAC and the DHCP lease issued to it.

use crate::error::VmError;
use crate::lease::{self, LeaseMatch};
use crate::locator::Locator;
use crate::outcome::Outcome;
use crate::process::Invoker;
use crate::vmx;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetInfo {
    pub mac: String,
    pub lease: LeaseMatch,
}

impl NetInfo {
    pub fn ip_address(&self) -> Option<&str> {
        self.lease.record().and_then(|r| r.ip_address.as_deref())
    }
}

pub fn net_info<I: Invoker>(
    locator: &Locator<'_, I>,
    name: &str,
) -> Result<Outcome<NetInfo>, VmError> {
    let config = locator.resolve_config_file(name);
    if !config.successful() {
        return Ok(config.failure_as());
    }
    let Some(config_path) = config.into_data() else {
        return Ok(Outcome::internal(format!("VM '{name}' has no config file")));
    };

    let entries = vmx::read_entries(&config_path)?;
    let Some(mac) = vmx::primary_mac(&entries) else {
        return Ok(Outcome::internal(format!(
            "VM '{name}' has no MAC address in {}",
            config_path.display()
        )));
    };
    let mac = mac.to_string();

    let found = lease::find_by_mac(&locator.settings().lease_file, &mac)?;
    tracing::debug!(name, mac = %mac, ok = found.successful(), "looked up lease");
    Ok(found.map(|lease| NetInfo { mac, lease }))
}
