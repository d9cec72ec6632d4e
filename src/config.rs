use std::path::{Path, PathBuf};

use facet::Facet;

use crate::error::VmError;
use crate::paths;

#[derive(Debug, Clone, Facet)]
#[facet(default)]
pub struct Config {
    #[facet(default = "~/Virtual Machines.localized")]
    pub vm_root: String,
    #[facet(default = "/Applications/VMware Fusion.app/Contents/Library/vmrun")]
    pub control_binary: String,
    #[facet(default = "/var/db/vmware/vmnet-dhcpd-vmnet8.leases")]
    pub lease_file: String,
    #[facet(default = "VMware Fusion")]
    pub gui_process: String,
    #[facet(default)]
    pub extensions: ExtensionsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vm_root: "~/Virtual Machines.localized".into(),
            control_binary: "/Applications/VMware Fusion.app/Contents/Library/vmrun".into(),
            lease_file: "/var/db/vmware/vmnet-dhcpd-vmnet8.leases".into(),
            gui_process: "VMware Fusion".into(),
            extensions: ExtensionsConfig::default(),
        }
    }
}

/// File extensions (without the dot) that make up a VM bundle.
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
#[facet(default)]
pub struct ExtensionsConfig {
    #[facet(default = "vmwarevm")]
    pub bundle: String,
    #[facet(default = "vmx")]
    pub config: String,
    #[facet(default = "vmxf")]
    pub config_fragment: String,
    #[facet(default = "vmdk")]
    pub disk: String,
    #[facet(default = "vmsd")]
    pub metadata: String,
    #[facet(default = "vmss")]
    pub suspend: String,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            bundle: "vmwarevm".into(),
            config: "vmx".into(),
            config_fragment: "vmxf".into(),
            disk: "vmdk".into(),
            metadata: "vmsd".into(),
            suspend: "vmss".into(),
        }
    }
}

// ── Settings ──────────────────────────────────────────────

/// Resolved runtime settings, built once per process run and handed to every
/// component explicitly.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding the `<name>.<bundle>` directories.
    pub vm_root: PathBuf,
    pub control_binary: PathBuf,
    pub lease_file: PathBuf,
    /// Name matched against the process table to detect the hypervisor GUI.
    pub gui_process: String,
    pub extensions: ExtensionsConfig,
    /// Config file these settings came from, if any.
    pub config_path: Option<PathBuf>,
}

impl Settings {
    fn resolve(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            vm_root: paths::expand_home(&config.vm_root),
            control_binary: paths::expand_home(&config.control_binary),
            lease_file: paths::expand_home(&config.lease_file),
            gui_process: config.gui_process,
            extensions: config.extensions,
            config_path,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::resolve(Config::default(), None)
    }
}

fn validate_config(config: &Config) -> Result<(), VmError> {
    for (key, value) in [
        ("vm_root", &config.vm_root),
        ("control_binary", &config.control_binary),
        ("lease_file", &config.lease_file),
        ("gui_process", &config.gui_process),
    ] {
        if value.trim().is_empty() {
            return Err(VmError::Validation {
                message: format!("{key} must not be empty"),
            });
        }
    }

    let ext = &config.extensions;
    for (key, value) in [
        ("bundle", &ext.bundle),
        ("config", &ext.config),
        ("config_fragment", &ext.config_fragment),
        ("disk", &ext.disk),
        ("metadata", &ext.metadata),
        ("suspend", &ext.suspend),
    ] {
        if value.is_empty() || value.contains('.') || value.contains('/') {
            return Err(VmError::Validation {
                message: format!(
                    "extensions.{key} must be a bare extension without dots or slashes (got '{value}')"
                ),
            });
        }
    }

    Ok(())
}

// ── public API ────────────────────────────────────────────

/// Parse and validate a TOML config string.
pub fn parse_config(contents: &str, origin: &Path) -> Result<Config, VmError> {
    let config: Config = facet_toml::from_str(contents).map_err(|e| VmError::ConfigParse {
        path: origin.display().to_string(),
        message: e.to_string(),
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Load settings from an explicit config file. The file must exist.
pub fn load_config(path: &Path) -> Result<Settings, VmError> {
    let contents = std::fs::read_to_string(path).map_err(|source| VmError::ConfigLoad {
        path: path.display().to_string(),
        source,
    })?;

    let config = parse_config(&contents, path)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(Settings::resolve(config, Some(path.to_path_buf())))
}

/// Load settings from the default config location, falling back to built-in
/// defaults when no file is there.
pub fn load_default() -> Result<Settings, VmError> {
    match paths::default_config_path() {
        Some(path) if path.exists() => load_config(&path),
        _ => Ok(Settings::default()),
    }
}
