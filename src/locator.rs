//! Finding VM bundles on disk and the VMs the control command reports as
//! running.

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::VmError;
use crate::outcome::Outcome;
use crate::paths;
use crate::process::{Invoker, escape_path};

pub struct Locator<'a, I> {
    settings: &'a Settings,
    invoker: &'a I,
}

impl<'a, I: Invoker> Locator<'a, I> {
    pub fn new(settings: &'a Settings, invoker: &'a I) -> Self {
        Self { settings, invoker }
    }

    pub fn settings(&self) -> &'a Settings {
        self.settings
    }

    pub fn invoker(&self) -> &'a I {
        self.invoker
    }

    /// Names of every bundle directory under the VM root, in directory
    /// enumeration order.
    pub fn list_all(&self) -> Outcome<Vec<String>> {
        let root = &self.settings.vm_root;
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                return Outcome::internal(format!(
                    "cannot read VM directory {}: {e}",
                    root.display()
                ));
            }
        };

        let suffix = format!(".{}", self.settings.extensions.bundle);
        let names = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|e| {
                let file_name = e.file_name().into_string().ok()?;
                let name = file_name.strip_suffix(&suffix)?;
                (!name.is_empty()).then(|| name.to_string())
            })
            .collect();

        Outcome::success(names)
    }

    /// Names of the VMs the control command currently lists as running.
    pub fn list_running(&self) -> Result<Outcome<Vec<String>>, VmError> {
        let command = format!("{} list", escape_path(&self.settings.control_binary));
        let output = self.invoker.run(&command)?;
        let outcome = Outcome::from_output(output, "");
        if !outcome.successful() {
            return Ok(outcome.failure_as());
        }

        let text = outcome.into_data().unwrap_or_default();
        let names = running_config_paths(&text, &self.settings.extensions.config)
            .into_iter()
            .filter(|path| path.is_file())
            .filter_map(|path| self.vm_name_for_config(&path))
            .collect();

        Ok(Outcome::success(names))
    }

    pub fn exists(&self, name: &str) -> bool {
        paths::bundle_dir(self.settings, name).is_dir()
    }

    /// Resolve the authoritative primary config file inside a bundle.
    ///
    /// A single candidate wins outright. With several, only the canonically
    /// named `<name>.<config>` is accepted; anything else is ambiguous.
    pub fn resolve_config_file(&self, name: &str) -> Outcome<PathBuf> {
        let pattern = paths::config_pattern(self.settings, name);
        let bundle = paths::bundle_dir(self.settings, name);
        let mut candidates = config_candidates(&bundle, &self.settings.extensions.config);

        match candidates.len() {
            0 => Outcome::internal(format!(
                "VM '{name}' has no config file (nothing matches {})",
                pattern.display()
            )),
            1 => Outcome::success(candidates.remove(0)),
            _ => {
                let canonical = paths::canonical_config_path(self.settings, name);
                if candidates.contains(&canonical) {
                    return Outcome::success(canonical);
                }
                let mut basenames: Vec<String> = candidates
                    .iter()
                    .filter_map(|p| p.file_name())
                    .map(|f| f.to_string_lossy().into_owned())
                    .collect();
                basenames.sort();
                Outcome::internal(format!(
                    "VM '{name}' has multiple config files ({}) in {} and none is named {name}.{}",
                    basenames.join(", "),
                    bundle.display(),
                    self.settings.extensions.config
                ))
            }
        }
    }

    /// VM name for a running config path: the enclosing bundle's name when the
    /// file sits in a bundle directory, otherwise the file stem.
    fn vm_name_for_config(&self, path: &Path) -> Option<String> {
        let bundle_ext = &self.settings.extensions.bundle;
        let from_bundle = path
            .parent()
            .filter(|p| paths::has_extension(p, bundle_ext))
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str());
        from_bundle
            .or_else(|| path.file_stem().and_then(|s| s.to_str()))
            .map(str::to_string)
    }
}

/// Files directly in `bundle` with the primary config extension.
fn config_candidates(bundle: &Path, config_ext: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(bundle) else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| paths::has_extension(p, config_ext))
        .collect()
}

/// Parse `list` output into the config paths it mentions.
///
/// The first line is a `Total running VMs: N` header; every other line that
/// ends in `.<config_ext>` is taken as a path.
pub fn running_config_paths(text: &str, config_ext: &str) -> Vec<PathBuf> {
    let suffix = format!(".{config_ext}");
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("Total running VMs"))
        .filter(|line| line.ends_with(&suffix))
        .map(PathBuf::from)
        .collect()
}
