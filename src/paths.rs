use std::path::{Path, PathBuf};

use crate::config::Settings;

/// Default config file: `~/.config/vmctl/vmctl.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vmctl").join("vmctl.toml"))
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/"))
            .join(rest),
        None if path == "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from("/")),
        None => PathBuf::from(path),
    }
}

/// Bundle directory for a VM: `<vm_root>/<name>.<bundle>`
pub fn bundle_dir(settings: &Settings, name: &str) -> PathBuf {
    settings
        .vm_root
        .join(format!("{name}.{}", settings.extensions.bundle))
}

/// Canonically named primary config file: `<bundle>/<name>.<config>`
pub fn canonical_config_path(settings: &Settings, name: &str) -> PathBuf {
    bundle_dir(settings, name).join(format!("{name}.{}", settings.extensions.config))
}

/// Glob-style pattern describing the primary config candidates in a bundle.
pub fn config_pattern(settings: &Settings, name: &str) -> PathBuf {
    bundle_dir(settings, name).join(format!("*.{}", settings.extensions.config))
}

/// Whether `path` has exactly the extension `ext`.
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_settings;

    #[test]
    fn bundle_layout() {
        let settings = test_settings(Path::new("/vms"));
        assert_eq!(
            bundle_dir(&settings, "foo"),
            PathBuf::from("/vms/foo.vmwarevm")
        );
        assert_eq!(
            canonical_config_path(&settings, "foo"),
            PathBuf::from("/vms/foo.vmwarevm/foo.vmx")
        );
        assert_eq!(
            config_pattern(&settings, "foo"),
            PathBuf::from("/vms/foo.vmwarevm/*.vmx")
        );
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home("/srv/vms"), PathBuf::from("/srv/vms"));
    }

    #[test]
    fn expand_home_replaces_tilde() {
        let expanded = expand_home("~/vms");
        assert!(expanded.ends_with("vms"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn has_extension_is_exact() {
        assert!(has_extension(Path::new("a/foo.vmx"), "vmx"));
        assert!(!has_extension(Path::new("a/foo.vmxf"), "vmx"));
        assert!(!has_extension(Path::new("a/foo.vmx.lck"), "vmx"));
    }
}
