//! Reading `key = "value"` entries out of a primary config file.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::VmError;

/// Parse config text into a key → value map. Keys are lowercased since the
/// hypervisor treats them case-insensitively; values lose their quotes.
/// Lines without `=` are skipped.
pub fn parse_entries(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| l.split_once('='))
        .map(|(k, v)| {
            let v = v.trim();
            let v = v
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(v);
            (k.trim().to_ascii_lowercase(), v.to_string())
        })
        .collect()
}

pub fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, VmError> {
    let bytes = std::fs::read(path).map_err(|e| VmError::Io {
        context: format!("reading {}", path.display()),
        source: e,
    })?;
    Ok(parse_entries(&String::from_utf8_lossy(&bytes)))
}

/// MAC address of the first network adapter: the generated address, or the
/// static one when the adapter is configured with a fixed MAC.
pub fn primary_mac(entries: &BTreeMap<String, String>) -> Option<&str> {
    ["ethernet0.generatedaddress", "ethernet0.address"]
        .iter()
        .filter_map(|k| entries.get(*k))
        .map(String::as_str)
        .find(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_values() {
        let entries = parse_entries(
            "displayName = \"dev box\"\n# comment\nethernet0.present = \"TRUE\"\nnonsense\n",
        );
        assert_eq!(entries["displayname"], "dev box");
        assert_eq!(entries["ethernet0.present"], "TRUE");
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn primary_mac_prefers_generated_address() {
        let entries = parse_entries(
            "ethernet0.generatedAddress = \"00:0c:29:aa:bb:cc\"\nethernet0.address = \"00:50:56:00:00:01\"\n",
        );
        assert_eq!(primary_mac(&entries), Some("00:0c:29:aa:bb:cc"));
    }

    #[test]
    fn primary_mac_falls_back_to_static_address() {
        let entries = parse_entries("ethernet0.addressType = \"static\"\nethernet0.address = \"00:50:56:00:00:01\"\n");
        assert_eq!(primary_mac(&entries), Some("00:50:56:00:00:01"));
    }

    #[test]
    fn primary_mac_absent() {
        assert_eq!(primary_mac(&parse_entries("memsize = \"2048\"\n")), None);
    }
}
