//! Cloning a VM bundle under a new name.
//!
//! A clone is three passes over the filesystem:
//!
//! 1. copy the source bundle tree byte-for-byte to the target bundle path,
//! 2. rename every top-level entry of the new bundle whose file name contains
//!    the source name (this picks up any number of `<name>-sNNN.vmdk` delta
//!    disks without listing them),
//! 3. rewrite the source name to the target name inside the target's
//!    `.vmx`, `.vmxf` and `.vmdk` files, unless the file looks binary.
//!
//! The caller checks that the source exists and the target does not. There
//! is no rollback: an I/O error part way through leaves a partial target
//! bundle behind.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::VmError;
use crate::outcome::Outcome;
use crate::paths;

/// Bytes inspected when deciding whether a file is text.
pub const SNIFF_LEN: usize = 8192;

/// Share of control bytes in the sniffed prefix above which a file counts as
/// binary.
const MAX_CONTROL_RATIO: f64 = 0.1;

/// Clone `source` to `target`, returning the new bundle path.
pub fn clone_vm(
    settings: &Settings,
    source: &str,
    target: &str,
) -> Result<Outcome<PathBuf>, VmError> {
    let source_bundle = paths::bundle_dir(settings, source);
    let target_bundle = paths::bundle_dir(settings, target);

    tracing::info!(source, target, "cloning VM");
    copy_tree(&source_bundle, &target_bundle)?;
    rename_entries(&target_bundle, source, target)?;

    let ext = &settings.extensions;
    for e in [&ext.config, &ext.config_fragment, &ext.disk] {
        let path = target_bundle.join(format!("{target}.{e}"));
        rewrite_references(&path, source, target)?;
    }

    tracing::info!(path = %target_bundle.display(), "clone complete");
    Ok(Outcome::success(target_bundle))
}

/// Recursively copy a directory tree. File contents are copied verbatim.
pub fn copy_tree(from: &Path, to: &Path) -> Result<(), VmError> {
    fs::create_dir_all(to).map_err(|e| VmError::Io {
        context: format!("creating directory {}", to.display()),
        source: e,
    })?;

    let entries = fs::read_dir(from).map_err(|e| VmError::Io {
        context: format!("reading directory {}", from.display()),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| VmError::Io {
            context: format!("reading directory {}", from.display()),
            source: e,
        })?;
        let src = entry.path();
        let dst = to.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| VmError::Io {
            context: format!("reading file type of {}", src.display()),
            source: e,
        })?;

        if file_type.is_dir() {
            copy_tree(&src, &dst)?;
        } else {
            fs::copy(&src, &dst).map_err(|e| VmError::Io {
                context: format!("copying {} to {}", src.display(), dst.display()),
                source: e,
            })?;
            tracing::debug!(from = %src.display(), to = %dst.display(), "copied");
        }
    }

    Ok(())
}

/// Rename entries directly inside `bundle` whose names contain `source`.
/// Returns the new paths.
pub fn rename_entries(bundle: &Path, source: &str, target: &str) -> Result<Vec<PathBuf>, VmError> {
    let entries = fs::read_dir(bundle).map_err(|e| VmError::Io {
        context: format!("reading directory {}", bundle.display()),
        source: e,
    })?;

    // Collect first so renames don't disturb the directory iterator.
    let old_names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| name.contains(source))
        .collect();

    let mut renamed = Vec::with_capacity(old_names.len());
    for old in old_names {
        let new = old.replace(source, target);
        let from = bundle.join(&old);
        let to = bundle.join(&new);
        fs::rename(&from, &to).map_err(|e| VmError::Io {
            context: format!("renaming {} to {}", from.display(), to.display()),
            source: e,
        })?;
        tracing::debug!(from = %old, to = %new, "renamed");
        renamed.push(to);
    }

    Ok(renamed)
}

/// Replace `source` with `target` throughout a text file. Missing and binary
/// files are left alone. Returns whether the file was rewritten.
pub fn rewrite_references(path: &Path, source: &str, target: &str) -> Result<bool, VmError> {
    if !path.is_file() {
        return Ok(false);
    }

    if !looks_like_text(path)? {
        tracing::debug!(path = %path.display(), "skipping binary file");
        return Ok(false);
    }

    let contents = fs::read(path).map_err(|e| VmError::Io {
        context: format!("reading {}", path.display()),
        source: e,
    })?;
    let rewritten = replace_bytes(&contents, source.as_bytes(), target.as_bytes());
    if rewritten == contents {
        return Ok(false);
    }

    fs::write(path, &rewritten).map_err(|e| VmError::Io {
        context: format!("writing {}", path.display()),
        source: e,
    })?;
    tracing::debug!(path = %path.display(), "rewrote references");
    Ok(true)
}

/// Text heuristic over the first [`SNIFF_LEN`] bytes of a file.
fn looks_like_text(path: &Path) -> Result<bool, VmError> {
    let mut file = fs::File::open(path).map_err(|e| VmError::Io {
        context: format!("opening {}", path.display()),
        source: e,
    })?;
    let mut buf = Vec::with_capacity(SNIFF_LEN);
    file.by_ref()
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut buf)
        .map_err(|e| VmError::Io {
            context: format!("reading {}", path.display()),
            source: e,
        })?;
    Ok(is_text(&buf))
}

/// A buffer is text when it has no NUL byte and at most 10% control bytes
/// other than tab, newline, carriage return and form feed. Bytes >= 0x80 are
/// allowed so UTF-8 and Latin-1 config files pass.
pub fn is_text(buf: &[u8]) -> bool {
    if buf.contains(&0) {
        return false;
    }
    if buf.is_empty() {
        return true;
    }
    let control = buf
        .iter()
        .filter(|&&b| (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c)) || b == 0x7f)
        .count();
    (control as f64) / (buf.len() as f64) <= MAX_CONTROL_RATIO
}

/// Replace every non-overlapping occurrence of `from` in `haystack`.
pub fn replace_bytes(haystack: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    if from.is_empty() {
        return haystack.to_vec();
    }
    let mut out = Vec::with_capacity(haystack.len());
    let mut i = 0;
    while i < haystack.len() {
        if haystack[i..].starts_with(from) {
            out.extend_from_slice(to);
            i += from.len();
        } else {
            out.push(haystack[i]);
            i += 1;
        }
    }
    out
}
