//! Removal of state left behind by a previous build.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::process::Cmd;

/// Remove stray `*.tgz` archives from `dir`. Returns how many were removed.
///
/// Hidden files are left alone, as a shell `*.tgz` glob would.
pub fn remove_stray_archives(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry
            .with_context(|| format!("Failed to read {}", dir.display()))?
            .path();
        let hidden = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'));
        if !hidden && path.is_file() && path.extension().is_some_and(|ext| ext == "tgz") {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Unmount `mount_point`, ignoring any failure.
///
/// Returns whether the unmount succeeded.
pub fn unmount_quietly(mount_point: &Path, use_sudo: bool) -> bool {
    match Cmd::privileged("umount", use_sudo)
        .arg_path(mount_point)
        .allow_fail()
        .run()
    {
        Ok(result) if result.success() => {
            tracing::info!(path = %mount_point.display(), "unmounted");
            true
        }
        Ok(result) => {
            tracing::debug!(
                path = %mount_point.display(),
                code = result.code(),
                "umount failed, ignoring"
            );
            false
        }
        Err(e) => {
            tracing::debug!(path = %mount_point.display(), "umount unavailable: {:#}", e);
            false
        }
    }
}

/// Remove a directory tree if it exists.
pub fn remove_tree(path: &Path, use_sudo: bool) -> Result<()> {
    if use_sudo {
        Cmd::privileged("rm", true)
            .arg("-rf")
            .arg_path(path)
            .error_msg(format!("Failed to remove {}", path.display()))
            .run()?;
        return Ok(());
    }
    if path.symlink_metadata().is_ok() {
        fs::remove_dir_all(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}
