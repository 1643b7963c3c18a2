//! Recursive copy of the builder source tree.

use anyhow::{bail, Context, Result};
use std::fs::{self, File, FileTimes};
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Copy every non-hidden top-level entry of `source` into `destination`.
///
/// Permissions and modification times are preserved and symlinks are
/// recreated rather than followed. Existing files in `destination` are
/// overwritten. Returns the number of entries copied.
pub fn copy_tree_contents(source: &Path, destination: &Path) -> Result<usize> {
    if !source.is_dir() {
        bail!("Stemcell builder source not found at {}", source.display());
    }

    let mut top_level: Vec<PathBuf> = fs::read_dir(source)
        .with_context(|| format!("Failed to read {}", source.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()
        .with_context(|| format!("Failed to read {}", source.display()))?;
    top_level.retain(|path| {
        !path
            .file_name()
            .map(|name| name.to_string_lossy().starts_with('.'))
            .unwrap_or(true)
    });
    top_level.sort();

    fs::create_dir_all(destination)
        .with_context(|| format!("Failed to create {}", destination.display()))?;

    let mut copied = 0;
    // Directory metadata is applied after their contents are written, deepest
    // first, so read-only directories don't block the copy.
    let mut dirs: Vec<(PathBuf, PathBuf)> = Vec::new();

    for root in top_level {
        for entry in WalkDir::new(&root)
            .follow_links(false)
            .follow_root_links(false) {
            let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
            let rel = entry
                .path()
                .strip_prefix(source)
                .with_context(|| format!("{} escaped {}", entry.path().display(), source.display()))?;
            let dest = destination.join(rel);
            let file_type = entry.file_type();

            if file_type.is_dir() {
                fs::create_dir_all(&dest)
                    .with_context(|| format!("Failed to create {}", dest.display()))?;
                dirs.push((entry.path().to_path_buf(), dest));
            } else if file_type.is_symlink() {
                let target = fs::read_link(entry.path())
                    .with_context(|| format!("Failed to read link {}", entry.path().display()))?;
                if dest.symlink_metadata().is_ok() {
                    fs::remove_file(&dest)
                        .with_context(|| format!("Failed to replace {}", dest.display()))?;
                }
                symlink(&target, &dest)
                    .with_context(|| format!("Failed to create symlink {}", dest.display()))?;
            } else {
                fs::copy(entry.path(), &dest).with_context(|| {
                    format!("Failed to copy {} to {}", entry.path().display(), dest.display())
                })?;
                preserve_times(entry.path(), &dest)?;
            }
            copied += 1;
        }
    }

    for (src, dest) in dirs.iter().rev() {
        let metadata = fs::metadata(src)
            .with_context(|| format!("Failed to stat {}", src.display()))?;
        fs::set_permissions(dest, metadata.permissions())
            .with_context(|| format!("Failed to set permissions on {}", dest.display()))?;
        preserve_times(src, dest)?;
    }

    Ok(copied)
}

fn preserve_times(src: &Path, dest: &Path) -> Result<()> {
    let metadata = fs::metadata(src).with_context(|| format!("Failed to stat {}", src.display()))?;
    let mut times = FileTimes::new();
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    File::open(dest)
        .and_then(|file| file.set_times(times))
        .with_context(|| format!("Failed to set times on {}", dest.display()))
}
