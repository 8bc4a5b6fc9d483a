use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn copy_file(source: &Path, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::copy(source, destination).with_context(|| {
        format!(
            "failed to copy {} to {}",
            source.display(),
            destination.display()
        )
    })?;
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, destination: &Path) -> Result<()> {
    let target =
        fs::read_link(source).with_context(|| format!("failed to read link {}", source.display()))?;
    if fs::symlink_metadata(destination).is_ok() {
        remove_content(destination)
            .with_context(|| format!("failed to replace {}", destination.display()))?;
    }
    std::os::unix::fs::symlink(&target, destination)
        .with_context(|| format!("failed to link {}", destination.display()))
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, _destination: &Path) -> Result<()> {
    tracing::warn!("skipping symlink {}", source.display());
    Ok(())
}

fn copy_tree(source: &Path, destination: &Path) -> Result<()> {
    if source.is_file() {
        return copy_file(source, destination);
    }

    fs::create_dir_all(destination)
        .with_context(|| format!("failed to create {}", destination.display()))?;

    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.with_context(|| format!("failed to walk {}", source.display()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .with_context(|| format!("{} escaped {}", entry.path().display(), source.display()))?;
        let target_path = destination.join(relative);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target_path)
                .with_context(|| format!("failed to create {}", target_path.display()))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target_path)?;
        } else if file_type.is_file() {
            copy_file(entry.path(), &target_path)?;
        } else {
            tracing::warn!("skipping special file {}", entry.path().display());
        }
    }

    Ok(())
}

/// Copy `source` (file or directory) into `holding_dir`, keeping its name.
/// The source is left untouched. Returns the staged path.
///
/// Refuses to stage onto the source itself or into a holding directory that
/// lives inside the source.
pub fn stage_copy(source: &Path, holding_dir: &Path) -> Result<PathBuf> {
    let name = source
        .file_name()
        .with_context(|| format!("{} has no file name", source.display()))?;
    if fs::symlink_metadata(source).is_err() {
        anyhow::bail!("torrent content missing at {}", source.display());
    }

    fs::create_dir_all(holding_dir)
        .with_context(|| format!("failed to create {}", holding_dir.display()))?;
    let real_source = fs::canonicalize(source)
        .with_context(|| format!("failed to resolve {}", source.display()))?;
    let real_holding = fs::canonicalize(holding_dir)
        .with_context(|| format!("failed to resolve {}", holding_dir.display()))?;
    let source_entry = match source.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => fs::canonicalize(parent)
            .with_context(|| format!("failed to resolve {}", parent.display()))?
            .join(name),
        None => real_source.clone(),
    };
    let staged = real_holding.join(name);
    if staged == real_source || staged == source_entry || real_holding.starts_with(&real_source)
    {
        anyhow::bail!(
            "refusing to stage {} into {}: holding directory overlaps the torrent content",
            source.display(),
            holding_dir.display()
        );
    }

    let destination = holding_dir.join(name);
    copy_tree(source, &destination)?;
    Ok(destination)
}

/// Remove a file or a whole directory tree. `NotFound` is returned as-is so
/// callers can decide whether "already gone" matters.
pub fn remove_content(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
