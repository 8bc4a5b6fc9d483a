use crate::radionoise::glob_escape::escape_glob;
use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn root_pattern(root: &Path) -> String {
    let raw = root.to_string_lossy();
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() && raw.starts_with('/') {
        return String::new();
    }
    escape_glob(trimmed)
}

/// `<escaped root>/**/*.{ext,...}`
pub fn extension_pattern(root: &Path, extensions: &[String]) -> String {
    let suffix = match extensions {
        [single] => single.clone(),
        many => format!("{{{}}}", many.join(",")),
    };
    format!("{}/**/*.{suffix}", root_pattern(root))
}

fn build_matcher(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .literal_separator(true)
            .backslash_escape(true)
            .build()
            .with_context(|| format!("invalid glob pattern {pattern}"))?;
        builder.add(glob);
    }
    builder.build().context("failed to build glob set")
}

fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

fn walk_matching(root: &Path, matcher: &GlobSet) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if fs::symlink_metadata(root).is_err() {
        tracing::debug!(root = %root.display(), "nothing to collect, root is missing");
        return out;
    }

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(root = %root.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        if matcher.is_match(path) && is_regular_file(path) {
            out.push(path.to_path_buf());
        }
    }
    out
}

/// Regular files anywhere under `root` whose extension is in `extensions`.
pub fn collect(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let matcher = build_matcher(&[extension_pattern(root, extensions)])?;
    let files = walk_matching(root, &matcher);
    tracing::debug!(root = %root.display(), count = files.len(), "collected files");
    Ok(files)
}

/// Like [`collect`], and also `item` itself when it is a regular file
/// (single-file torrents), whatever its extension.
pub fn collect_staged(item: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let matcher = build_matcher(&[root_pattern(item), extension_pattern(item, extensions)])?;
    let files = walk_matching(item, &matcher);
    tracing::debug!(item = %item.display(), count = files.len(), "collected staged files");
    Ok(files)
}
