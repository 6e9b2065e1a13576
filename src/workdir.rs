//! Per-scenario copies of the module root.
//!
//! Scenarios that share a definitions directory would otherwise share
//! Terraform state. Each isolated run gets `<work_dir>/<name_prefix>/`.

use crate::error::{HarnessError, Result};
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Matched against each entry's file name.
const SKIP_PATTERNS: &[&str] = &[
    ".git",
    ".terraform",
    "*.tfstate",
    "*.tfstate.*",
    ".terraform.tfstate.lock.info",
    "*.tfplan",
];

struct SkipList {
    patterns: Vec<Pattern>,
}

impl SkipList {
    fn new() -> Self {
        let patterns = SKIP_PATTERNS
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();
        Self { patterns }
    }

    fn matches(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        self.patterns.iter().any(|p| p.matches(&name))
    }
}

pub fn scenario_workdir(work_dir: &Path, name_prefix: &str) -> PathBuf {
    work_dir.join(name_prefix)
}

/// Copy `src` into `dest`, skipping provider caches, state and VCS data.
/// Returns the number of files copied.
pub fn copy_module_tree(src: &Path, dest: &Path) -> Result<usize> {
    if !src.is_dir() {
        return Err(HarnessError::Config(format!(
            "Module root {} is not a directory",
            src.display()
        )));
    }

    let skip = SkipList::new();
    let mut copied = 0;

    fs::create_dir_all(dest)?;

    let walker = WalkDir::new(src)
        .min_depth(1)
        .into_iter()
        // `dest` may live under `src` when the work dir is inside the module.
        .filter_entry(|e| {
            !skip.matches(e) && !e.path().starts_with(dest) && !dest.starts_with(e.path())
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            HarnessError::Config(format!("Failed to walk {}: {}", src.display(), e))
        })?;
        let relative = entry.path().strip_prefix(src).map_err(|e| {
            HarnessError::Config(format!("Unexpected path {}: {}", entry.path().display(), e))
        })?;
        let target = dest.join(relative);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
            copied += 1;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, target: &Path) -> Result<()> {
    let link = fs::read_link(src)?;
    std::os::unix::fs::symlink(link, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, target: &Path) -> Result<()> {
    fs::copy(src, target)?;
    Ok(())
}

pub fn remove_workdir(root: &Path) -> Result<()> {
    if root.exists() {
        fs::remove_dir_all(root)?;
    }
    Ok(())
}
