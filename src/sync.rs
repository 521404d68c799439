//! # Vendor Synchronization
//!
//! Copies resolved package trees from the cache into the project's vendor
//! directory. The vendor root is removed and recreated before any package
//! is copied, so no stale content ever survives a run; each package subtree
//! is then copied whole, and version-control metadata is stripped afterwards
//! unless the caller asked to keep it.

use std::fs;
use std::path::Path;

use log::info;
use walkdir::WalkDir;

use crate::cache::CacheDir;
use crate::error::{Error, Result};
use crate::manifest::Manifest;

/// Copy every declared package's checked-out cache tree into
/// `<project_dir>/<target_dir>`.
///
/// Every spec must carry a non-empty version; this is validated up front so
/// a bad manifest aborts before the old vendor tree is touched.
pub fn copy_all(
    project_dir: &Path,
    target_dir: &str,
    cache: &CacheDir,
    manifest: &Manifest,
    keep_vcs: bool,
) -> Result<()> {
    for spec in &manifest.imports {
        if spec.version.is_empty() {
            return Err(Error::MissingVersion {
                package: spec.package.clone(),
            });
        }
    }

    let vendor_dir = project_dir.join(target_dir);
    if vendor_dir.exists() {
        fs::remove_dir_all(&vendor_dir)?;
    }
    fs::create_dir_all(&vendor_dir)?;

    info!("copying deps...");
    for spec in &manifest.imports {
        let src = cache.repo_dir(&spec.package);
        let dst = vendor_dir.join(&spec.package);
        copy_tree(&src, &dst)?;
    }
    info!("copying deps... done");

    if !keep_vcs {
        strip_vcs(&vendor_dir)?;
    }
    Ok(())
}

/// Copy the auxiliary staging subtree for every spec that opted in.
///
/// The staging convention places sibling packages under
/// `<pkg>/staging/src/<parent(pkg)>/` inside the source tree; they are
/// copied into the same relative position under the vendor root.
pub fn copy_staging(
    project_dir: &Path,
    target_dir: &str,
    cache: &CacheDir,
    manifest: &Manifest,
) -> Result<()> {
    let vendor_dir = project_dir.join(target_dir);
    for spec in manifest.imports.iter().filter(|s| s.staging) {
        let parent = parent_path(&spec.package);
        let base = cache
            .repo_dir(&spec.package)
            .join("staging/src")
            .join(parent);

        for entry in fs::read_dir(&base)? {
            let entry = entry?;
            let dst = vendor_dir.join(parent).join(entry.file_name());
            copy_tree(&entry.path(), &dst)?;
        }
    }
    Ok(())
}

/// The directory portion of an import path (`a/b/c` -> `a/b`).
fn parent_path(package: &str) -> &str {
    match package.rfind('/') {
        Some(idx) => &package[..idx],
        None => "",
    }
}

/// Recursively copy `src` into `dst`, preserving structure and symlinks.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    let copy_err = |e: std::io::Error| Error::Copy {
        src: src.display().to_string(),
        dst: dst.display().to_string(),
        message: e.to_string(),
    };

    fs::create_dir_all(dst).map_err(copy_err)?;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(|e| Error::Copy {
            src: src.display().to_string(),
            dst: dst.display().to_string(),
            message: e.to_string(),
        })?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .expect("walked path is under its root");
        let target = dst.join(rel);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(copy_err)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target).map_err(copy_err)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(copy_err)?;
            }
            fs::copy(entry.path(), &target).map_err(copy_err)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    let link = fs::read_link(src)?;
    if dst.exists() {
        fs::remove_file(dst)?;
    }
    std::os::unix::fs::symlink(link, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::copy(src, dst).map(|_| ())
}

/// Remove every `.git` directory under `root`.
pub fn strip_vcs(root: &Path) -> Result<()> {
    let mut walker = WalkDir::new(root).into_iter();
    loop {
        let entry = match walker.next() {
            None => break,
            Some(Err(e)) => {
                // A subtree vanishing mid-walk means nothing left to strip.
                if e.io_error().map(|io| io.kind()) == Some(std::io::ErrorKind::NotFound) {
                    continue;
                }
                return Err(Error::Io(std::io::Error::other(e)));
            }
            Some(Ok(entry)) => entry,
        };
        if entry.file_type().is_dir() && entry.file_name() == ".git" {
            info!("removing '{}'", entry.path().display());
            fs::remove_dir_all(entry.path())?;
            walker.skip_current_dir();
        }
    }
    Ok(())
}
