//! # Vendor Tree Pruning
//!
//! Shrinks a freshly copied vendor tree down to what the project actually
//! uses. The steps run in a fixed order, and the order matters: manifest
//! excludes are applied *before* the import closure is recomputed, so a
//! package reachable only through excluded code is correctly treated as
//! unused and removed.
//!
//! Individual removal failures are logged and skipped; pruning never takes
//! the whole run down over one stubborn path.

use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::closure::{parent_packages, ClosureBuilder, PackageSet};
use crate::error::Result;
use crate::gosrc;
use crate::manifest::Manifest;

/// File extensions that count as vendorable source.
const SOURCE_EXTENSIONS: &[&str] = &["go", "h", "c", "s", "cpp", "hpp"];

/// Settings for one pruning pass over `<project_dir>/<target_dir>`.
pub struct PruneContext<'a> {
    pub root_package: &'a str,
    pub project_dir: &'a Path,
    pub target_dir: &'a str,
    pub manifest: &'a Manifest,
    pub build_tag_filters: &'a [String],
    pub native_only: bool,
}

/// Run the full pruning sequence. A missing vendor directory means there is
/// nothing to do.
pub fn run(ctx: &PruneContext) -> Result<()> {
    let vendor_dir = ctx.project_dir.join(ctx.target_dir);
    if !vendor_dir.exists() {
        info!("no '{}' directory, nothing to prune", ctx.target_dir);
        return Ok(());
    }

    remove_excludes(&vendor_dir, &ctx.manifest.excludes);

    // The closure is computed against the vendor tree itself, after the
    // excludes are gone.
    let closure = ClosureBuilder {
        root_package: ctx.root_package,
        project_dir: ctx.project_dir,
        lib_root: &vendor_dir,
        target_dir: ctx.target_dir,
        build_tag_filters: ctx.build_tag_filters,
        ignored_pkgs: &ctx.manifest.ignored_pkgs,
        native_only: ctx.native_only,
    }
    .compute();

    remove_unused(&vendor_dir, &closure);
    remove_empty_dirs(&vendor_dir);
    remove_non_source(&vendor_dir);
    warn_vanished(&vendor_dir, ctx.manifest);
    Ok(())
}

/// Delete every path the manifest explicitly excludes.
fn remove_excludes(vendor_dir: &Path, excludes: &[String]) {
    for exclude in excludes {
        let path = vendor_dir.join(exclude.trim_matches('/'));
        if !path.exists() {
            continue;
        }
        info!("removing excluded '{}'", exclude);
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        if let Err(e) = result {
            warn!("could not remove excluded '{}': {}", path.display(), e);
        }
    }
}

/// Delete packages outside the closure, plus all test files.
///
/// Directories survive when they are closure members or ancestors of one;
/// ancestors keep their subtree reachable but lose any stray `.go` files of
/// their own.
fn remove_unused(vendor_dir: &Path, closure: &PackageSet) {
    let mut keep = PackageSet::new();
    for pkg in closure.iter() {
        keep.merge(parent_packages("", pkg));
    }

    let mut walker = WalkDir::new(vendor_dir).min_depth(1).into_iter();
    loop {
        let entry = match walker.next() {
            None => break,
            Some(Err(e)) => {
                debug!("walking vendor tree: {}", e);
                continue;
            }
            Some(Ok(entry)) => entry,
        };
        let rel = match entry.path().strip_prefix(vendor_dir) {
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };

        if entry.file_type().is_dir() {
            if !keep.contains(&rel) {
                info!("removing unused '{}'", rel);
                if let Err(e) = fs::remove_dir_all(entry.path()) {
                    warn!("could not remove '{}': {}", entry.path().display(), e);
                }
                walker.skip_current_dir();
            }
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if !name.ends_with(".go") {
            continue;
        }
        let owning_pkg = match rel.rfind('/') {
            Some(idx) => &rel[..idx],
            None => "",
        };
        if gosrc::is_test_file(&name) || !closure.contains(owning_pkg) {
            info!("removing unused '{}'", rel);
            if let Err(e) = fs::remove_file(entry.path()) {
                warn!("could not remove '{}': {}", entry.path().display(), e);
            }
        }
    }
}

/// Remove directories left empty by the earlier steps. Walking contents
/// first collapses whole empty chains in one pass.
fn remove_empty_dirs(vendor_dir: &Path) {
    for entry in WalkDir::new(vendor_dir)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .flatten()
    {
        if !entry.file_type().is_dir() {
            continue;
        }
        let is_empty = fs::read_dir(entry.path())
            .map(|mut d| d.next().is_none())
            .unwrap_or(false);
        if is_empty {
            debug!("removing empty dir '{}'", entry.path().display());
            if let Err(e) = fs::remove_dir(entry.path()) {
                warn!("could not remove '{}': {}", entry.path().display(), e);
            }
        }
    }
}

/// Remove everything that is neither source nor a license-like file.
fn remove_non_source(vendor_dir: &Path) {
    for entry in WalkDir::new(vendor_dir).min_depth(1).into_iter().flatten() {
        if entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if is_source_file(&name) || is_license_file(&name) {
            continue;
        }
        debug!("removing non-source '{}'", entry.path().display());
        if let Err(e) = fs::remove_file(entry.path()) {
            warn!("could not remove '{}': {}", entry.path().display(), e);
        }
    }
}

fn is_source_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// License and notice files are kept wherever they sit: redistributing the
/// vendored code usually requires them.
fn is_license_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("license") || lower.contains("notice")
}

/// Point out declared packages that pruning (or upstream changes) removed
/// entirely from the vendor tree.
fn warn_vanished(vendor_dir: &Path, manifest: &Manifest) {
    for spec in &manifest.imports {
        if !vendor_dir.join(&spec.package).exists() {
            warn!(
                "package '{}' has been completely removed: it's probably useless (a top-level \
                 package or a test package)",
                spec.package
            );
        }
    }
}
