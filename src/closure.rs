//! # Import Closure Resolution
//!
//! Computes the set of external import paths statically reachable from a
//! project's own source: the *closure*. The algorithm is a fixed point over
//! a frontier of package paths. Every frontier package is scanned
//! independently (fanned out with rayon and joined before the next frontier
//! is formed, so the closure set only ever grows at one aggregation point),
//! and newly discovered imports that have not been visited become the next
//! frontier. Termination follows from the path space being finite and the
//! visited set never shrinking.
//!
//! External packages are resolved against a library root: the cache source
//! root in update mode, the vendor tree during pruning.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::gosrc;

/// A set of import-path strings with a union merge, iterated in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageSet(BTreeSet<String>);

impl PackageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pkg: impl Into<String>) -> bool {
        self.0.insert(pkg.into())
    }

    pub fn contains(&self, pkg: &str) -> bool {
        self.0.contains(pkg)
    }

    /// Union `other` into this set.
    pub fn merge(&mut self, other: PackageSet) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for PackageSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PackageSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Every ancestor path of `pkg` above `root` (exclusive), including `pkg`
/// itself. Used by pruning to retain directories that only exist to hold a
/// closure member.
pub fn parent_packages(root: &str, pkg: &str) -> PackageSet {
    let mut set = PackageSet::new();
    let mut p = pkg;
    while p.len() > root.len() {
        set.insert(p);
        p = match p.rfind('/') {
            Some(idx) => &p[..idx],
            None => break,
        };
    }
    set
}

/// Normalize a relative import (`./x`, `../x`) against the importing
/// package path.
fn clean_relative(pkg: &str, import: &str) -> String {
    let mut parts: Vec<&str> = pkg.split('/').collect();
    for seg in import.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Configuration for one closure computation.
pub struct ClosureBuilder<'a> {
    /// The project's root import path; its namespace is excluded from the
    /// result.
    pub root_package: &'a str,
    /// Directory holding the project's own source.
    pub project_dir: &'a Path,
    /// Directory external packages are resolved under (cache `src` root or
    /// the vendor tree).
    pub lib_root: &'a Path,
    /// Name of the vendor directory, skipped while walking the project.
    pub target_dir: &'a str,
    /// Files declaring any of these build tags are skipped.
    pub build_tag_filters: &'a [String],
    /// Import paths never added to the closure.
    pub ignored_pkgs: &'a [String],
    /// Only scan files whose platform suffix matches the host.
    pub native_only: bool,
}

impl ClosureBuilder<'_> {
    /// Run the frontier fixed point and return the closure.
    ///
    /// The result excludes the root package's own namespace. Packages that
    /// do not exist on disk or fail to parse contribute no imports; both are
    /// logged, never fatal.
    pub fn compute(&self) -> PackageSet {
        info!("collecting packages in '{}'", self.root_package);

        let mut imports = PackageSet::new();
        let mut seen = PackageSet::new();
        let mut frontier = self.list_local_packages();

        while !frontier.is_empty() {
            let batch: Vec<String> = frontier.iter().map(str::to_string).collect();
            // Scans are independent reads; results merge only after the
            // whole frontier has reported.
            let scanned: Vec<PackageSet> = batch
                .par_iter()
                .map(|pkg| self.scan_package(pkg))
                .collect();
            for set in scanned {
                imports.merge(set);
            }

            seen.merge(frontier);
            frontier = imports
                .iter()
                .filter(|pkg| !seen.contains(pkg) && !self.in_root_namespace(pkg))
                .map(str::to_string)
                .collect();
        }

        debug!("closure size: {}", imports.len());
        imports
            .iter()
            .filter(|pkg| !self.in_root_namespace(pkg))
            .map(str::to_string)
            .collect()
    }

    fn in_root_namespace(&self, pkg: &str) -> bool {
        pkg == self.root_package || pkg.starts_with(&format!("{}/", self.root_package))
    }

    fn is_ignored(&self, pkg: &str) -> bool {
        self.ignored_pkgs.iter().any(|p| p == pkg)
    }

    /// The directory a package path maps to.
    fn package_dir(&self, pkg: &str) -> (PathBuf, bool) {
        if pkg == self.root_package {
            (self.project_dir.to_path_buf(), false)
        } else if let Some(rest) = pkg.strip_prefix(&format!("{}/", self.root_package)) {
            (self.project_dir.join(rest), false)
        } else {
            (self.lib_root.join(pkg), true)
        }
    }

    /// Every locally-owned package under the project root: directories
    /// containing at least one file with a package clause, skipping the
    /// vendor target directory and dot-directories.
    fn list_local_packages(&self) -> PackageSet {
        let mut packages = PackageSet::new();
        let mut walker = WalkDir::new(self.project_dir).into_iter();
        loop {
            let entry = match walker.next() {
                None => break,
                Some(Err(e)) => {
                    warn!("walking project tree: {}", e);
                    continue;
                }
                Some(Ok(entry)) => entry,
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(self.project_dir)
                .unwrap_or(entry.path());
            let rel_str = rel.to_string_lossy().replace('\\', "/");
            let name = entry.file_name().to_string_lossy();
            if rel_str == self.target_dir || (!rel_str.is_empty() && name.starts_with('.')) {
                walker.skip_current_dir();
                continue;
            }
            if dir_has_go_package(entry.path()) {
                if rel_str.is_empty() {
                    packages.insert(self.root_package);
                } else {
                    packages.insert(format!("{}/{}", self.root_package, rel_str));
                }
            }
        }
        packages
    }

    /// Scan one package directory for external imports.
    ///
    /// Returns the discovered import paths, plus the scanned package itself
    /// when it is external (so a vendored package stays in the closure once
    /// reached).
    fn scan_package(&self, pkg: &str) -> PackageSet {
        let (dir, external) = self.package_dir(pkg);
        let mut found = PackageSet::new();
        if external {
            found.insert(pkg);
        }

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("package dir does not exist: '{}'", dir.display());
                return found;
            }
            Err(e) => {
                error!("reading package dir '{}': {}", dir.display(), e);
                return found;
            }
        };

        info!("collecting imports for package '{}'", pkg);
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".go") {
                continue;
            }
            if external && gosrc::is_test_file(&name) {
                continue;
            }
            if self.native_only && !gosrc::matches_host_platform(&name) {
                continue;
            }

            let path = entry.path();
            let file = match gosrc::parse_file(&path) {
                Ok(Some(file)) => file,
                Ok(None) => {
                    debug!("no package clause in '{}'", path.display());
                    continue;
                }
                Err(e) => {
                    error!("parsing '{}': {}", path.display(), e);
                    continue;
                }
            };

            // Vendored executables are not importable.
            if external && file.package_name == "main" {
                info!("program '{}' in vendor tree is ignored", pkg);
                continue;
            }

            if gosrc::has_filtered_build_tag(&file.build_tags, self.build_tag_filters) {
                continue;
            }

            for import in &file.imports {
                if let Some(resolved) = self.resolve_import(pkg, import) {
                    found.insert(resolved);
                }
            }

            // A local #include pulls the containing directory in as an
            // additional discovered import.
            for include in &file.cgo_includes {
                let include_dir = match include.rfind('/') {
                    Some(idx) => &include[..idx],
                    None => continue,
                };
                if dir.join(include_dir).exists() {
                    let resolved = clean_relative(pkg, include_dir);
                    if !self.in_root_namespace(&resolved) && !self.is_ignored(&resolved) {
                        found.insert(resolved);
                    }
                }
            }
        }
        found
    }

    /// Filter and normalize one declared import: relative paths resolve
    /// against the importing package, standard-library and root-namespace
    /// paths drop out.
    fn resolve_import(&self, pkg: &str, import: &str) -> Option<String> {
        let first = import.split('/').next().unwrap_or(import);
        let resolved = if first == "." || first == ".." {
            clean_relative(pkg, import)
        } else if !first.contains('.') {
            // Standard library (no domain in the first segment).
            return None;
        } else {
            import.to_string()
        };

        if self.in_root_namespace(&resolved) || self.is_ignored(&resolved) {
            return None;
        }
        Some(resolved)
    }
}

/// Whether `dir` directly contains at least one Go file with a package
/// clause.
fn dir_has_go_package(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(".go") {
            continue;
        }
        if let Ok(Some(_)) = gosrc::parse_file(&entry.path()) {
            return true;
        }
    }
    false
}
