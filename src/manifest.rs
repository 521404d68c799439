//! # Manifest Model
//!
//! The manifest (`vendor.conf` by default) is a flat YAML record declaring
//! the project's root import path and every external package that must be
//! vendored, each pinned to a branch, tag, or commit.
//!
//! Two invariants are enforced on every parse and every save:
//!
//! - Imports are deduplicated by import path (first occurrence wins) and
//!   serialized sorted by import path, so re-saving a manifest is stable.
//! - The ignored-tags list always contains the sentinel tag `ignore`.
//!
//! Saving is atomic: the manifest is written to a temporary sibling file and
//! renamed into place.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Manifest file names probed, in order, when the default `-f` value is used.
const MANIFEST_CANDIDATES: &[&str] = &[
    "vendor.conf",
    "trash.conf",
    "vndr.cfg",
    "vendor.manifest",
    "trash.yml",
    "glide.yaml",
    "glide.yml",
    "trash.yaml",
];

fn is_false(v: &bool) -> bool {
    !*v
}

/// One declared dependency: an import path pinned to a version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    /// Import path, the unique key of the spec.
    pub package: String,

    /// Branch name, tag name, commit id, or the tip sentinel `"master"`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    /// Explicit remote URL; `None` means derive the remote from the import
    /// path via `go get`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    /// Also resolve this package's own recorded dependencies (godep hints)
    /// and merge them in.
    #[serde(default, skip_serializing_if = "is_false")]
    pub transitive: bool,

    /// Also copy the auxiliary `staging/src` subtree shipped inside this
    /// package.
    #[serde(default, skip_serializing_if = "is_false")]
    pub staging: bool,
}

impl PackageSpec {
    /// A spec with only the import path set; version and options default.
    pub fn named(package: &str) -> Self {
        Self {
            package: package.to_string(),
            ..Self::default()
        }
    }
}

/// The whole manifest record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// The project's own root import path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,

    /// Declared dependencies, sorted and deduplicated by import path.
    #[serde(default, rename = "import", skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<PackageSpec>,

    /// Vendor-relative paths removed unconditionally during pruning.
    #[serde(default, rename = "exclude", skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,

    /// Build tags whose files are skipped during import scanning. Always
    /// contains the sentinel `ignore` after parse.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored_tags: Vec<String>,

    /// Import paths never added to the closure. Trailing slashes are trimmed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored_pkgs: Vec<String>,

    /// Only scan files matching the host platform.
    #[serde(default, skip_serializing_if = "is_false")]
    pub native_only: bool,

    /// Index of every spec ever seen for this manifest, keyed by import path.
    /// Preserves per-package options across an update that rebuilds `imports`.
    #[serde(skip)]
    pub index: BTreeMap<String, PackageSpec>,
}

impl Manifest {
    /// Parse a manifest file, then normalize it: dedupe and sort imports,
    /// append the `ignore` tag sentinel, trim ignored package paths.
    ///
    /// An empty or whitespace-only file parses as an empty manifest, so a
    /// file freshly created by `--update` is valid input.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let mut manifest: Manifest = if raw.trim().is_empty() {
            Manifest::default()
        } else {
            serde_yaml::from_str(&raw)?
        };

        manifest.dedupe();

        if !manifest.ignored_tags.iter().any(|t| t == "ignore") {
            manifest.ignored_tags.push("ignore".to_string());
        }
        manifest.ignored_tags = unique(&manifest.ignored_tags);

        for pkg in &mut manifest.ignored_pkgs {
            *pkg = pkg.trim_matches('/').to_string();
        }

        Ok(manifest)
    }

    /// Delete duplicate imports (first occurrence wins) and sort by import
    /// path. Also rebuilds the spec index used by [`Manifest::get`].
    pub fn dedupe(&mut self) {
        let mut index = BTreeMap::new();
        for spec in &self.imports {
            if index.contains_key(&spec.package) {
                debug!("package '{}' has duplicates in the manifest", spec.package);
                continue;
            }
            index.insert(spec.package.clone(), spec.clone());
        }
        self.index = index;
        // BTreeMap iteration is already sorted by import path.
        self.imports = self.index.values().cloned().collect();
    }

    /// Look up a previously seen spec by import path.
    ///
    /// The index survives `imports` being rebuilt, so update mode can
    /// preserve per-package options (repo, transitive, staging) for packages
    /// it rediscovers.
    pub fn get(&self, package: &str) -> Option<&PackageSpec> {
        self.index.get(package)
    }

    /// Serialize to `path` atomically (temp file + rename), sorted and
    /// deduplicated.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut out = self.clone();
        out.dedupe();
        let yaml = serde_yaml::to_string(&out)?;

        let tmp = path.with_extension("vendo-tmp");
        fs::write(&tmp, yaml)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Locate the manifest file inside `dir`.
///
/// When `preferred` is one of the well-known default names, every candidate
/// name is probed in order; otherwise only the explicitly requested file.
pub fn find_manifest(dir: &Path, preferred: &str) -> Option<PathBuf> {
    let explicit = dir.join(preferred);
    if explicit.exists() {
        return Some(explicit);
    }
    if preferred != MANIFEST_CANDIDATES[0] {
        return None;
    }
    MANIFEST_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

fn unique(src: &[String]) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    src.iter()
        .filter(|s| seen.insert(s.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_minimal() {
        let temp = TempDir::new().unwrap();
        let path = write_manifest(
            temp.path(),
            "vendor.conf",
            "package: host.example/org/proj\nimport:\n- package: host.example/org/lib\n  version: v1.0.0\n",
        );

        let manifest = Manifest::from_file(&path).unwrap();
        assert_eq!(manifest.package.as_deref(), Some("host.example/org/proj"));
        assert_eq!(manifest.imports.len(), 1);
        assert_eq!(manifest.imports[0].package, "host.example/org/lib");
        assert_eq!(manifest.imports[0].version, "v1.0.0");
        assert!(!manifest.imports[0].transitive);
    }

    #[test]
    fn test_parse_empty_file() {
        let temp = TempDir::new().unwrap();
        let path = write_manifest(temp.path(), "vendor.conf", "");

        let manifest = Manifest::from_file(&path).unwrap();
        assert!(manifest.imports.is_empty());
        assert_eq!(manifest.ignored_tags, vec!["ignore"]);
    }

    #[test]
    fn test_dedupe_first_occurrence_wins_and_sorts() {
        let temp = TempDir::new().unwrap();
        let path = write_manifest(
            temp.path(),
            "vendor.conf",
            concat!(
                "import:\n",
                "- package: host.example/b\n  version: v2\n",
                "- package: host.example/a\n  version: v1\n",
                "- package: host.example/b\n  version: v9\n",
            ),
        );

        let manifest = Manifest::from_file(&path).unwrap();
        let names: Vec<_> = manifest.imports.iter().map(|s| s.package.as_str()).collect();
        assert_eq!(names, vec!["host.example/a", "host.example/b"]);
        // First occurrence of b wins.
        assert_eq!(manifest.imports[1].version, "v2");
    }

    #[test]
    fn test_ignore_tag_sentinel() {
        let temp = TempDir::new().unwrap();
        let path = write_manifest(
            temp.path(),
            "vendor.conf",
            "ignored_tags:\n- exotic\n- exotic\n",
        );

        let manifest = Manifest::from_file(&path).unwrap();
        assert_eq!(manifest.ignored_tags, vec!["exotic", "ignore"]);
    }

    #[test]
    fn test_ignored_pkgs_trimmed() {
        let temp = TempDir::new().unwrap();
        let path = write_manifest(
            temp.path(),
            "vendor.conf",
            "ignored_pkgs:\n- host.example/skip/\n- /host.example/other\n",
        );

        let manifest = Manifest::from_file(&path).unwrap();
        assert_eq!(
            manifest.ignored_pkgs,
            vec!["host.example/skip", "host.example/other"]
        );
    }

    #[test]
    fn test_round_trip_is_stable() {
        let temp = TempDir::new().unwrap();
        let path = write_manifest(
            temp.path(),
            "vendor.conf",
            concat!(
                "package: host.example/org/proj\n",
                "import:\n",
                "- package: host.example/z\n  version: v1\n",
                "- package: host.example/a\n  version: v2\n  transitive: true\n",
                "- package: host.example/z\n  version: dupe\n",
            ),
        );

        let first = Manifest::from_file(&path).unwrap();
        let saved = temp.path().join("out.conf");
        first.write_to(&saved).unwrap();
        let second = Manifest::from_file(&saved).unwrap();

        assert_eq!(first.package, second.package);
        assert_eq!(first.imports, second.imports);

        // A second round trip yields byte-identical output.
        let saved_again = temp.path().join("out2.conf");
        second.write_to(&saved_again).unwrap();
        assert_eq!(
            fs::read_to_string(&saved).unwrap(),
            fs::read_to_string(&saved_again).unwrap()
        );
    }

    #[test]
    fn test_get_preserves_options_after_rebuild() {
        let temp = TempDir::new().unwrap();
        let path = write_manifest(
            temp.path(),
            "vendor.conf",
            "import:\n- package: host.example/a\n  version: v1\n  staging: true\n",
        );

        let mut manifest = Manifest::from_file(&path).unwrap();
        manifest.imports.clear();
        let spec = manifest.get("host.example/a").unwrap();
        assert!(spec.staging);
        assert_eq!(spec.version, "v1");
    }

    #[test]
    fn test_find_manifest_fallback_candidates() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), "glide.yaml", "package: p\n");

        let found = find_manifest(temp.path(), "vendor.conf").unwrap();
        assert!(found.ends_with("glide.yaml"));

        // A non-default name is not subject to fallback.
        assert!(find_manifest(temp.path(), "custom.conf").is_none());
    }

    #[test]
    fn test_find_manifest_prefers_explicit() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), "vendor.conf", "");
        write_manifest(temp.path(), "glide.yaml", "");

        let found = find_manifest(temp.path(), "vendor.conf").unwrap();
        assert!(found.ends_with("vendor.conf"));
    }
}
