//! # Repository Cache Management
//!
//! One shared on-disk cache holds a git working tree per declared import
//! path, under `<cache>/src/<importPath>`. Entries are reused across runs
//! and across projects on the same machine.
//!
//! An entry is considered healthy when it is a git working tree whose
//! toplevel lies under the cache source root. Anything else (missing,
//! plain directory, nested foreign repository) is destroyed and recreated:
//! the ecosystem's native fetch tool (`go get`) is invoked best-effort to
//! seed the clone, the directory is made a repository with `git init` if
//! that did not happen, and any explicitly declared remote is registered.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::gitcmd;
use crate::manifest::PackageSpec;

/// Handle on the shared cache root.
#[derive(Debug, Clone)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The directory all package working trees live under.
    pub fn src_root(&self) -> PathBuf {
        self.root.join("src")
    }

    /// The working tree for one import path.
    pub fn repo_dir(&self, package: &str) -> PathBuf {
        self.src_root().join(package)
    }

    /// Make sure a healthy cache entry exists for `spec`.
    pub fn ensure(&self, spec: &PackageSpec, insecure: bool) -> Result<()> {
        debug!("ensuring cache for '{}'", spec.package);
        fs::create_dir_all(self.src_root())?;

        let repo_dir = self.repo_dir(&spec.package);
        if !repo_dir.exists() || !self.is_repo(&repo_dir) {
            return self.recreate(spec, insecure);
        }

        if let Some(url) = spec.repo.as_deref().filter(|u| !u.is_empty()) {
            if !gitcmd::remote_exists(&repo_dir, &gitcmd::remote_name(Some(url))) {
                gitcmd::add_remote(&repo_dir, url);
            }
        } else if !gitcmd::remote_exists(&repo_dir, "origin") {
            return self.recreate(spec, insecure);
        }
        Ok(())
    }

    /// Whether `dir` is a git working tree rooted under this cache.
    fn is_repo(&self, dir: &Path) -> bool {
        match gitcmd::toplevel(dir) {
            Ok(top) => Path::new(&top).starts_with(self.src_root()),
            Err(e) => {
                debug!("not a usable repository at '{}': {}", dir.display(), e);
                false
            }
        }
    }

    /// Destroy and rebuild the entry: best-effort `go get`, then `git init`
    /// if needed, then remote registration.
    fn recreate(&self, spec: &PackageSpec, insecure: bool) -> Result<()> {
        info!("preparing cache for '{}'", spec.package);
        let repo_dir = self.repo_dir(&spec.package);
        if repo_dir.exists() {
            fs::remove_dir_all(&repo_dir).map_err(|e| Error::Cache {
                package: spec.package.clone(),
                message: format!("removing stale entry '{}': {}", repo_dir.display(), e),
            })?;
        }

        self.go_get(&spec.package, insecure);

        fs::create_dir_all(&repo_dir).map_err(|e| Error::Cache {
            package: spec.package.clone(),
            message: format!("creating '{}': {}", repo_dir.display(), e),
        })?;
        if !self.is_repo(&repo_dir) {
            debug!("'{}' is not a repository, creating one", repo_dir.display());
            gitcmd::init(&repo_dir);
        }
        if let Some(url) = spec.repo.as_deref().filter(|u| !u.is_empty()) {
            gitcmd::add_remote(&repo_dir, url);
        }
        Ok(())
    }

    /// Seed the entry via the native fetch tool. Failures are non-fatal;
    /// the tree is still usable as an empty repository.
    fn go_get(&self, package: &str, insecure: bool) {
        let mut args = vec!["get", "-d", "-f", "-u"];
        if insecure {
            args.push("-insecure");
        }
        args.push(package);

        let result = Command::new("go")
            .args(&args)
            .env("GOPATH", &self.root)
            .current_dir(&self.root)
            .output();
        match result {
            Ok(output) if !output.status.success() => {
                debug!(
                    "`go {}` failed:\n{}",
                    args.join(" "),
                    String::from_utf8_lossy(&output.stderr)
                );
            }
            Err(e) => debug!("`go {}` could not run: {}", args.join(" "), e),
            Ok(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_dir_layout() {
        let cache = CacheDir::new(PathBuf::from("/tmp/vendo-cache"));
        assert_eq!(cache.src_root(), PathBuf::from("/tmp/vendo-cache/src"));
        assert_eq!(
            cache.repo_dir("host.example/org/lib"),
            PathBuf::from("/tmp/vendo-cache/src/host.example/org/lib")
        );
    }

    #[test]
    fn test_repo_dirs_are_disjoint_per_package() {
        let cache = CacheDir::new(PathBuf::from("/tmp/vendo-cache"));
        let a = cache.repo_dir("host.example/org/a");
        let b = cache.repo_dir("host.example/org/a-sibling");
        assert_ne!(a, b);
        assert!(!b.starts_with(&a));
    }

    // `ensure` drives git and go subprocesses; its branch/retry policy is
    // exercised through the mocked resolution tests in `resolve`.
}
