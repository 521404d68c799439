//! # Version Resolution
//!
//! Turns a pinned version string (branch, tag, commit, or the tip sentinel
//! `"master"`) into a detached, reproducible checkout of a cache entry.
//!
//! Branches move, so a branch-like pin always fetches before checking out.
//! Tags and commits are immutable, so they are checked out directly and a
//! fetch happens only reactively, when the ref is locally unknown. Each
//! failure path retries exactly once; exhausting the retry is fatal for the
//! whole run, because substituting a wrong version silently is worse than
//! aborting.
//!
//! The policy is written against the [`RepoGit`] trait so it can be tested
//! without real repositories (the same seam the repository manager uses for
//! its git operations).

use std::path::PathBuf;

use log::{debug, info, warn};

use crate::cache::CacheDir;
use crate::error::{Error, Result};
use crate::gitcmd;
use crate::manifest::PackageSpec;

/// The tip sentinel: "latest commit on the default branch".
pub const TIP_SENTINEL: &str = "master";

/// Git operations needed by the resolution policy, scoped to one
/// repository. Allows mocking in tests.
pub trait RepoGit {
    fn is_branch(&self, remote: &str, version: &str) -> bool;
    fn fetch(&self, remote: &str) -> Result<()>;
    fn checkout_detached(&self, version: &str) -> Result<()>;
    fn newest_commit(&self) -> Result<String>;
}

/// The real implementation, invoking `git` in a cache entry's working tree.
pub struct CliRepoGit {
    dir: PathBuf,
}

impl CliRepoGit {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl RepoGit for CliRepoGit {
    fn is_branch(&self, remote: &str, version: &str) -> bool {
        gitcmd::is_branch(&self.dir, remote, version)
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        gitcmd::fetch(&self.dir, remote)
    }

    fn checkout_detached(&self, version: &str) -> Result<()> {
        gitcmd::checkout_detached(&self.dir, version)
    }

    fn newest_commit(&self) -> Result<String> {
        gitcmd::newest_commit(&self.dir)
    }
}

/// Check out `spec`'s pinned version in its cache entry, detached.
pub fn checkout(cache: &CacheDir, spec: &PackageSpec) -> Result<()> {
    let git = CliRepoGit::new(cache.repo_dir(&spec.package));
    resolve_with(&git, spec)
}

/// The resolution state machine, generic over the git seam.
pub fn resolve_with(git: &dyn RepoGit, spec: &PackageSpec) -> Result<()> {
    info!(
        "checking out '{}', version: '{}'",
        spec.package, spec.version
    );
    let remote = gitcmd::remote_name(spec.repo.as_deref());

    let mut version = spec.version.clone();
    if spec.version == TIP_SENTINEL || git.is_branch(&remote, &spec.version) {
        // Branch pins must see the remote's current tip.
        version = format!("{}/{}", remote, spec.version);
        git.fetch(&remote)?;
    }

    let first = match git.checkout_detached(&version) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    debug!("checkout of '{}' failed: {}", version, first);

    if spec.version == TIP_SENTINEL {
        warn!("failed to checkout '{TIP_SENTINEL}': falling back to the latest commit git can find");
        version = git.newest_commit()?;
    } else {
        // The ref may simply be unknown locally; fetch once and retry.
        git.fetch(&remote)?;
    }

    debug!("retrying checkout of '{}'", version);
    git.checkout_detached(&version)
        .map_err(|e| Error::Checkout {
            package: spec.package.clone(),
            version: spec.version.clone(),
            message: e.to_string(),
        })
}
