//! # Git Subprocess Plumbing
//!
//! Thin wrappers around the system `git` command. Using the real binary
//! means SSH keys, credential helpers, and everything else in the user's
//! `~/.gitconfig` just work.
//!
//! Every invocation takes an explicit working directory; nothing here ever
//! changes the process's current directory. Output parsing is limited to
//! line splitting and whitespace trimming.

use std::path::Path;
use std::process::Command;

use log::{debug, error, info, warn};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Run `git` with `args` in `dir`, returning stdout on success.
pub fn git_in(dir: &Path, args: &[&str]) -> Result<String> {
    debug!("git {} (in '{}')", args.join(" "), dir.display());
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .map_err(|e| Error::GitCommand {
            args: args.join(" "),
            dir: dir.display().to_string(),
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(Error::GitCommand {
            args: args.join(" "),
            dir: dir.display().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Run `git` in `dir` and return trimmed stdout lines; failures log at
/// debug and yield no lines.
pub fn git_out_lines(dir: &Path, args: &[&str]) -> Vec<String> {
    match git_in(dir, args) {
        Ok(stdout) => stdout
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect(),
        Err(e) => {
            debug!("{}", e);
            Vec::new()
        }
    }
}

/// Derive the remote name for a source URL.
///
/// `None` (no explicit URL) maps to `origin`; otherwise the name is the
/// first seven lowercase hex characters of the URL's SHA-256, so every
/// package pointing at the same repository shares one remote.
pub fn remote_name(url: Option<&str>) -> String {
    match url {
        None | Some("") => "origin".to_string(),
        Some(url) => {
            let digest = Sha256::digest(url.as_bytes());
            let mut name = String::with_capacity(8);
            for byte in digest.iter().take(4) {
                name.push_str(&format!("{:02x}", byte));
            }
            name.truncate(7);
            name
        }
    }
}

/// Whether a remote with this name is registered in the repository at `dir`.
pub fn remote_exists(dir: &Path, name: &str) -> bool {
    git_out_lines(dir, &["remote"]).iter().any(|l| l == name)
}

/// Register `url` under its derived remote name, fetching its refs.
/// An already-existing remote is tolerated with a warning.
pub fn add_remote(dir: &Path, url: &str) {
    let name = remote_name(Some(url));
    if let Err(e) = git_in(dir, &["remote", "add", "-f", &name, url]) {
        let text = e.to_string();
        if text.contains(&format!("remote {} already exists", name)) {
            warn!("already have remote '{}' for '{}'", name, url);
        } else {
            error!("could not add remote '{}' for '{}': {}", name, url, e);
        }
    }
}

/// Whether `<remote>/<version>` names a known remote branch.
pub fn is_branch(dir: &Path, remote: &str, version: &str) -> bool {
    let branch = format!("{}/{}", remote, version);
    debug!("checking if '{}' is a branch", branch);
    git_out_lines(dir, &["branch", "--list", "-r", &branch])
        .iter()
        .any(|l| l == &branch)
}

/// Force-fetch refs and tags from `remote`.
pub fn fetch(dir: &Path, remote: &str) -> Result<()> {
    info!("fetching latest commits from '{}'", remote);
    git_in(dir, &["fetch", "-f", "-t", remote]).map(|_| ())
}

/// Force a detached checkout of `version`.
pub fn checkout_detached(dir: &Path, version: &str) -> Result<()> {
    git_in(dir, &["checkout", "-f", "--detach", version]).map(|_| ())
}

/// The single newest commit across all refs, abbreviated.
pub fn newest_commit(dir: &Path) -> Result<String> {
    let out = git_in(dir, &["log", "--all", "--pretty=oneline", "--abbrev-commit", "-1"])?;
    out.split_whitespace()
        .next()
        .map(str::to_string)
        .ok_or_else(|| Error::GitCommand {
            args: "log --all --pretty=oneline --abbrev-commit -1".to_string(),
            dir: dir.display().to_string(),
            stderr: "no commits found".to_string(),
        })
}

/// `git rev-parse --show-toplevel` for the repository containing `dir`.
pub fn toplevel(dir: &Path) -> Result<String> {
    git_in(dir, &["rev-parse", "--show-toplevel"]).map(|s| s.trim().to_string())
}

/// The most specific tag (or abbreviated commit) describing `HEAD`.
pub fn describe(dir: &Path) -> Result<String> {
    git_in(dir, &["describe", "--tags", "--always"]).map(|s| s.trim().to_string())
}

/// Initialize an empty repository at `dir`, quietly. Best effort.
pub fn init(dir: &Path) {
    if let Err(e) = git_in(dir, &["init", "-q"]) {
        debug!("git init in '{}': {}", dir.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_name_default() {
        assert_eq!(remote_name(None), "origin");
        assert_eq!(remote_name(Some("")), "origin");
    }

    #[test]
    fn test_remote_name_deterministic() {
        let url = "https://host.example/org/repo.git";
        assert_eq!(remote_name(Some(url)), remote_name(Some(url)));
        assert_eq!(remote_name(Some(url)).len(), 7);
    }

    #[test]
    fn test_remote_name_is_lowercase_hex() {
        let name = remote_name(Some("git@host.example:org/repo.git"));
        assert!(name.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_remote_name_differs_per_url() {
        let a = remote_name(Some("https://host.example/org/a.git"));
        let b = remote_name(Some("https://host.example/org/b.git"));
        assert_ne!(a, b);
    }

    // Tests for the subprocess wrappers would require real git
    // repositories; the resolution policy built on top of them is covered
    // with mocks in `resolve`.
}
