//! Command implementations
//!
//! A run is a single invocation: optionally rewrite the manifest from the
//! project's current imports (`--update`), then vendor and prune. Shared
//! setup (locating the manifest, the cache, merging tag filters) lives
//! here; the two pipelines live in [`sync`] and [`update`].

pub mod sync;
pub mod update;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::warn;

use vendo::cache::CacheDir;
use vendo::error::Error;
use vendo::manifest::{self, Manifest};

use crate::cli::Cli;

/// Everything a pipeline needs, resolved once per run.
pub struct RunContext {
    pub project_dir: PathBuf,
    pub target_dir: String,
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
    pub cache: CacheDir,
    pub keep: bool,
    pub insecure: bool,
    pub tag_filters: Vec<String>,
    pub native_only: bool,
}

pub fn run(cli: Cli) -> Result<()> {
    let project_dir = cli
        .directory
        .canonicalize()
        .with_context(|| format!("no such project directory '{}'", cli.directory.display()))?;

    let cache_root = match cli.cache {
        Some(dir) => dir,
        None => default_cache_root()?,
    };

    let manifest_path = match manifest::find_manifest(&project_dir, &cli.file) {
        Some(path) => path,
        None if cli.update => {
            let path = project_dir.join(&cli.file);
            warn!("creating '{}'", path.display());
            fs::write(&path, "")
                .with_context(|| format!("could not create '{}'", path.display()))?;
            path
        }
        None => {
            return Err(Error::Manifest {
                message: format!(
                    "no manifest file found in '{}' (looked for '{}')",
                    project_dir.display(),
                    cli.file
                ),
                hint: Some("run with --update to create one".to_string()),
            }
            .into())
        }
    };

    let manifest = Manifest::from_file(&manifest_path)
        .with_context(|| format!("could not read '{}'", manifest_path.display()))?;

    let mut tag_filters = manifest.ignored_tags.clone();
    for tag in &cli.skip_tags {
        if !tag_filters.contains(tag) {
            tag_filters.push(tag.clone());
        }
    }

    let mut ctx = RunContext {
        project_dir,
        target_dir: cli.target,
        manifest_path,
        native_only: cli.native_only || manifest.native_only,
        manifest,
        cache: CacheDir::new(cache_root),
        keep: cli.keep,
        insecure: cli.insecure,
        tag_filters,
    };

    if cli.update {
        update::execute(&mut ctx)?;
    }
    sync::execute(&ctx)
}

fn default_cache_root() -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .context("HOME is not set; pass --cache (or set VENDO_CACHE)")?;
    Ok(PathBuf::from(home).join(".vendo-cache"))
}
