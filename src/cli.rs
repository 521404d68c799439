//! CLI argument parsing and dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::commands;

/// Vendor Go dependencies pinned in a manifest
#[derive(Parser, Debug)]
#[command(name = "vendo")]
#[command(version, long_about = None)]
pub struct Cli {
    /// Manifest file name, relative to the project directory
    #[arg(short = 'f', long = "file", default_value = "vendor.conf")]
    pub file: String,

    /// Project directory to operate in
    #[arg(short = 'C', long = "directory", default_value = ".")]
    pub directory: PathBuf,

    /// Vendor directory name, relative to the project directory
    #[arg(short = 'T', long = "target", default_value = "vendor")]
    pub target: String,

    /// Keep version-control metadata in the vendored trees and skip pruning
    #[arg(short = 'k', long = "keep")]
    pub keep: bool,

    /// Rewrite the manifest from the project's current imports, then vendor
    #[arg(short = 'u', long = "update")]
    pub update: bool,

    /// Allow the native fetch tool to use insecure transports
    #[arg(long)]
    pub insecure: bool,

    /// Cache directory (defaults to ~/.vendo-cache)
    #[arg(long = "cache", env = "VENDO_CACHE", value_name = "DIR")]
    pub cache: Option<PathBuf>,

    /// Additional build tag whose files are skipped while scanning imports
    #[arg(long = "skip-tag", value_name = "TAG")]
    pub skip_tags: Vec<String>,

    /// Only scan files matching the host platform
    #[arg(long = "native-only")]
    pub native_only: bool,

    /// Verbose logging
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Execute the requested run.
    pub fn execute(self) -> Result<()> {
        commands::run(self)
    }
}
