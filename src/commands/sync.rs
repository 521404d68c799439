//! The default pipeline: fetch, check out, copy, prune.

use std::collections::BTreeSet;

use anyhow::Result;
use log::info;

use vendo::error::Error;
use vendo::godep;
use vendo::manifest::{Manifest, PackageSpec};
use vendo::prune::{self, PruneContext};
use vendo::resolve;
use vendo::sync;

use super::RunContext;

pub fn execute(ctx: &RunContext) -> Result<()> {
    // Pruning needs the project's root import path; fail before any
    // fetching if it is missing.
    let root_package = if ctx.keep {
        None
    } else {
        Some(
            ctx.manifest
                .package
                .clone()
                .ok_or(Error::MissingRootPackage)?,
        )
    };

    // Every package is fetched and checked out before the vendor directory
    // is touched, so a failed resolution leaves the old tree intact.
    let mut manifest = ctx.manifest.clone();
    let mut prepared: BTreeSet<String> = BTreeSet::new();
    loop {
        for spec in &manifest.imports {
            if !prepared.insert(spec.package.clone()) {
                continue;
            }
            if spec.version.is_empty() {
                return Err(Error::MissingVersion {
                    package: spec.package.clone(),
                }
                .into());
            }
            ctx.cache.ensure(spec, ctx.insecure)?;
            resolve::checkout(&ctx.cache, spec)?;
        }

        // Transitive specs pull in the pins their own checkout records.
        // Declared entries win over hints; the loop runs until no checkout
        // contributes a new package.
        let mut hints = Vec::new();
        for spec in manifest.imports.iter().filter(|s| s.transitive) {
            hints.extend(godep::hints(&ctx.cache.repo_dir(&spec.package))?);
        }
        let extras = undeclared(&manifest, hints);
        if extras.is_empty() {
            break;
        }
        info!("adding {} transitively recorded packages", extras.len());
        manifest.imports.extend(extras);
        manifest.dedupe();
    }

    sync::copy_all(
        &ctx.project_dir,
        &ctx.target_dir,
        &ctx.cache,
        &manifest,
        ctx.keep,
    )?;
    sync::copy_staging(&ctx.project_dir, &ctx.target_dir, &ctx.cache, &manifest)?;

    let Some(root_package) = root_package else {
        info!("keeping full trees, skipping prune");
        return Ok(());
    };
    prune::run(&PruneContext {
        root_package: &root_package,
        project_dir: &ctx.project_dir,
        target_dir: &ctx.target_dir,
        manifest: &manifest,
        build_tag_filters: &ctx.tag_filters,
        native_only: ctx.native_only,
    })?;
    Ok(())
}

/// The recorded pins not already declared in the manifest. A hint for a
/// declared package never overrides its pin.
fn undeclared(manifest: &Manifest, hints: Vec<PackageSpec>) -> Vec<PackageSpec> {
    hints
        .into_iter()
        .filter(|hint| manifest.get(&hint.package).is_none())
        .collect()
}
