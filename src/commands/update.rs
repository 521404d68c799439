//! Manifest update: rediscover the project's imports and re-pin them.
//!
//! Every package statically reachable from the project's source is checked
//! out at the default-branch tip in the cache, then the discovered set is
//! collapsed to repository roots and each root pinned at whatever
//! `git describe` names for its HEAD. Options on existing manifest entries
//! (repo URL, transitive, staging) are preserved.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use log::{info, warn};

use vendo::closure::ClosureBuilder;
use vendo::error::Error;
use vendo::gitcmd;
use vendo::godep;
use vendo::manifest::{Manifest, PackageSpec};
use vendo::resolve::{self, TIP_SENTINEL};

use super::RunContext;

pub fn execute(ctx: &mut RunContext) -> Result<()> {
    let root_package = ctx
        .manifest
        .package
        .clone()
        .ok_or(Error::MissingRootPackage)?;
    info!("updating '{}'", ctx.manifest_path.display());

    let src_root = ctx.cache.src_root();

    // Checking out one package can make its own imports scannable, which
    // can reveal new packages. Iterate to a fixed point.
    let mut prepared: BTreeSet<String> = BTreeSet::new();
    let closure = loop {
        let closure = ClosureBuilder {
            root_package: &root_package,
            project_dir: &ctx.project_dir,
            lib_root: &src_root,
            target_dir: &ctx.target_dir,
            build_tag_filters: &ctx.tag_filters,
            ignored_pkgs: &ctx.manifest.ignored_pkgs,
            native_only: ctx.native_only,
        }
        .compute();

        let mut changed = false;
        for pkg in closure.iter() {
            if prepared.contains(pkg) {
                continue;
            }
            let spec = tip_spec(&ctx.manifest, pkg);
            ctx.cache.ensure(&spec, ctx.insecure)?;
            resolve::checkout(&ctx.cache, &spec)?;
            prepared.insert(pkg.to_string());
            changed = true;
        }
        if !changed {
            break closure;
        }
    };

    // Collapse subpackages to their repository roots and pin each root.
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut rebuilt: Vec<PackageSpec> = Vec::new();
    for pkg in closure.iter() {
        let repo_dir = ctx.cache.repo_dir(pkg);
        let root = match gitcmd::toplevel(&repo_dir) {
            Ok(top) => repo_root_package(&src_root, &top).unwrap_or_else(|| pkg.to_string()),
            Err(e) => {
                warn!("no repository for '{}': {}", pkg, e);
                pkg.to_string()
            }
        };
        if !seen.insert(root.clone()) {
            continue;
        }

        let mut spec = ctx
            .manifest
            .get(&root)
            .cloned()
            .unwrap_or_else(|| PackageSpec::named(&root));
        spec.version = gitcmd::describe(&ctx.cache.repo_dir(&root))
            .unwrap_or_else(|_| TIP_SENTINEL.to_string());
        info!("latest version of '{}': '{}'", root, spec.version);
        rebuilt.push(spec);
    }

    // Recorded pins from transitive packages; rediscovered entries win.
    let transitive: Vec<String> = rebuilt
        .iter()
        .filter(|s| s.transitive)
        .map(|s| s.package.clone())
        .collect();
    for pkg in transitive {
        for hint in godep::hints(&ctx.cache.repo_dir(&pkg))? {
            if !seen.contains(&hint.package) {
                seen.insert(hint.package.clone());
                rebuilt.push(hint);
            }
        }
    }

    ctx.manifest.imports = rebuilt;
    ctx.manifest.dedupe();
    ctx.manifest.write_to(&ctx.manifest_path)?;
    info!(
        "'{}' updated with {} packages",
        ctx.manifest_path.display(),
        ctx.manifest.imports.len()
    );
    Ok(())
}

/// A spec that checks `pkg` out at the default-branch tip, carrying over an
/// explicitly declared repo URL when the manifest has one.
fn tip_spec(manifest: &Manifest, pkg: &str) -> PackageSpec {
    let mut spec = PackageSpec::named(pkg);
    spec.version = TIP_SENTINEL.to_string();
    if let Some(existing) = manifest.get(pkg) {
        spec.repo = existing.repo.clone();
    }
    spec
}

/// The import path of the repository rooted at absolute path `toplevel`,
/// relative to the cache source root.
fn repo_root_package(src_root: &Path, toplevel: &str) -> Option<String> {
    let rel = Path::new(toplevel).strip_prefix(src_root).ok()?;
    let pkg = rel.to_string_lossy().replace('\\', "/");
    if pkg.is_empty() {
        None
    } else {
        Some(pkg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_repo_root_package() {
        let src_root = PathBuf::from("/cache/src");
        assert_eq!(
            repo_root_package(&src_root, "/cache/src/host.example/org/lib"),
            Some("host.example/org/lib".to_string())
        );
        assert_eq!(repo_root_package(&src_root, "/cache/src"), None);
        assert_eq!(repo_root_package(&src_root, "/elsewhere/lib"), None);
    }

    #[test]
    fn test_tip_spec_preserves_repo_url() {
        let mut manifest = Manifest {
            imports: vec![PackageSpec {
                package: "host.example/org/lib".to_string(),
                version: "v1".to_string(),
                repo: Some("https://mirror.example/lib.git".to_string()),
                ..PackageSpec::default()
            }],
            ..Manifest::default()
        };
        manifest.dedupe();

        let spec = tip_spec(&manifest, "host.example/org/lib");
        assert_eq!(spec.version, TIP_SENTINEL);
        assert_eq!(spec.repo.as_deref(), Some("https://mirror.example/lib.git"));

        let fresh = tip_spec(&manifest, "host.example/org/other");
        assert_eq!(fresh.version, TIP_SENTINEL);
        assert_eq!(fresh.repo, None);
    }
}
