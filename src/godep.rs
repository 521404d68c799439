//! Reads dependency pins recorded by the Godep tool (`Godeps/Godeps.json`)
//! out of vendored package trees, so transitively vendored projects bring
//! their own version hints along.

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::manifest::PackageSpec;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GodepFile {
    #[serde(default)]
    deps: Vec<GodepDep>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GodepDep {
    import_path: String,
    rev: String,
    #[serde(default)]
    repository: Option<String>,
}

/// Load the pins declared by the package rooted at `pkg_dir`.
///
/// A missing manifest file means the package simply declares nothing.
pub fn hints(pkg_dir: &Path) -> Result<Vec<PackageSpec>> {
    let path = pkg_dir.join("Godeps/Godeps.json");
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let file: GodepFile = serde_json::from_str(&data)?;
    Ok(file
        .deps
        .into_iter()
        .map(|dep| PackageSpec {
            package: dep.import_path,
            version: dep.rev,
            repo: dep.repository.filter(|r| !r.is_empty()),
            ..PackageSpec::default()
        })
        .collect())
}
