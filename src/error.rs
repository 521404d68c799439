//! # Error Handling
//!
//! Centralized error type for the `vendo` pipeline, built with `thiserror`.
//!
//! The taxonomy mirrors the failure policy of the tool:
//!
//! - **Configuration errors** (`Manifest`, `MissingVersion`, `MissingRootPackage`)
//!   are reported before any filesystem mutation takes place.
//! - **Resolution errors** (`GitCommand`, `Checkout`, `Cache`) abort the whole
//!   run; vendoring never silently substitutes a wrong version.
//! - **Copy errors** (`Copy`) are fatal; a partially written vendor tree is
//!   never acceptable.
//! - Pruning and source-parse failures are *not* represented here because they
//!   are non-fatal by design: they are logged at the call site and the run
//!   continues.
//!
//! The `Result<T>` alias is used throughout the library; the binary boundary
//! converts into `anyhow::Error` for final reporting.

use thiserror::Error;

/// Main error type for vendo operations
#[derive(Error, Debug)]
pub enum Error {
    /// The manifest file is malformed or describes an impossible configuration.
    #[error("manifest error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Manifest {
        message: String,
        /// Optional hint for how to fix the manifest
        hint: Option<String>,
    },

    /// A declared package carries no pinned version.
    #[error("version not specified for package '{package}'")]
    MissingVersion { package: String },

    /// The root package is needed (update or prune) but is not declared.
    #[error("root package not set\n  hint: add a 'package:' entry naming the project's import path to the manifest")]
    MissingRootPackage,

    /// A git subprocess exited unsuccessfully.
    #[error("`git {args}` failed in '{dir}':\n{stderr}")]
    GitCommand {
        args: String,
        dir: String,
        stderr: String,
    },

    /// Checking out a pinned version failed after the retry policy was
    /// exhausted.
    #[error("checkout of '{package}' at '{version}' failed: {message}")]
    Checkout {
        package: String,
        version: String,
        message: String,
    },

    /// A repository cache entry could not be created or repaired.
    #[error("cache error for '{package}': {message}")]
    Cache { package: String, message: String },

    /// Copying a resolved package tree into the vendor directory failed.
    #[error("copy failed: '{src}' -> '{dst}': {message}")]
    Copy {
        src: String,
        dst: String,
        message: String,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON parsing error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_manifest() {
        let error = Error::Manifest {
            message: "duplicate key".to_string(),
            hint: None,
        };
        let display = format!("{}", error);
        assert!(display.contains("manifest error"));
        assert!(display.contains("duplicate key"));
    }

    #[test]
    fn test_error_display_manifest_with_hint() {
        let error = Error::Manifest {
            message: "no manifest found".to_string(),
            hint: Some("run with --update to create one".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("hint:"));
        assert!(display.contains("--update"));
    }

    #[test]
    fn test_error_display_missing_version() {
        let error = Error::MissingVersion {
            package: "host.example/org/lib".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("version not specified"));
        assert!(display.contains("host.example/org/lib"));
    }

    #[test]
    fn test_error_display_git_command() {
        let error = Error::GitCommand {
            args: "fetch -f -t origin".to_string(),
            dir: "/cache/src/host.example/org/lib".to_string(),
            stderr: "could not resolve host".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("git fetch -f -t origin"));
        assert!(display.contains("could not resolve host"));
    }

    #[test]
    fn test_error_display_checkout() {
        let error = Error::Checkout {
            package: "host.example/org/lib".to_string(),
            version: "v1.2.3".to_string(),
            message: "unknown revision".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("host.example/org/lib"));
        assert!(display.contains("v1.2.3"));
        assert!(display.contains("unknown revision"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("file not found"));
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_error =
            serde_yaml::from_str::<serde_yaml::Value>("invalid: [unclosed").unwrap_err();
        let error: Error = yaml_error.into();
        assert!(format!("{}", error).contains("YAML parsing error"));
    }
}
