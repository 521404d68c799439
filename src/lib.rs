//! # Vendo Library
//!
//! Vendors the Go dependencies a project pins in its manifest: each declared
//! import path is fetched into a shared git-backed cache, checked out at its
//! pinned version, copied into the project's `vendor` directory, and the
//! result is pruned down to the packages the project's own source actually
//! imports.
//!
//! The pipeline is split into focused modules:
//!
//! - [`manifest`] — the `vendor.conf` model: parsing, normalization, saving
//! - [`gosrc`] — static scanning of Go source (imports, build tags, cgo)
//! - [`closure`] — the import-closure fixed point over package directories
//! - [`gitcmd`] — git subprocess plumbing with explicit working directories
//! - [`cache`] — the shared per-package repository cache
//! - [`resolve`] — turning version pins into detached checkouts
//! - [`sync`] — copying checked-out trees into the vendor directory
//! - [`prune`] — shrinking the vendor tree to the used closure
//! - [`godep`] — version hints recorded by transitively vendored projects
//! - [`error`] — the crate-wide error type

pub mod cache;
pub mod closure;
pub mod error;
pub mod gitcmd;
pub mod godep;
pub mod gosrc;
pub mod manifest;
pub mod prune;
pub mod resolve;
pub mod sync;

#[cfg(test)]
mod closure_proptest;
