// src/lib.rs

//! reposx package manager
//!
//! Minimal package manager client that installs prebuilt tarballs into a
//! per-user store and exports their directories for shells.
//!
//! # Architecture
//!
//! - Index: a single `index.xml` listing packages with one URL per
//!   architecture family, cached in the store
//! - Store: `~/.local/reposx`, one directory per installed package
//! - Install: resolve name and host family, download, extract, clean up
//! - No versions, no dependencies, no checksums

pub mod arch;
pub mod config;
mod error;
pub mod install;
pub mod packages;
pub mod repository;
pub mod store;

pub use error::{Error, Result};
