// src/packages/mod.rs

//! Package format support for reposx
//!
//! Packages are plain gzip-compressed tarballs; this module unpacks them.

pub mod archive;

pub use archive::{EntryOutcome, SkipReason, extract_tar_gz};
