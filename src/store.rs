// src/store.rs

//! Local package store
//!
//! Layout under the store root:
//!
//! - `index.xml`: cached package index
//! - `<package>.tar.gz`: archive being installed (transient)
//! - `<package>/`: installed package contents

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory name of the store below `~/.local`
pub const STORE_DIR_NAME: &str = "reposx";

/// File name of the cached index
pub const INDEX_FILE_NAME: &str = "index.xml";

/// Separator used when exporting package paths to shells
pub const PATH_SEPARATOR: &str = ":";

/// Create a directory tree; succeeds if it already exists
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| {
        Error::IoError(format!("Failed to create directory {}: {}", path.display(), e))
    })
}

/// Per-user package store
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open the store at `<home>/.local/reposx`, creating it if needed
    pub fn open_default() -> Result<Self> {
        let home = dirs::home_dir().ok_or(Error::HomeDirNotFound)?;
        Self::open(home.join(".local").join(STORE_DIR_NAME))
    }

    /// Open the store at an explicit root, creating it if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        ensure_dir(&root)?;
        debug!("Opened local store at {}", root.display());
        Ok(Self { root })
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the cached index file
    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE_NAME)
    }

    /// Path the archive of `name` is downloaded to
    pub fn archive_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.tar.gz", name))
    }

    /// Directory `name` is installed into
    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Installed package directories, in directory listing order
    pub fn list_package_dirs(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            Error::IoError(format!("Failed to read {}: {}", self.root.display(), e))
        })?;

        let mut dirs = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                dirs.push(self.root.join(entry.file_name()));
            }
        }

        Ok(dirs)
    }

    /// Installed package directories joined for use in `PATH`-like variables
    pub fn package_paths(&self) -> Result<String> {
        let paths: Vec<String> = self
            .list_package_dirs()?
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();

        Ok(paths.join(PATH_SEPARATOR))
    }
}
