// src/install.rs

//! Package installation
//!
//! Installing is strictly sequential:
//!
//! 1. Find the package in the index (first match wins)
//! 2. Pick the URL for the host architecture family
//! 3. Download the archive to `<root>/<name>.tar.gz`
//! 4. Create `<root>/<name>/`
//! 5. Extract the archive into it
//! 6. Remove the archive
//!
//! There is no rollback: a failure after step 4 leaves whatever was
//! extracted so far in place. The archive is removed on every path once
//! the download succeeded.
//!
//! Nothing is locked. Two processes installing the same package share the
//! archive path and the package directory.

use crate::arch::ArchFamily;
use crate::error::{Error, Result};
use crate::packages::archive::{EntryOutcome, extract_tar_gz};
use crate::repository::{Index, PackageEntry, RepositoryClient};
use crate::store::{INDEX_FILE_NAME, LocalStore, ensure_dir};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

/// A resolved install: what to fetch and where it goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub name: String,
    pub family: ArchFamily,
    pub url: String,
    pub archive_path: PathBuf,
    pub dest_dir: PathBuf,
}

/// Downloaded archive, deleted when dropped
#[derive(Debug)]
pub struct DownloadedArchive {
    path: Option<PathBuf>,
}

impl DownloadedArchive {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// Location of the archive on disk
    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Delete the archive now, reporting failure
    pub fn remove(mut self) -> Result<()> {
        match self.path.take() {
            Some(path) => fs::remove_file(&path).map_err(|e| {
                Error::IoError(format!("Failed to remove {}: {}", path.display(), e))
            }),
            None => Ok(()),
        }
    }
}

impl Drop for DownloadedArchive {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", path.display(), e);
                }
            }
        }
    }
}

/// Result of a completed install
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub name: String,
    pub dest_dir: PathBuf,
    pub outcomes: Vec<EntryOutcome>,
}

impl InstallReport {
    /// Entries written to disk
    pub fn extracted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_extracted()).count()
    }

    /// Entries left out (unsupported type or unsafe path)
    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.extracted_count()
    }
}

/// Installs packages from an index into a local store
#[derive(Debug, Clone, Copy)]
pub struct Installer<'a> {
    store: &'a LocalStore,
    client: &'a RepositoryClient,
}

impl<'a> Installer<'a> {
    /// Create an installer writing into `store`
    pub fn new(store: &'a LocalStore, client: &'a RepositoryClient) -> Self {
        Self { store, client }
    }

    /// Resolve `name` for the host architecture
    pub fn plan(&self, name: &str, index: &Index) -> Result<InstallPlan> {
        let entry = lookup(name, index)?;
        let family = ArchFamily::host()?;
        self.resolve(entry, family)
    }

    /// Resolve `name` for an explicit architecture family
    pub fn plan_for(&self, name: &str, index: &Index, family: ArchFamily) -> Result<InstallPlan> {
        let entry = lookup(name, index)?;
        self.resolve(entry, family)
    }

    /// Download the package archive into the store
    pub fn download(&self, plan: &InstallPlan) -> Result<DownloadedArchive> {
        self.client.download_file(&plan.url, &plan.archive_path)?;
        Ok(DownloadedArchive::new(plan.archive_path.clone()))
    }

    /// Create the package directory, extract the archive, remove the archive
    pub fn unpack(&self, plan: &InstallPlan, archive: DownloadedArchive) -> Result<InstallReport> {
        ensure_dir(&plan.dest_dir)?;

        let outcomes = extract_tar_gz(archive.path(), &plan.dest_dir)?;
        archive.remove()?;

        let report = InstallReport {
            name: plan.name.clone(),
            dest_dir: plan.dest_dir.clone(),
            outcomes,
        };

        info!(
            "Installed {} into {} ({} entries, {} skipped)",
            report.name,
            report.dest_dir.display(),
            report.extracted_count(),
            report.skipped_count()
        );
        Ok(report)
    }

    /// Install `name` for the host architecture
    pub fn install(&self, name: &str, index: &Index) -> Result<InstallReport> {
        let plan = self.plan(name, index)?;
        self.execute(&plan)
    }

    /// Install `name` for an explicit architecture family
    pub fn install_for(&self, name: &str, index: &Index, family: ArchFamily) -> Result<InstallReport> {
        let plan = self.plan_for(name, index, family)?;
        self.execute(&plan)
    }

    fn execute(&self, plan: &InstallPlan) -> Result<InstallReport> {
        let archive = self.download(plan)?;
        self.unpack(plan, archive)
    }

    fn resolve(&self, entry: &PackageEntry, family: ArchFamily) -> Result<InstallPlan> {
        let url = entry
            .url_for(family)
            .ok_or_else(|| Error::MissingArchitectureUrl {
                package: entry.name.clone(),
                family: family.to_string(),
            })?;

        Ok(InstallPlan {
            name: entry.name.clone(),
            family,
            url: url.to_string(),
            archive_path: self.store.archive_path(&entry.name),
            dest_dir: self.store.package_dir(&entry.name),
        })
    }
}

fn lookup<'i>(name: &str, index: &'i Index) -> Result<&'i PackageEntry> {
    let entry = index
        .find(name)
        .ok_or_else(|| Error::NotFoundError(format!("package {} not found", name)))?;

    // The name becomes a directory below the store root, next to the index
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if name != INDEX_FILE_NAME => Ok(entry),
        _ => Err(Error::InvalidPackageName(name.to_string())),
    }
}
