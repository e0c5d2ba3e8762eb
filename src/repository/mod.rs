// src/repository/mod.rs

//! Repository access and package downloading
//!
//! This module provides functionality for:
//! - Downloading files from the package origin
//! - Fetching the package index, or reading it from the local cache

pub mod index;

pub use index::{Index, PackageEntry};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::LocalStore;
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// HTTP client wrapper
///
/// Downloads are single attempts: no retry, no resume, no checksum check.
#[derive(Debug, Clone)]
pub struct RepositoryClient {
    client: Client,
}

impl RepositoryClient {
    /// Create a new client with an optional request timeout
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        // The blocking client defaults to 30s; `None` must be passed explicitly
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Download a file to the specified path
    ///
    /// The body is streamed into a sibling `.tmp` file which is renamed over
    /// `dest_path` once complete, so an interrupted transfer never replaces
    /// an existing file.
    pub fn download_file(&self, url: &str, dest_path: &Path) -> Result<()> {
        info!("Downloading {} to {}", url, dest_path.display());

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::DownloadError(format!("Failed to download {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::DownloadError(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let temp_path = dest_path.with_extension("tmp");
        let mut file = File::create(&temp_path).map_err(|e| {
            Error::IoError(format!("Failed to create file {}: {}", temp_path.display(), e))
        })?;

        if let Err(e) = io::copy(&mut response, &mut file) {
            drop(file);
            let _ = fs::remove_file(&temp_path);
            return Err(Error::DownloadError(format!(
                "Failed to read body from {}: {}",
                url, e
            )));
        }
        drop(file);

        fs::rename(&temp_path, dest_path).map_err(|e| {
            Error::IoError(format!(
                "Failed to move {} to {}: {}",
                temp_path.display(),
                dest_path.display(),
                e
            ))
        })?;

        debug!("Downloaded {}", dest_path.display());
        Ok(())
    }
}

/// The package origin: where the index lives, plus the client to reach it
#[derive(Debug, Clone)]
pub struct Repository {
    base_url: String,
    client: RepositoryClient,
}

impl Repository {
    /// Create a repository from configuration
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            base_url: config.base_url.clone(),
            client: RepositoryClient::new(config.timeout)?,
        })
    }

    /// HTTP client shared with the installer
    pub fn client(&self) -> &RepositoryClient {
        &self.client
    }

    /// URL of the remote index document
    pub fn index_url(&self) -> String {
        if self.base_url.ends_with('/') {
            format!("{}index.xml", self.base_url)
        } else {
            format!("{}/index.xml", self.base_url)
        }
    }

    /// Load the package index
    ///
    /// With `force` unset and a cached index present, the cache is parsed
    /// without touching the network. Otherwise the index is downloaded over
    /// the cache first.
    pub fn load_index(&self, store: &LocalStore, force: bool) -> Result<Index> {
        let index_path = store.index_path();

        if !force && index_path.is_file() {
            debug!("Reading cached index from {}", index_path.display());
            return Index::from_file(&index_path);
        }

        info!("Fetching package index from {}", self.index_url());
        self.client.download_file(&self.index_url(), &index_path)?;

        let index = Index::from_file(&index_path)?;
        info!("Fetched index with {} packages", index.len());
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    const INDEX_XML: &str = r#"<packages>
  <package name="foo">
    <amd><url>http://example.com/foo-amd.tar.gz</url></amd>
    <arm><url>http://example.com/foo-arm.tar.gz</url></arm>
  </package>
</packages>"#;

    fn setup(server: &Server) -> (tempfile::TempDir, LocalStore, Repository) {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(temp_dir.path()).unwrap();
        let repo = Repository::new(&Config::with_base_url(server.url())).unwrap();
        (temp_dir, store, repo)
    }

    #[test]
    fn test_index_url() {
        let repo = Repository::new(&Config::with_base_url("http://host/reposx/")).unwrap();
        assert_eq!(repo.index_url(), "http://host/reposx/index.xml");

        let repo = Repository::new(&Config::with_base_url("http://host/reposx")).unwrap();
        assert_eq!(repo.index_url(), "http://host/reposx/index.xml");
    }

    #[test]
    fn test_load_index_fetches_when_cache_missing() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/index.xml")
            .with_status(200)
            .with_body(INDEX_XML)
            .expect(1)
            .create();

        let (_temp, store, repo) = setup(&server);
        let index = repo.load_index(&store, false).unwrap();

        mock.assert();
        assert_eq!(index.len(), 1);
        assert_eq!(fs::read_to_string(store.index_path()).unwrap(), INDEX_XML);
    }

    #[test]
    fn test_load_index_uses_cache_without_network() {
        let mut server = Server::new();
        let mock = server.mock("GET", "/index.xml").expect(0).create();

        let (_temp, store, repo) = setup(&server);
        fs::write(store.index_path(), INDEX_XML).unwrap();

        let index = repo.load_index(&store, false).unwrap();

        mock.assert();
        assert_eq!(index.find("foo").unwrap().arm_url, "http://example.com/foo-arm.tar.gz");
    }

    #[test]
    fn test_load_index_force_overwrites_cache() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/index.xml")
            .with_status(200)
            .with_body(INDEX_XML)
            .expect(1)
            .create();

        let (_temp, store, repo) = setup(&server);
        fs::write(store.index_path(), "<packages/>").unwrap();

        let index = repo.load_index(&store, true).unwrap();

        mock.assert();
        assert_eq!(index.len(), 1);
        assert_eq!(fs::read_to_string(store.index_path()).unwrap(), INDEX_XML);
        assert!(!store.root().join("index.tmp").exists());
    }

    #[test]
    fn test_load_index_http_error_keeps_cache() {
        let mut server = Server::new();
        let _mock = server.mock("GET", "/index.xml").with_status(404).create();

        let (_temp, store, repo) = setup(&server);
        fs::write(store.index_path(), "<packages/>").unwrap();

        let result = repo.load_index(&store, true);

        assert!(matches!(result, Err(Error::DownloadError(_))));
        assert_eq!(fs::read_to_string(store.index_path()).unwrap(), "<packages/>");
    }

    #[test]
    fn test_load_index_malformed_document() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", "/index.xml")
            .with_status(200)
            .with_body("<packages><package name=\"foo\">")
            .create();

        let (_temp, store, repo) = setup(&server);
        let result = repo.load_index(&store, true);

        assert!(matches!(result, Err(Error::ParseError(_))));
    }

    #[test]
    fn test_download_file_unreachable_host() {
        let client = RepositoryClient::new(Some(Duration::from_secs(5))).unwrap();
        let temp_dir = tempfile::tempdir().unwrap();
        let dest = temp_dir.path().join("out.tar.gz");

        // Port 1 is reserved and nothing listens there
        let result = client.download_file("http://127.0.0.1:1/pkg.tar.gz", &dest);

        assert!(matches!(result, Err(Error::DownloadError(_))));
        assert!(!dest.exists());
    }
}
