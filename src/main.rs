// src/main.rs

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use reposx::config::{Config, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use reposx::install::Installer;
use reposx::repository::Repository;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "reposx")]
#[command(author, version, about = "Minimal package manager for prebuilt tarballs", long_about = None)]
struct Cli {
    /// Package origin serving index.xml
    #[arg(long, global = true, env = "REPOSX_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Store root (default: ~/.local/reposx)
    #[arg(long, global = true, env = "REPOSX_ROOT")]
    root: Option<PathBuf>,

    /// HTTP timeout in seconds, 0 disables it
    #[arg(long, global = true, env = "REPOSX_TIMEOUT", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Update package list
    Update,
    /// Install package
    Install {
        /// Package name as listed in the index
        package: String,
    },
    /// Get package paths for shells
    Paths,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            base_url: self.base_url.clone(),
            root: self.root.clone(),
            timeout: (self.timeout > 0).then(|| Duration::from_secs(self.timeout)),
        }
    }
}

fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Update => {
            info!("Updating package list from {}", config.base_url);

            let store = config.open_store().context("Error updating package list")?;
            let repo = Repository::new(config).context("Error updating package list")?;
            let index = repo
                .load_index(&store, true)
                .context("Error updating package list")?;

            println!("[...] Package list updated successfully ({} packages)", index.len());
            Ok(())
        }
        Commands::Install { package } => {
            let store = config.open_store().context("Error reading package list")?;
            let repo = Repository::new(config).context("Error reading package list")?;
            let index = repo
                .load_index(&store, false)
                .context("Error reading package list")?;

            let failed = || format!("Error installing package {}", package);
            let installer = Installer::new(&store, repo.client());

            let plan = installer.plan(&package, &index).with_context(failed)?;

            println!("[...] downloading {}", plan.url);
            let archive = installer.download(&plan).with_context(failed)?;

            println!("[...] extracting {}", archive.path().display());
            let report = installer.unpack(&plan, archive).with_context(failed)?;

            if report.skipped_count() > 0 {
                println!(
                    "[...] skipped {} unsupported archive entries",
                    report.skipped_count()
                );
            }
            println!("[...] Package {} installed successfully", package);
            Ok(())
        }
        Commands::Paths => {
            let store = config.open_store().context("Error getting package paths")?;
            let paths = store
                .package_paths()
                .context("Error getting package paths")?;

            println!("{}", paths);
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    // Logs go to stderr so `reposx paths` output stays usable in $(...)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let config = cli.config();

    let Some(command) = cli.command else {
        println!("reposx v{}", env!("CARGO_PKG_VERSION"));
        let _ = Cli::command().print_help();
        return ExitCode::FAILURE;
    };

    match run(command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ ! ] {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_install_requires_package() {
        assert!(Cli::try_parse_from(["reposx", "install"]).is_err());
        assert!(Cli::try_parse_from(["reposx", "install", "a", "b"]).is_err());
        assert!(Cli::try_parse_from(["reposx", "frobnicate"]).is_err());
    }

    #[test]
    fn test_config_from_flags() {
        let cli = Cli::try_parse_from([
            "reposx",
            "--base-url",
            "http://localhost:8080/repo/",
            "--root",
            "/tmp/store",
            "--timeout",
            "0",
            "paths",
        ])
        .unwrap();

        let config = cli.config();
        assert_eq!(config.base_url, "http://localhost:8080/repo/");
        assert_eq!(config.root, Some(PathBuf::from("/tmp/store")));
        assert_eq!(config.timeout, None);
        assert!(matches!(cli.command, Some(Commands::Paths)));
    }

    #[test]
    fn test_config_defaults() {
        let cli = Cli::try_parse_from(["reposx", "update"]).unwrap();

        // Environment may override in CI; only check when unset
        if std::env::var_os("REPOSX_BASE_URL").is_none() {
            assert_eq!(cli.config().base_url, DEFAULT_BASE_URL);
        }
        if std::env::var_os("REPOSX_TIMEOUT").is_none() {
            assert_eq!(cli.config().timeout, Some(DEFAULT_TIMEOUT));
        }
    }
}
