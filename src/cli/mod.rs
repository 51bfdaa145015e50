//! Command-line interface for vcs-index.
//!
//! The CLI is thin glue over [`crate::discovery::scan`]: it parses
//! repository options, runs one scan per URL (concurrently; scans share
//! nothing but the read-mostly manifest cache), and prints one JSON
//! [`DiscoveryResult`](crate::discovery::DiscoveryResult) per repository on
//! stdout. Warnings about skipped refs go to stderr through `tracing`.
//!
//! # Examples
//!
//! ```bash
//! # Scan one repository and pretty-print its catalog
//! vcs-index scan https://github.com/acme/widget.git --pretty
//!
//! # Scan several repositories concurrently under a canonical name scheme
//! vcs-index scan git@github.com:acme/widget.git git@github.com:acme/gadget.git
//!
//! # Unusual layouts: manifest name and release-tag prefix
//! vcs-index scan https://example.com/repo.git \
//!     --manifest-path module.json --release-prefix rel-
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use futures::future::join_all;
use tracing_subscriber::EnvFilter;

use crate::cache::ManifestCache;
use crate::core::display_error;
use crate::discovery::{self, RepositoryConfig};
use crate::driver::DriverRegistry;

/// Top-level CLI for the VCS package-version indexer.
#[derive(Parser)]
#[command(
    name = "vcs-index",
    about = "Discover installable package versions from VCS tags and branches",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show per-ref diagnostics (equivalent to RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only report errors, suppressing per-ref skip warnings
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan repositories and print their package catalogs as JSON
    Scan(ScanArgs),
}

#[derive(clap::Args)]
struct ScanArgs {
    /// Repository URLs to scan
    #[arg(required = true)]
    urls: Vec<String>,

    /// Force a driver kind instead of autodetecting by URL
    #[arg(long)]
    kind: Option<String>,

    /// Canonical package name overriding whatever the manifests declare
    #[arg(long)]
    package_name: Option<String>,

    /// Manifest file name read at each revision
    #[arg(long, default_value = "package.json")]
    manifest_path: String,

    /// Tag prefix marking release tags, stripped before interpretation
    #[arg(long, default_value = "release-")]
    release_prefix: String,

    /// Directory for repository mirrors (defaults to the platform cache dir)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

impl Cli {
    /// Initialize tracing according to the verbosity flags, honoring an
    /// explicit `RUST_LOG` if one is set.
    pub fn init_logging(&self) {
        let default_level = if self.verbose {
            "vcs_index=debug"
        } else if self.quiet {
            "vcs_index=error"
        } else {
            "vcs_index=warn"
        };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    /// Run the selected command.
    ///
    /// # Errors
    ///
    /// Returns an error when any repository scan failed; successful scans
    /// still print their results first.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Scan(args) => scan_command(args).await,
        }
    }
}

async fn scan_command(args: ScanArgs) -> Result<()> {
    let registry = DriverRegistry::with_default_drivers();
    let cache = Arc::new(ManifestCache::new());

    let scans = args.urls.iter().map(|url| {
        let mut config = RepositoryConfig::new(url);
        config.kind = args.kind.clone();
        config.package_name = args.package_name.clone();
        config.manifest_path = args.manifest_path.clone();
        config.release_prefix = Some(args.release_prefix.clone());
        config.cache_dir = args.cache_dir.clone();
        discovery::scan(config, &registry, Arc::clone(&cache))
    });

    let mut failures = 0usize;
    for outcome in join_all(scans).await {
        match outcome {
            Ok(result) => {
                if result.branch_error_occurred {
                    tracing::warn!(
                        "some branches of {} contained invalid manifests and were skipped",
                        result.url
                    );
                }
                let rendered = if args.pretty {
                    serde_json::to_string_pretty(&result)?
                } else {
                    serde_json::to_string(&result)?
                };
                println!("{rendered}");
            }
            Err(e) => {
                display_error(&e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} scans failed", args.urls.len());
    }
    Ok(())
}
