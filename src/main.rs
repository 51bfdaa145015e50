//! vcs-index CLI entry point.
//!
//! Parses arguments, wires up logging, and delegates to the `scan`
//! command. Failures print through the shared error display and exit
//! non-zero.

use anyhow::Result;
use clap::Parser;
use vcs_index::cli::Cli;
use vcs_index::core::display_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    // Colored output needs explicit enabling on Windows terminals.
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
