//! Command-line interface definitions using clap
//!
//! This module defines the CLI structure for tracelink using clap's derive macros.

use clap::{Parser, Subcommand};

/// Tracelink - tracking links with a dwell-then-redirect visit page
#[derive(Parser)]
#[command(name = "tracelink")]
#[command(version)]
#[command(about = "Issue tracking links and capture visit telemetry", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true, default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Issue a tracking link for a destination URL
    Issue {
        /// Destination (decoy) URL, absolute http(s)
        destination_url: String,
    },

    /// Resolve a link id to its destination URL
    Resolve {
        /// Link id
        id: String,
    },

    /// Run a headless visit against a link id
    ///
    /// Collects the local environment as the fingerprint, sends the report to
    /// `reporting.endpoint` when configured and prints the redirect target.
    Simulate {
        /// Link id
        id: String,

        /// Override the dwell interval in milliseconds
        #[arg(long)]
        dwell_ms: Option<u64>,
    },

    /// Generate example configuration file
    GenerateConfig {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Force overwrite without confirmation
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["tracelink"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, "config.toml");
    }

    #[test]
    fn test_parse_issue() {
        let cli = Cli::try_parse_from(["tracelink", "issue", "https://example.com"]).unwrap();
        match cli.command {
            Some(Commands::Issue { destination_url }) => {
                assert_eq!(destination_url, "https://example.com")
            }
            _ => panic!("expected issue"),
        }
    }

    #[test]
    fn test_parse_simulate_with_dwell() {
        let cli = Cli::try_parse_from([
            "tracelink",
            "-c",
            "other.toml",
            "simulate",
            "abc",
            "--dwell-ms",
            "10",
        ])
        .unwrap();
        assert_eq!(cli.config, "other.toml");
        assert!(matches!(
            cli.command,
            Some(Commands::Simulate { ref id, dwell_ms: Some(10) }) if id == "abc"
        ));
    }

    #[test]
    fn test_issue_requires_url() {
        assert!(Cli::try_parse_from(["tracelink", "issue"]).is_err());
    }
}
