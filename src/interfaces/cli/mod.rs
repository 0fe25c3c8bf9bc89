//! CLI interface module
//!
//! This module provides command-line interface functionality for tracelink.

pub mod commands;

use crate::cli::Commands;
use commands::{config_generate, issue_link, resolve_link, simulate_visit};
use std::fmt;

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<crate::errors::TracelinkError> for CliError {
    fn from(err: crate::errors::TracelinkError) -> Self {
        use crate::errors::TracelinkError;
        match err {
            TracelinkError::InvalidDestination(_) | TracelinkError::UnknownLink(_) => {
                CliError::CommandError(err.to_string())
            }
            TracelinkError::Serialization(_) | TracelinkError::Config(_) => {
                CliError::ParseError(err.to_string())
            }
            _ => CliError::StorageError(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::StorageError(format!("{:#}", err))
    }
}

/// Run a CLI command from clap-parsed input
pub async fn run_cli_command(cmd: Commands) -> Result<(), CliError> {
    match cmd {
        Commands::GenerateConfig { output_path, force } => {
            config_generate(output_path, force).await
        }
        Commands::Issue { destination_url } => issue_link(&destination_url).await,
        Commands::Resolve { id } => resolve_link(&id).await,
        Commands::Simulate { id, dwell_ms } => simulate_visit(&id, dwell_ms).await,
        Commands::Serve => Err(CliError::CommandError(
            "serve is handled by the server runtime".to_string(),
        )),
    }
}
