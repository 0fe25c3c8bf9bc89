//! Issue / resolve commands

use colored::Colorize;

use crate::interfaces::cli::CliError;

use super::open_registry;

pub async fn issue_link(destination_url: &str) -> Result<(), CliError> {
    let registry = open_registry().await?;
    let link = registry.issue(destination_url).await?;

    println!(
        "{} Issued tracking link: {} -> {}",
        "✓".bold().green(),
        link.id.cyan(),
        link.destination_url.blue().underline()
    );
    println!("  {}", registry.link_url(&link.id).magenta());

    Ok(())
}

pub async fn resolve_link(id: &str) -> Result<(), CliError> {
    let registry = open_registry().await?;
    let link = registry.lookup(id).await?;

    println!(
        "{} -> {} (created: {})",
        link.id.cyan(),
        link.destination_url.blue().underline(),
        link.created_at
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string()
            .yellow()
    );

    Ok(())
}
