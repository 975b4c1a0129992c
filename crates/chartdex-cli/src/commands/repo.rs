//! Repository management commands

use console::style;

use super::Settings;
use crate::error::Result;

/// List configured repositories
pub fn list(settings: &Settings) -> Result<()> {
    let config = settings.load_config()?;

    if config.repositories.is_empty() {
        println!("No repositories configured.");
        println!();
        println!(
            "Add entries to {}",
            style(settings.repository_config.display()).cyan()
        );
        return Ok(());
    }

    println!("{:<20} {}", "NAME", "URL");
    println!("{}", "-".repeat(80));

    for repo in &config.repositories {
        println!("{:<20} {}", repo.name, repo.url);
    }

    Ok(())
}
