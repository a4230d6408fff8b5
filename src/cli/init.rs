//! Init command - write an example config file

use crate::config::UserConfig;
use crate::scoring::Status;
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

/// Write the example config to `target`, or to the user config path
pub fn run(target: Option<&Path>) -> Result<Status> {
    let path = match target {
        Some(path) => path.to_path_buf(),
        None => UserConfig::user_config_path()
            .context("Could not determine config directory")?,
    };

    let created = UserConfig::write_example(&path)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    if created {
        println!("{} Created {}", style("✓").green(), style(path.display()).cyan());
    } else {
        println!(
            "{} Config already exists at {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }
    println!(
        "\nSet {} or add {} under [ai] to enable the AI commands.",
        style("AI_API_KEY").bold(),
        style("api_keys").bold()
    );
    Ok(Status::Completed)
}
