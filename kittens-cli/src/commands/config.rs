use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use kittens_core::ContributorConfig;

use crate::config::{ConfigLoader, KittensConfig};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the merged configuration
    Show {
        /// Print JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
    /// Show where configuration and data are read from
    Path,
    /// List the tracked contributors
    Roster,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show { json } => show_config(&ConfigLoader::load()?, json),
        ConfigCommands::Path => show_paths(),
        ConfigCommands::Roster => {
            let config = ConfigLoader::load()?;
            println!("{}", roster_table(&config.contributors));
            Ok(())
        }
    }
}

fn show_config(config: &KittensConfig, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}

fn show_paths() -> Result<()> {
    let describe = |path: Option<std::path::PathBuf>| {
        path.map_or_else(|| "(unavailable)".to_string(), |p| p.display().to_string())
    };
    println!("User config:    {}", describe(ConfigLoader::user_config_path()));
    println!("Project config: {}", describe(Some(ConfigLoader::project_config_path())));
    println!("Database:       {}", describe(ConfigLoader::default_store_path()));
    Ok(())
}

fn roster_table(roster: &[ContributorConfig]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Email", "Name"]);
    for contributor in roster {
        table.add_row(vec![contributor.email.as_str(), contributor.name.as_str()]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_table_lists_every_contributor() {
        let rendered = roster_table(&[
            ContributorConfig::new("a@x.com", "Alice"),
            ContributorConfig::new("jane@x.com", "Jane Doe"),
        ])
        .to_string();
        assert!(rendered.contains("a@x.com"));
        assert!(rendered.contains("Jane Doe"));
    }
}
