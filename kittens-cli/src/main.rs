use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(
    name = "kittens",
    about = "Follow a Subversion repository and credit commits to a roster of contributors"
)]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Print revisions from the repository log
    Log(commands::log::LogArgs),
    /// Re-derive attribution links for stored revisions
    Rebuild(commands::rebuild::RebuildArgs),
    /// Run the kittens server
    Serve(commands::serve::ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Config(args) => commands::config::run(args),
        Commands::Log(args) => commands::log::run(args).await,
        Commands::Rebuild(args) => commands::rebuild::run(args).await,
        Commands::Serve(args) => commands::serve::run(args).await,
    }
}
