mod commands;
mod daemon;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::daemon::DaemonClient;

#[derive(Parser)]
#[command(author, version, about = "Configure and control the Restyle response rewriter", long_about = None)]
struct Cli {
    /// Base URL of a running restyled daemon
    #[arg(long, default_value = "http://127.0.0.1:7878")]
    daemon_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Interactively set the API key, personality level and enabled flag
    Configure,
    /// Turn rewriting on across attached pages
    Enable,
    /// Turn rewriting off
    Disable,
    /// Show daemon liveness and the current settings
    Status,
    /// List the available personality levels
    Levels,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let daemon = DaemonClient::new(&cli.daemon_url);

    match cli.command {
        Command::Configure => commands::configure::handle_configure(&daemon).await?,
        Command::Enable => commands::toggle::handle_toggle(&daemon, true).await?,
        Command::Disable => commands::toggle::handle_toggle(&daemon, false).await?,
        Command::Status => commands::status::handle_status(&daemon).await?,
        Command::Levels => commands::levels::handle_levels(),
    }
    Ok(())
}
