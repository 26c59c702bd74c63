use anyhow::Result;
use console::style;
use restyle::settings::{SettingsStore, PERSONALITY_LEVELS};

use crate::daemon::DaemonClient;

pub async fn handle_status(daemon: &DaemonClient) -> Result<()> {
    let store = SettingsStore::open(SettingsStore::default_path()?)?;
    let settings = store.get();

    let daemon_state = if daemon.ping().await {
        style("alive").green()
    } else {
        style("unreachable").red()
    };
    println!("{} {daemon_state}", style("daemon:").bold());

    let enabled = if settings.enabled {
        style("enabled").green()
    } else {
        style("disabled").yellow()
    };
    println!("{} {enabled}", style("rewriting:").bold());

    let level_index = (settings.anthropomorphize as usize).min(PERSONALITY_LEVELS.len() - 1);
    println!(
        "{} {} ({})",
        style("personality:").bold(),
        settings.anthropomorphize,
        PERSONALITY_LEVELS[level_index].name
    );

    let key = if settings.api_key.is_empty() {
        style("not configured").red()
    } else {
        style("configured").green()
    };
    println!("{} {key}", style("api key:").bold());
    Ok(())
}
