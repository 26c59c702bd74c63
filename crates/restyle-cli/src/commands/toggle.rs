use anyhow::Result;
use console::style;
use restyle::message::Request;
use restyle::settings::SettingsStore;

use crate::daemon::DaemonClient;

pub async fn handle_toggle(daemon: &DaemonClient, enabled: bool) -> Result<()> {
    let store = SettingsStore::open(SettingsStore::default_path()?)?;
    store.set_enabled(enabled)?;

    if enabled {
        daemon.notify(&Request::InjectContentScript).await;
    }
    let reachable = daemon.notify(&Request::ToggleExtension { enabled }).await;

    let state = if enabled {
        style("enabled").green()
    } else {
        style("disabled").yellow()
    };
    if reachable {
        println!("Rewriting {state}.");
    } else {
        println!("Rewriting {state}; no daemon reachable, applies on its next start.");
    }
    Ok(())
}
