use anyhow::Result;
use cliclack::spinner;
use console::style;
use restyle::message::Request;
use restyle::settings::{prompt_for_level, SettingsStore, PERSONALITY_LEVELS};

use crate::daemon::DaemonClient;

pub async fn handle_configure(daemon: &DaemonClient) -> Result<()> {
    cliclack::intro(style(" configure-restyle ").on_cyan().black())?;

    let store = SettingsStore::open(SettingsStore::default_path()?)?;
    let current = store.get();

    let api_key = if current.api_key.is_empty() {
        cliclack::password("Enter your Gemini API key")
            .mask('▪')
            .interact()?
    } else {
        let _ = cliclack::log::info("A Gemini API key is already configured.");
        if cliclack::confirm("Would you like to overwrite it?").interact()? {
            cliclack::password("Enter the new Gemini API key")
                .mask('▪')
                .interact()?
        } else {
            current.api_key.clone()
        }
    };

    let items: Vec<(usize, &str, &str)> = PERSONALITY_LEVELS
        .iter()
        .enumerate()
        .map(|(index, level)| (index, level.name, level.style))
        .collect();
    let level = cliclack::select("Which personality should rewritten responses have?")
        .initial_value(current.anthropomorphize as usize)
        .items(&items)
        .interact()?;

    let enabled = cliclack::confirm("Enable rewriting now?")
        .initial_value(current.enabled)
        .interact()?;

    store.update(|settings| {
        settings.api_key = api_key.clone();
        settings.anthropomorphize = level as u8;
        settings.system_prompt = prompt_for_level(level as u8).to_string();
        settings.enabled = enabled;
    })?;

    let spin = spinner();
    spin.start("Notifying the daemon...");
    let reachable = daemon.notify(&Request::UpdateSettings).await;
    if reachable && enabled {
        daemon.notify(&Request::InjectContentScript).await;
        daemon.notify(&Request::ToggleExtension { enabled }).await;
    }
    spin.stop(if reachable {
        "Daemon updated"
    } else {
        "No daemon reachable; settings apply on its next start"
    });

    cliclack::outro(format!("Settings saved to: {:?}", store.path()))?;
    Ok(())
}
