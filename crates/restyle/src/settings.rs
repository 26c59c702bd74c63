//! User settings and the process-wide settings store.
//!
//! Settings persist as camelCase JSON under the user's config directory
//! and are shared between the daemon, the watchers and the CLI. Changes go
//! out on a watch channel so running watchers pick them up without being
//! restarted.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

pub const SETTINGS_FILE: &str = ".config/restyle/settings.json";

/// The default anthropomorphization level ("Balanced Assistant").
pub const DEFAULT_LEVEL: u8 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_key: String,
    pub system_prompt: String,
    pub anthropomorphize: u8,
    pub enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_key: String::new(),
            system_prompt: prompt_for_level(DEFAULT_LEVEL).to_string(),
            anthropomorphize: DEFAULT_LEVEL,
            enabled: false,
        }
    }
}

/// One step on the anthropomorphization scale.
pub struct PersonalityLevel {
    pub name: &'static str,
    pub style: &'static str,
    pub prompt: &'static str,
}

/// Index corresponds to the `anthropomorphize` setting.
pub const PERSONALITY_LEVELS: [PersonalityLevel; 5] = [
    PersonalityLevel {
        name: "Technical Assistant",
        style: "Precise, formal, and data-driven",
        prompt: "Analyze the following response and rewrite it with these characteristics:\n\
            - Use precise, technical language without colloquialisms\n\
            - Present information in a structured, logical manner\n\
            - Remove all personal pronouns (I, we, you) where possible\n\
            - Focus on objective facts and data\n\
            - Use passive voice for more formal tone\n\
            - Eliminate emotional language and personal opinions\n\
            - Structure responses with clear hierarchies and bullet points\n\
            - Be concise and direct without unnecessary pleasantries\n\
            Purely output the response, with no mention of what you are doing.\n\
            Original response to rewrite:",
    },
    PersonalityLevel {
        name: "Professional Assistant",
        style: "Clear, professional, and informative",
        prompt: "Improve the following response with these characteristics:\n\
            - Use clear, professional language\n\
            - Maintain a respectful but not overly formal tone\n\
            - Present information in a well-organized manner\n\
            - Use \"you\" sparingly and appropriately\n\
            - Focus on being helpful and informative\n\
            - Include relevant context where necessary\n\
            - Be thorough but avoid redundancy\n\
            - Maintain objectivity while being approachable\n\
            Purely output the response, with no mention of what you are doing.\n\
            Original response to improve:",
    },
    PersonalityLevel {
        name: "Balanced Assistant",
        style: "Clear, helpful, and appropriately friendly",
        prompt: "Enhance the following response with these characteristics:\n\
            - Balance professionalism with approachability\n\
            - Use clear, accessible language\n\
            - Include helpful explanations without being condescending\n\
            - Use \"you\" naturally where it improves clarity\n\
            - Provide comprehensive yet digestible information\n\
            - Add relevant examples when helpful\n\
            - Maintain a neutral, helpful tone\n\
            - Be informative while remaining engaging\n\
            Purely output the response, with no mention of what you are doing.\n\
            Original response to enhance:",
    },
    PersonalityLevel {
        name: "Friendly Guide",
        style: "Warm, encouraging, and conversational",
        prompt: "Transform the following response with these characteristics:\n\
            - Use warm, conversational language\n\
            - Include personal pronouns naturally (I'd suggest, you might find)\n\
            - Add encouraging phrases and positive reinforcement\n\
            - Use relatable examples and analogies\n\
            - Express understanding and empathy where appropriate\n\
            - Include helpful tips with a friendly tone\n\
            - Use casual but respectful language\n\
            - Make the interaction feel more like a friendly conversation\n\
            Purely output the response, with no mention of what you are doing.\n\
            Original response to transform:",
    },
    PersonalityLevel {
        name: "Personal Companion",
        style: "Highly personable, empathetic, and engaging",
        prompt: "Reimagine the following response with these characteristics:\n\
            - Use very warm, personal language\n\
            - Freely use personal pronouns to create connection\n\
            - Express enthusiasm and genuine interest\n\
            - Include empathetic statements and emotional support\n\
            - Use encouraging and motivating language\n\
            - Add personal touches and conversational elements\n\
            - Show understanding of potential feelings and concerns\n\
            - Create a sense of partnership and support\n\
            - Use exclamation points and emoticons sparingly but naturally\n\
            - Make the user feel heard, valued, and supported\n\
            Purely output the response, with no mention of what you are doing.\n\
            Original response to reimagine:",
    },
];

/// Rewrite prompt for an anthropomorphization level, clamped to the scale.
pub fn prompt_for_level(level: u8) -> &'static str {
    let index = (level as usize).min(PERSONALITY_LEVELS.len() - 1);
    PERSONALITY_LEVELS[index].prompt
}

/// Shared, persisted settings with change notification.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    path: PathBuf,
    current: RwLock<Settings>,
    tx: watch::Sender<Settings>,
}

impl SettingsStore {
    /// Open the store at `path`, reading existing settings or starting from
    /// defaults when the file is absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("invalid settings file {}", path.display()))?,
            Err(_) => Settings::default(),
        };
        let (tx, _) = watch::channel(settings.clone());
        Ok(SettingsStore {
            inner: Arc::new(StoreInner {
                path,
                current: RwLock::new(settings),
                tx,
            }),
        })
    }

    /// An in-memory store that never touches disk; handy for tests and
    /// embedded use.
    pub fn ephemeral(settings: Settings) -> Self {
        let (tx, _) = watch::channel(settings.clone());
        SettingsStore {
            inner: Arc::new(StoreInner {
                path: PathBuf::new(),
                current: RwLock::new(settings),
                tx,
            }),
        }
    }

    pub fn default_path() -> Result<PathBuf> {
        let mut path = dirs::home_dir().context("failed to find home directory")?;
        path.push(SETTINGS_FILE);
        Ok(path)
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn get(&self) -> Settings {
        self.inner.current.read().unwrap().clone()
    }

    /// Apply a mutation, persist it, and notify subscribers.
    pub fn update<F>(&self, mutate: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let updated = {
            let mut current = self.inner.current.write().unwrap();
            mutate(&mut current);
            current.clone()
        };
        self.persist(&updated)?;
        let _ = self.inner.tx.send(updated.clone());
        Ok(updated)
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<Settings> {
        self.update(|settings| settings.enabled = enabled)
    }

    /// Re-read the backing file, replacing the in-memory view. Used when an
    /// external writer (the CLI) announces a change.
    pub fn reload(&self) -> Result<Settings> {
        let raw = fs::read_to_string(&self.inner.path)
            .with_context(|| format!("failed to read {}", self.inner.path.display()))?;
        let settings: Settings = serde_json::from_str(&raw)
            .with_context(|| format!("invalid settings file {}", self.inner.path.display()))?;
        *self.inner.current.write().unwrap() = settings.clone();
        let _ = self.inner.tx.send(settings.clone());
        info!("settings reloaded");
        Ok(settings)
    }

    /// Change notifications; the receiver always observes the latest value.
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.inner.tx.subscribe()
    }

    fn persist(&self, settings: &Settings) -> Result<()> {
        if self.inner.path.as_os_str().is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.inner.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(settings)?;
        fs::write(&self.inner.path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.api_key.is_empty());
        assert!(!settings.enabled);
        assert_eq!(settings.anthropomorphize, 2);
        assert_eq!(settings.system_prompt, prompt_for_level(2));
    }

    #[test]
    fn test_camel_case_wire_format() {
        let settings = Settings {
            api_key: "k".to_string(),
            ..Settings::default()
        };
        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&settings).unwrap()).unwrap();
        assert_eq!(value["apiKey"], "k");
        assert!(value["systemPrompt"].is_string());
        assert_eq!(value["anthropomorphize"], 2);
        assert_eq!(value["enabled"], false);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::open(&path).unwrap();
        store
            .update(|settings| {
                settings.api_key = "secret".to_string();
                settings.anthropomorphize = 4;
                settings.system_prompt = prompt_for_level(4).to_string();
            })
            .unwrap();

        let reopened = SettingsStore::open(&path).unwrap();
        let settings = reopened.get();
        assert_eq!(settings.api_key, "secret");
        assert_eq!(settings.anthropomorphize, 4);
        assert_eq!(settings.system_prompt, prompt_for_level(4));
    }

    #[test]
    fn test_update_notifies_subscribers() {
        let store = SettingsStore::ephemeral(Settings::default());
        let mut rx = store.subscribe();

        store.set_enabled(true).unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().enabled);
    }

    #[test]
    fn test_reload_picks_up_external_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::open(&path).unwrap();

        let external = Settings {
            api_key: "external".to_string(),
            ..Settings::default()
        };
        fs::write(&path, serde_json::to_string(&external).unwrap()).unwrap();

        let settings = store.reload().unwrap();
        assert_eq!(settings.api_key, "external");
        assert_eq!(store.get().api_key, "external");
    }

    #[test]
    fn test_prompt_for_level_clamps() {
        assert_eq!(prompt_for_level(9), PERSONALITY_LEVELS[4].prompt);
    }

    #[test]
    fn test_partial_settings_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"apiKey": "only-key"}"#).unwrap();

        let store = SettingsStore::open(&path).unwrap();
        let settings = store.get();
        assert_eq!(settings.api_key, "only-key");
        assert_eq!(settings.anthropomorphize, 2);
    }
}
