//! Gemini generative-language client used for rewriting.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{RewriteError, RewriteResult};
use crate::rewrite::Rewriter;
use crate::settings::SettingsStore;

pub const GEMINI_HOST: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_MODEL: &str = "gemini-2.0-flash";

const TEMPERATURE: f64 = 0.7;
const TOP_K: u32 = 40;
const TOP_P: f64 = 0.95;
const MAX_OUTPUT_TOKENS: u32 = 8192;

/// Every harm category runs at its most permissive threshold.
const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub host: String,
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            host: GEMINI_HOST.to_string(),
            model: GEMINI_MODEL.to_string(),
        }
    }
}

/// Rewrites text through the Gemini API using the credential and style
/// prompt from the settings store.
pub struct GeminiRewriter {
    client: Client,
    config: GeminiConfig,
    settings: SettingsStore,
}

impl GeminiRewriter {
    pub fn new(config: GeminiConfig, settings: SettingsStore) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(GeminiRewriter {
            client,
            config,
            settings,
        })
    }

    async fn post(&self, api_key: &str, payload: Value) -> RewriteResult<Value> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.host.trim_end_matches('/'),
            self.config.model,
            api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RewriteError::Remote(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RewriteError::Remote(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|data| {
                    data.get("error")?
                        .get("message")?
                        .as_str()
                        .map(String::from)
                })
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(RewriteError::Remote(format!("Gemini API error: {message}")));
        }

        serde_json::from_str(&body).map_err(|_| RewriteError::invalid_response())
    }
}

#[async_trait]
impl Rewriter for GeminiRewriter {
    async fn rewrite(&self, text: &str) -> RewriteResult<String> {
        let settings = self.settings.get();
        if settings.api_key.is_empty() {
            return Err(RewriteError::missing_api_key());
        }

        // The blank line between the style instructions and the original
        // text matters for the model's output formatting.
        let prompt = format!("{}\n\n{}", settings.system_prompt, text);
        debug!(
            level = settings.anthropomorphize,
            chars = text.len(),
            "requesting rewrite"
        );

        let payload = json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "topK": TOP_K,
                "topP": TOP_P,
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
            },
            "safetySettings": HARM_CATEGORIES
                .iter()
                .map(|category| json!({"category": category, "threshold": "BLOCK_NONE"}))
                .collect::<Vec<_>>(),
        });

        let data = self.post(&settings.api_key, payload).await?;

        let parts = data
            .get("candidates")
            .and_then(|candidates| candidates.as_array())
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(|parts| parts.as_array())
            .ok_or_else(RewriteError::invalid_response)?;

        let modified: String = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(|text| text.as_str()))
            .collect();
        Ok(modified)
    }
}
