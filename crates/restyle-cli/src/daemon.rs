//! Thin client for a running `restyled` daemon. Every notification is
//! best-effort: the daemon may simply not be running yet, and settings are
//! persisted either way.

use anyhow::Result;
use restyle::message::Request;
use serde_json::Value;

pub struct DaemonClient {
    client: reqwest::Client,
    base_url: String,
}

impl DaemonClient {
    pub fn new(base_url: &str) -> Self {
        DaemonClient {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn send(&self, request: &Request) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}/message", self.base_url))
            .json(request)
            .send()
            .await?;
        Ok(response.json().await?)
    }

    /// Fire a notification, swallowing connection errors. Returns whether
    /// the daemon was reachable.
    pub async fn notify(&self, request: &Request) -> bool {
        self.send(request).await.is_ok()
    }

    pub async fn ping(&self) -> bool {
        match self.send(&Request::Ping).await {
            Ok(response) => response["status"] == "alive",
            Err(_) => false,
        }
    }
}
