//! The rewrite seam between the pipeline and whatever performs the
//! rewrite: the Gemini client directly (in the daemon), the daemon over
//! HTTP (the content → background bridge), or a scripted mock in tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{RewriteError, RewriteResult};
use crate::message::{ModifyResponse, Request};

#[async_trait]
pub trait Rewriter: Send + Sync {
    /// One remote call per invocation; no batching, no automatic retry.
    async fn rewrite(&self, text: &str) -> RewriteResult<String>;
}

/// Bridges rewrite requests to a running `restyled` daemon.
pub struct DaemonRewriter {
    client: reqwest::Client,
    base_url: String,
}

impl DaemonRewriter {
    pub fn new(base_url: impl Into<String>) -> Self {
        DaemonRewriter {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Rewriter for DaemonRewriter {
    async fn rewrite(&self, text: &str) -> RewriteResult<String> {
        let url = format!("{}/message", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&Request::ModifyWithGemini {
                text: text.to_string(),
            })
            .send()
            .await
            .map_err(|e| RewriteError::Remote(e.to_string()))?;

        let body: ModifyResponse = response
            .json()
            .await
            .map_err(|e| RewriteError::Format(e.to_string()))?;

        if !body.success {
            return Err(RewriteError::Remote(
                body.error
                    .unwrap_or_else(|| "Failed to modify text".to_string()),
            ));
        }
        body.modified_text.ok_or_else(RewriteError::invalid_response)
    }
}

/// Scripted rewriter for tests: pops pre-configured results in order and
/// echoes the input once the script runs out.
pub struct MockRewriter {
    responses: Mutex<Vec<RewriteResult<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockRewriter {
    pub fn new(responses: Vec<RewriteResult<String>>) -> Self {
        MockRewriter {
            responses: Mutex::new(responses),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn echoing() -> Self {
        Self::new(Vec::new())
    }

    /// Texts this rewriter has been asked to rewrite, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Rewriter for MockRewriter {
    async fn rewrite(&self, text: &str) -> RewriteResult<String> {
        self.calls.lock().unwrap().push(text.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(text.to_string())
        } else {
            responses.remove(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_daemon_rewriter_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message"))
            .and(body_json(json!({"action": "modifyWithGemini", "text": "hi"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "modifiedText": "hello there"
            })))
            .mount(&server)
            .await;

        let rewriter = DaemonRewriter::new(server.uri());
        assert_eq!(rewriter.rewrite("hi").await.unwrap(), "hello there");
    }

    #[tokio::test]
    async fn test_daemon_rewriter_maps_failure_to_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "error": "Gemini API error: bad key"
            })))
            .mount(&server)
            .await;

        let rewriter = DaemonRewriter::new(server.uri());
        let err = rewriter.rewrite("hi").await.unwrap_err();
        assert_eq!(
            err,
            RewriteError::Remote("Gemini API error: bad key".to_string())
        );
    }

    #[tokio::test]
    async fn test_daemon_rewriter_missing_text_is_format_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;

        let rewriter = DaemonRewriter::new(server.uri());
        assert!(matches!(
            rewriter.rewrite("hi").await.unwrap_err(),
            RewriteError::Format(_)
        ));
    }

    #[tokio::test]
    async fn test_mock_rewriter_scripts_then_echoes() {
        let rewriter = MockRewriter::new(vec![Ok("scripted".to_string())]);
        assert_eq!(rewriter.rewrite("a").await.unwrap(), "scripted");
        assert_eq!(rewriter.rewrite("b").await.unwrap(), "b");
        assert_eq!(rewriter.calls(), vec!["a", "b"]);
    }
}
