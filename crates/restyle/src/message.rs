//! Request/response envelopes for the content ↔ background ↔ settings-UI
//! bridge. The `action` discriminator and field names are the wire format;
//! changing them breaks older peers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Rewrite `text` through the configured Gemini model.
    ModifyWithGemini { text: String },
    /// Ensure every attached page session has a running watcher.
    InjectContentScript,
    /// Liveness probe.
    Ping,
    /// Persisted settings changed externally; reload and broadcast.
    UpdateSettings,
    /// Flip the enabled flag and start/stop watchers to match.
    ToggleExtension { enabled: bool },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModifyResponse {
    pub fn ok(modified_text: impl Into<String>) -> Self {
        ModifyResponse {
            success: true,
            modified_text: Some(modified_text.into()),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        ModifyResponse {
            success: false,
            modified_text: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,
}

impl PingResponse {
    pub fn alive() -> Self {
        PingResponse {
            status: "alive".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_strings_match_wire_format() {
        let request = Request::ModifyWithGemini {
            text: "hello".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"action": "modifyWithGemini", "text": "hello"}));

        let request = Request::ToggleExtension { enabled: true };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"action": "toggleExtension", "enabled": true}));

        for (request, action) in [
            (Request::InjectContentScript, "injectContentScript"),
            (Request::Ping, "ping"),
            (Request::UpdateSettings, "updateSettings"),
        ] {
            let value = serde_json::to_value(&request).unwrap();
            assert_eq!(value, json!({ "action": action }));
        }
    }

    #[test]
    fn test_modify_response_shapes() {
        let ok = serde_json::to_value(ModifyResponse::ok("better")).unwrap();
        assert_eq!(ok, json!({"success": true, "modifiedText": "better"}));

        let err = serde_json::to_value(ModifyResponse::err("no key")).unwrap();
        assert_eq!(err, json!({"success": false, "error": "no key"}));
    }

    #[test]
    fn test_request_parses_from_wire() {
        let request: Request =
            serde_json::from_str(r#"{"action":"modifyWithGemini","text":"t"}"#).unwrap();
        assert_eq!(
            request,
            Request::ModifyWithGemini {
                text: "t".to_string()
            }
        );
    }
}
