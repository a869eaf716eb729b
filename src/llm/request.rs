//! Request body for the completion service

use serde::Serialize;

/// JSON body posted for one question
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The outgoing prompt (the question, possibly joined with saved context)
    pub prompt: String,

    /// Instruction describing how the assistant should answer
    pub role: String,

    /// Optional key forwarded to the service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            role: role.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_without_key() {
        let body = serde_json::to_value(ChatRequest::new("What is a closure?", "Tutor")).unwrap();

        assert_eq!(
            body,
            serde_json::json!({ "prompt": "What is a closure?", "role": "Tutor" })
        );
    }

    #[test]
    fn test_body_with_key_is_camel_case() {
        let request = ChatRequest::new("q", "r").with_api_key(Some("k-123".to_string()));
        let body = serde_json::to_value(request).unwrap();

        assert_eq!(body["apiKey"], "k-123");
        assert!(body.get("api_key").is_none());
    }
}
