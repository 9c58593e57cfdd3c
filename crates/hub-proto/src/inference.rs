//! Chat-completion requests served by a node's inference endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default model used when none is requested.
pub const DEFAULT_MODEL: &str = "phi3:mini";

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// A user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// OpenAI-style chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model name.
    pub model: String,
    /// Conversation so far.
    pub messages: Vec<ChatMessage>,
    /// Extra model parameters (temperature, `max_tokens`, ...).
    #[serde(flatten)]
    pub parameters: Map<String, Value>,
}

impl ChatCompletionRequest {
    /// A single-prompt request.
    #[must_use]
    pub fn prompt(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(prompt)],
            parameters: Map::new(),
        }
    }
}

/// Extract the first choice's message content from a completion response.
#[must_use]
pub fn first_choice_content(response: &Value) -> Option<&str> {
    response
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parameters_flatten_into_request() {
        let mut request = ChatCompletionRequest::prompt(DEFAULT_MODEL, "hello");
        request.parameters.insert("temperature".into(), json!(0.2));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "phi3:mini");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["temperature"], 0.2);
    }

    #[test]
    fn extracts_first_choice() {
        let response = json!({"choices": [{"message": {"role": "assistant", "content": "hi"}}]});
        assert_eq!(first_choice_content(&response), Some("hi"));
        assert_eq!(first_choice_content(&json!({})), None);
    }
}
