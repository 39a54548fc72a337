//! Text-to-text and embeddings request/response bodies.
//!
//! Shapes mirror `spt/models/llm.py`'s `ChatRequest`/`ChatResponse` and
//! `EmbeddingsRequest`/`EmbeddingsResponse`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Base64-encoded images attached to this message, used by the vision
    /// chat endpoint (`POST /v1/image-to-text`). Absent for plain text
    /// chat; the same `ChatRequest`/`ChatResponse` pair serves both
    /// endpoints since vision chat is just chat with image attachments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

/// Sampling knobs shared by chat and future generation endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmOptions {
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub stop: Option<Vec<String>>,
}

impl Default for LlmOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            top_p: Some(1.0),
            max_tokens: None,
            stop: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub options: LlmOptions,
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub model: String,
    pub message: ChatMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsRequest {
    pub model: String,
    pub input: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsResponse {
    pub model: String,
    pub embeddings: Vec<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_round_trips_through_json() {
        let req = ChatRequest {
            model: "echo".into(),
            messages: vec![ChatMessage {
                role: ChatRole::User,
                content: "hello".into(),
                images: None,
            }],
            options: LlmOptions::default(),
            stream: false,
        };
        let encoded = serde_json::to_string(&req).unwrap();
        let decoded: ChatRequest = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.model, "echo");
        assert_eq!(decoded.messages.len(), 1);
    }
}
