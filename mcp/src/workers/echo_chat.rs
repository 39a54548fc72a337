use async_trait::async_trait;
use serde_json::Value;
use smi_protocol::llm::{ChatMessage, ChatRequest, ChatResponse, ChatRole};

use crate::error::ServiceError;
use crate::worker::Worker;

/// Reflects the last user message back as the assistant's reply, prefixed
/// with the configured model name. Stands in for a real chat backend such
/// as the original's Ollama-backed worker.
pub struct EchoChatWorker {
    model: String,
}

impl EchoChatWorker {
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into() }
    }
}

#[async_trait]
impl Worker for EchoChatWorker {
    fn name(&self) -> &str {
        "echo-chat"
    }

    async fn work(&self, data: Value) -> Result<Value, ServiceError> {
        let request: ChatRequest = serde_json::from_value(data)?;
        let last_user = request.messages.iter().rev().find(|m| matches!(m.role, ChatRole::User));
        let content = last_user.map(|m| m.content.clone()).unwrap_or_default();
        let image_count = last_user.and_then(|m| m.images.as_ref()).map(Vec::len).unwrap_or(0);
        let content = if image_count > 0 {
            format!("[{}] saw {} image(s): {}", self.model, image_count, content)
        } else {
            format!("[{}] {}", self.model, content)
        };

        let response = ChatResponse {
            model: self.model.clone(),
            message: ChatMessage {
                role: ChatRole::Assistant,
                content,
                images: None,
            },
            finish_reason: Some("stop".to_string()),
        };
        Ok(serde_json::to_value(response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smi_protocol::llm::LlmOptions;

    #[tokio::test]
    async fn echoes_the_last_user_message_prefixed_with_the_model_name() {
        let worker = EchoChatWorker::new("test-model");
        let request = ChatRequest {
            model: "test-model".into(),
            messages: vec![ChatMessage {
                role: ChatRole::User,
                content: "hello".into(),
                images: None,
            }],
            options: LlmOptions::default(),
            stream: false,
        };
        let response: ChatResponse =
            serde_json::from_value(worker.work(serde_json::to_value(request).unwrap()).await.unwrap())
                .unwrap();
        assert_eq!(response.message.content, "[test-model] hello");
    }

    #[tokio::test]
    async fn mentions_attached_image_count_for_vision_chat() {
        let worker = EchoChatWorker::new("test-model");
        let request = ChatRequest {
            model: "test-model".into(),
            messages: vec![ChatMessage {
                role: ChatRole::User,
                content: "what is this".into(),
                images: Some(vec!["base64data".into()]),
            }],
            options: LlmOptions::default(),
            stream: false,
        };
        let response: ChatResponse =
            serde_json::from_value(worker.work(serde_json::to_value(request).unwrap()).await.unwrap())
                .unwrap();
        assert!(response.message.content.contains("saw 1 image(s)"));
    }
}
