use async_trait::async_trait;
use serde_json::Value;
use smi_protocol::llm::{EmbeddingsRequest, EmbeddingsResponse};

use crate::error::ServiceError;
use crate::worker::Worker;

/// Produces a deterministic fixed-width embedding per input string by
/// hashing its bytes into a small float vector. Stands in for a real
/// embeddings backend such as the original's Ollama-backed worker.
pub struct EchoEmbeddingsWorker {
    model: String,
    dims: usize,
}

impl EchoEmbeddingsWorker {
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into(), dims: 8 }
    }

    fn embed(&self, input: &str) -> Vec<f32> {
        let hash = blake3::hash(input.as_bytes());
        let bytes = hash.as_bytes();
        (0..self.dims)
            .map(|i| bytes[i % bytes.len()] as f32 / 255.0)
            .collect()
    }
}

#[async_trait]
impl Worker for EchoEmbeddingsWorker {
    fn name(&self) -> &str {
        "echo-embeddings"
    }

    async fn work(&self, data: Value) -> Result<Value, ServiceError> {
        let request: EmbeddingsRequest = serde_json::from_value(data)?;
        let embeddings = request.input.iter().map(|s| self.embed(s)).collect();
        let response = EmbeddingsResponse {
            model: self.model.clone(),
            embeddings,
        };
        Ok(serde_json::to_value(response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embeds_every_input_string_to_the_configured_width() {
        let worker = EchoEmbeddingsWorker::new("test-model");
        let request = EmbeddingsRequest {
            model: "test-model".into(),
            input: vec!["a".into(), "b".into()],
        };
        let response: EmbeddingsResponse =
            serde_json::from_value(worker.work(serde_json::to_value(request).unwrap()).await.unwrap())
                .unwrap();
        assert_eq!(response.embeddings.len(), 2);
        assert_eq!(response.embeddings[0].len(), 8);
    }

    #[tokio::test]
    async fn embedding_is_deterministic_for_the_same_input() {
        let worker = EchoEmbeddingsWorker::new("test-model");
        assert_eq!(worker.embed("hello"), worker.embed("hello"));
    }
}
