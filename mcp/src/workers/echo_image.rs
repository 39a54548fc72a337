use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;
use smi_protocol::image::{ImagePayload, TextToImageRequest, TextToImageResponse};

use crate::error::ServiceError;
use crate::worker::Worker;

/// Produces a deterministic single-color PNG-shaped payload sized to the
/// request's requested dimensions, standing in for a real diffusion
/// backend such as the original's `flux.py` worker. The payload is not a
/// valid PNG container; it exists only to exercise the base64 inline
/// delivery path end to end.
pub struct EchoImageWorker {
    model: String,
}

impl EchoImageWorker {
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into() }
    }
}

#[async_trait]
impl Worker for EchoImageWorker {
    fn name(&self) -> &str {
        "echo-image"
    }

    async fn work(&self, data: Value) -> Result<Value, ServiceError> {
        let request: TextToImageRequest = serde_json::from_value(data)?;
        let seed = request.seed.unwrap_or(0);
        let pixel = ((seed % 256) as u8, request.prompt.len() as u8);
        let bytes: Vec<u8> = (0..(request.width * request.height / 64).max(1))
            .flat_map(|_| [pixel.0, pixel.1])
            .collect();
        let response = TextToImageResponse {
            model: self.model.clone(),
            payload: ImagePayload::Inline {
                image_base64: base64::engine::general_purpose::STANDARD.encode(&bytes),
            },
        };
        Ok(serde_json::to_value(response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_returns_an_inline_base64_payload() {
        let worker = EchoImageWorker::new("test-model");
        let request = TextToImageRequest {
            model: "test-model".into(),
            prompt: "a cat".into(),
            width: 64,
            height: 64,
            seed: Some(7),
        };
        let response: TextToImageResponse =
            serde_json::from_value(worker.work(serde_json::to_value(request).unwrap()).await.unwrap())
                .unwrap();
        assert!(matches!(response.payload, ImagePayload::Inline { .. }));
    }
}
