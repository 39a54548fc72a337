//! Speech-to-text and text-to-speech request/response bodies.
//!
//! Mirrors `spt/models/audio.py`: binary audio payloads travel as JSON
//! strings, base64-encoded on the way out and decoded on the way in, via
//! the custom (de)serializers below rather than a `Vec<u8>` field with
//! serde's default (lossy) byte-array representation.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

fn to_base64<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
    use base64::Engine;
    s.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
}

fn from_base64<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
    use base64::Engine;
    let encoded = String::deserialize(d)?;
    base64::engine::general_purpose::STANDARD
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextToSpeechRequest {
    pub model: String,
    pub text: String,
    #[serde(default)]
    pub speaker: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextToSpeechResponse {
    pub model: String,
    #[serde(serialize_with = "to_base64", deserialize_with = "from_base64")]
    pub audio: Vec<u8>,
    pub sample_rate_hz: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextToSpeechSpeakerRequest {
    pub model: String,
    #[serde(serialize_with = "to_base64", deserialize_with = "from_base64")]
    pub reference_audio: Vec<u8>,
    pub speaker_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechToTextRequest {
    pub model: String,
    #[serde(serialize_with = "to_base64", deserialize_with = "from_base64")]
    pub audio: Vec<u8>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechToTextResponse {
    pub model: String,
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tts_response_audio_round_trips_as_base64_json() {
        let resp = TextToSpeechResponse {
            model: "echo-tts".into(),
            audio: vec![0, 1, 2, 255],
            sample_rate_hz: 16_000,
        };
        let encoded = serde_json::to_value(&resp).unwrap();
        assert!(encoded["audio"].is_string());
        let decoded: TextToSpeechResponse = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded.audio, vec![0, 1, 2, 255]);
    }
}
