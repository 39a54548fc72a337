//! Text-to-image request/response bodies, mirroring `spt/models/txt2img.py`.
//!
//! Per the gateway's result-delivery rule, an image response carries either
//! an inline base64 payload or an object-store URL, never both empty.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextToImageRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_width() -> u32 {
    512
}

fn default_height() -> u32 {
    512
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImagePayload {
    Inline { image_base64: String },
    Url { url: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextToImageResponse {
    pub model: String,
    #[serde(flatten)]
    pub payload: ImagePayload,
}
