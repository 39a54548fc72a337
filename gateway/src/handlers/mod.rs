//! Per-modality HTTP handlers (`spec.md` §6's endpoint table) plus the
//! shared submission/polling plumbing they're all built on.

pub mod common;
pub mod embeddings;
pub mod gpu;
pub mod image_to_text;
pub mod speech_to_text;
pub mod text_to_image;
pub mod text_to_speech;
pub mod text_to_text;
pub mod workers;
