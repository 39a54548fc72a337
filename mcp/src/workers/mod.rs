//! Deterministic reference Worker implementations.
//!
//! Loading real models is out of scope; these stand-ins exercise the full
//! RPC/pool/reaping/streaming plumbing without a GPU, the same role the
//! original project's simplest backends (pure Python passthroughs) played
//! in its own test suite.

mod echo_chat;
mod echo_embeddings;
mod echo_image;
mod echo_speech;

pub use echo_chat::EchoChatWorker;
pub use echo_embeddings::EchoEmbeddingsWorker;
pub use echo_image::EchoImageWorker;
pub use echo_speech::EchoSpeechWorker;
