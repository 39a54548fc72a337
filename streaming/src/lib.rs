//! The Streaming Transport: connectionless push/pull sockets carrying raw
//! frames between the API Gateway's WebSocket endpoint and a running
//! Worker (`spec.md` §2, §4.7).
//!
//! This crate owns the Gateway side of a streaming session: port
//! allocation, the session plan, and the bridge that relays frames once
//! the Dispatcher's `StreamStart` call has told a Worker where to
//! connect. The Service-side socket pair lives in `smi-worker-service`.

pub mod bridge;
pub mod error;
pub mod frame;
pub mod port;
pub mod session;

pub use bridge::run_bridge;
pub use error::StreamingError;
pub use frame::FrameType;
pub use port::{find_free_port, find_free_port_pair};
pub use session::StreamSession;
