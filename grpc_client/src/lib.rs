//! gRPC client for the Dispatcher -> Service RPC boundary.
//!
//! One `DispatcherClient` is created per job type and holds a `tonic`
//! channel to that type's Service. The channel is built lazily and cloned
//! cheaply per call (an HTTP/2 channel multiplexes concurrent RPCs over one
//! connection, so there is no need for a connection pool here the way the
//! Job Store needs one for Redis).

pub mod client;
pub mod proto {
    tonic::include_proto!("smi.generic");
}

use std::sync::Arc;

pub use client::{DispatcherClient, DispatcherError};
use tonic::metadata::MetadataMap;

/// Trait for injecting trace context into gRPC metadata.
///
/// Implement this to enable distributed tracing across gRPC calls. The
/// default implementation is a no-op.
pub trait TraceInjector: Send + Sync {
    fn inject(
        &self,
        metadata: &mut MetadataMap,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// A no-op trace injector that does nothing.
#[derive(Clone, Default)]
pub struct NoopTraceInjector;

impl TraceInjector for NoopTraceInjector {
    fn inject(
        &self,
        _metadata: &mut MetadataMap,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

pub type BoxedTraceInjector = Arc<dyn TraceInjector>;
