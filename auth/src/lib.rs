//! API key authentication and audit logging for the gateway's HTTP surface.
//!
//! The upstream service this gateway replaces authenticates every request
//! against a single shared key presented in an `auth-key` header. This
//! crate generalizes that to a small roster of named keys (so a deployment
//! can tell which caller made a request without a full IdP), while keeping
//! the same header-based, no-redirect authentication model.

mod audit;
mod config;
mod error;
mod middleware;

pub use audit::{AuditEvent, AuditLogger, AuditOutcome};
pub use config::{ApiKeyEntry, AuthConfig};
pub use error::AuthError;
pub use middleware::{api_key_auth_middleware, AuthState, Principal, PrincipalExt};

/// Request ID for correlation in audit logs. Added to request extensions
/// by the gateway's tracing middleware; read here if present.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);
