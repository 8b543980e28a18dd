//! Stratus Infrastructure Library
//!
//! Shared plumbing for the HTTP service:
//! - Middleware (request ID, security headers)
//! - Tracing initialization
//! - Error response body

#[cfg(feature = "middleware")]
pub mod middleware;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod error;

#[cfg(feature = "middleware")]
pub use middleware::{
    request_id_middleware, security_headers_middleware, RequestId, SecurityHeaders,
};

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, LogFormat};

pub use error::ErrorResponse;
