//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. Rate limiting on `/auth/*` (governor)
//!
//! Authentication is not a layer: handlers take [`RequireAuth`] or
//! [`OptionalAuth`] and evaluate [`guards`] themselves.

pub mod auth;
pub mod guards;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{OptionalAuth, RequireAuth};
pub use guards::{Denial, Guard, authorize};
pub use rate_limit::auth_rate_limiter;
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
