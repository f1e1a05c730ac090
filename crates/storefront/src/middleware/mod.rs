//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with a `request_id` field)
//! 3. Request ID (record and echo `x-request-id`)
//! 4. Timeout (`408` when the handler takes too long)
//! 5. Rate limiting on `/auth/*` (governor)
//!
//! The bearer guard is not a layer: handlers opt in with [`RequireAuth`].

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::RequireAuth;
pub use rate_limit::auth_rate_limiter;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
