//! # Interceptors
//!
//! Cross-cutting behaviour wrapped around handlers, and the execution chain
//! that sequences it.
//!
//! An [`Interceptor`] has three optional phases: `pre_handle` (in order,
//! may stop the request), `post_handle` (reverse order, after a successful
//! handler) and `after_completion` (reverse order, bounded by the chain's
//! cursor). Interceptors that also implement [`AsyncInterceptor`] are told
//! when a handler suspends.
//!
//! Interceptors are registered either globally or as a [`MappedInterceptor`]
//! scoped by include/exclude path patterns. The [`InterceptorRegistry`] holding
//! them is an immutable snapshot shared by all in-flight requests.
//!
//! ## Built-in interceptors
//!
//! - [`AuthInterceptor`]: static token check, `401` and short-circuit on mismatch
//! - [`MetricsInterceptor`]: lock-free request, failure and latency counters
//! - [`TracingInterceptor`]: structured request lifecycle events
//!
//! CORS lives in [`cors`](self::CorsConfig) and is wired into chains by the
//! handler mapping rather than registered like an ordinary interceptor.

mod auth;
mod chain;
mod core;
mod cors;
mod mapped;
mod metrics;
mod tracing;

pub use auth::{AuthInterceptor, DEFAULT_AUTH_HEADER};
pub use chain::{ChainState, ExecutionChain};
pub use core::{AsyncInterceptor, Interceptor, InterceptorHandle};
pub use cors::{
    is_cors_request, is_preflight_request, is_same_origin, CorsConfig, CorsConfigBuilder,
    CorsConfigError, CorsConfigSource, CorsProcessor, DefaultCorsProcessor, OriginPattern,
    UrlBasedCorsConfigSource, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS,
    ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD,
    CORS_REJECTION_BODY, CORS_REJECTION_STATUS, DEFAULT_MAX_AGE, DEFAULT_METHODS, ORIGIN, VARY,
};
pub use mapped::{InterceptorRegistry, MappedInterceptor, RegisteredInterceptor};
pub use metrics::MetricsInterceptor;
pub use tracing::TracingInterceptor;

#[cfg(test)]
mod tests;
