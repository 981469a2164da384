//! # CORS (Cross-Origin Resource Sharing)
//!
//! Policy model and protocol processor used by the handler mapping.
//!
//! The effective configuration for a request is the global one (from a
//! [`CorsConfigSource`]) combined with the handler's own. Pre-flight requests
//! never reach application code: the mapping swaps in a synthetic handler that
//! only runs the [`CorsProcessor`]. Actual requests get a CORS interceptor
//! inserted ahead of every other interceptor, so a rejected origin
//! short-circuits the chain like any failed pre-handle.
//!
//! ## Builder Pattern (Recommended)
//!
//! ```rust,ignore
//! use brrtdispatch::middleware::CorsConfig;
//! use http::Method;
//!
//! let cors = CorsConfig::builder()
//!     .allowed_origins(&["https://example.com"])
//!     .allowed_methods(&[Method::GET, Method::POST])
//!     .allow_credentials(true)
//!     .build()?;
//! ```

mod builder;
mod config;
mod error;
mod processor;
mod source;

pub use builder::CorsConfigBuilder;
pub use config::{CorsConfig, OriginPattern, DEFAULT_MAX_AGE, DEFAULT_METHODS};
pub use error::CorsConfigError;
pub use processor::{
    is_cors_request, is_preflight_request, is_same_origin, CorsProcessor, DefaultCorsProcessor,
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE,
    ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD, CORS_REJECTION_BODY,
    CORS_REJECTION_STATUS, ORIGIN, VARY,
};
pub use source::{CorsConfigSource, UrlBasedCorsConfigSource};
