//! # Handler Mapping
//!
//! Turns a request into an [`ExecutionChain`](crate::middleware::ExecutionChain).
//!
//! ## Resolution
//!
//! 1. A pluggable [`HandlerLookup`] returns a [`HandlerRef`](crate::handler::HandlerRef).
//!    Pre-flight requests are looked up with the method named in
//!    `Access-Control-Request-Method`, never as an `OPTIONS` route.
//! 2. A miss falls back to the default handler, if any.
//! 3. Named references resolve through the [`HandlerRegistry`](crate::handler::HandlerRegistry);
//!    nested chains flatten to a leaf handler, inner interceptors first.
//! 4. Global and mapped interceptors from the current registry snapshot are appended.
//! 5. CORS: the handler's policy is combined with the global source. Pre-flight
//!    requests get a synthetic handler and no interceptors; actual requests get
//!    a CORS interceptor at position 0.
//!
//! [`UrlHandlerLookup`] is the router-backed lookup used by configuration.

mod core;
mod cors;
mod url;

pub use core::{HandlerLookup, HandlerMapping, HandlerMappingBuilder};
pub use cors::{CorsInterceptor, PreFlightHandler};
pub use url::UrlHandlerLookup;
