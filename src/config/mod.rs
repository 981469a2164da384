//! # Configuration
//!
//! YAML description of a dispatch setup: routes, interceptors, CORS mappings
//! and content negotiation.
//!
//! Everything is validated when the configuration is turned into runtime
//! objects, so a bad pattern, an unknown interceptor or an invalid CORS
//! policy fails at startup rather than on the first request. The
//! `negotiation` section becomes a manager through
//! [`NegotiationConfig::build_manager`] or a whole negotiating view resolver
//! through [`NegotiationConfig::build_view_resolver`].
//!
//! ## Example
//!
//! ```yaml
//! routes:
//!   - pattern: /orders/{id}
//!     methods: [GET, DELETE]
//!     handler: order_handler
//!     produces: [application/json]
//! default_handler: fallback
//! interceptors:
//!   - name: tracing
//!   - name: auth
//!     include: ["/orders/**"]
//!     exclude: ["/orders/public/**"]
//! cors:
//!   - pattern: /**
//!     allowed_origins: ["https://app.example.com"]
//!     allowed_methods: [GET, POST, DELETE]
//!     allow_credentials: true
//! negotiation:
//!   favor_parameter: true
//!   media_types:
//!     json: application/json
//!     html: text/html
//!   use_not_acceptable: true
//! ```

mod core;

pub use core::{
    CorsMappingConfig, DispatchConfig, InterceptorConfig, NegotiationConfig, RouteConfig,
    CONFIG_ENV_VAR,
};
