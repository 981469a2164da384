//! # BRRTDispatch
//!
//! **BRRTDispatch** is the request-dispatch pipeline of a BRRTRouter service: given an incoming
//! request it resolves the handler, runs the interceptors around it, applies CORS policy and,
//! when the handler answers with a logical view name, picks a concrete view through content
//! negotiation.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - **[`router`]** - Ant-style path patterns (`/orders/{id}`, `/static/**`) and most-specific route matching
//! - **[`handler`]** - Handler trait, handler references, named-handler registry and deferred results
//! - **[`mapping`]** - Handler mapping: lookup, chain assembly, interceptor selection and CORS wiring
//! - **[`middleware`]** - Interceptors, the three-phase execution chain and the CORS processor
//! - **[`negotiation`]** - Media types and the content negotiation manager
//! - **[`view`]** - Views, view resolvers and the content-negotiating view resolver
//! - **[`dispatcher`]** - Request/response model and the dispatcher driving the whole pipeline
//! - **[`config`]** - YAML dispatch configuration
//! - **[`logging`]** - Structured logging setup
//! - **[`cli`]** - The `brrtdispatch` inspection tool
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant Dispatcher
//!     participant Mapping as HandlerMapping
//!     participant Chain as ExecutionChain
//!     participant Handler
//!     participant Resolver as ContentNegotiatingViewResolver
//!     participant View
//!
//!     Caller->>Dispatcher: dispatch(request)
//!     Dispatcher->>Mapping: resolve(request)
//!     Mapping->>Mapping: lookup (pre-flight uses<br/>Access-Control-Request-Method)
//!     Mapping->>Mapping: flatten chains, add mapped<br/>and global interceptors
//!     Mapping->>Mapping: combine CORS config
//!
//!     alt No handler
//!         Mapping-->>Dispatcher: none
//!         Dispatcher-->>Caller: NotFound (404)
//!     end
//!
//!     Mapping-->>Dispatcher: ExecutionChain
//!     Dispatcher->>Chain: apply_pre_handle
//!     alt An interceptor returns false
//!         Chain->>Chain: after_completion for<br/>interceptors that passed
//!         Dispatcher-->>Caller: Rejected
//!     end
//!
//!     Dispatcher->>Handler: handle(request)
//!     alt Async result
//!         Dispatcher->>Chain: after_concurrent_handling_started
//!         Dispatcher-->>Caller: Suspended(PendingDispatch)
//!     end
//!
//!     Dispatcher->>Chain: apply_post_handle (reverse)
//!     opt Handler returned a view name
//!         Dispatcher->>Resolver: resolve_view_name(name, locale)
//!         Resolver->>Resolver: acceptable ∩ producible media types
//!         Resolver-->>Dispatcher: best View
//!         Dispatcher->>View: render(model)
//!     end
//!     Dispatcher->>Chain: trigger_after_completion (reverse)
//!     Dispatcher-->>Caller: Completed
//! ```
//!
//! ### Key Architectural Patterns
//!
//! 1. **Registration-time validation**: malformed path patterns, origin patterns and media types
//!    are rejected when routes, interceptors and CORS mappings are built
//! 2. **Snapshot reads**: interceptor registries are swapped atomically, so a request always sees
//!    one consistent list
//! 3. **Write-once attributes**: the mapping publishes the matched pattern, URI variables and
//!    producible media types exactly once per request
//! 4. **Completion guarantee**: once an interceptor's `pre_handle` succeeded, its
//!    `after_completion` runs exactly once, whatever happens later
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use brrtdispatch::dispatcher::{Dispatcher, HandlerRequest};
//! use brrtdispatch::handler::{handler_fn, HandlerOutcome, HandlerRef};
//! use brrtdispatch::mapping::{HandlerMapping, UrlHandlerLookup};
//! use brrtdispatch::middleware::{InterceptorRegistry, TracingInterceptor};
//! use brrtdispatch::router::{Route, Router};
//! use http::Method;
//!
//! let get_order = handler_fn("get_order", |req, res| {
//!     res.body = serde_json::json!({ "id": req.path_variable("id") });
//!     Ok(HandlerOutcome::Handled)
//! });
//! let router = Router::new(vec![
//!     Route::new("/orders/{id}", HandlerRef::Raw(get_order))?.with_methods([Method::GET]),
//! ]);
//! let mapping = HandlerMapping::builder(Arc::new(UrlHandlerLookup::new(router)))
//!     .with_interceptors(InterceptorRegistry::new().with_global(Arc::new(TracingInterceptor)))
//!     .build();
//!
//! let dispatcher = Dispatcher::builder().with_mapping(mapping).build();
//! let response = dispatcher.handle(HandlerRequest::new(Method::GET, "/orders/42"));
//! assert_eq!(response.status, 200);
//! ```
//!
//! ## Configuration
//!
//! Routes, interceptors, CORS mappings and negotiation settings can be loaded from YAML with
//! [`config::DispatchConfig`]; handlers and interceptor instances are supplied by name:
//!
//! ```yaml
//! routes:
//!   - pattern: /orders/{id}
//!     methods: [GET, DELETE]
//!     handler: order
//!     produces: [application/json]
//! interceptors:
//!   - name: tracing
//!   - name: auth
//!     include: ["/admin/**"]
//! cors:
//!   - pattern: /**
//!     allowed_origins: [https://app.example.com]
//! negotiation:
//!   favor_parameter: true
//!   media_types:
//!     json: application/json
//! ```
//!
//! ## Environment Variables
//!
//! - `BRRTD_CONFIG` - Default configuration path for the CLI
//! - `BRRTD_LOG_LEVEL`, `BRRTD_LOG_FORMAT`, `BRRTD_LOG_ASYNC`, `BRRTD_LOG_TARGETS`,
//!   `BRRTD_LOG_LOCATION` - See [`logging`]

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod ids;
pub mod logging;
pub mod mapping;
pub mod middleware;
pub mod negotiation;
pub mod order;
pub mod router;
pub mod view;

pub use dispatcher::{DispatchOutcome, Dispatcher, HandlerRequest, HandlerResponse};
pub use error::DispatchError;
pub use handler::{Handler, HandlerOutcome, HandlerRef};
pub use mapping::HandlerMapping;
pub use middleware::{ExecutionChain, Interceptor};
pub use view::{ModelAndView, View, ViewResolver};
