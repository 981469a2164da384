use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use super::deferred::DeferredResult;
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::DispatchError;
use crate::middleware::{CorsConfig, InterceptorHandle};
use crate::view::ModelAndView;

/// What a handler produced.
#[derive(Debug)]
pub enum HandlerOutcome {
    /// The response is complete; nothing left to render
    Handled,
    /// Render this model and view
    View(ModelAndView),
    /// Processing continues concurrently; the result arrives through the deferred value
    Async(DeferredResult),
}

/// Application logic invoked by the execution chain.
pub trait Handler: Send + Sync {
    fn handle(&self, req: &HandlerRequest, res: &mut HandlerResponse) -> Result<HandlerOutcome, DispatchError>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Handler-specific CORS policy, combined with the global one by the mapping.
    fn cors_config(&self, _req: &HandlerRequest) -> Option<CorsConfig> {
        None
    }
}

/// Adapter turning a closure into a named [`Handler`].
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&HandlerRequest, &mut HandlerResponse) -> Result<HandlerOutcome, DispatchError> + Send + Sync,
{
    fn handle(&self, req: &HandlerRequest, res: &mut HandlerResponse) -> Result<HandlerOutcome, DispatchError> {
        (self.f)(req, res)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wrap a closure as a shared handler.
///
/// ```rust,ignore
/// let hello = handler_fn("hello", |_req, res| {
///     res.body = serde_json::json!({"message": "hello"});
///     Ok(HandlerOutcome::Handled)
/// });
/// ```
pub fn handler_fn<F>(name: &str, f: F) -> Arc<dyn Handler>
where
    F: Fn(&HandlerRequest, &mut HandlerResponse) -> Result<HandlerOutcome, DispatchError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnHandler {
        name: name.to_string(),
        f,
    })
}

struct CorsAwareHandler {
    inner: Arc<dyn Handler>,
    config: CorsConfig,
}

impl Handler for CorsAwareHandler {
    fn handle(&self, req: &HandlerRequest, res: &mut HandlerResponse) -> Result<HandlerOutcome, DispatchError> {
        self.inner.handle(req, res)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn cors_config(&self, _req: &HandlerRequest) -> Option<CorsConfig> {
        Some(self.config.clone())
    }
}

/// Attach a handler-specific CORS policy to `handler`.
pub fn with_cors(handler: Arc<dyn Handler>, config: CorsConfig) -> Arc<dyn Handler> {
    Arc::new(CorsAwareHandler {
        inner: handler,
        config,
    })
}

/// What a lookup step returns, before the mapping turns it into an execution chain.
#[derive(Clone)]
pub enum HandlerRef {
    /// A concrete handler
    Raw(Arc<dyn Handler>),
    /// A name to resolve through the [`HandlerRegistry`]
    Named(String),
    /// A handler that already carries interceptors; may wrap another chain
    Chain {
        handler: Box<HandlerRef>,
        interceptors: Vec<InterceptorHandle>,
    },
}

impl HandlerRef {
    #[must_use]
    pub fn chain(handler: HandlerRef, interceptors: Vec<InterceptorHandle>) -> Self {
        HandlerRef::Chain {
            handler: Box::new(handler),
            interceptors,
        }
    }

    /// Name of the leaf handler (or handler reference) for logs and attributes.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            HandlerRef::Raw(handler) => handler.name().to_string(),
            HandlerRef::Named(name) => name.clone(),
            HandlerRef::Chain { handler, .. } => handler.describe(),
        }
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerRef::Raw(handler) => f.debug_tuple("Raw").field(&handler.name()).finish(),
            HandlerRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
            HandlerRef::Chain {
                handler,
                interceptors,
            } => f
                .debug_struct("Chain")
                .field("handler", handler)
                .field(
                    "interceptors",
                    &interceptors.iter().map(InterceptorHandle::name).collect::<Vec<_>>(),
                )
                .finish(),
        }
    }
}

impl From<Arc<dyn Handler>> for HandlerRef {
    fn from(handler: Arc<dyn Handler>) -> Self {
        HandlerRef::Raw(handler)
    }
}

/// The object container boundary: hands out handlers by name.
pub trait HandlerRegistry: Send + Sync {
    fn get_handler(&self, name: &str) -> Option<Arc<dyn Handler>>;

    fn handler_names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Map-backed [`HandlerRegistry`].
#[derive(Clone, Default)]
pub struct MapHandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl MapHandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `name`.
    ///
    /// If a handler with the same name already exists, it is replaced.
    pub fn register(&mut self, name: &str, handler: Arc<dyn Handler>) {
        if self.handlers.insert(name.to_string(), handler).is_some() {
            warn!(handler_name = %name, "Replaced existing handler");
        } else {
            info!(
                handler_name = %name,
                total_handlers = self.handlers.len(),
                "Handler registered successfully"
            );
        }
    }

    #[must_use]
    pub fn with(mut self, name: &str, handler: Arc<dyn Handler>) -> Self {
        self.register(name, handler);
        self
    }
}

impl HandlerRegistry for MapHandlerRegistry {
    fn get_handler(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).cloned()
    }

    fn handler_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}
