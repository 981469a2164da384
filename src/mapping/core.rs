use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use http::Method;
use tracing::{debug, info, warn};

use super::cors::{CorsInterceptor, PreFlightHandler};
use crate::dispatcher::HandlerRequest;
use crate::error::DispatchError;
use crate::handler::{Handler, HandlerRef, HandlerRegistry};
use crate::middleware::{
    is_preflight_request, CorsConfig, CorsConfigSource, CorsProcessor, DefaultCorsProcessor,
    ExecutionChain, InterceptorHandle, InterceptorRegistry, RegisteredInterceptor,
    ACCESS_CONTROL_REQUEST_METHOD,
};
use crate::order::LOWEST_PRECEDENCE;

/// The pluggable first step of handler mapping.
///
/// `method` is the method to match on; for a pre-flight request it is the
/// method named in `Access-Control-Request-Method`, not `OPTIONS`.
pub trait HandlerLookup: Send + Sync {
    fn lookup(&self, req: &HandlerRequest, method: &Method) -> Result<Option<HandlerRef>, DispatchError>;
}

impl<F> HandlerLookup for F
where
    F: Fn(&HandlerRequest, &Method) -> Result<Option<HandlerRef>, DispatchError> + Send + Sync,
{
    fn lookup(&self, req: &HandlerRequest, method: &Method) -> Result<Option<HandlerRef>, DispatchError> {
        self(req, method)
    }
}

/// Resolves requests to execution chains.
///
/// Shared by every in-flight request. The interceptor list is an immutable
/// snapshot; [`register_interceptor`](Self::register_interceptor) swaps in a
/// new one without disturbing chains already built.
pub struct HandlerMapping {
    lookup: Arc<dyn HandlerLookup>,
    registry: Option<Arc<dyn HandlerRegistry>>,
    default_handler: Option<HandlerRef>,
    interceptors: ArcSwap<InterceptorRegistry>,
    cors_source: Option<Arc<dyn CorsConfigSource>>,
    cors_processor: Arc<dyn CorsProcessor>,
    order: i32,
}

/// Builder for [`HandlerMapping`].
pub struct HandlerMappingBuilder {
    lookup: Arc<dyn HandlerLookup>,
    registry: Option<Arc<dyn HandlerRegistry>>,
    default_handler: Option<HandlerRef>,
    interceptors: InterceptorRegistry,
    cors_source: Option<Arc<dyn CorsConfigSource>>,
    cors_processor: Arc<dyn CorsProcessor>,
    order: i32,
}

impl HandlerMappingBuilder {
    /// Object container used to resolve [`HandlerRef::Named`] references.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<dyn HandlerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn with_default_handler(mut self, handler: HandlerRef) -> Self {
        self.default_handler = Some(handler);
        self
    }

    #[must_use]
    pub fn with_interceptors(mut self, interceptors: InterceptorRegistry) -> Self {
        self.interceptors = interceptors;
        self
    }

    /// Global CORS configuration, combined with each handler's own policy.
    #[must_use]
    pub fn with_cors_source(mut self, source: Arc<dyn CorsConfigSource>) -> Self {
        self.cors_source = Some(source);
        self
    }

    #[must_use]
    pub fn with_cors_processor(mut self, processor: Arc<dyn CorsProcessor>) -> Self {
        self.cors_processor = processor;
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn build(self) -> HandlerMapping {
        info!(
            interceptors = self.interceptors.len(),
            has_default_handler = self.default_handler.is_some(),
            has_cors_source = self.cors_source.is_some(),
            order = self.order,
            "Handler mapping initialized"
        );
        HandlerMapping {
            lookup: self.lookup,
            registry: self.registry,
            default_handler: self.default_handler,
            interceptors: ArcSwap::from_pointee(self.interceptors),
            cors_source: self.cors_source,
            cors_processor: self.cors_processor,
            order: self.order,
        }
    }
}

impl HandlerMapping {
    #[must_use]
    pub fn builder(lookup: Arc<dyn HandlerLookup>) -> HandlerMappingBuilder {
        HandlerMappingBuilder {
            lookup,
            registry: None,
            default_handler: None,
            interceptors: InterceptorRegistry::new(),
            cors_source: None,
            cors_processor: Arc::new(DefaultCorsProcessor),
            order: LOWEST_PRECEDENCE,
        }
    }

    #[must_use]
    pub fn order(&self) -> i32 {
        self.order
    }

    /// Current interceptor snapshot.
    #[must_use]
    pub fn interceptors(&self) -> Arc<InterceptorRegistry> {
        self.interceptors.load_full()
    }

    /// Publish a new snapshot with `entry` appended. Requests already being
    /// dispatched keep the snapshot they started with.
    pub fn register_interceptor(&self, entry: RegisteredInterceptor) {
        self.interceptors.rcu(|current| {
            let mut next = InterceptorRegistry::clone(current);
            next.push(entry.clone());
            next
        });
        info!(
            interceptor = %entry.handle().name(),
            total_interceptors = self.interceptors.load().len(),
            "Interceptor registered"
        );
    }

    /// Resolve `req` to an execution chain, or `None` when neither the lookup
    /// nor the default handler produced one.
    ///
    /// # Errors
    ///
    /// [`DispatchError::UnknownHandler`] for a name the registry cannot
    /// resolve, and [`DispatchError::CorsConfig`] when the combined CORS
    /// configuration is invalid. Both are raised before any interceptor runs.
    pub fn resolve(&self, req: &HandlerRequest) -> Result<Option<ExecutionChain>, DispatchError> {
        let preflight = is_preflight_request(req);
        let lookup_method = if preflight {
            lookup_method_for_preflight(req)
        } else {
            req.method.clone()
        };

        let handler_ref = match self.lookup.lookup(req, &lookup_method)? {
            Some(found) => found,
            None => match &self.default_handler {
                Some(default) => {
                    debug!(request_id = %req.request_id, path = %req.path, "Using default handler");
                    default.clone()
                }
                None => {
                    debug!(
                        request_id = %req.request_id,
                        method = %lookup_method,
                        path = %req.path,
                        "No handler found"
                    );
                    return Ok(None);
                }
            },
        };

        let mut interceptors = Vec::new();
        let handler = self.flatten(handler_ref, &mut interceptors)?;
        let snapshot = self.interceptors.load();
        interceptors.extend(snapshot.matching(&req.path).cloned());
        let mut chain = ExecutionChain::with_interceptors(Arc::clone(&handler), interceptors);

        let handler_cors = handler.cors_config(req);
        let global_cors = self.cors_source.as_ref().and_then(|source| source.cors_config(req));
        if handler_cors.is_some() || global_cors.is_some() || preflight {
            let config = match effective_cors_config(global_cors, handler_cors) {
                Ok(config) => config,
                Err(e) => {
                    warn!(request_id = %req.request_id, path = %req.path, error = %e, "Invalid CORS configuration");
                    return Err(e);
                }
            };
            if preflight {
                debug!(request_id = %req.request_id, handler = %handler.name(), "Replacing chain with pre-flight handler");
                let preflight_handler = PreFlightHandler::new(config, Arc::clone(&self.cors_processor));
                chain = ExecutionChain::new(Arc::new(preflight_handler));
            } else if let Some(config) = config {
                let cors = CorsInterceptor::new(config, Arc::clone(&self.cors_processor));
                chain.insert_interceptor(0, InterceptorHandle::new(Arc::new(cors)));
            }
        }

        info!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            handler = %chain.handler().name(),
            interceptors = chain.interceptors().len(),
            preflight,
            "Handler mapped"
        );
        Ok(Some(chain))
    }

    /// Reduce a handler reference to a leaf handler, collecting carried
    /// interceptors innermost first.
    fn flatten(&self, handler: HandlerRef, interceptors: &mut Vec<InterceptorHandle>) -> Result<Arc<dyn Handler>, DispatchError> {
        match handler {
            HandlerRef::Raw(handler) => Ok(handler),
            HandlerRef::Named(name) => self
                .registry
                .as_ref()
                .and_then(|registry| registry.get_handler(&name))
                .ok_or(DispatchError::UnknownHandler { name }),
            HandlerRef::Chain {
                handler,
                interceptors: carried,
            } => {
                let leaf = self.flatten(*handler, interceptors)?;
                interceptors.extend(carried);
                Ok(leaf)
            }
        }
    }
}

impl fmt::Debug for HandlerMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMapping")
            .field("default_handler", &self.default_handler)
            .field("interceptors", &self.interceptors.load().len())
            .field("has_cors_source", &self.cors_source.is_some())
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

fn lookup_method_for_preflight(req: &HandlerRequest) -> Method {
    req.get_header(ACCESS_CONTROL_REQUEST_METHOD)
        .and_then(|m| Method::from_bytes(m.trim().as_bytes()).ok())
        .unwrap_or_else(|| req.method.clone())
}

/// Global policy combined with the handler's; either may be absent.
fn effective_cors_config(
    global: Option<CorsConfig>,
    handler: Option<CorsConfig>,
) -> Result<Option<CorsConfig>, DispatchError> {
    let config = match (global, handler) {
        (Some(global), Some(handler)) => Some(global.combine(&handler)?),
        (Some(global), None) => Some(global),
        (None, handler) => handler,
    };
    if let Some(config) = &config {
        config.validate_allow_credentials()?;
    }
    Ok(config)
}
