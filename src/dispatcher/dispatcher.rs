use std::fmt;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, info, warn};

use super::core::{DispatchType, HandlerRequest, HandlerResponse};
use crate::error::DispatchError;
use crate::handler::{AsyncValue, DeferredResult, HandlerOutcome};
use crate::mapping::HandlerMapping;
use crate::middleware::ExecutionChain;
use crate::order::sort_by_order;
use crate::view::{
    DefaultViewNameTranslator, ModelAndView, RequestToViewNameTranslator, View, ViewRef, ViewResolver,
};

/// Locale used when the request carries no usable `Accept-Language`.
pub const DEFAULT_LOCALE: &str = "en";

/// A request and the response produced for it.
#[derive(Debug)]
pub struct Exchange {
    pub request: HandlerRequest,
    pub response: HandlerResponse,
}

/// How a dispatch ended.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Handler ran and the response is complete
    Completed(Exchange),
    /// An interceptor's `pre_handle` returned `false`; it wrote the response
    Rejected(Exchange),
    /// No mapping produced a handler; a `404` was written
    NotFound(Exchange),
    /// The handler went asynchronous; finish it through the pending dispatch
    Suspended(PendingDispatch),
}

struct DispatcherInner {
    mappings: Vec<Arc<HandlerMapping>>,
    view_resolvers: Vec<Arc<dyn ViewResolver>>,
    view_name_translator: Arc<dyn RequestToViewNameTranslator>,
    default_locale: String,
}

/// Drives a request through mapping, the execution chain and view rendering.
///
/// Cheap to clone; every clone shares the same mappings and resolvers.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

/// Builder for [`Dispatcher`]. Mappings and view resolvers are sorted by their
/// declared order once, at build time.
#[derive(Default)]
pub struct DispatcherBuilder {
    mappings: Vec<Arc<HandlerMapping>>,
    view_resolvers: Vec<Arc<dyn ViewResolver>>,
    view_name_translator: Option<Arc<dyn RequestToViewNameTranslator>>,
    default_locale: Option<String>,
}

impl DispatcherBuilder {
    #[must_use]
    pub fn with_mapping(mut self, mapping: HandlerMapping) -> Self {
        self.mappings.push(Arc::new(mapping));
        self
    }

    #[must_use]
    pub fn with_view_resolver(mut self, resolver: Arc<dyn ViewResolver>) -> Self {
        self.view_resolvers.push(resolver);
        self
    }

    /// Names the view of a `ModelAndView` that carries none; defaults to
    /// [`DefaultViewNameTranslator`].
    #[must_use]
    pub fn with_view_name_translator(mut self, translator: Arc<dyn RequestToViewNameTranslator>) -> Self {
        self.view_name_translator = Some(translator);
        self
    }

    #[must_use]
    pub fn with_default_locale(mut self, locale: &str) -> Self {
        self.default_locale = Some(locale.to_string());
        self
    }

    #[must_use]
    pub fn build(mut self) -> Dispatcher {
        sort_by_order(&mut self.mappings, |m| m.order());
        sort_by_order(&mut self.view_resolvers, |r| r.order());
        info!(
            mappings = self.mappings.len(),
            view_resolvers = self.view_resolvers.len(),
            "Dispatcher initialized"
        );
        Dispatcher {
            inner: Arc::new(DispatcherInner {
                mappings: self.mappings,
                view_resolvers: self.view_resolvers,
                view_name_translator: self
                    .view_name_translator
                    .unwrap_or_else(|| Arc::new(DefaultViewNameTranslator::new())),
                default_locale: self.default_locale.unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
            }),
        }
    }
}

impl Dispatcher {
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Mappings in precedence order. Interceptors registered on them after
    /// build apply to requests dispatched afterwards.
    #[must_use]
    pub fn mappings(&self) -> &[Arc<HandlerMapping>] {
        &self.inner.mappings
    }

    /// Dispatch one request.
    ///
    /// # Errors
    ///
    /// Mapping failures (unknown handler, invalid CORS configuration) are
    /// returned before any interceptor runs. Interceptor, handler and render
    /// failures are returned after the chain's completion phase has seen them.
    pub fn dispatch(&self, request: HandlerRequest, mut response: HandlerResponse) -> Result<DispatchOutcome, DispatchError> {
        // D1: Handler lookup
        let Some(mut chain) = self.handler_chain(&request)? else {
            info!(
                request_id = %request.request_id,
                method = %request.method,
                path = %request.path,
                "No handler for request"
            );
            response.status = 404;
            response.set_header("content-type", "application/json".to_string());
            response.body = json!({ "error": "Not Found" });
            return Ok(DispatchOutcome::NotFound(Exchange { request, response }));
        };

        // D2: Interceptor pre-handle
        if !chain.apply_pre_handle(&request, &mut response)? {
            debug!(
                request_id = %request.request_id,
                status = response.status,
                "Request rejected by interceptor"
            );
            return Ok(DispatchOutcome::Rejected(Exchange { request, response }));
        }

        // D3: Handler invocation
        let outcome = match chain.invoke_handler(&request, &mut response) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    request_id = %request.request_id,
                    handler = %chain.handler().name(),
                    error = %e,
                    "Handler failed"
                );
                chain.trigger_after_completion(&request, &mut response, Some(&e));
                return Err(e);
            }
        };

        match outcome {
            HandlerOutcome::Handled => self.finish(chain, request, response, None).map(DispatchOutcome::Completed),
            HandlerOutcome::View(mav) => self
                .finish(chain, request, response, Some(mav))
                .map(DispatchOutcome::Completed),
            HandlerOutcome::Async(deferred) => {
                // D4: Async hand-off
                chain.apply_after_concurrent_handling_started(&request, &mut response);
                debug!(
                    request_id = %request.request_id,
                    handler = %chain.handler().name(),
                    timeout_ms = ?deferred.timeout().map(|t| t.as_millis()),
                    "Request suspended"
                );
                Ok(DispatchOutcome::Suspended(PendingDispatch {
                    dispatcher: self.clone(),
                    state: Some(PendingState {
                        chain,
                        request,
                        response,
                        deferred,
                    }),
                }))
            }
        }
    }

    /// Dispatch and always produce a response, waiting for async handlers and
    /// translating errors into JSON error responses.
    #[must_use]
    pub fn handle(&self, request: HandlerRequest) -> HandlerResponse {
        let request_id = request.request_id;
        let result = match self.dispatch(request, HandlerResponse::default()) {
            Ok(DispatchOutcome::Completed(exchange))
            | Ok(DispatchOutcome::Rejected(exchange))
            | Ok(DispatchOutcome::NotFound(exchange)) => Ok(exchange),
            Ok(DispatchOutcome::Suspended(pending)) => pending.wait(),
            Err(e) => Err(e),
        };
        match result {
            Ok(exchange) => exchange.response,
            Err(e) => {
                error!(request_id = %request_id, error = %e, "Dispatch failed");
                HandlerResponse::error(e.status_code(), &e.to_string())
            }
        }
    }

    fn handler_chain(&self, req: &HandlerRequest) -> Result<Option<ExecutionChain>, DispatchError> {
        for mapping in &self.inner.mappings {
            if let Some(chain) = mapping.resolve(req)? {
                return Ok(Some(chain));
            }
        }
        Ok(None)
    }

    /// Post-handle and render, then completion with whatever went wrong.
    fn finish(
        &self,
        mut chain: ExecutionChain,
        request: HandlerRequest,
        mut response: HandlerResponse,
        mav: Option<ModelAndView>,
    ) -> Result<Exchange, DispatchError> {
        let result = self.post_handle_and_render(&mut chain, &request, &mut response, mav);
        chain.trigger_after_completion(&request, &mut response, result.as_ref().err());
        result.map(|()| Exchange { request, response })
    }

    fn post_handle_and_render(
        &self,
        chain: &mut ExecutionChain,
        req: &HandlerRequest,
        res: &mut HandlerResponse,
        mut mav: Option<ModelAndView>,
    ) -> Result<(), DispatchError> {
        if let Some(mav) = mav.as_mut() {
            self.apply_default_view_name(mav, req);
        }
        chain.apply_post_handle(req, res, &mut mav)?;
        match mav {
            Some(mav) => self.render(mav, req, res),
            None => Ok(()),
        }
    }

    fn apply_default_view_name(&self, mav: &mut ModelAndView, req: &HandlerRequest) {
        if mav.view.is_some() {
            return;
        }
        if let Some(view_name) = self.inner.view_name_translator.view_name(req) {
            debug!(request_id = %req.request_id, view_name = %view_name, "Using default view name");
            mav.set_view_name(&view_name);
        }
    }

    fn render(&self, mav: ModelAndView, req: &HandlerRequest, res: &mut HandlerResponse) -> Result<(), DispatchError> {
        if let Some(status) = mav.status {
            res.status = status;
        }
        let view = match mav.view {
            Some(ViewRef::View(view)) => view,
            Some(ViewRef::Name(view_name)) => {
                let locale = self.locale(req);
                match self.resolve_view_name(&view_name, &locale, req)? {
                    Some(view) => view,
                    None => {
                        warn!(request_id = %req.request_id, view_name = %view_name, "View name not resolved");
                        return Err(DispatchError::ViewNotResolved { view_name });
                    }
                }
            }
            None => return Ok(()),
        };
        debug!(request_id = %req.request_id, view = %view.name(), "Rendering view");
        view.render(&mav.model, req, res)
    }

    fn resolve_view_name(
        &self,
        view_name: &str,
        locale: &str,
        req: &HandlerRequest,
    ) -> Result<Option<Arc<dyn View>>, DispatchError> {
        for resolver in &self.inner.view_resolvers {
            if let Some(view) = resolver.resolve_view_name(view_name, locale, req)? {
                return Ok(Some(view));
            }
        }
        Ok(None)
    }

    /// First language tag of `Accept-Language`, or the default locale.
    fn locale(&self, req: &HandlerRequest) -> String {
        req.get_header("accept-language")
            .and_then(|value| value.split(',').next())
            .and_then(|tag| tag.split(';').next())
            .map(str::trim)
            .filter(|tag| !tag.is_empty() && *tag != "*")
            .map_or_else(|| self.inner.default_locale.clone(), str::to_string)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("mappings", &self.inner.mappings)
            .field("view_resolvers", &self.inner.view_resolvers.len())
            .field("default_locale", &self.inner.default_locale)
            .finish()
    }
}

struct PendingState {
    chain: ExecutionChain,
    request: HandlerRequest,
    response: HandlerResponse,
    deferred: DeferredResult,
}

/// A request whose handler is still producing its result.
///
/// Owns everything the remaining phases need. Finish it with
/// [`resume`](Self::resume) or [`wait`](Self::wait); dropping it unfinished
/// runs the completion phase with [`DispatchError::AsyncCancelled`].
pub struct PendingDispatch {
    dispatcher: Dispatcher,
    state: Option<PendingState>,
}

impl PendingDispatch {
    #[must_use]
    pub fn request(&self) -> Option<&HandlerRequest> {
        self.state.as_ref().map(|state| &state.request)
    }

    #[must_use]
    pub fn response(&self) -> Option<&HandlerResponse> {
        self.state.as_ref().map(|state| &state.response)
    }

    /// Continue the request with an async result on the calling thread.
    ///
    /// # Errors
    ///
    /// An `Err` value runs completion with it and is returned unchanged;
    /// post-handle and render failures are returned after completion.
    pub fn resume(mut self, value: AsyncValue) -> Result<Exchange, DispatchError> {
        let Some(PendingState {
            mut chain,
            mut request,
            mut response,
            ..
        }) = self.state.take()
        else {
            return Err(DispatchError::AsyncCancelled);
        };
        request.dispatch_type = DispatchType::Async;
        debug!(request_id = %request.request_id, ok = value.is_ok(), "Resuming async dispatch");

        match value {
            Ok(mav) => self.dispatcher.finish(chain, request, response, mav),
            Err(e) => {
                chain.trigger_after_completion(&request, &mut response, Some(&e));
                Err(e)
            }
        }
    }

    /// Block until the deferred result arrives, then [`resume`](Self::resume).
    ///
    /// An elapsed timeout resumes with [`DispatchError::AsyncTimeout`].
    pub fn wait(self) -> Result<Exchange, DispatchError> {
        let value = match &self.state {
            Some(state) => state.deferred.wait(),
            None => Err(DispatchError::AsyncCancelled),
        };
        if let Err(e) = &value {
            warn!(
                request_id = ?self.request().map(|r| r.request_id.to_string()),
                error = %e,
                "Async result not delivered"
            );
        }
        self.resume(value)
    }
}

impl Drop for PendingDispatch {
    fn drop(&mut self) {
        if let Some(mut state) = self.state.take() {
            warn!(request_id = %state.request.request_id, "Pending dispatch dropped before completion");
            state.chain.trigger_after_completion(
                &state.request,
                &mut state.response,
                Some(&DispatchError::AsyncCancelled),
            );
        }
    }
}

impl fmt::Debug for PendingDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingDispatch")
            .field("request_id", &self.request().map(|r| r.request_id.to_string()))
            .field("chain", &self.state.as_ref().map(|s| &s.chain))
            .finish()
    }
}
