use std::fmt;
use std::sync::Arc;

use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::DispatchError;
use crate::handler::Handler;
use crate::view::ModelAndView;

/// Cross-cutting behaviour wrapped around a handler by the execution chain.
///
/// All callbacks default to no-ops so an interceptor only implements the
/// phases it cares about.
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Runs before the handler, in registration order. `Ok(false)` stops the
    /// chain; the interceptor is then expected to have written the response.
    fn pre_handle(
        &self,
        _req: &HandlerRequest,
        _res: &mut HandlerResponse,
        _handler: &dyn Handler,
    ) -> Result<bool, DispatchError> {
        Ok(true)
    }

    /// Runs after a successful handler invocation, in reverse order, before rendering.
    fn post_handle(
        &self,
        _req: &HandlerRequest,
        _res: &mut HandlerResponse,
        _handler: &dyn Handler,
        _model_and_view: Option<&mut ModelAndView>,
    ) -> Result<(), DispatchError> {
        Ok(())
    }

    /// Runs once the request is finished, in reverse order, for every
    /// interceptor whose `pre_handle` returned `true`. Errors are logged, never propagated.
    fn after_completion(
        &self,
        _req: &HandlerRequest,
        _res: &mut HandlerResponse,
        _handler: &dyn Handler,
        _error: Option<&DispatchError>,
    ) -> Result<(), DispatchError> {
        Ok(())
    }

    /// Capability hook: interceptors that also implement [`AsyncInterceptor`]
    /// return `Some(self)` here.
    fn as_async(&self) -> Option<&dyn AsyncInterceptor> {
        None
    }
}

/// Interceptor that wants to know when a handler went asynchronous.
pub trait AsyncInterceptor: Interceptor {
    /// Runs on the dispatching thread right after the handler suspends, in
    /// reverse order. Errors are logged, never propagated.
    fn after_concurrent_handling_started(
        &self,
        req: &HandlerRequest,
        res: &mut HandlerResponse,
        handler: &dyn Handler,
    ) -> Result<(), DispatchError>;
}

/// A shared interceptor plus its async capability, checked once at registration.
#[derive(Clone)]
pub struct InterceptorHandle {
    inner: Arc<dyn Interceptor>,
    async_capable: bool,
}

impl InterceptorHandle {
    #[must_use]
    pub fn new(inner: Arc<dyn Interceptor>) -> Self {
        let async_capable = inner.as_async().is_some();
        Self {
            inner,
            async_capable,
        }
    }

    #[must_use]
    pub fn interceptor(&self) -> &dyn Interceptor {
        self.inner.as_ref()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    #[must_use]
    pub fn is_async_capable(&self) -> bool {
        self.async_capable
    }

    pub(crate) fn as_async(&self) -> Option<&dyn AsyncInterceptor> {
        if self.async_capable {
            self.inner.as_async()
        } else {
            None
        }
    }
}

impl From<Arc<dyn Interceptor>> for InterceptorHandle {
    fn from(inner: Arc<dyn Interceptor>) -> Self {
        Self::new(inner)
    }
}

impl fmt::Debug for InterceptorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorHandle")
            .field("name", &self.name())
            .field("async_capable", &self.async_capable)
            .finish()
    }
}
