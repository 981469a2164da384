use std::sync::Arc;

use crate::middleware::{CorsConfig, CorsProcessor, Interceptor};
use crate::dispatcher::{DispatchType, HandlerRequest, HandlerResponse};
use crate::error::DispatchError;
use crate::handler::{Handler, HandlerOutcome};

/// Synthetic handler answering a CORS pre-flight request.
///
/// Only runs the CORS protocol; application logic is never reached.
pub struct PreFlightHandler {
    config: Option<CorsConfig>,
    processor: Arc<dyn CorsProcessor>,
}

impl PreFlightHandler {
    #[must_use]
    pub fn new(config: Option<CorsConfig>, processor: Arc<dyn CorsProcessor>) -> Self {
        Self { config, processor }
    }
}

impl Handler for PreFlightHandler {
    fn handle(&self, req: &HandlerRequest, res: &mut HandlerResponse) -> Result<HandlerOutcome, DispatchError> {
        self.processor.process_request(self.config.as_ref(), req, res);
        Ok(HandlerOutcome::Handled)
    }

    fn name(&self) -> &str {
        "PreFlightHandler"
    }

    fn cors_config(&self, _req: &HandlerRequest) -> Option<CorsConfig> {
        self.config.clone()
    }
}

/// Interceptor placed first in the chain of an actual CORS request.
///
/// A rejection short-circuits the chain like any other `false` pre-handle.
/// Async continuations are let through; CORS was decided on the original dispatch.
pub struct CorsInterceptor {
    config: CorsConfig,
    processor: Arc<dyn CorsProcessor>,
}

impl CorsInterceptor {
    #[must_use]
    pub fn new(config: CorsConfig, processor: Arc<dyn CorsProcessor>) -> Self {
        Self { config, processor }
    }

    #[must_use]
    pub fn config(&self) -> &CorsConfig {
        &self.config
    }
}

impl Interceptor for CorsInterceptor {
    fn name(&self) -> &str {
        "CorsInterceptor"
    }

    fn pre_handle(
        &self,
        req: &HandlerRequest,
        res: &mut HandlerResponse,
        _handler: &dyn Handler,
    ) -> Result<bool, DispatchError> {
        if req.dispatch_type == DispatchType::Async {
            return Ok(true);
        }
        Ok(self.processor.process_request(Some(&self.config), req, res))
    }
}
