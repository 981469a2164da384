use tracing::{debug, info, warn};

use super::{AsyncInterceptor, Interceptor};
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::DispatchError;
use crate::handler::Handler;

/// Logs the request lifecycle as structured events.
///
/// Every event carries the request id, method, path and handler so the
/// pre-handle and completion records of one request can be joined.
pub struct TracingInterceptor;

impl Interceptor for TracingInterceptor {
    fn name(&self) -> &str {
        "tracing"
    }

    fn pre_handle(
        &self,
        req: &HandlerRequest,
        _res: &mut HandlerResponse,
        handler: &dyn Handler,
    ) -> Result<bool, DispatchError> {
        info!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            handler = %handler.name(),
            pattern = req.attributes().best_matching_pattern().unwrap_or(""),
            "Request started"
        );
        Ok(true)
    }

    fn after_completion(
        &self,
        req: &HandlerRequest,
        res: &mut HandlerResponse,
        handler: &dyn Handler,
        error: Option<&DispatchError>,
    ) -> Result<(), DispatchError> {
        let latency_ms = u64::try_from(req.received_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        match error {
            Some(e) => warn!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                handler = %handler.name(),
                status = res.status,
                latency_ms = latency_ms,
                error = %e,
                "Request failed"
            ),
            None => info!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                handler = %handler.name(),
                status = res.status,
                latency_ms = latency_ms,
                "Request completed"
            ),
        }
        Ok(())
    }

    fn as_async(&self) -> Option<&dyn AsyncInterceptor> {
        Some(self)
    }
}

impl AsyncInterceptor for TracingInterceptor {
    fn after_concurrent_handling_started(
        &self,
        req: &HandlerRequest,
        _res: &mut HandlerResponse,
        handler: &dyn Handler,
    ) -> Result<(), DispatchError> {
        debug!(
            request_id = %req.request_id,
            handler = %handler.name(),
            "Handler started async processing"
        );
        Ok(())
    }
}
