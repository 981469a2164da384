use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use super::{AsyncInterceptor, Interceptor};
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::DispatchError;
use crate::handler::Handler;

/// Interceptor collecting request statistics
///
/// All counters use atomic operations for thread-safe updates without locks.
///
/// Metrics collected:
/// - Total request count (every request whose pre-handle reached this interceptor)
/// - Failure count (completion with an error, or a response status >= 400)
/// - Async hand-off count
/// - Average latency, measured from [`HandlerRequest::received_at`] to completion
pub struct MetricsInterceptor {
    request_count: AtomicUsize,
    failure_count: AtomicUsize,
    async_started: AtomicUsize,
    completed: AtomicU64,
    total_latency_ns: AtomicU64,
}

/// Default initialization for metrics interceptor
///
/// Creates a new instance with all atomic counters set to zero.
impl Default for MetricsInterceptor {
    fn default() -> Self {
        Self {
            request_count: AtomicUsize::new(0),
            failure_count: AtomicUsize::new(0),
            async_started: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            total_latency_ns: AtomicU64::new(0),
        }
    }
}

impl MetricsInterceptor {
    /// Create a new metrics interceptor with all counters initialized to zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the total number of requests seen
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Get the number of requests that completed with an error or an error status
    pub fn failure_count(&self) -> usize {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Get the number of requests whose handler went asynchronous
    pub fn async_started_count(&self) -> usize {
        self.async_started.load(Ordering::Relaxed)
    }

    /// Calculate the average request latency
    ///
    /// Returns the mean time from request arrival to completion across all
    /// completed requests. Returns zero duration if nothing has completed yet.
    pub fn average_latency(&self) -> Duration {
        let count = self.completed.load(Ordering::Relaxed);
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }
}

/// Metrics collection interceptor implementation
///
/// This interceptor is passive: it never rejects requests, only observes and records.
///
/// # Performance
///
/// Uses `Ordering::Relaxed` for atomic operations to minimize overhead.
/// Metrics are eventually consistent but extremely low-cost to collect.
impl Interceptor for MetricsInterceptor {
    fn name(&self) -> &str {
        "metrics"
    }

    /// Increment request counter before processing
    fn pre_handle(
        &self,
        _req: &HandlerRequest,
        _res: &mut HandlerResponse,
        _handler: &dyn Handler,
    ) -> Result<bool, DispatchError> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    /// Record latency and failures once the request is done
    fn after_completion(
        &self,
        req: &HandlerRequest,
        res: &mut HandlerResponse,
        _handler: &dyn Handler,
        error: Option<&DispatchError>,
    ) -> Result<(), DispatchError> {
        let latency = req.received_at.elapsed();
        self.total_latency_ns.fetch_add(
            u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX),
            Ordering::Relaxed,
        );
        self.completed.fetch_add(1, Ordering::Relaxed);
        if error.is_some() || res.status >= 400 {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn as_async(&self) -> Option<&dyn AsyncInterceptor> {
        Some(self)
    }
}

impl AsyncInterceptor for MetricsInterceptor {
    fn after_concurrent_handling_started(
        &self,
        _req: &HandlerRequest,
        _res: &mut HandlerResponse,
        _handler: &dyn Handler,
    ) -> Result<(), DispatchError> {
        self.async_started.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
