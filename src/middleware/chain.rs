//! Per-request handler + interceptor chain and its three-phase protocol.
//!
//! ```text
//! NotStarted ─▶ PreHandling ─▶ HandlerInvoking ─▶ PostHandling ─▶ Completing ─▶ Done
//!                    │                 │
//!                    │                 └─▶ AsyncStarted ─▶ PostHandling / Completing ─▶ Done
//!                    └─▶ ShortCircuited ─▶ Completing ─▶ Done
//! ```
//!
//! The cursor records the last interceptor whose `pre_handle` returned `true`.
//! Completion walks backwards from the cursor, so an interceptor whose
//! `pre_handle` never succeeded never sees `after_completion`.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};

use super::InterceptorHandle;
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::DispatchError;
use crate::handler::{Handler, HandlerOutcome};
use crate::view::ModelAndView;

/// Where a chain is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    NotStarted,
    PreHandling,
    ShortCircuited,
    HandlerInvoking,
    AsyncStarted,
    PostHandling,
    Completing,
    Done,
}

/// A leaf handler and the interceptors that apply to one request.
///
/// Owned by exactly one dispatch; never pooled or reused.
pub struct ExecutionChain {
    handler: Arc<dyn Handler>,
    interceptors: Vec<InterceptorHandle>,
    cursor: Option<usize>,
    state: ChainState,
    async_notified: bool,
}

impl ExecutionChain {
    #[must_use]
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self::with_interceptors(handler, Vec::new())
    }

    #[must_use]
    pub fn with_interceptors(handler: Arc<dyn Handler>, interceptors: Vec<InterceptorHandle>) -> Self {
        Self {
            handler,
            interceptors,
            cursor: None,
            state: ChainState::NotStarted,
            async_notified: false,
        }
    }

    #[must_use]
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    #[must_use]
    pub fn interceptors(&self) -> &[InterceptorHandle] {
        &self.interceptors
    }

    pub fn add_interceptor(&mut self, interceptor: InterceptorHandle) {
        self.interceptors.push(interceptor);
    }

    /// Insert at `index`, clamped to the current length.
    pub fn insert_interceptor(&mut self, index: usize, interceptor: InterceptorHandle) {
        let index = index.min(self.interceptors.len());
        self.interceptors.insert(index, interceptor);
    }

    /// Index of the last interceptor whose `pre_handle` returned `true`.
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    #[must_use]
    pub fn state(&self) -> ChainState {
        self.state
    }

    #[must_use]
    pub fn into_parts(self) -> (Arc<dyn Handler>, Vec<InterceptorHandle>) {
        (self.handler, self.interceptors)
    }

    /// Run every `pre_handle` in order.
    ///
    /// On `false` or an error the completion phase runs immediately for the
    /// interceptors before the one that stopped the chain; the error (if any)
    /// is then returned to the caller.
    pub fn apply_pre_handle(&mut self, req: &HandlerRequest, res: &mut HandlerResponse) -> Result<bool, DispatchError> {
        self.state = ChainState::PreHandling;
        for (idx, handle) in self.interceptors.iter().enumerate() {
            match handle.interceptor().pre_handle(req, res, self.handler.as_ref()) {
                Ok(true) => self.cursor = Some(idx),
                Ok(false) => {
                    debug!(
                        request_id = %req.request_id,
                        interceptor = %handle.name(),
                        interceptor_idx = idx,
                        "Interceptor pre_handle rejected request"
                    );
                    self.state = ChainState::ShortCircuited;
                    self.trigger_after_completion(req, res, None);
                    return Ok(false);
                }
                Err(e) => {
                    debug!(
                        request_id = %req.request_id,
                        interceptor = %handle.name(),
                        interceptor_idx = idx,
                        error = %e,
                        "Interceptor pre_handle failed"
                    );
                    self.state = ChainState::ShortCircuited;
                    self.trigger_after_completion(req, res, Some(&e));
                    return Err(e);
                }
            }
        }
        Ok(true)
    }

    /// Invoke the handler. Errors are returned untouched; the caller decides
    /// when to run completion with them.
    pub fn invoke_handler(&mut self, req: &HandlerRequest, res: &mut HandlerResponse) -> Result<HandlerOutcome, DispatchError> {
        self.state = ChainState::HandlerInvoking;
        let outcome = self.handler.handle(req, res)?;
        if matches!(outcome, HandlerOutcome::Async(_)) {
            self.state = ChainState::AsyncStarted;
        }
        Ok(outcome)
    }

    /// Run every `post_handle` in reverse order. The first error aborts the
    /// remaining post-handles and is returned.
    pub fn apply_post_handle(
        &mut self,
        req: &HandlerRequest,
        res: &mut HandlerResponse,
        model_and_view: &mut Option<ModelAndView>,
    ) -> Result<(), DispatchError> {
        self.state = ChainState::PostHandling;
        for handle in self.interceptors.iter().rev() {
            handle
                .interceptor()
                .post_handle(req, res, self.handler.as_ref(), model_and_view.as_mut())?;
        }
        Ok(())
    }

    /// Run `after_completion` in reverse order from the cursor down.
    ///
    /// Runs at most once per chain and only if pre-handling started. Each
    /// callback is isolated: a failure is logged and the walk continues.
    pub fn trigger_after_completion(&mut self, req: &HandlerRequest, res: &mut HandlerResponse, error: Option<&DispatchError>) {
        if matches!(self.state, ChainState::NotStarted | ChainState::Completing | ChainState::Done) {
            return;
        }
        self.state = ChainState::Completing;
        if let Some(cursor) = self.cursor {
            for (idx, handle) in self.interceptors[..=cursor].iter().enumerate().rev() {
                if let Err(e) = handle
                    .interceptor()
                    .after_completion(req, res, self.handler.as_ref(), error)
                {
                    error!(
                        request_id = %req.request_id,
                        interceptor = %handle.name(),
                        interceptor_idx = idx,
                        error = %e,
                        "Interceptor after_completion failed"
                    );
                }
            }
        }
        self.state = ChainState::Done;
    }

    /// Offer the async hand-off to every async-capable interceptor, in reverse
    /// order. Runs once, and only after the handler went asynchronous.
    /// Failures are logged and do not stop the walk.
    pub fn apply_after_concurrent_handling_started(&mut self, req: &HandlerRequest, res: &mut HandlerResponse) {
        if self.state != ChainState::AsyncStarted || self.async_notified {
            return;
        }
        self.async_notified = true;
        for (idx, handle) in self.interceptors.iter().enumerate().rev() {
            let Some(interceptor) = handle.as_async() else {
                continue;
            };
            if let Err(e) = interceptor.after_concurrent_handling_started(req, res, self.handler.as_ref()) {
                error!(
                    request_id = %req.request_id,
                    interceptor = %handle.name(),
                    interceptor_idx = idx,
                    error = %e,
                    "Interceptor after_concurrent_handling_started failed"
                );
            }
        }
    }
}

impl fmt::Debug for ExecutionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionChain")
            .field("handler", &self.handler.name())
            .field(
                "interceptors",
                &self.interceptors.iter().map(InterceptorHandle::name).collect::<Vec<_>>(),
            )
            .field("cursor", &self.cursor)
            .field("state", &self.state)
            .finish()
    }
}
