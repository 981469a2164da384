use std::fmt;
use std::sync::mpsc;
use std::time::Duration;

use crate::error::DispatchError;
use crate::view::ModelAndView;

/// Value eventually produced by an asynchronous handler.
pub type AsyncValue = Result<Option<ModelAndView>, DispatchError>;

/// Receiving half of an asynchronous handler result.
///
/// Returned inside [`HandlerOutcome::Async`](super::HandlerOutcome::Async);
/// the dispatcher parks the request until the paired [`DeferredResultSender`]
/// delivers a value, the timeout elapses, or every sender is dropped.
pub struct DeferredResult {
    rx: mpsc::Receiver<AsyncValue>,
    timeout: Option<Duration>,
}

/// Producing half; cheap to clone and safe to move to another thread.
#[derive(Clone)]
pub struct DeferredResultSender {
    tx: mpsc::Sender<AsyncValue>,
}

/// Create a linked sender/result pair. `None` waits without a deadline.
#[must_use]
pub fn deferred_result(timeout: Option<Duration>) -> (DeferredResultSender, DeferredResult) {
    let (tx, rx) = mpsc::channel();
    (DeferredResultSender { tx }, DeferredResult { rx, timeout })
}

impl DeferredResultSender {
    /// Deliver the result. Returns `false` if the request was already completed or abandoned.
    pub fn set_result(&self, value: AsyncValue) -> bool {
        self.tx.send(value).is_ok()
    }
}

impl DeferredResult {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Block until the value arrives.
    ///
    /// An elapsed timeout becomes [`DispatchError::AsyncTimeout`] and a
    /// dropped sender becomes [`DispatchError::AsyncCancelled`].
    pub(crate) fn wait(&self) -> AsyncValue {
        let received = match self.timeout {
            Some(timeout) => self.rx.recv_timeout(timeout).map_err(|e| match e {
                mpsc::RecvTimeoutError::Timeout => DispatchError::AsyncTimeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                },
                mpsc::RecvTimeoutError::Disconnected => DispatchError::AsyncCancelled,
            }),
            None => self.rx.recv().map_err(|_| DispatchError::AsyncCancelled),
        };
        received.and_then(|value| value)
    }
}

impl fmt::Debug for DeferredResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredResult")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
