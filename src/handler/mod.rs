//! # Handlers
//!
//! Application logic and the ways a lookup can refer to it.
//!
//! A lookup step hands the mapping a [`HandlerRef`]: a concrete handler, a
//! name to resolve through the [`HandlerRegistry`], or a handler that already
//! carries its own interceptors. The mapping flattens the last case so the
//! execution chain always sees a leaf handler.
//!
//! Handlers that cannot answer immediately return
//! [`HandlerOutcome::Async`] with a [`DeferredResult`]; the dispatcher
//! suspends the request until the paired sender delivers.

mod core;
mod deferred;

pub use core::{
    handler_fn, with_cors, FnHandler, Handler, HandlerOutcome, HandlerRef, HandlerRegistry,
    MapHandlerRegistry,
};
pub use deferred::{deferred_result, AsyncValue, DeferredResult, DeferredResultSender};
