//! # Dispatcher Module
//!
//! The dispatcher drives one request through the whole pipeline: handler
//! mapping, the execution chain's three phases, view resolution and
//! rendering.
//!
//! ## Request Flow
//!
//! 1. Each [`HandlerMapping`](crate::mapping::HandlerMapping), in precedence
//!    order, tries to resolve the request; the first chain wins
//! 2. No chain → `404` and [`DispatchOutcome::NotFound`]
//! 3. `pre_handle` on every interceptor; a `false` ends the request as
//!    [`DispatchOutcome::Rejected`]
//! 4. The handler runs and either finishes the response, returns a
//!    [`ModelAndView`](crate::view::ModelAndView), or suspends
//! 5. `post_handle` in reverse, then the view is resolved and rendered
//! 6. `after_completion` in reverse, bounded by the chain's cursor
//!
//! ## Asynchronous Handlers
//!
//! A handler returning [`HandlerOutcome::Async`](crate::handler::HandlerOutcome::Async)
//! releases the dispatching thread. Async-capable interceptors are notified
//! first, then the caller receives a [`PendingDispatch`] owning the request.
//! Steps 5 and 6 run on whichever thread calls [`PendingDispatch::resume`] or
//! [`PendingDispatch::wait`]. Completion runs exactly once: on resume, on
//! timeout, or when the pending dispatch is dropped.
//!
//! ## Error Handling
//!
//! Errors are returned from [`Dispatcher::dispatch`] after the completion
//! phase has seen them. [`Dispatcher::handle`] is the convenience entry point
//! that turns them into JSON error responses.
//!
//! ```rust,ignore
//! use brrtdispatch::dispatcher::{Dispatcher, HandlerRequest};
//!
//! let dispatcher = Dispatcher::builder().with_mapping(mapping).build();
//! let response = dispatcher.handle(HandlerRequest::new(Method::GET, "/orders/42"));
//! ```

mod core;
#[allow(clippy::module_inception)]
mod dispatcher;

pub use core::{
    DispatchType, HandlerRequest, HandlerResponse, HeaderVec, RequestAttributes, DEFAULT_SCHEME,
    MAX_INLINE_HEADERS,
};
pub use dispatcher::{DispatchOutcome, Dispatcher, DispatcherBuilder, Exchange, PendingDispatch, DEFAULT_LOCALE};
