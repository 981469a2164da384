//! # Router Module
//!
//! Path matching and route resolution for the dispatch pipeline.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling Ant-style path patterns (`/pets/{id}`, `/static/**`) into regexes
//! - Matching incoming requests to the most specific registered route
//! - Extracting URI template variables from the matched pattern
//!
//! ## Architecture
//!
//! The router uses a two-phase approach:
//!
//! 1. **Compilation**: At registration, patterns are compiled by [`PathPattern::parse`].
//!    Malformed patterns (unbalanced braces, duplicate variables, bad custom
//!    regexes) are rejected here rather than at request time.
//!
//! 2. **Matching**: For each request every route is tested; among the routes whose
//!    pattern and method accept the request the most specific pattern wins, with
//!    registration order breaking ties.
//!
//! ## Example
//!
//! ```rust,ignore
//! use brrtdispatch::handler::HandlerRef;
//! use brrtdispatch::router::{Route, Router};
//! use http::Method;
//!
//! let router = Router::new(vec![
//!     Route::new("/pets/{id}", HandlerRef::Named("get_pet".into()))?
//!         .with_methods([Method::GET]),
//! ]);
//!
//! let m = router.route(&Method::GET, "/pets/123").unwrap();
//! assert_eq!(m.get_path_param("id"), Some("123"));
//! ```

mod core;
mod pattern;

pub use core::{describe_route, ParamVec, Route, RouteMatch, Router, MAX_INLINE_PARAMS};
pub use pattern::{PathPattern, PatternError};
