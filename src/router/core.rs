//! Router core module - hot path for request routing.
//!
//! # JSF Compliance (Rule 206)
//!
//! This module is part of the request hot path. The following clippy lints
//! are denied to enforce "no heap allocations after initialization":
//!
//! - `clippy::inefficient_to_string` - Catches unnecessary allocations
//! - `clippy::format_push_string` - Prevents format! string building

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]

use super::pattern::{PathPattern, PatternError};
use crate::handler::HandlerRef;
use crate::negotiation::MediaType;
use http::Method;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Maximum number of path/query parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names are `Arc<str>` shared with the compiled pattern, so a match only
/// allocates for the captured values.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// A registered route: a path pattern, the methods it accepts and its target.
#[derive(Clone, Debug)]
pub struct Route {
    pub pattern: PathPattern,
    /// Accepted methods; empty means every method
    pub methods: Vec<Method>,
    pub target: HandlerRef,
    /// Media types the target can produce, published to view resolution
    pub produces: Vec<MediaType>,
}

impl Route {
    pub fn new(pattern: &str, target: HandlerRef) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: PathPattern::parse(pattern)?,
            methods: Vec::new(),
            target,
            produces: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_produces(mut self, produces: Vec<MediaType>) -> Self {
        self.produces = produces;
        self
    }

    fn accepts(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }
}

/// Result of successfully matching a request path to a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    /// Path parameters extracted from the URL (e.g., `{id}` → `{"id": "123"}`)
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics, mirroring the request accessors.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Ordered route table matched by pattern specificity.
///
/// Every route whose pattern and method accept the request is a candidate;
/// the most specific pattern wins and registration order breaks ties.
#[derive(Clone, Debug, Default)]
pub struct Router {
    routes: Vec<Arc<Route>>,
}

impl Router {
    #[must_use]
    pub fn new(routes: Vec<Route>) -> Self {
        let routes: Vec<Arc<Route>> = routes.into_iter().map(Arc::new).collect();

        // RT5: Routing table loaded
        let routes_summary: Vec<String> = routes
            .iter()
            .take(10)
            .map(|r| describe_route(r))
            .collect();
        info!(
            routes_count = routes.len(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );

        Self { routes }
    }

    pub fn add_route(&mut self, route: Route) {
        self.routes.push(Arc::new(route));
    }

    #[must_use]
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    /// Match a request against the table.
    ///
    /// `HEAD` falls back to routes that accept `GET` when no route accepts
    /// `HEAD` itself.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// if let Some(m) = router.route(&Method::GET, "/users/123") {
    ///     assert_eq!(m.get_path_param("id"), Some("123"));
    /// }
    /// ```
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        // RT1: Route match attempt
        debug!(method = %method, path = %path, "Route match attempt");
        let match_start = Instant::now();

        let mut result = self.best_match(method, path);
        if result.is_none() && *method == Method::HEAD {
            result = self.best_match(&Method::GET, path);
        }
        let match_duration = match_start.elapsed();

        match result {
            Some(m) => {
                // RT3: Route matched
                if match_duration > Duration::from_millis(1) {
                    warn!(
                        method = %method,
                        path = %path,
                        route_pattern = %m.route.pattern,
                        duration_us = match_duration.as_micros(),
                        "Slow route matching detected"
                    );
                } else {
                    debug!(
                        method = %method,
                        path = %path,
                        route_pattern = %m.route.pattern,
                        path_params = ?m.path_params,
                        duration_us = match_duration.as_micros(),
                        "Route matched"
                    );
                }
                Some(m)
            }
            None => {
                // RT4: No route found
                debug!(
                    method = %method,
                    path = %path,
                    duration_us = match_duration.as_micros(),
                    "No route matched"
                );
                None
            }
        }
    }

    fn best_match(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let mut best: Option<(&Arc<Route>, ParamVec)> = None;
        for route in &self.routes {
            if !route.accepts(method) {
                continue;
            }
            let Some(params) = route.pattern.match_path(path) else {
                continue;
            };
            let replace = match &best {
                Some((current, _)) => {
                    route.pattern.specificity_cmp(&current.pattern) == Ordering::Less
                }
                None => true,
            };
            if replace {
                best = Some((route, params));
            }
        }
        best.map(|(route, path_params)| RouteMatch {
            route: Arc::clone(route),
            path_params,
        })
    }
}

/// `"GET,POST /users/{id} -> get_user"` style summary used by logs and the CLI.
#[must_use]
pub fn describe_route(route: &Route) -> String {
    let methods = if route.methods.is_empty() {
        "*".to_string()
    } else {
        route
            .methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(",")
    };
    format!("{methods} {} -> {}", route.pattern, route.target.describe())
}
