//! Request and response model shared by every stage of the pipeline.
//!
//! # JSF Compliance (Rule 206)
//!
//! Headers and parameters use `SmallVec` storage so the common request never
//! touches the heap for its header table. Header names are `Arc<str>` because
//! the same handful of names repeat across every request.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]

use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::negotiation::MediaType;
use crate::router::ParamVec;
use http::Method;
use once_cell::unsync::OnceCell;
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Instant;

/// Maximum inline headers before heap allocation
/// Most requests have ≤16 headers (JSF: no heap in hot path)
pub const MAX_INLINE_HEADERS: usize = 16;

/// Scheme assumed for requests built without one.
pub const DEFAULT_SCHEME: &str = "http";

/// Stack-allocated header storage for the hot path
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Whether a request is an original dispatch or the continuation of async processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchType {
    #[default]
    Request,
    Async,
}

/// Write-once attributes the mapping and view layers publish on a request.
///
/// Every slot can be set exactly once. Later writes are ignored and the setter
/// reports `false`, so an attribute published by the lookup can never be
/// silently replaced further down the pipeline.
#[derive(Debug, Clone, Default)]
pub struct RequestAttributes {
    best_matching_pattern: OnceCell<Arc<str>>,
    best_matching_handler: OnceCell<String>,
    uri_template_variables: OnceCell<ParamVec>,
    producible_media_types: OnceCell<Vec<MediaType>>,
    selected_content_type: OnceCell<MediaType>,
}

impl RequestAttributes {
    #[must_use]
    pub fn best_matching_pattern(&self) -> Option<&str> {
        self.best_matching_pattern.get().map(AsRef::as_ref)
    }

    pub fn set_best_matching_pattern(&self, pattern: Arc<str>) -> bool {
        self.best_matching_pattern.set(pattern).is_ok()
    }

    /// Description of the handler the lookup selected.
    #[must_use]
    pub fn best_matching_handler(&self) -> Option<&str> {
        self.best_matching_handler.get().map(String::as_str)
    }

    pub fn set_best_matching_handler(&self, handler: String) -> bool {
        self.best_matching_handler.set(handler).is_ok()
    }

    #[must_use]
    pub fn uri_template_variables(&self) -> Option<&ParamVec> {
        self.uri_template_variables.get()
    }

    pub fn set_uri_template_variables(&self, variables: ParamVec) -> bool {
        self.uri_template_variables.set(variables).is_ok()
    }

    /// Media types the matched handler declared it can produce.
    #[must_use]
    pub fn producible_media_types(&self) -> Option<&[MediaType]> {
        self.producible_media_types.get().map(Vec::as_slice)
    }

    pub fn set_producible_media_types(&self, media_types: Vec<MediaType>) -> bool {
        self.producible_media_types.set(media_types).is_ok()
    }

    /// Content type chosen by content-negotiated view resolution.
    #[must_use]
    pub fn selected_content_type(&self) -> Option<&MediaType> {
        self.selected_content_type.get()
    }

    pub fn set_selected_content_type(&self, media_type: MediaType) -> bool {
        self.selected_content_type.set(media_type).is_ok()
    }
}

/// Incoming request as seen by mappings, interceptors, handlers and views.
///
/// The request is immutable once dispatch starts; the only state that grows
/// during dispatch lives in [`RequestAttributes`], which is write-once.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Scheme the request arrived over, lower case; `http` unless set
    pub scheme: String,
    /// Request path without the query string
    pub path: String,
    /// Query string parameters (stack-allocated for ≤8 params)
    pub query_params: ParamVec,
    /// HTTP headers (stack-allocated for ≤16 headers)
    pub headers: HeaderVec,
    /// Request body parsed as JSON (if present)
    pub body: Option<Value>,
    pub dispatch_type: DispatchType,
    /// When the request entered the pipeline; used for latency accounting
    pub received_at: Instant,
    attributes: RequestAttributes,
}

impl HandlerRequest {
    /// Build a request for `target`, splitting off and decoding any query string.
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        let query_params = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            request_id: RequestId::new(),
            method,
            scheme: DEFAULT_SCHEME.to_string(),
            path: path.to_string(),
            query_params,
            headers: HeaderVec::new(),
            body: None,
            dispatch_type: DispatchType::Request,
            received_at: Instant::now(),
            attributes: RequestAttributes::default(),
        }
    }

    /// Append a header. A caller-supplied `x-request-id` replaces the generated id.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if name.eq_ignore_ascii_case(REQUEST_ID_HEADER) {
            self.request_id = RequestId::from_header_or_new(Some(value));
        }
        self.headers.push((Arc::from(name), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_ascii_lowercase();
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_dispatch_type(mut self, dispatch_type: DispatchType) -> Self {
        self.dispatch_type = dispatch_type;
        self
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values of a possibly repeated header, in arrival order.
    pub fn get_header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name
    ///
    /// Uses "last write wins" semantics: if duplicate query parameter names exist
    /// (e.g., `?limit=10&limit=20`), returns the last occurrence.
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value of a URI template variable published by the lookup.
    #[must_use]
    pub fn path_variable(&self, name: &str) -> Option<&str> {
        self.attributes
            .uri_template_variables()?
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &RequestAttributes {
        &self.attributes
    }
}

/// Response under construction while the request travels through the pipeline.
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// HTTP response headers (stack-allocated for ≤16 headers)
    pub headers: HeaderVec,
    /// Response body as JSON
    pub body: Value,
}

impl Default for HandlerResponse {
    fn default() -> Self {
        Self::new(200, HeaderVec::new(), Value::Null)
    }
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a JSON response with default headers
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create an error response
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// Get a header by name
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// Add or update a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Merge comma-separated values into a list header, skipping ones already present.
    pub fn add_header_values(&mut self, name: &str, values: &[&str]) {
        let mut merged: Vec<String> = self
            .get_header(name)
            .map(|existing| {
                existing
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        for value in values {
            if !merged.iter().any(|m| m.eq_ignore_ascii_case(value)) {
                merged.push((*value).to_string());
            }
        }
        self.set_header(name, merged.join(", "));
    }
}
