use http::Method;
use serde_json::Value;
use tracing::{debug, warn};

use super::CorsConfig;
use crate::dispatcher::{HandlerRequest, HandlerResponse};

pub const ORIGIN: &str = "origin";
pub const ACCESS_CONTROL_REQUEST_METHOD: &str = "access-control-request-method";
pub const ACCESS_CONTROL_REQUEST_HEADERS: &str = "access-control-request-headers";
pub const ACCESS_CONTROL_ALLOW_ORIGIN: &str = "access-control-allow-origin";
pub const ACCESS_CONTROL_ALLOW_METHODS: &str = "access-control-allow-methods";
pub const ACCESS_CONTROL_ALLOW_HEADERS: &str = "access-control-allow-headers";
pub const ACCESS_CONTROL_ALLOW_CREDENTIALS: &str = "access-control-allow-credentials";
pub const ACCESS_CONTROL_EXPOSE_HEADERS: &str = "access-control-expose-headers";
pub const ACCESS_CONTROL_MAX_AGE: &str = "access-control-max-age";
pub const VARY: &str = "vary";

/// Status written when a CORS check fails.
pub const CORS_REJECTION_STATUS: u16 = 403;
pub const CORS_REJECTION_BODY: &str = "Invalid CORS request";

/// Applies a CORS policy to one request/response pair.
pub trait CorsProcessor: Send + Sync {
    /// Returns `false` when the request was rejected; the response then already
    /// carries the rejection status.
    fn process_request(
        &self,
        config: Option<&CorsConfig>,
        req: &HandlerRequest,
        res: &mut HandlerResponse,
    ) -> bool;
}

/// The standard CORS protocol.
///
/// # Security
///
/// - Validates the Origin header against the configured origins and patterns
/// - Only adds CORS headers for valid cross-origin requests
/// - Skips same-origin requests
/// - Rejects with 403 on any failed check
/// - Requires every requested header to be allowed on preflight
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCorsProcessor;

impl CorsProcessor for DefaultCorsProcessor {
    fn process_request(
        &self,
        config: Option<&CorsConfig>,
        req: &HandlerRequest,
        res: &mut HandlerResponse,
    ) -> bool {
        let Some(origin) = req.get_header(ORIGIN) else {
            return true;
        };

        if is_same_origin(req, origin) {
            debug!(request_id = %req.request_id, origin = %origin, "CORS: same-origin request, skipping CORS headers");
            add_vary(res);
            return true;
        }

        if res.has_header(ACCESS_CONTROL_ALLOW_ORIGIN) {
            debug!(request_id = %req.request_id, "CORS: response already carries Access-Control-Allow-Origin");
            add_vary(res);
            return true;
        }

        let preflight = is_preflight_request(req);
        match config {
            Some(config) => handle_internal(config, req, res, origin, preflight),
            None if preflight => {
                warn!(request_id = %req.request_id, origin = %origin, "CORS preflight: no configuration applies");
                reject(res);
                false
            }
            None => {
                add_vary(res);
                true
            }
        }
    }
}

/// The answer depends on these request headers; rejections write no headers at all.
fn add_vary(res: &mut HandlerResponse) {
    res.add_header_values(
        VARY,
        &["Origin", "Access-Control-Request-Method", "Access-Control-Request-Headers"],
    );
}

fn handle_internal(
    config: &CorsConfig,
    req: &HandlerRequest,
    res: &mut HandlerResponse,
    origin: &str,
    preflight: bool,
) -> bool {
    let Some(allow_origin) = config.check_origin(origin) else {
        warn!(request_id = %req.request_id, origin = %origin, preflight, "CORS: origin not allowed");
        reject(res);
        return false;
    };

    let method = if preflight {
        match req
            .get_header(ACCESS_CONTROL_REQUEST_METHOD)
            .map(|m| Method::from_bytes(m.trim().as_bytes()))
        {
            Some(Ok(method)) => method,
            _ => {
                warn!(
                    request_id = %req.request_id,
                    requested_method = ?req.get_header(ACCESS_CONTROL_REQUEST_METHOD),
                    "CORS preflight: invalid Access-Control-Request-Method"
                );
                reject(res);
                return false;
            }
        }
    } else {
        req.method.clone()
    };
    let Some(allow_methods) = config.check_http_method(&method) else {
        warn!(request_id = %req.request_id, method = %method, preflight, "CORS: method not in allowed methods");
        reject(res);
        return false;
    };

    let requested_headers = if preflight {
        requested_headers(req)
    } else {
        Vec::new()
    };
    let allow_headers = config.check_headers(&requested_headers);
    if preflight && allow_headers.is_none() {
        warn!(
            request_id = %req.request_id,
            requested_headers = ?requested_headers,
            "CORS preflight: requested headers not allowed"
        );
        reject(res);
        return false;
    }

    add_vary(res);
    res.set_header(ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
    if preflight {
        res.set_header(ACCESS_CONTROL_ALLOW_METHODS, allow_methods.join(", "));
        if let Some(headers) = allow_headers.filter(|h| !h.is_empty()) {
            res.set_header(ACCESS_CONTROL_ALLOW_HEADERS, headers.join(", "));
        }
    }
    if let Some(exposed) = config.exposed_headers().filter(|h| !h.is_empty()) {
        res.set_header(ACCESS_CONTROL_EXPOSE_HEADERS, exposed.join(", "));
    }
    if config.allow_credentials() == Some(true) {
        res.set_header(ACCESS_CONTROL_ALLOW_CREDENTIALS, "true".to_string());
    }
    if preflight {
        if let Some(age) = config.max_age() {
            res.set_header(ACCESS_CONTROL_MAX_AGE, age.to_string());
        }
    }
    debug!(request_id = %req.request_id, origin = %origin, preflight, "CORS: request allowed");
    true
}

fn reject(res: &mut HandlerResponse) {
    res.status = CORS_REJECTION_STATUS;
    res.body = Value::String(CORS_REJECTION_BODY.to_string());
}

fn requested_headers(req: &HandlerRequest) -> Vec<String> {
    req.get_header_values(ACCESS_CONTROL_REQUEST_HEADERS)
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

/// A request carrying an `Origin` header.
#[must_use]
pub fn is_cors_request(req: &HandlerRequest) -> bool {
    req.get_header(ORIGIN).is_some()
}

/// `OPTIONS` with both `Origin` and `Access-Control-Request-Method`.
#[must_use]
pub fn is_preflight_request(req: &HandlerRequest) -> bool {
    req.method == Method::OPTIONS
        && is_cors_request(req)
        && req.get_header(ACCESS_CONTROL_REQUEST_METHOD).is_some()
}

/// Check if a request is same-origin (no CORS headers needed)
///
/// Scheme, host and port of the Origin must all equal the request's own:
/// its scheme and `Host` header, with the scheme's default port when `Host`
/// names none. Without a `Host` header the request is treated as cross-origin.
#[must_use]
pub fn is_same_origin(req: &HandlerRequest, origin: &str) -> bool {
    let Some(host) = req.get_header("host").map(str::trim).filter(|h| !h.is_empty()) else {
        return false;
    };
    let Ok(origin_url) = url::Url::parse(origin) else {
        return false;
    };
    let Ok(request_url) = url::Url::parse(&format!("{}://{host}", req.scheme)) else {
        return false;
    };

    origin_url.scheme() == request_url.scheme()
        && matches!(
            (origin_url.host_str(), request_url.host_str()),
            (Some(a), Some(b)) if a.eq_ignore_ascii_case(b)
        )
        && origin_url.port_or_known_default() == request_url.port_or_known_default()
}
