//! CORS behaviour through the full dispatch pipeline
//!
//! # Test Coverage
//!
//! - Pre-flight requests resolved against the actual method and never reaching the handler
//! - Actual-request rejection short-circuiting the chain
//! - Handler and global policies combined, including the credentials conflict
//! - Requests without `Origin` and same-origin requests bypassing CORS

mod common;

use brrtdispatch::dispatcher::{DispatchOutcome, Dispatcher, HandlerResponse};
use brrtdispatch::error::DispatchError;
use brrtdispatch::handler::{handler_fn, with_cors, Handler, HandlerOutcome, HandlerRef};
use brrtdispatch::mapping::{HandlerMapping, UrlHandlerLookup};
use brrtdispatch::middleware::{
    CorsConfig, CorsConfigError, InterceptorRegistry, UrlBasedCorsConfigSource,
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE, CORS_REJECTION_STATUS, VARY,
};
use brrtdispatch::router::{Route, Router};
use common::recording::{CallLog, RecordingInterceptor};
use common::requests;
use http::Method;
use std::sync::Arc;

const APP_ORIGIN: &str = "https://app.example.com";

fn order_handler(log: &CallLog) -> Arc<dyn Handler> {
    let log = log.clone();
    handler_fn("order", move |_req, res| {
        log.push("handler:order".to_string());
        res.body = serde_json::json!({ "ok": true });
        Ok(HandlerOutcome::Handled)
    })
}

fn handler_policy(methods: &[Method]) -> CorsConfig {
    CorsConfig::builder()
        .allowed_origins(&[APP_ORIGIN])
        .allowed_methods(methods)
        .max_age(60)
        .build()
        .unwrap()
}

fn dispatcher(log: &CallLog, handler: Arc<dyn Handler>, global: Option<CorsConfig>) -> Dispatcher {
    let route = Route::new("/orders/{id}", HandlerRef::Raw(handler))
        .unwrap()
        .with_methods([Method::GET, Method::POST, Method::DELETE]);
    let mut builder = HandlerMapping::builder(Arc::new(UrlHandlerLookup::new(Router::new(vec![route]))))
        .with_interceptors(InterceptorRegistry::new().with_global(RecordingInterceptor::new("Logging", log).shared()));
    if let Some(global) = global {
        builder = builder.with_cors_source(Arc::new(UrlBasedCorsConfigSource::new().with("/**", global).unwrap()));
    }
    Dispatcher::builder().with_mapping(builder.build()).build()
}

#[test]
fn test_preflight_for_disallowed_method_is_rejected() {
    let log = CallLog::new();
    let handler = with_cors(order_handler(&log), handler_policy(&[Method::GET, Method::POST]));
    let dispatcher = dispatcher(&log, handler, None);

    let response = dispatcher.handle(requests::preflight("/orders/42", APP_ORIGIN, "DELETE"));

    assert_eq!(response.status, CORS_REJECTION_STATUS);
    assert!(response.get_header(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    assert!(response.get_header(VARY).is_none());
    assert!(log.entries().is_empty(), "neither interceptors nor handler run on pre-flight");
}

#[test]
fn test_preflight_for_allowed_method_writes_headers() {
    let log = CallLog::new();
    let handler = with_cors(order_handler(&log), handler_policy(&[Method::GET, Method::DELETE]));
    let dispatcher = dispatcher(&log, handler, None);

    let response = dispatcher.handle(requests::preflight("/orders/42", APP_ORIGIN, "DELETE"));

    assert_eq!(response.status, 200);
    assert_eq!(response.get_header(ACCESS_CONTROL_ALLOW_ORIGIN), Some(APP_ORIGIN));
    assert_eq!(response.get_header(ACCESS_CONTROL_ALLOW_METHODS), Some("GET, DELETE"));
    assert_eq!(response.get_header(ACCESS_CONTROL_MAX_AGE), Some("60"));
    assert!(response.get_header(VARY).unwrap().contains("Origin"));
    assert!(log.entries().is_empty());
}

#[test]
fn test_preflight_for_unrouted_method_is_not_found() {
    let log = CallLog::new();
    let dispatcher = dispatcher(&log, order_handler(&log), Some(CorsConfig::permissive()));

    let outcome = dispatcher
        .dispatch(requests::preflight("/orders/42", APP_ORIGIN, "PATCH"), HandlerResponse::default())
        .unwrap();
    assert!(matches!(outcome, DispatchOutcome::NotFound(_)));
}

#[test]
fn test_actual_request_from_disallowed_origin_short_circuits() {
    let log = CallLog::new();
    let handler = with_cors(order_handler(&log), handler_policy(&[Method::GET]));
    let dispatcher = dispatcher(&log, handler, None);

    let outcome = dispatcher
        .dispatch(
            requests::cors(Method::GET, "/orders/42", "https://evil.example.com"),
            HandlerResponse::default(),
        )
        .unwrap();

    match outcome {
        DispatchOutcome::Rejected(exchange) => {
            assert_eq!(exchange.response.status, CORS_REJECTION_STATUS);
        }
        other => panic!("Expected Rejected, got {other:?}"),
    }
    assert!(log.entries().is_empty());
}

#[test]
fn test_actual_request_from_allowed_origin() {
    let log = CallLog::new();
    let handler = with_cors(order_handler(&log), handler_policy(&[Method::GET]));
    let dispatcher = dispatcher(&log, handler, None);

    let response = dispatcher.handle(requests::cors(Method::GET, "/orders/42", APP_ORIGIN));

    assert_eq!(response.status, 200);
    assert_eq!(response.get_header(ACCESS_CONTROL_ALLOW_ORIGIN), Some(APP_ORIGIN));
    assert_eq!(
        log.entries(),
        vec!["pre:Logging", "handler:order", "post:Logging", "after:Logging"]
    );
}

#[test]
fn test_global_and_handler_policies_are_combined() {
    let log = CallLog::new();
    let global = CorsConfig::builder()
        .allowed_origins(&["https://admin.example.com"])
        .allowed_methods(&[Method::GET])
        .max_age(600)
        .build()
        .unwrap();
    let handler = with_cors(order_handler(&log), handler_policy(&[Method::POST]));
    let dispatcher = dispatcher(&log, handler, Some(global));

    let response = dispatcher.handle(requests::preflight("/orders/42", "https://admin.example.com", "POST"));
    assert_eq!(response.status, 200);
    assert_eq!(response.get_header(ACCESS_CONTROL_ALLOW_METHODS), Some("GET, POST"));
    assert_eq!(response.get_header(ACCESS_CONTROL_MAX_AGE), Some("60"));

    let response = dispatcher.handle(requests::preflight("/orders/42", APP_ORIGIN, "GET"));
    assert_eq!(response.get_header(ACCESS_CONTROL_ALLOW_ORIGIN), Some(APP_ORIGIN));
}

#[test]
fn test_credentials_with_global_wildcard_is_configuration_error() {
    let log = CallLog::new();
    let handler_cors = CorsConfig::builder()
        .allowed_origins(&[APP_ORIGIN])
        .allow_credentials(true)
        .build()
        .unwrap();
    let global = CorsConfig::builder().allowed_origins(&["*"]).build().unwrap();
    let dispatcher = dispatcher(&log, with_cors(order_handler(&log), handler_cors), Some(global));

    let err = dispatcher
        .dispatch(
            requests::cors(Method::GET, "/orders/42", APP_ORIGIN),
            HandlerResponse::default(),
        )
        .unwrap_err();

    assert_eq!(err, DispatchError::CorsConfig(CorsConfigError::WildcardWithCredentials));
    assert!(log.entries().is_empty(), "configuration errors surface before any interceptor");
}

#[test]
fn test_credentials_echo_origin() {
    let log = CallLog::new();
    let config = CorsConfig::builder()
        .allowed_origin_patterns(&["https://*.example.com"])
        .allow_credentials(true)
        .build()
        .unwrap();
    let dispatcher = dispatcher(&log, with_cors(order_handler(&log), config), None);

    let response = dispatcher.handle(requests::cors(Method::GET, "/orders/42", "https://shop.example.com"));
    assert_eq!(response.get_header(ACCESS_CONTROL_ALLOW_ORIGIN), Some("https://shop.example.com"));
    assert_eq!(response.get_header(ACCESS_CONTROL_ALLOW_CREDENTIALS), Some("true"));
}

#[test]
fn test_request_without_origin_bypasses_cors() {
    let log = CallLog::new();
    let handler = with_cors(order_handler(&log), handler_policy(&[Method::GET]));
    let dispatcher = dispatcher(&log, handler, None);

    let response = dispatcher.handle(requests::get("/orders/42"));
    assert_eq!(response.status, 200);
    assert!(response.get_header(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    assert!(response.get_header(VARY).is_none());
}

#[test]
fn test_same_origin_request_gets_no_cors_headers() {
    let log = CallLog::new();
    let handler = with_cors(order_handler(&log), handler_policy(&[Method::GET]));
    let dispatcher = dispatcher(&log, handler, None);

    let request = requests::cors(Method::GET, "/orders/42", "https://api.example.com")
        .with_scheme("https")
        .with_header("Host", "api.example.com");
    let response = dispatcher.handle(request);
    assert_eq!(response.status, 200);
    assert!(response.get_header(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[test]
fn test_same_host_on_other_port_or_scheme_is_cross_origin() {
    for origin in ["http://api.example.com:9999", "https://api.example.com"] {
        let log = CallLog::new();
        let handler = with_cors(order_handler(&log), handler_policy(&[Method::GET]));
        let dispatcher = dispatcher(&log, handler, None);

        let request = requests::cors(Method::GET, "/orders/42", origin).with_header("Host", "api.example.com");
        let outcome = dispatcher.dispatch(request, HandlerResponse::default()).unwrap();

        match outcome {
            DispatchOutcome::Rejected(exchange) => {
                assert_eq!(exchange.response.status, CORS_REJECTION_STATUS, "origin {origin}");
            }
            other => panic!("Expected Rejected for {origin}, got {other:?}"),
        }
        assert!(log.entries().is_empty(), "origin {origin}");
    }
}
