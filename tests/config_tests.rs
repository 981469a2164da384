//! Tests for loading a dispatch configuration and turning it into runtime objects

mod common;

use brrtdispatch::config::DispatchConfig;
use brrtdispatch::dispatcher::{Dispatcher, HandlerRequest, HandlerResponse};
use brrtdispatch::handler::{handler_fn, HandlerOutcome, MapHandlerRegistry};
use brrtdispatch::middleware::{CorsConfigSource, Interceptor, TracingInterceptor, ACCESS_CONTROL_ALLOW_ORIGIN};
use brrtdispatch::view::{JsonView, Model, NamedViewResolver, View, ViewResolver};
use common::recording::{CallLog, RecordingInterceptor};
use common::requests;
use common::temp_files::create_temp_yaml;
use http::Method;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

const CONFIG: &str = r#"
routes:
  - pattern: /orders/{id}
    methods: [get, DELETE]
    handler: order
    produces: [application/json]
default_handler: fallback
interceptors:
  - name: tracing
  - name: audit
    include: ["/orders/**"]
    exclude: ["/orders/public/**"]
cors:
  - pattern: /orders/**
    allowed_origins: ["https://app.example.com"]
    allowed_methods: [GET, DELETE]
  - pattern: /**
    allowed_origins: ["*"]
negotiation:
  favor_parameter: true
  media_types:
    json: application/json
    html: text/html
"#;

fn registry() -> Arc<MapHandlerRegistry> {
    Arc::new(
        MapHandlerRegistry::new()
            .with(
                "order",
                handler_fn("order", |req, res| {
                    res.body = json!({ "id": req.path_variable("id") });
                    Ok(HandlerOutcome::Handled)
                }),
            )
            .with(
                "fallback",
                handler_fn("fallback", |_req, res| {
                    res.status = 418;
                    Ok(HandlerOutcome::Handled)
                }),
            ),
    )
}

fn interceptors(log: &CallLog) -> HashMap<String, Arc<dyn Interceptor>> {
    let mut available: HashMap<String, Arc<dyn Interceptor>> = HashMap::new();
    available.insert("tracing".to_string(), Arc::new(TracingInterceptor));
    available.insert("audit".to_string(), RecordingInterceptor::new("audit", log).shared());
    available
}

#[test]
fn test_load_from_file() {
    let file = create_temp_yaml(CONFIG);
    let config = DispatchConfig::load(file.path()).unwrap();

    assert_eq!(config.routes.len(), 1);
    assert_eq!(config.routes[0].handler, "order");
    assert_eq!(config.default_handler.as_deref(), Some("fallback"));
    assert!(config.interceptors[0].is_global());
    assert!(!config.interceptors[1].is_global());
    assert_eq!(config.cors.len(), 2);
    assert!(config.negotiation.favor_parameter);
    assert_eq!(config.negotiation.parameter_name, "format");
}

#[test]
fn test_empty_document_uses_defaults() {
    let config = DispatchConfig::from_yaml_str("{}").unwrap();
    assert_eq!(config, DispatchConfig::default());
    assert!(config.build_cors_source().unwrap().is_none());
}

#[test]
fn test_missing_file_is_error() {
    let err = DispatchConfig::load(std::path::Path::new("/nonexistent/brrtd.yaml")).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to read dispatch config"));
}

#[test]
fn test_invalid_yaml_is_error() {
    let file = create_temp_yaml("routes: [ { pattern: /x ");
    let err = DispatchConfig::load(file.path()).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("Failed to parse dispatch config"), "{message}");
    assert!(message.contains("Invalid dispatch config YAML"), "{message}");
}

#[test]
fn test_route_without_handler_is_rejected() {
    assert!(DispatchConfig::from_yaml_str("routes:\n  - pattern: /x\n").is_err());
}

#[test]
fn test_invalid_route_parts_are_reported() {
    let config = DispatchConfig::from_yaml_str("routes:\n  - pattern: /x\n    handler: h\n    methods: [\"G T\"]\n").unwrap();
    let err = config.build_router().unwrap_err();
    assert!(format!("{err:#}").contains("Invalid method 'G T' for route /x"));

    let config = DispatchConfig::from_yaml_str("routes:\n  - pattern: /x\n    handler: h\n    produces: [json]\n").unwrap();
    let err = config.build_router().unwrap_err();
    assert!(format!("{err:#}").contains("Invalid produces for route /x"));
}

#[test]
fn test_unknown_handler_fails_at_build() {
    let config = DispatchConfig::from_yaml_str("routes:\n  - pattern: /x\n    handler: missing\n").unwrap();
    let err = config.build_mapping(registry(), &HashMap::new()).unwrap_err();
    assert_eq!(err.to_string(), "Handler 'missing' is not registered");
}

#[test]
fn test_unknown_interceptor_fails_at_build() {
    let config = DispatchConfig::from_yaml_str("interceptors:\n  - name: auth\n").unwrap();
    let err = config.build_interceptors(&HashMap::new()).unwrap_err();
    assert_eq!(err.to_string(), "Unknown interceptor 'auth'");
}

#[test]
fn test_invalid_cors_mapping_names_the_pattern() {
    let config = DispatchConfig::from_yaml_str(
        "cors:\n  - pattern: /**\n    allowed_origins: [\"*\"]\n    allow_credentials: true\n",
    )
    .unwrap();
    let err = config.build_cors_source().unwrap_err();
    assert!(format!("{err:#}").contains("Invalid CORS configuration for '/**'"));
}

#[test]
fn test_cors_source_first_match_wins() {
    let config = DispatchConfig::from_yaml_str(CONFIG).unwrap();
    let source = config.build_cors_source().unwrap().unwrap();

    let orders = source.cors_config(&requests::get("/orders/1")).unwrap();
    assert_eq!(orders.allowed_origins(), Some(&["https://app.example.com".to_string()][..]));
    let other = source.cors_config(&requests::get("/health")).unwrap();
    assert_eq!(other.allowed_origins(), Some(&["*".to_string()][..]));
}

#[test]
fn test_negotiation_manager_from_config() {
    let config = DispatchConfig::from_yaml_str(CONFIG).unwrap();
    let manager = config.negotiation.build_manager().unwrap();

    let by_parameter = manager
        .resolve_media_types(&HandlerRequest::new(Method::GET, "/orders/1?format=html"))
        .unwrap();
    assert_eq!(by_parameter.iter().map(ToString::to_string).collect::<Vec<_>>(), vec!["text/html"]);

    let by_header = manager
        .resolve_media_types(&requests::get("/orders/1").with_header("Accept", "application/json"))
        .unwrap();
    assert_eq!(by_header.iter().map(ToString::to_string).collect::<Vec<_>>(), vec!["application/json"]);
}

#[test]
fn test_view_resolver_honours_use_not_acceptable() {
    let resolvers = || -> Vec<Arc<dyn ViewResolver>> {
        vec![Arc::new(NamedViewResolver::new().with("order", Arc::new(JsonView::new())))]
    };
    let req = || requests::get("/orders/1").with_header("Accept", "text/html");

    let config = DispatchConfig::from_yaml_str("negotiation:\n  use_not_acceptable: true\n").unwrap();
    let resolver = config.negotiation.build_view_resolver(resolvers(), Vec::new()).unwrap();
    let request = req();
    let view = resolver.resolve_view_name("order", "en", &request).unwrap().unwrap();
    let mut response = HandlerResponse::default();
    view.render(&Model::new(), &request, &mut response).unwrap();
    assert_eq!(response.status, 406);

    let config = DispatchConfig::from_yaml_str("{}").unwrap();
    let resolver = config.negotiation.build_view_resolver(resolvers(), Vec::new()).unwrap();
    assert!(resolver.resolve_view_name("order", "en", &req()).unwrap().is_none());

    // An acceptable view still wins with the flag set.
    let config = DispatchConfig::from_yaml_str("negotiation:\n  use_not_acceptable: true\n").unwrap();
    let resolver = config.negotiation.build_view_resolver(resolvers(), Vec::new()).unwrap();
    let request = requests::get("/orders/1").with_header("Accept", "application/json");
    let view = resolver.resolve_view_name("order", "en", &request).unwrap().unwrap();
    assert_eq!(view.name(), "JsonView");
}

#[test]
fn test_configured_mapping_dispatches() {
    let log = CallLog::new();
    let config = DispatchConfig::from_yaml_str(CONFIG).unwrap();
    let mapping = config.build_mapping(registry(), &interceptors(&log)).unwrap();
    let dispatcher = Dispatcher::builder().with_mapping(mapping).build();

    let response = dispatcher.handle(requests::cors(Method::DELETE, "/orders/7", "https://app.example.com"));
    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({ "id": "7" }));
    assert_eq!(response.get_header(ACCESS_CONTROL_ALLOW_ORIGIN), Some("https://app.example.com"));
    assert_eq!(log.phase("pre"), vec!["pre:audit"]);

    // Excluded path: audit is skipped, the default handler answers.
    let response = dispatcher.handle(requests::get("/orders/public/info"));
    assert_eq!(response.status, 418);
    assert_eq!(log.phase("pre"), vec!["pre:audit"]);

    // Method not routed falls through to the default handler too.
    assert_eq!(dispatcher.handle(HandlerRequest::new(Method::PUT, "/orders/7")).status, 418);
}
