use std::sync::Arc;

use http::Method;
use serde_json::json;

use super::*;
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::DispatchError;
use crate::handler::{handler_fn, Handler, HandlerOutcome};

struct Named(&'static str);

impl Interceptor for Named {
    fn name(&self) -> &str {
        self.0
    }
}

struct Failing;

impl Interceptor for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn pre_handle(
        &self,
        _req: &HandlerRequest,
        _res: &mut HandlerResponse,
        _handler: &dyn Handler,
    ) -> Result<bool, DispatchError> {
        Err(DispatchError::interceptor("failing", "boom"))
    }
}

fn ok_handler() -> Arc<dyn Handler> {
    handler_fn("ok", |_req, res| {
        res.body = json!({"ok": true});
        Ok(HandlerOutcome::Handled)
    })
}

fn names<'a>(handles: impl Iterator<Item = &'a InterceptorHandle>) -> Vec<String> {
    handles.map(|h| h.name().to_string()).collect()
}

#[test]
fn test_mapped_interceptor_include_exclude() {
    let mapped = MappedInterceptor::new(&["/api/**"], &["/api/public/**"], Arc::new(Named("m"))).unwrap();
    assert!(mapped.matches("/api/orders/1"));
    assert!(!mapped.matches("/api/public/health"));
    assert!(!mapped.matches("/other"));

    let everywhere = MappedInterceptor::new(&[], &["/health"], Arc::new(Named("m"))).unwrap();
    assert!(everywhere.matches("/anything"));
    assert!(!everywhere.matches("/health"));
}

#[test]
fn test_mapped_interceptor_invalid_pattern() {
    assert!(MappedInterceptor::new(&["/api/{id"], &[], Arc::new(Named("m"))).is_err());
}

#[test]
fn test_registry_matching_keeps_registration_order() {
    let registry = InterceptorRegistry::new()
        .with_global(Arc::new(Named("first")))
        .with_mapped(MappedInterceptor::new(&["/admin/**"], &[], Arc::new(Named("admin"))).unwrap())
        .with_global(Arc::new(Named("last")));

    assert_eq!(names(registry.matching("/admin/users")), vec!["first", "admin", "last"]);
    assert_eq!(names(registry.matching("/orders")), vec!["first", "last"]);
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_handle_caches_async_capability() {
    let metrics: Arc<dyn Interceptor> = Arc::new(MetricsInterceptor::new());
    let plain: Arc<dyn Interceptor> = Arc::new(Named("plain"));
    assert!(InterceptorHandle::new(metrics).is_async_capable());
    assert!(!InterceptorHandle::new(plain).is_async_capable());
}

#[test]
fn test_auth_interceptor_rejects_bad_token() {
    let auth = AuthInterceptor::new("Bearer secret".to_string());
    let handler = ok_handler();

    let req = HandlerRequest::new(Method::GET, "/orders/1").with_header("Authorization", "Bearer nope");
    let mut res = HandlerResponse::default();
    assert!(!auth.pre_handle(&req, &mut res, handler.as_ref()).unwrap());
    assert_eq!(res.status, 401);
    assert_eq!(res.body, json!({"error": "Unauthorized"}));

    let req = HandlerRequest::new(Method::GET, "/orders/1").with_header("Authorization", "Bearer secret");
    let mut res = HandlerResponse::default();
    assert!(auth.pre_handle(&req, &mut res, handler.as_ref()).unwrap());
    assert_eq!(res.status, 200);
}

#[test]
fn test_auth_interceptor_custom_header() {
    let auth = AuthInterceptor::new("k".to_string()).with_header("X-Api-Key");
    let handler = ok_handler();
    let req = HandlerRequest::new(Method::GET, "/").with_header("x-api-key", "k");
    let mut res = HandlerResponse::default();
    assert!(auth.pre_handle(&req, &mut res, handler.as_ref()).unwrap());
}

#[test]
fn test_metrics_interceptor_counts() {
    let metrics = MetricsInterceptor::new();
    let handler = ok_handler();
    let req = HandlerRequest::new(Method::GET, "/");
    let mut res = HandlerResponse::default();

    assert!(metrics.pre_handle(&req, &mut res, handler.as_ref()).unwrap());
    metrics.after_completion(&req, &mut res, handler.as_ref(), None).unwrap();
    assert_eq!(metrics.request_count(), 1);
    assert_eq!(metrics.failure_count(), 0);

    res.status = 500;
    metrics.pre_handle(&req, &mut res, handler.as_ref()).unwrap();
    metrics.after_completion(&req, &mut res, handler.as_ref(), None).unwrap();
    assert_eq!(metrics.request_count(), 2);
    assert_eq!(metrics.failure_count(), 1);

    metrics
        .after_concurrent_handling_started(&req, &mut res, handler.as_ref())
        .unwrap();
    assert_eq!(metrics.async_started_count(), 1);
}

#[test]
fn test_chain_without_interceptors() {
    let mut chain = ExecutionChain::new(ok_handler());
    let req = HandlerRequest::new(Method::GET, "/");
    let mut res = HandlerResponse::default();

    assert_eq!(chain.state(), ChainState::NotStarted);
    assert!(chain.apply_pre_handle(&req, &mut res).unwrap());
    assert_eq!(chain.cursor(), None);
    let outcome = chain.invoke_handler(&req, &mut res).unwrap();
    assert!(matches!(outcome, HandlerOutcome::Handled));
    chain.apply_post_handle(&req, &mut res, &mut None).unwrap();
    chain.trigger_after_completion(&req, &mut res, None);
    assert_eq!(chain.state(), ChainState::Done);
    assert_eq!(res.body, json!({"ok": true}));
}

#[test]
fn test_chain_pre_handle_error_short_circuits() {
    let mut chain = ExecutionChain::with_interceptors(
        ok_handler(),
        vec![
            InterceptorHandle::new(Arc::new(Named("a"))),
            InterceptorHandle::new(Arc::new(Failing)),
            InterceptorHandle::new(Arc::new(Named("c"))),
        ],
    );
    let req = HandlerRequest::new(Method::GET, "/");
    let mut res = HandlerResponse::default();

    let err = chain.apply_pre_handle(&req, &mut res).unwrap_err();
    assert_eq!(err, DispatchError::interceptor("failing", "boom"));
    assert_eq!(chain.cursor(), Some(0));
    assert_eq!(chain.state(), ChainState::Done);
}

#[test]
fn test_completion_not_run_before_pre_handle() {
    let mut chain = ExecutionChain::with_interceptors(ok_handler(), vec![InterceptorHandle::new(Arc::new(Named("a")))]);
    let req = HandlerRequest::new(Method::GET, "/");
    let mut res = HandlerResponse::default();
    chain.trigger_after_completion(&req, &mut res, None);
    assert_eq!(chain.state(), ChainState::NotStarted);
}

#[test]
fn test_insert_interceptor_clamps_index() {
    let mut chain = ExecutionChain::new(ok_handler());
    chain.insert_interceptor(5, InterceptorHandle::new(Arc::new(Named("a"))));
    chain.insert_interceptor(0, InterceptorHandle::new(Arc::new(Named("b"))));
    assert_eq!(names(chain.interceptors().iter()), vec!["b", "a"]);
}
