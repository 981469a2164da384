use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use http::Method;
use serde_json::json;
use smallvec::smallvec;

use super::*;
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::DispatchError;
use crate::negotiation::{ContentNegotiationManager, MediaType};
use crate::router::ParamVec;

struct FixedView {
    name: &'static str,
    content_type: Option<&'static str>,
}

impl View for FixedView {
    fn content_type(&self) -> Option<MediaType> {
        self.content_type.map(|ct| MediaType::parse(ct).unwrap())
    }

    fn name(&self) -> &str {
        self.name
    }

    fn render(&self, _model: &Model, _req: &HandlerRequest, _res: &mut HandlerResponse) -> Result<(), DispatchError> {
        Ok(())
    }
}

fn view(name: &'static str, content_type: &'static str) -> Arc<dyn View> {
    Arc::new(FixedView {
        name,
        content_type: Some(content_type),
    })
}

fn mt(value: &str) -> MediaType {
    MediaType::parse(value).unwrap()
}

fn negotiating(resolvers: Vec<Arc<dyn ViewResolver>>) -> ContentNegotiatingViewResolver {
    ContentNegotiatingViewResolver::new(Arc::new(ContentNegotiationManager::default()), resolvers)
}

fn resolved_name(resolver: &dyn ViewResolver, view_name: &str, req: &HandlerRequest) -> Option<String> {
    resolver
        .resolve_view_name(view_name, "en", req)
        .unwrap()
        .map(|v| v.name().to_string())
}

#[test]
fn test_compatible_set_prefers_higher_quality() {
    let resolver = negotiating(vec![]);
    let req = HandlerRequest::new(Method::GET, "/").with_header("Accept", "text/html;q=1.0, application/json;q=0.8");
    req.attributes()
        .set_producible_media_types(vec![mt("application/json"), mt("text/html")]);

    let types: Vec<String> = resolver
        .media_types(&req)
        .unwrap()
        .iter()
        .map(|m| format!("{}/{}", m.type_(), m.subtype()))
        .collect();
    assert_eq!(types, vec!["text/html", "application/json"]);
}

#[test]
fn test_compatible_set_keeps_more_specific_side() {
    let resolver = negotiating(vec![]);
    let req = HandlerRequest::new(Method::GET, "/").with_header("Accept", "text/*;q=0.5");
    req.attributes().set_producible_media_types(vec![mt("text/plain")]);

    let types = resolver.media_types(&req).unwrap();
    assert_eq!(types.len(), 1);
    assert_eq!(types[0].subtype(), "plain");
    assert_eq!(types[0].quality(), 0.5);
}

#[test]
fn test_incompatible_producible_yields_empty_set() {
    let resolver = negotiating(vec![]);
    let req = HandlerRequest::new(Method::GET, "/").with_header("Accept", "text/html");
    req.attributes().set_producible_media_types(vec![mt("application/json")]);
    assert!(resolver.media_types(&req).unwrap().is_empty());
}

#[test]
fn test_malformed_accept_is_not_acceptable() {
    let resolver = negotiating(vec![]).with_use_not_acceptable(true);
    let req = HandlerRequest::new(Method::GET, "/").with_header("Accept", "not a media type");
    assert!(resolver.media_types(&req).is_none());
    assert_eq!(resolved_name(&resolver, "home", &req).as_deref(), Some("NotAcceptableView"));
}

#[test]
fn test_selects_by_negotiated_order() {
    let named = NamedViewResolver::new()
        .with("report", view("json-report", "application/json"))
        .with("report.html", view("html-report", "text/html"));
    let resolver = negotiating(vec![Arc::new(named)]);

    let req = HandlerRequest::new(Method::GET, "/").with_header("Accept", "application/json");
    assert_eq!(resolved_name(&resolver, "report", &req).as_deref(), Some("json-report"));
    assert_eq!(req.attributes().selected_content_type().map(ToString::to_string).as_deref(), Some("application/json"));
}

#[test]
fn test_extension_candidates() {
    let manager = ContentNegotiationManager::builder()
        .media_type("html", mt("text/html"))
        .media_type("json", mt("application/json"))
        .build();
    let named = NamedViewResolver::new()
        .with("report.html", view("html-report", "text/html"))
        .with("report.json", view("json-report", "application/json"));
    let resolver = ContentNegotiatingViewResolver::new(Arc::new(manager), vec![Arc::new(named)]);

    let req = HandlerRequest::new(Method::GET, "/").with_header("Accept", "text/html, application/json;q=0.9");
    assert_eq!(resolved_name(&resolver, "report", &req).as_deref(), Some("html-report"));

    let req = HandlerRequest::new(Method::GET, "/").with_header("Accept", "application/json");
    assert_eq!(resolved_name(&resolver, "report", &req).as_deref(), Some("json-report"));
}

#[test]
fn test_redirect_wins_over_content_match() {
    let named = NamedViewResolver::new().with("done", view("json-done", "application/json"));
    let redirects = UrlBasedViewResolver::new(|_url: &str| None);
    let resolver = negotiating(vec![Arc::new(named), Arc::new(redirects)]);

    let req = HandlerRequest::new(Method::GET, "/").with_header("Accept", "application/json");
    assert_eq!(resolved_name(&resolver, "done", &req).as_deref(), Some("json-done"));
    assert_eq!(
        resolved_name(&resolver, "redirect:/orders", &req).as_deref(),
        Some("RedirectView")
    );

    let resolver = negotiating(vec![]).with_default_views(vec![
        view("json-default", "application/json"),
        Arc::new(RedirectView::new("/elsewhere")),
    ]);
    assert_eq!(resolved_name(&resolver, "anything", &req).as_deref(), Some("RedirectView"));
}

#[test]
fn test_no_match_returns_none_or_not_acceptable() {
    let req = HandlerRequest::new(Method::GET, "/").with_header("Accept", "application/json");

    let resolver = negotiating(vec![]);
    assert!(resolver.resolve_view_name("missing", "en", &req).unwrap().is_none());

    let resolver = negotiating(vec![]).with_use_not_acceptable(true);
    assert_eq!(resolved_name(&resolver, "missing", &req).as_deref(), Some("NotAcceptableView"));
}

#[test]
fn test_views_without_content_type_are_not_selected() {
    let untyped: Arc<dyn View> = Arc::new(FixedView {
        name: "untyped",
        content_type: None,
    });
    let resolver = negotiating(vec![Arc::new(NamedViewResolver::new().with("page", untyped))])
        .with_default_views(vec![view("json-default", "application/json")]);

    let req = HandlerRequest::new(Method::GET, "/");
    assert_eq!(resolved_name(&resolver, "page", &req).as_deref(), Some("json-default"));
}

#[test]
fn test_default_views_follow_resolver_candidates() {
    let named = NamedViewResolver::new().with("page", view("resolved", "application/json"));
    let resolver = negotiating(vec![Arc::new(named)]).with_default_views(vec![view("default", "application/json")]);
    let req = HandlerRequest::new(Method::GET, "/");
    assert_eq!(resolved_name(&resolver, "page", &req).as_deref(), Some("resolved"));
}

#[test]
fn test_resolvers_sorted_by_order_stably() {
    let first = NamedViewResolver::new().with("v", view("first", "application/json")).with_order(10);
    let second = NamedViewResolver::new().with("v", view("second", "application/json")).with_order(10);
    let early = NamedViewResolver::new().with("v", view("early", "application/json")).with_order(-5);
    let resolver = negotiating(vec![Arc::new(first), Arc::new(second), Arc::new(early)]);

    let orders: Vec<i32> = resolver.resolvers().iter().map(|r| r.order()).collect();
    assert_eq!(orders, vec![-5, 10, 10]);
    let req = HandlerRequest::new(Method::GET, "/");
    assert_eq!(resolved_name(&resolver, "v", &req).as_deref(), Some("early"));
}

struct CountingResolver {
    calls: AtomicUsize,
}

impl ViewResolver for CountingResolver {
    fn resolve_view_name(
        &self,
        view_name: &str,
        _locale: &str,
        _req: &HandlerRequest,
    ) -> Result<Option<Arc<dyn View>>, DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((view_name == "known").then(|| view("known", "application/json")))
    }
}

#[test]
fn test_caching_resolver_caches_hits_and_misses() {
    let counting = Arc::new(CountingResolver {
        calls: AtomicUsize::new(0),
    });
    let caching = CachingViewResolver::new(Arc::clone(&counting) as Arc<dyn ViewResolver>);
    let req = HandlerRequest::new(Method::GET, "/");

    assert!(caching.resolve_view_name("known", "en", &req).unwrap().is_some());
    assert!(caching.resolve_view_name("known", "en", &req).unwrap().is_some());
    assert!(caching.resolve_view_name("unknown", "en", &req).unwrap().is_none());
    assert!(caching.resolve_view_name("unknown", "en", &req).unwrap().is_none());
    assert_eq!(counting.calls.load(Ordering::SeqCst), 2);

    caching.resolve_view_name("known", "fr", &req).unwrap();
    assert_eq!(counting.calls.load(Ordering::SeqCst), 3);
    assert_eq!(caching.cached_entries(), 3);

    caching.clear();
    caching.resolve_view_name("known", "en", &req).unwrap();
    assert_eq!(counting.calls.load(Ordering::SeqCst), 4);
}

#[test]
fn test_caching_resolver_is_bounded() {
    let counting = Arc::new(CountingResolver {
        calls: AtomicUsize::new(0),
    });
    let caching = CachingViewResolver::new(Arc::clone(&counting) as Arc<dyn ViewResolver>).with_cache_limit(64);
    let req = HandlerRequest::new(Method::GET, "/");

    for i in 0..5000 {
        caching.resolve_view_name("known", &format!("locale-{i}"), &req).unwrap();
    }
    assert_eq!(caching.cached_entries(), 64);

    // The newest entry survived, the oldest was evicted.
    caching.resolve_view_name("known", "locale-4999", &req).unwrap();
    assert_eq!(counting.calls.load(Ordering::SeqCst), 5000);
    caching.resolve_view_name("known", "locale-0", &req).unwrap();
    assert_eq!(counting.calls.load(Ordering::SeqCst), 5001);
}

#[test]
fn test_caching_resolver_default_limit() {
    let counting = Arc::new(CountingResolver {
        calls: AtomicUsize::new(0),
    });
    let caching = CachingViewResolver::new(counting as Arc<dyn ViewResolver>);
    let req = HandlerRequest::new(Method::GET, "/");
    for i in 0..(DEFAULT_CACHE_LIMIT + 10) {
        caching.resolve_view_name(&format!("view-{i}"), "en", &req).unwrap();
    }
    assert_eq!(caching.cached_entries(), DEFAULT_CACHE_LIMIT);
}

#[test]
fn test_url_based_resolver_prefix_suffix() {
    let resolver = UrlBasedViewResolver::new(|url: &str| {
        (url == "views/home.json").then(|| Arc::new(JsonView::new()) as Arc<dyn View>)
    })
    .with_prefix("views/")
    .with_suffix(".json");
    let req = HandlerRequest::new(Method::GET, "/");
    assert_eq!(resolved_name(&resolver, "home", &req).as_deref(), Some("JsonView"));
    assert!(resolver.resolve_view_name("other", "en", &req).unwrap().is_none());
}

#[test]
fn test_json_view_renders_model_with_selected_type() {
    let req = HandlerRequest::new(Method::GET, "/");
    req.attributes().set_selected_content_type(mt("application/hal+json"));
    let mut res = HandlerResponse::default();
    let model = ModelAndView::new("x").add_object("id", json!(7)).model;

    JsonView::new().render(&model, &req, &mut res).unwrap();
    assert_eq!(res.body, json!({"id": 7}));
    assert_eq!(res.get_header("content-type"), Some("application/hal+json"));
}

#[test]
fn test_redirect_view_expands_uri_variables() {
    let req = HandlerRequest::new(Method::POST, "/orders/42/cancel");
    let variables: ParamVec = smallvec![(Arc::from("id"), "42".to_string())];
    req.attributes().set_uri_template_variables(variables);
    let mut res = HandlerResponse::default();

    RedirectView::new("/orders/{id}?from={unknown}")
        .render(&Model::new(), &req, &mut res)
        .unwrap();
    assert_eq!(res.status, 302);
    assert_eq!(res.get_header("location"), Some("/orders/42?from={unknown}"));
}

#[test]
fn test_not_acceptable_view_sets_406() {
    let req = HandlerRequest::new(Method::GET, "/");
    let mut res = HandlerResponse::default();
    NotAcceptableView.render(&Model::new(), &req, &mut res).unwrap();
    assert_eq!(res.status, 406);
}

#[test]
fn test_model_and_view_helpers() {
    let mut mav = ModelAndView::new("orders/list").with_status(201);
    assert_eq!(mav.view_name(), Some("orders/list"));
    assert_eq!(mav.status, Some(201));
    mav.set_view_name("orders/detail");
    assert_eq!(mav.view_name(), Some("orders/detail"));
    assert!(ModelAndView::with_view(Arc::new(JsonView::new())).view_name().is_none());
}

#[test]
fn test_default_view_name_translator() {
    let translator = DefaultViewNameTranslator::new();
    let name = |path: &str| translator.view_name(&HandlerRequest::new(Method::GET, path));

    assert_eq!(name("/orders/list.json?page=2").as_deref(), Some("orders/list"));
    assert_eq!(name("/orders/").as_deref(), Some("orders"));
    assert_eq!(name("/v1.2/orders").as_deref(), Some("v1.2/orders"));
    assert_eq!(name("/.hidden").as_deref(), Some(".hidden"));
    assert_eq!(name("/"), None);
    assert_eq!(name("/index.html").as_deref(), Some("index"));
}

#[test]
fn test_view_name_translator_prefix_suffix_separator() {
    let translator = DefaultViewNameTranslator::new()
        .with_prefix("views.")
        .with_suffix(".page")
        .with_separator(".");
    let req = HandlerRequest::new(Method::GET, "/admin/users/edit.do");
    assert_eq!(translator.view_name(&req).as_deref(), Some("views.admin.users.edit.page"));
}
