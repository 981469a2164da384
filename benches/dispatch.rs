use brrtdispatch::dispatcher::{Dispatcher, HandlerRequest};
use brrtdispatch::handler::{handler_fn, HandlerOutcome, HandlerRef};
use brrtdispatch::mapping::{HandlerMapping, UrlHandlerLookup};
use brrtdispatch::middleware::{
    CorsConfig, InterceptorRegistry, MappedInterceptor, MetricsInterceptor, TracingInterceptor,
    UrlBasedCorsConfigSource,
};
use brrtdispatch::router::{Route, Router};
use brrtdispatch::view::{ContentNegotiatingViewResolver, JsonView, ModelAndView, NamedViewResolver};
use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use std::hint::black_box;
use std::sync::Arc;

const PATTERNS: &[&str] = &[
    "/",
    "/zoo/animals",
    "/zoo/animals/{id}",
    "/zoo/animals/{id}/toys/{toy_id}",
    "/zoo/{category}/animals/{id}/habitats/{habitat_id}/sections/{section_id}",
    "/inventory/{warehouse_id}/feeds/{feed_id}/items/{item_id}/batches/{batch_id}",
    "/complex/{a}/{b}/{c}/{d}/{e}/{f}/{g}/{h}/{i}",
    "/static/**",
];

const PATHS: &[(Method, &str)] = &[
    (Method::GET, "/zoo/animals/123"),
    (Method::GET, "/zoo/animals/123/toys/456"),
    (Method::GET, "/zoo/cats/animals/123/habitats/88/sections/5"),
    (Method::GET, "/inventory/1/feeds/2/items/3/batches/4"),
    (Method::GET, "/complex/1/2/3/4/5/6/7/8/9"),
    (Method::GET, "/static/css/site.css"),
];

fn zoo_mapping() -> HandlerMapping {
    let routes = PATTERNS
        .iter()
        .map(|pattern| {
            let handler = handler_fn(pattern, |_req, _res| {
                Ok(HandlerOutcome::View(
                    ModelAndView::new("animal").add_object("ok", serde_json::Value::Bool(true)),
                ))
            });
            Route::new(pattern, HandlerRef::Raw(handler))
                .expect("valid pattern")
                .with_methods([Method::GET])
        })
        .collect();
    let interceptors = InterceptorRegistry::new()
        .with_global(Arc::new(TracingInterceptor))
        .with_global(Arc::new(MetricsInterceptor::new()))
        .with_mapped(
            MappedInterceptor::new(&["/inventory/**"], &[], Arc::new(MetricsInterceptor::new()))
                .expect("valid pattern"),
        );
    let cors = UrlBasedCorsConfigSource::new()
        .with("/zoo/**", CorsConfig::permissive())
        .expect("valid pattern");
    HandlerMapping::builder(Arc::new(UrlHandlerLookup::new(Router::new(routes))))
        .with_interceptors(interceptors)
        .with_cors_source(Arc::new(cors))
        .build()
}

fn bench_mapping_resolve(c: &mut Criterion) {
    let mapping = zoo_mapping();
    c.bench_function("mapping_resolve", |b| {
        b.iter(|| {
            for (method, path) in PATHS {
                let chain = mapping.resolve(&HandlerRequest::new(method.clone(), path));
                black_box(&chain);
            }
        })
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let views = NamedViewResolver::new().with("animal", Arc::new(JsonView::new()));
    let dispatcher = Dispatcher::builder()
        .with_mapping(zoo_mapping())
        .with_view_resolver(Arc::new(ContentNegotiatingViewResolver::new(
            Arc::new(Default::default()),
            vec![Arc::new(views)],
        )))
        .build();
    c.bench_function("dispatch_with_view", |b| {
        b.iter(|| {
            for (method, path) in PATHS {
                let request = HandlerRequest::new(method.clone(), path)
                    .with_header("Origin", "https://app.example.com")
                    .with_header("Accept", "application/json, text/html;q=0.8");
                black_box(dispatcher.handle(request));
            }
        })
    });
}

criterion_group!(benches, bench_mapping_resolve, bench_dispatch);
criterion_main!(benches);
