use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use yawf::handler::Json;
use yawf::request::{PathParams, Request};
use yawf::router::Router;
use yawf::{handlers, Server};

fn zoo_router() -> Router {
    let mut router = Router::new();
    let routes = [
        ("GET", "/"),
        ("GET", "/zoo/animals"),
        ("POST", "/zoo/animals"),
        ("GET", "/zoo/animals/:id"),
        ("PUT", "/zoo/animals/:id"),
        ("PATCH", "/zoo/animals/:id"),
        ("DELETE", "/zoo/animals/:id"),
        ("GET", "/zoo/animals/:id/toys/:toy_id"),
        (
            "GET",
            "/zoo/:category/animals/:id/habitats/:habitat_id/sections/:section_id",
        ),
        (
            "POST",
            "/inventory/:warehouse_id/feeds/:feed_id/items/:item_id/batches/:batch_id",
        ),
        ("GET", "/complex/:a/:b/:c/:d/:e/:f/:g/:h/:i"),
        ("HEAD", "/zoo/health"),
        ("OPTIONS", "/zoo/health"),
        ("*", "/static/**"),
    ];
    for (method, pattern) in routes {
        router
            .add_route(method, pattern, handlers![|| ()])
            .expect("valid pattern");
    }
    router
}

fn bench_route_throughput(c: &mut Criterion) {
    let router = zoo_router();
    c.bench_function("route_match", |b| {
        let test_paths = [
            ("GET", "/zoo/animals/123"),
            ("GET", "/zoo/animals/123/toys/456"),
            ("GET", "/zoo/cats/animals/123/habitats/88/sections/5"),
            ("POST", "/inventory/1/feeds/2/items/3/batches/4"),
            ("GET", "/complex/1/2/3/4/5/6/7/8/9"),
            ("GET", "/static/css/site.css"),
        ];
        b.iter(|| {
            for (method, path) in &test_paths {
                let res = router.find(method, path);
                black_box(&res);
            }
        });
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let mut server = Server::new();
    server.use_handler(|| ());
    server
        .get(
            "/zoo/animals/:id",
            handlers![|p: PathParams| (200u16, Json(serde_json::json!({ "id": p.get("id") })))],
        )
        .expect("valid pattern");
    let app = server.into_app();

    c.bench_function("dispatch_json", |b| {
        b.iter(|| {
            let out = app
                .serve(Request::new("GET", "/zoo/animals/123"))
                .expect("dispatch");
            black_box(out);
        });
    });
}

criterion_group!(benches, bench_route_throughput, bench_dispatch);
criterion_main!(benches);
