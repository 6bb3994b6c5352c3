use axum::extract::Request;
use axum::Json;
use dispatcher::rate_limit_config::RateLimiterConfig;
use dispatcher::rate_limiter::RateLimiter;
use dispatcher::route_table::RouteTable;
use dispatcher::server::{create_app, handler, uri_param, BoxHandler};
use dispatcher::Dispatcher;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

fn routes() -> Arc<RouteTable<BoxHandler>> {
    let routes = RouteTable::new();
    routes
        .get(
            "/api/{version}/user/{id}",
            handler(|request: Request| async move {
                Json(serde_json::json!({
                    "version": uri_param(&request, "version").unwrap_or_default(),
                    "id": uri_param(&request, "id").unwrap_or_default(),
                }))
            }),
        )
        .unwrap();
    Arc::new(routes)
}

async fn spawn_server(max_tokens: u32) -> (SocketAddr, Arc<RateLimiter>) {
    let limiter = Arc::new(RateLimiter::new(
        RateLimiterConfig::new(max_tokens, Duration::from_secs(60)).unwrap(),
    )
    .unwrap());
    let app = create_app(
        Dispatcher::new(routes()).with_rate_limiter(Arc::clone(&limiter)),
        false,
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    (addr, limiter)
}

#[tokio::test]
async fn test_params_reach_handler() {
    let (addr, _limiter) = spawn_server(10).await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .get(format!("http://{}/api/v2/user/0xffffff/", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["version"], "v2");
    assert_eq!(body["id"], "0xffffff");
}

#[tokio::test]
async fn test_unmatched_route() {
    let (addr, _limiter) = spawn_server(10).await;
    let client = reqwest::Client::new();

    for path in ["/api/v2", "/api/v2/user/1/extra", "/api/v2/user//"] {
        let response = client
            .get(format!("http://{}{}", addr, path))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 405, "path {}", path);
    }
}

#[tokio::test]
async fn test_rate_limit_exceeded() {
    let (addr, limiter) = spawn_server(3).await;
    let client = reqwest::Client::new();
    let url = format!("http://{}/api/v1/user/1", addr);

    for i in 0..5 {
        let response = client.get(&url).send().await.unwrap();
        if i < 3 {
            assert_eq!(response.status(), 200);
        } else {
            assert_eq!(response.status(), 429);
            let body: serde_json::Value = response.json().await.unwrap();
            assert_eq!(body["error"], "rate_limit_exceeded");
        }
    }
    assert!(limiter.contains("127.0.0.1"));

    // a forwarded client address is tracked separately
    let response = client
        .get(&url)
        .header("x-forwarded-for", "203.0.113.7")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(limiter.tokens("203.0.113.7"), Some(1));
}
