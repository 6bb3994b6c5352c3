use axum::extract::{ConnectInfo, Request};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;
use tracing::info;
use uuid::Uuid;

use crate::client_identity::{ClientOrigin, FORWARDED_FOR};

pub const REQUEST_ID: &str = "x-request-id";

/// Logging middleware for request/response tracking
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let client = client_ip(&request);
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    info!(
        target: "dispatcher::middleware",
        request_id = %request_id,
        method = %method,
        uri = %uri,
        client = %client,
        "Incoming request"
    );

    let mut response = next.run(request).await;

    info!(
        target: "dispatcher::middleware",
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status(),
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID, value);
    }
    response
}

/// Peer address recorded by the server, or an empty string when unknown.
pub(crate) fn remote_addr(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default()
}

pub(crate) fn forwarded_for(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
}

/// Rate limiting identity of the caller.
pub fn client_ip(request: &Request) -> String {
    let remote_addr = remote_addr(request);
    ClientOrigin::new(&remote_addr, forwarded_for(request)).identity()
}
