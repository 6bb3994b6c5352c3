use anyhow::Result;
use axum::extract::Request;
use axum::Json;
use dispatcher::config::Config;
use dispatcher::route_table::RouteTable;
use dispatcher::server::{handler, uri_param, BoxHandler, Server};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("dispatcher={},tower_http=debug", config.log_level.to_lowercase()).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting dispatcher service");
    tracing::info!(
        "Configuration: bind_addr={}, cors={}",
        config.bind_addr,
        config.cors
    );

    let routes = Arc::new(demo_routes()?);
    Server::new(&config, routes)
        .map_err(|e| anyhow::anyhow!("Failed to create server: {}", e))?
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

fn demo_routes() -> Result<RouteTable<BoxHandler>> {
    let routes = RouteTable::new();

    routes.get(
        "/health",
        handler(|_request: Request| async {
            Json(serde_json::json!({ "status": "healthy" }))
        }),
    )?;

    routes.get(
        "/service/{service_name}/resource/{resource_name}",
        handler(|request: Request| async move {
            let service = uri_param(&request, "service_name").unwrap_or_default();
            let resource = uri_param(&request, "resource_name").unwrap_or_default();
            Json(serde_json::json!({
                "service": service,
                "resource": resource,
                "status": "ok",
            }))
        }),
    )?;

    Ok(routes)
}
