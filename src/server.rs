//! HTTP transport around the dispatch core.
//!
//! Every request goes through a single axum fallback that asks the
//! [`Dispatcher`] what to do: run the matched handler with its [`Params`] in
//! the request extensions, answer 429 when the client is over its rate
//! limit, or 405 when no route matches.

use axum::extract::{Request, State};
use axum::http;
use axum::response::{IntoResponse, Response};
use axum::{middleware, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::client_identity::ClientOrigin;
use crate::config::Config;
use crate::dispatcher::{Dispatch, Dispatcher};
use crate::error::{ConfigError, ParamError};
use crate::middleware::{forwarded_for, logging_middleware, remote_addr};
use crate::params::Params;
use crate::rate_limiter::RateLimiter;
use crate::response::ErrorResponse;
use crate::route::Method;
use crate::route_table::RouteTable;

pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// A route handler: any async function from a request to something that
/// converts into a response.
pub trait RouteHandler: Send + Sync + 'static {
    fn call(&self, request: Request) -> BoxFuture;
}

impl<F, Fut, R> RouteHandler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    fn call(&self, request: Request) -> BoxFuture {
        let future = self(request);
        Box::pin(async move { future.await.into_response() })
    }
}

pub type BoxHandler = Arc<dyn RouteHandler>;

/// Box a handler for registration in a [`RouteTable`].
pub fn handler<H: RouteHandler>(handler: H) -> BoxHandler {
    Arc::new(handler)
}

/// Value of the path parameter `name` captured for this request.
pub fn uri_param<'a>(request: &'a Request, name: &str) -> Result<&'a str, ParamError> {
    request
        .extensions()
        .get::<Params>()
        .ok_or(ParamError::Missing)?
        .get(name)
}

/// Guard a single handler with `rate_limiter`, answering 429 before it runs.
pub fn rate_limited<H: RouteHandler>(rate_limiter: Arc<RateLimiter>, handler: H) -> BoxHandler {
    Arc::new(move |request: Request| {
        let remote_addr = remote_addr(&request);
        let client = ClientOrigin::new(&remote_addr, forwarded_for(&request)).identity();
        let admitted = rate_limiter.admit(&client);
        let response = admitted.then(|| handler.call(request));

        async move {
            match response {
                Some(response) => response.await,
                None => {
                    warn!(client = %client, "rate limit exceeded");
                    ErrorResponse::rate_limited().into_response()
                }
            }
        }
    })
}

/// Build the axum application serving `dispatcher`.
pub fn create_app(dispatcher: Dispatcher<BoxHandler>, cors: bool) -> Router {
    let app = Router::new()
        .fallback(dispatch_request)
        .with_state(dispatcher);
    let app = if cors { app.layer(cors_layer()) } else { app };

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn(logging_middleware)),
    )
}

async fn dispatch_request(
    State(dispatcher): State<Dispatcher<BoxHandler>>,
    mut request: Request,
) -> Response {
    let outcome = {
        let remote_addr = remote_addr(&request);
        let origin = ClientOrigin::new(&remote_addr, forwarded_for(&request));
        dispatcher.dispatch(request.method().as_str(), request.uri().path(), &origin)
    };

    match outcome {
        Dispatch::Matched { route, params } => {
            request.extensions_mut().insert(params);
            let response = route.handler().call(request);
            response.await
        }
        Dispatch::RateLimited { client } => {
            warn!(client = %client, "rate limit exceeded");
            ErrorResponse::rate_limited().into_response()
        }
        Dispatch::NotMatched => ErrorResponse::not_matched().into_response(),
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Method::ALL.map(http_method).to_vec())
}

fn http_method(method: Method) -> http::Method {
    match method {
        Method::Get => http::Method::GET,
        Method::Head => http::Method::HEAD,
        Method::Post => http::Method::POST,
        Method::Put => http::Method::PUT,
        Method::Patch => http::Method::PATCH,
        Method::Delete => http::Method::DELETE,
        Method::Connect => http::Method::CONNECT,
        Method::Options => http::Method::OPTIONS,
        Method::Trace => http::Method::TRACE,
    }
}

pub struct Server {
    app: Router,
    bind_addr: SocketAddr,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl Server {
    pub fn new(config: &Config, routes: Arc<RouteTable<BoxHandler>>) -> Result<Self, ConfigError> {
        let mut dispatcher = Dispatcher::new(routes);
        let rate_limiter = match config.rate_limiting() {
            Some(limits) => Some(Arc::new(RateLimiter::new(limits)?)),
            None => None,
        };
        if let Some(rate_limiter) = &rate_limiter {
            dispatcher = dispatcher.with_rate_limiter(Arc::clone(rate_limiter));
        }

        Ok(Self {
            app: create_app(dispatcher, config.cors),
            bind_addr: config.bind_addr,
            rate_limiter,
        })
    }

    pub async fn run(self) -> Result<(), std::io::Error> {
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;

        info!("Dispatcher server listening on {}", listener.local_addr()?);
        match &self.rate_limiter {
            Some(rate_limiter) => info!(
                max_tokens = rate_limiter.max_tokens(),
                interval = ?rate_limiter.interval(),
                "Per-client rate limiting enabled"
            ),
            None => info!("Per-client rate limiting disabled"),
        }

        let result = axum::serve(
            listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await;

        if let Some(rate_limiter) = &self.rate_limiter {
            rate_limiter.shutdown().await;
        }

        result
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
