use std::sync::Arc;

use tracing::trace;

use crate::client_identity::ClientOrigin;
use crate::params::Params;
use crate::rate_limiter::RateLimiter;
use crate::route::Route;
use crate::route_table::RouteTable;

/// Outcome of dispatching one request.
#[derive(Debug)]
pub enum Dispatch<H> {
    Matched { route: Arc<Route<H>>, params: Params },
    RateLimited { client: String },
    NotMatched,
}

impl<H> Dispatch<H> {
    pub fn is_matched(&self) -> bool {
        matches!(self, Dispatch::Matched { .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Dispatch::RateLimited { .. })
    }
}

/// Admission, then route lookup, then parameter extraction.
#[derive(Debug)]
pub struct Dispatcher<H> {
    routes: Arc<RouteTable<H>>,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl<H> Dispatcher<H> {
    /// Dispatcher without rate limiting; every request is admitted.
    pub fn new(routes: Arc<RouteTable<H>>) -> Self {
        Self {
            routes,
            rate_limiter: None,
        }
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    pub fn routes(&self) -> &Arc<RouteTable<H>> {
        &self.routes
    }

    pub fn rate_limiter(&self) -> Option<&Arc<RateLimiter>> {
        self.rate_limiter.as_ref()
    }

    pub fn dispatch(&self, method: &str, path: &str, origin: &ClientOrigin<'_>) -> Dispatch<H> {
        if let Some(rate_limiter) = &self.rate_limiter {
            let client = origin.identity();
            if !rate_limiter.admit(&client) {
                return Dispatch::RateLimited { client };
            }
        }

        let Some(route) = self.routes.find(method, path) else {
            trace!(method, path, "no route matched");
            return Dispatch::NotMatched;
        };

        match route.extract_params(path) {
            Some(params) => Dispatch::Matched { route, params },
            None => Dispatch::NotMatched,
        }
    }
}

impl<H> Clone for Dispatcher<H> {
    fn clone(&self) -> Self {
        Self {
            routes: Arc::clone(&self.routes),
            rate_limiter: self.rate_limiter.clone(),
        }
    }
}
