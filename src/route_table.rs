use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::error::{RegistrationError, Result};
use crate::route::{Method, Route};

/// Ordered set of routes. Registration order is search order.
///
/// Routes are stored behind `Arc` so a lookup hands out a snapshot of the
/// route it matched; a concurrent re-registration swaps the slot without
/// affecting callers already holding the old route.
#[derive(Debug)]
pub struct RouteTable<H> {
    routes: RwLock<Vec<Arc<Route<H>>>>,
}

impl<H> RouteTable<H> {
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(Vec::new()),
        }
    }

    /// Register `handler` for `method` and `template`.
    ///
    /// A second registration of the same method and template replaces the
    /// first in place, keeping its position in search order. Nothing is
    /// changed when the method is unsupported or the template does not compile.
    pub fn register(&self, method: &str, template: &str, handler: H) -> Result<()> {
        let method: Method = method.parse()?;
        let route = Route::new(method, template, handler).map_err(|source| {
            RegistrationError::InvalidTemplate {
                template: template.to_string(),
                source,
            }
        })?;

        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        match routes
            .iter()
            .position(|r| r.method() == method && r.template() == template)
        {
            Some(index) => {
                routes[index] = Arc::new(route);
                debug!(method = %method, template, index, "replaced route");
            }
            None => {
                routes.push(Arc::new(route));
                debug!(method = %method, template, "registered route");
            }
        }

        Ok(())
    }

    /// First route, in registration order, whose method equals `method` and
    /// whose template matches `path`.
    pub fn find(&self, method: &str, path: &str) -> Option<Arc<Route<H>>> {
        let method: Method = method.parse().ok()?;
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        routes
            .iter()
            .find(|route| route.matches(method, path))
            .cloned()
    }

    /// Snapshot of the registered routes in search order.
    pub fn routes(&self) -> Vec<Arc<Route<H>>> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.routes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, template: &str, handler: H) -> Result<()> {
        self.register(Method::Get.as_str(), template, handler)
    }

    pub fn head(&self, template: &str, handler: H) -> Result<()> {
        self.register(Method::Head.as_str(), template, handler)
    }

    pub fn post(&self, template: &str, handler: H) -> Result<()> {
        self.register(Method::Post.as_str(), template, handler)
    }

    pub fn put(&self, template: &str, handler: H) -> Result<()> {
        self.register(Method::Put.as_str(), template, handler)
    }

    pub fn patch(&self, template: &str, handler: H) -> Result<()> {
        self.register(Method::Patch.as_str(), template, handler)
    }

    pub fn delete(&self, template: &str, handler: H) -> Result<()> {
        self.register(Method::Delete.as_str(), template, handler)
    }

    pub fn connect(&self, template: &str, handler: H) -> Result<()> {
        self.register(Method::Connect.as_str(), template, handler)
    }

    pub fn options(&self, template: &str, handler: H) -> Result<()> {
        self.register(Method::Options.as_str(), template, handler)
    }

    pub fn trace(&self, template: &str, handler: H) -> Result<()> {
        self.register(Method::Trace.as_str(), template, handler)
    }
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self::new()
    }
}
