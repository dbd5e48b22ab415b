//! Router core module - hot path for request routing.

use crate::registry::RouteMeta;
use http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of successfully matching a request to a registered route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route metadata from the registry (Arc to avoid clones).
    pub route: Arc<RouteMeta>,
    /// Name of the handler that should process this request.
    pub handler_name: String,
}

/// Router that matches HTTP requests to handlers.
///
/// Prediction endpoints are a fixed, parameter-free set, so matching is a
/// single `(method, path)` table lookup. The table is built once at startup
/// from the disease registry.
#[derive(Clone, Default)]
pub struct Router {
    routes: HashMap<(Method, String), Arc<RouteMeta>>,
}

impl Router {
    /// Create a new router from registry route metadata.
    #[must_use]
    pub fn new(routes: Vec<RouteMeta>) -> Self {
        let table: HashMap<(Method, String), Arc<RouteMeta>> = routes
            .into_iter()
            .map(|route| ((route.method.clone(), route.path.clone()), Arc::new(route)))
            .collect();

        let routes_summary: Vec<String> = table
            .values()
            .take(10)
            .map(|meta| format!("{} {}", meta.method, meta.path))
            .collect();

        info!(
            routes_count = table.len(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );

        Self { routes: table }
    }

    /// Print all registered routes to stdout.
    ///
    /// Useful for debugging and verifying that routes are loaded correctly.
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.routes.len());
        for ((method, path), meta) in &self.routes {
            println!("[route] {method} {path} -> {}", meta.handler_name);
        }
    }

    /// Match an HTTP request to a route.
    ///
    /// # Returns
    ///
    /// * `Some(RouteMatch)` - if a matching route is registered
    /// * `None` - if no route matches (results in 404)
    #[must_use]
    pub fn route(&self, method: Method, path: &str) -> Option<RouteMatch> {
        debug!(method = %method, path = %path, "Route match attempt");

        let key = (method.clone(), path.to_string());
        if let Some(route) = self.routes.get(&key) {
            let handler_name = route.handler_name.clone();
            info!(
                method = %method,
                path = %path,
                handler_name = %handler_name,
                "Route matched"
            );
            return Some(RouteMatch {
                route: Arc::clone(route),
                handler_name,
            });
        }

        warn!(method = %method, path = %path, "No route matched");
        None
    }

    /// All registered paths, for diagnostics and tests.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.routes.keys().map(|(_, path)| path.clone()).collect()
    }
}
