//! Router core module - route registration and request dispatch.
//!
//! Routes are scanned in registration order for every request. The best ranked
//! match wins; the earliest route wins a tie and an exact match ends the scan.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::route::{Route, RouteMatch, UrlParam, ANY_METHOD};
use crate::context::{Ctx, Response, RouteContext};
use crate::error::{ConfigError, DispatchError};
use crate::handler::{BoxedHandler, ErasedHandler, Returned, Signature};
use crate::request::{PathParams, Request};

/// Body written by the default not-found chain.
pub const NOT_FOUND_BODY: &str = "404 page not found\n";

/// Metadata of the route that matched the current request.
///
/// Injected into the request container alongside [`PathParams`] before the
/// route's chain runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRoute {
    pub method: Arc<str>,
    pub pattern: Arc<str>,
    pub name: Option<Arc<str>>,
}

impl MatchedRoute {
    fn from_route(route: &Route) -> Self {
        Self {
            method: Arc::from(route.method()),
            pattern: Arc::from(route.pattern()),
            name: route.name().map(Arc::from),
        }
    }
}

#[derive(Debug)]
struct Group {
    prefix: String,
    handlers: Vec<BoxedHandler>,
}

/// Ordered routes, the not-found chain and the registration-time group stack.
pub struct Router {
    routes: Vec<Route>,
    not_found: Arc<[BoxedHandler]>,
    groups: Vec<Group>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

fn default_not_found(res: Response) {
    res.write_header(404);
    res.write_str(NOT_FOUND_BODY);
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            not_found: vec![BoxedHandler::new(default_not_found)].into(),
            groups: Vec::new(),
        }
    }

    /// Register a route for an arbitrary method.
    ///
    /// Inside [`group`](Self::group) registrations the pattern is prefixed with
    /// every active group prefix and the chain with every group's handlers,
    /// outermost first.
    pub fn add_route(
        &mut self,
        method: &str,
        pattern: &str,
        handlers: Vec<BoxedHandler>,
    ) -> Result<&mut Route, ConfigError> {
        let (pattern, handlers) = if self.groups.is_empty() {
            (pattern.to_string(), handlers)
        } else {
            let mut full = String::new();
            let mut chain = Vec::new();
            for group in &self.groups {
                full.push_str(&group.prefix);
                chain.extend(group.handlers.iter().cloned());
            }
            full.push_str(pattern);
            chain.extend(handlers);
            (full, chain)
        };

        let route = Route::new(method, pattern, handlers)?;
        debug!(
            method = %route.method(),
            pattern = %route.pattern(),
            handlers = route.handlers().len(),
            "Route registered"
        );
        self.routes.push(route);
        let index = self.routes.len() - 1;
        Ok(&mut self.routes[index])
    }

    pub fn get(
        &mut self,
        pattern: &str,
        handlers: Vec<BoxedHandler>,
    ) -> Result<&mut Route, ConfigError> {
        self.add_route("GET", pattern, handlers)
    }

    pub fn post(
        &mut self,
        pattern: &str,
        handlers: Vec<BoxedHandler>,
    ) -> Result<&mut Route, ConfigError> {
        self.add_route("POST", pattern, handlers)
    }

    pub fn put(
        &mut self,
        pattern: &str,
        handlers: Vec<BoxedHandler>,
    ) -> Result<&mut Route, ConfigError> {
        self.add_route("PUT", pattern, handlers)
    }

    pub fn patch(
        &mut self,
        pattern: &str,
        handlers: Vec<BoxedHandler>,
    ) -> Result<&mut Route, ConfigError> {
        self.add_route("PATCH", pattern, handlers)
    }

    pub fn delete(
        &mut self,
        pattern: &str,
        handlers: Vec<BoxedHandler>,
    ) -> Result<&mut Route, ConfigError> {
        self.add_route("DELETE", pattern, handlers)
    }

    pub fn options(
        &mut self,
        pattern: &str,
        handlers: Vec<BoxedHandler>,
    ) -> Result<&mut Route, ConfigError> {
        self.add_route("OPTIONS", pattern, handlers)
    }

    pub fn head(
        &mut self,
        pattern: &str,
        handlers: Vec<BoxedHandler>,
    ) -> Result<&mut Route, ConfigError> {
        self.add_route("HEAD", pattern, handlers)
    }

    /// Register a route matching every method, ranked below exact and
    /// `HEAD`-for-`GET` matches.
    pub fn any(
        &mut self,
        pattern: &str,
        handlers: Vec<BoxedHandler>,
    ) -> Result<&mut Route, ConfigError> {
        self.add_route(ANY_METHOD, pattern, handlers)
    }

    /// Register related routes under a shared prefix and shared handlers.
    ///
    /// The group is active only while `register` runs; the group stack is
    /// restored afterwards even when `register` fails.
    ///
    /// ```
    /// # use yawf::router::Router;
    /// # use yawf::handlers;
    /// let mut router = Router::new();
    /// router
    ///     .group(
    ///         "/api",
    ///         |r| {
    ///             r.get("/users", handlers![|| "users"])?;
    ///             Ok(())
    ///         },
    ///         handlers![|| true],
    ///     )
    ///     .unwrap();
    /// assert_eq!(router.all()[0].pattern(), "/api/users");
    /// ```
    pub fn group<F>(
        &mut self,
        prefix: &str,
        register: F,
        shared: Vec<BoxedHandler>,
    ) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut Router) -> Result<(), ConfigError>,
    {
        let depth = self.groups.len();
        self.groups.push(Group {
            prefix: prefix.to_string(),
            handlers: shared,
        });
        let result = register(self);
        self.groups.truncate(depth);
        result
    }

    /// Replace the chain run when no route matches.
    pub fn not_found(&mut self, handlers: Vec<BoxedHandler>) {
        self.not_found = handlers.into();
    }

    /// Every registered route, in registration order.
    #[must_use]
    pub fn all(&self) -> &[Route] {
        &self.routes
    }

    /// Render the URL of the route named `name`.
    pub fn url_for(&self, name: &str, params: &[UrlParam]) -> Result<String, ConfigError> {
        let route = self
            .routes
            .iter()
            .find(|r| r.name() == Some(name))
            .ok_or_else(|| ConfigError::RouteNotFound(name.to_string()))?;
        let args: Vec<String> = params.iter().map(ToString::to_string).collect();
        Ok(route.url_with(&args))
    }

    /// Distinct methods, first seen first, of the routes matching `path`.
    #[must_use]
    pub fn methods_for(&self, path: &str) -> Vec<String> {
        let mut methods: Vec<String> = Vec::new();
        for route in &self.routes {
            if route.matches_path(path) && !methods.iter().any(|m| m == route.method()) {
                methods.push(route.method().to_string());
            }
        }
        methods
    }

    /// Select the best route for `(method, path)`.
    #[must_use]
    pub fn find(&self, method: &str, path: &str) -> Option<(&Route, PathParams)> {
        let mut best = RouteMatch::None;
        let mut found = None;
        for route in &self.routes {
            let (rank, params) = route.matches(method, path);
            if rank.better_than(best) {
                best = rank;
                found = Some((route, params));
                if rank == RouteMatch::Exact {
                    break;
                }
            }
        }
        found.map(|(route, params)| (route, PathParams::from(params)))
    }

    /// Dispatch the current request to its route, or to the not-found chain.
    ///
    /// Runs a route-scoped context sharing the caller's request container and
    /// response.
    pub fn handle(&self, ctx: &Ctx) -> Result<(), DispatchError> {
        let req = ctx
            .get::<Request>()
            .ok_or_else(DispatchError::unresolved::<Request>)?;
        let scope = std::rc::Rc::clone(ctx.scope());

        let match_start = Instant::now();
        let found = self.find(req.method(), req.path());
        let match_duration = match_start.elapsed();

        match found {
            Some((route, params)) => {
                if match_duration > Duration::from_millis(1) {
                    warn!(
                        method = %req.method(),
                        path = %req.path(),
                        route_pattern = %route.pattern(),
                        path_params = ?params,
                        duration_us = match_duration.as_micros(),
                        "Slow route matching detected"
                    );
                } else {
                    info!(
                        method = %req.method(),
                        path = %req.path(),
                        route_pattern = %route.pattern(),
                        path_params = ?params,
                        duration_us = match_duration.as_micros(),
                        "Route matched"
                    );
                }
                scope.insert(params);
                scope.insert(MatchedRoute::from_route(route));
                RouteContext::new(scope, route.handlers()).start()
            }
            None => {
                warn!(
                    method = %req.method(),
                    path = %req.path(),
                    duration_us = match_duration.as_micros(),
                    "No route matched"
                );
                RouteContext::new(scope, Arc::clone(&self.not_found)).start()
            }
        }
    }

    /// Log the routing table, up to the first ten routes.
    pub fn log_routes(&self) {
        let routes_summary: Vec<String> = self
            .routes
            .iter()
            .take(10)
            .map(|r| format!("{} {}", r.method(), r.pattern()))
            .collect();
        info!(
            routes_count = self.routes.len(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("not_found", &self.not_found)
            .finish()
    }
}

/// The terminal action of a server: dispatches through a frozen router.
pub(crate) struct RouterAction(pub(crate) Arc<Router>);

impl ErasedHandler for RouterAction {
    fn invoke(&self, ctx: &Ctx) -> Result<Returned, DispatchError> {
        self.0.handle(ctx)?;
        Ok(Returned::empty())
    }

    fn signature(&self) -> Signature {
        Signature {
            params: vec![std::any::type_name::<Ctx>()],
            returns: std::any::type_name::<()>(),
        }
    }
}

/// Read-only view of the routing table, injectable into handlers.
#[derive(Clone)]
pub struct Routes(Arc<Router>);

impl Routes {
    pub(crate) fn new(router: Arc<Router>) -> Self {
        Routes(router)
    }

    pub fn url_for(&self, name: &str, params: &[UrlParam]) -> Result<String, ConfigError> {
        self.0.url_for(name, params)
    }

    pub fn methods_for(&self, path: &str) -> Vec<String> {
        self.0.methods_for(path)
    }

    pub fn all(&self) -> &[Route] {
        self.0.all()
    }
}

impl fmt::Debug for Routes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Routes").field(&self.0.all().len()).finish()
    }
}
