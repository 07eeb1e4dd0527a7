//! Server core module - configuration, the frozen [`App`] and the run loop.

use std::net::SocketAddr;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use super::http_server::HttpServer;
use super::lifecycle::{InFlight, Lifecycle, ShutdownHandle};
use super::service::AppService;
use crate::context::{Context, RequestContext, RequestScope, ResponseWriter};
use crate::error::{ConfigError, DispatchError, ServerError};
use crate::handler::{BoxedHandler, Handler};
use crate::ids::RequestId;
use crate::injector::Injector;
use crate::logging::Logger;
use crate::protocol::{MiddlewareReturnHandler, RouteReturnHandler};
use crate::request::{FormParams, Headers, QueryParams, Request};
use crate::router::{Route, Router, RouterAction, Routes, UrlParam};
use crate::runtime_config::{env_address, resolve_address};

/// A configurable server: global middleware, a router and a server-wide
/// dependency container.
///
/// ```rust,no_run
/// use yawf::{handlers, Server};
///
/// let mut server = Server::new();
/// server.get("/ping", handlers![|| "pong"]).unwrap();
/// server.run_on_address("127.0.0.1:3000").unwrap();
/// ```
#[derive(Debug)]
pub struct Server {
    container: Injector,
    handlers: Vec<BoxedHandler>,
    router: Router,
    address: Option<String>,
    listen_addr: Option<SocketAddr>,
    logger: Logger,
    lifecycle: Arc<Lifecycle>,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    /// A server with the default return-value protocols, a default logger and
    /// an empty router.
    #[must_use]
    pub fn new() -> Self {
        let lifecycle = Lifecycle::new();
        let logger = Logger::default();
        let mut container = Injector::new();
        container.insert(RouteReturnHandler::default());
        container.insert(MiddlewareReturnHandler::default());
        container.insert(logger.clone());
        container.insert(ShutdownHandle(Arc::clone(&lifecycle)));
        Self {
            container,
            handlers: Vec::new(),
            router: Router::new(),
            address: None,
            listen_addr: None,
            logger,
            lifecycle,
        }
    }

    /// Append a global middleware handler.
    pub fn use_handler<H, Args>(&mut self, handler: H)
    where
        H: Handler<Args>,
        Args: 'static,
    {
        self.handlers.push(BoxedHandler::new(handler));
    }

    /// Append an already boxed global middleware handler.
    pub fn use_boxed(&mut self, handler: BoxedHandler) {
        self.handlers.push(handler);
    }

    /// Map a value into the server container, visible to every request.
    pub fn map<T: Send + Sync + 'static>(&mut self, value: T) {
        self.container.insert(value);
    }

    pub fn map_arc<T: Send + Sync + 'static>(&mut self, value: Arc<T>) {
        self.container.insert_arc(value);
    }

    pub fn set_address(&mut self, address: impl Into<String>) {
        self.address = Some(address.into());
    }

    /// The configured address, or the one built from `YAWF_HOST_ENV_NAME` and
    /// `YAWF_PORT_ENV_NAME` (default `:3000`).
    pub fn address(&mut self) -> &str {
        self.address.get_or_insert_with(env_address)
    }

    /// Resolve and validate the listen address.
    ///
    /// The socket is bound once, by [`run`](Self::run), by the accept loop
    /// that serves it; until then connections are refused rather than queued.
    pub fn listen(&mut self) -> Result<(), ServerError> {
        let address = self.address().to_string();
        let addr = resolve_address(&address)?;
        info!(address = %address, resolved = %addr, "Listen address resolved");
        self.listen_addr = Some(addr);
        Ok(())
    }

    /// Address resolved by [`listen`](Self::listen).
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listen_addr
    }

    /// Serve until [`stop`](Self::stop) (or a [`ShutdownHandle`]) closes the
    /// server and every in-flight request has finished.
    pub fn run(mut self) -> Result<(), ServerError> {
        let Some(addr) = self.listen_addr.take() else {
            error!("failed to run server before listening");
            return Err(ServerError::NotListening);
        };

        self.router.log_routes();
        let app = self.into_app();
        let lifecycle = Arc::clone(&app.lifecycle);
        let handle = HttpServer(AppService::new(app)).start(addr)?;
        info!(address = %addr, "Server started");
        lifecycle.attach(handle);

        lifecycle.wait_closed();
        info!(address = %addr, "Server closed");
        Ok(())
    }

    pub fn run_on_address(mut self, address: impl Into<String>) -> Result<(), ServerError> {
        self.set_address(address);
        self.listen()?;
        self.run()
    }

    /// Replace the logger; it is also mapped into the server container.
    pub fn set_logger(&mut self, logger: Logger) {
        self.container.insert(logger.clone());
        self.logger = logger;
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Stop accepting connections and close once nothing is in flight.
    pub fn stop(&self) {
        self.lifecycle.stop();
    }

    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.lifecycle))
    }

    /// Delay between the last in-flight request finishing during a stop and
    /// the server closing. Defaults to three seconds.
    pub fn set_graceful_delay(&mut self, delay: Duration) {
        self.lifecycle.set_graceful_delay(delay);
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    pub fn add_route(
        &mut self,
        method: &str,
        pattern: &str,
        handlers: Vec<BoxedHandler>,
    ) -> Result<&mut Route, ConfigError> {
        self.router.add_route(method, pattern, handlers)
    }

    pub fn group<F>(
        &mut self,
        prefix: &str,
        register: F,
        shared: Vec<BoxedHandler>,
    ) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut Router) -> Result<(), ConfigError>,
    {
        self.router.group(prefix, register, shared)
    }

    pub fn not_found(&mut self, handlers: Vec<BoxedHandler>) {
        self.router.not_found(handlers);
    }

    pub fn url_for(&self, name: &str, params: &[UrlParam]) -> Result<String, ConfigError> {
        self.router.url_for(name, params)
    }

    #[must_use]
    pub fn methods_for(&self, path: &str) -> Vec<String> {
        self.router.methods_for(path)
    }

    /// Freeze the configuration into a shareable [`App`].
    #[must_use]
    pub fn into_app(self) -> App {
        let Server {
            mut container,
            handlers,
            router,
            logger,
            lifecycle,
            ..
        } = self;
        let router = Arc::new(router);
        container.insert(Routes::new(Arc::clone(&router)));
        App {
            container: Arc::new(container),
            handlers: handlers.into(),
            action: BoxedHandler::from_erased(Arc::new(RouterAction(router))),
            logger,
            lifecycle,
        }
    }
}

macro_rules! route_methods {
    ($($name:ident),+ $(,)?) => {
        impl Server {
            $(
                pub fn $name(
                    &mut self,
                    pattern: &str,
                    handlers: Vec<BoxedHandler>,
                ) -> Result<&mut Route, ConfigError> {
                    self.router.$name(pattern, handlers)
                }
            )+
        }
    };
}

route_methods!(get, post, put, patch, delete, options, head, any);

/// A frozen server: everything a serving coroutine needs, shared by `Arc`.
#[derive(Clone)]
pub struct App {
    container: Arc<Injector>,
    handlers: Arc<[BoxedHandler]>,
    action: BoxedHandler,
    logger: Logger,
    lifecycle: Arc<Lifecycle>,
}

impl App {
    /// Run one request through the global chain and the router.
    ///
    /// The request counts as in flight for graceful shutdown until this
    /// returns or unwinds.
    pub fn serve(&self, req: Request) -> Result<ResponseWriter, DispatchError> {
        let id = RequestId::from_request(&req);
        self.serve_with_id(req, id)
    }

    pub(crate) fn serve_with_id(
        &self,
        req: Request,
        id: RequestId,
    ) -> Result<ResponseWriter, DispatchError> {
        let _in_flight = self.lifecycle.enter();

        let scope = RequestScope::new(Arc::clone(&self.container));
        scope.insert(Headers::from_request(&req));
        scope.insert(QueryParams::from_request(&req));
        scope.insert(FormParams::from_request(&req));
        scope.insert(self.logger.for_request(&req, id));
        scope.insert(id);
        scope.insert(req);

        let ctx = RequestContext::new(
            Rc::clone(&scope),
            Arc::clone(&self.handlers),
            self.action.clone(),
        );
        ctx.next()?;
        Ok(scope.response().take())
    }

    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.lifecycle))
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub(crate) fn enter(&self) -> InFlight {
        self.lifecycle.enter()
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("handlers", &self.handlers)
            .field("container", &self.container)
            .finish()
    }
}
