//! # yawf
//!
//! **yawf** is a request dispatch core for coroutine-powered HTTP servers built
//! on `may` and `may_minihttp`.
//!
//! ## Overview
//!
//! For every incoming request yawf selects the best matching route, runs an
//! ordered chain of handlers (global middleware, then route middleware, then
//! the route's terminal handler) with arguments resolved from a type-keyed
//! container, and turns each handler's return value into a response write.
//!
//! ## Architecture
//!
//! - **[`injector`]** - Type-keyed dependency container, chained per request
//! - **[`handler`]** - Handler traits, argument resolution and return values
//! - **[`context`]** - Per-request execution cursor and the shared response
//! - **[`protocol`]** - Interpretation of handler return values
//! - **[`router`]** - Ranked route matching, groups and reverse routing
//! - **[`server`]** - Server lifecycle, graceful shutdown and the HTTP adapter
//! - **[`middleware`]** - Built-in middleware
//! - **[`logging`]** / **[`runtime_config`]** - Environment-driven setup
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Service as server::AppService
//!     participant App as server::App
//!     participant Ctx as context::RequestContext
//!     participant Router as router::Router
//!     participant Route as context::RouteContext
//!
//!     Client->>Service: HTTP request
//!     Service->>App: serve(Request)
//!     App->>App: seed Request, Headers,<br/>QueryParams, FormParams, RequestId
//!     App->>Ctx: next()
//!     loop global middleware
//!         Ctx->>Ctx: invoke handler, middleware protocol
//!     end
//!     Ctx->>Router: terminal action
//!     Router->>Router: rank routes, bind PathParams
//!     Router->>Route: start()
//!     loop route chain
//!         Route->>Route: invoke handler, route protocol
//!     end
//!     App-->>Service: ResponseWriter
//!     Service-->>Client: status, content type, body
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use yawf::handler::Json;
//! use yawf::request::PathParams;
//! use yawf::{handlers, Server};
//!
//! fn get_item(params: PathParams) -> (u16, Json<serde_json::Value>) {
//!     (200, Json(serde_json::json!({ "id": params.get("id") })))
//! }
//!
//! let mut server = Server::new();
//! server.use_boxed(yawf::middleware::request_logger());
//! server.get("/items/:id", handlers![get_item]).unwrap();
//! server.run_on_address("127.0.0.1:3000").unwrap();
//! ```
//!
//! ## Return Values
//!
//! | handler returns              | response                                  |
//! |------------------------------|-------------------------------------------|
//! | `()` or `true`               | nothing written, the chain continues      |
//! | `false`                      | empty body, the chain stops               |
//! | `String`, `&str`             | text body                                 |
//! | `Vec<u8>`                    | raw body                                  |
//! | `Json<T>`, maps, `Value`     | JSON body                                 |
//! | `(u16, body)`                | status and body                           |
//! | `Result<R, E>`               | `R`, or a `500` on `Err`                  |
//!
//! A global middleware that writes a response ends the request. A route
//! handler that writes ends its route chain; the middleware that wrapped the
//! route with [`Ctx::next`](context::Ctx::next) still gets to run its
//! post-processing.

pub mod context;
pub mod error;
pub mod handler;
pub mod ids;
pub mod injector;
pub mod logging;
pub mod middleware;
pub mod protocol;
pub mod request;
pub mod router;
pub mod runtime_config;
pub mod server;

pub use context::{Ctx, Response};
pub use error::{ConfigError, DispatchError, ServerError};
pub use handler::{BoxedHandler, Inject, Json};
pub use router::{Route, Router, Routes, UrlParam};
pub use server::{App, Server, ShutdownHandle};
