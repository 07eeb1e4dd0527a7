//! HTTP serving: the configurable [`Server`], the frozen [`App`] it serves, and
//! the `may_minihttp` adapter.

mod core;
mod http_server;
mod lifecycle;
mod request;
mod response;
mod service;

pub use self::core::{App, Server};
pub use http_server::{HttpServer, ServerHandle};
pub use lifecycle::ShutdownHandle;
pub use request::parse_request;
pub use response::{write_internal_error, write_response};
pub use service::AppService;
