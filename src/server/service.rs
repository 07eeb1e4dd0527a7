use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use may_minihttp::{HttpService, Request, Response};
use tracing::{error, info};

use super::core::App;
use super::request::parse_request;
use super::response::{write_internal_error, write_response};
use crate::context::ResponseWriter;
use crate::ids::RequestId;

/// `may_minihttp` service running every request through an [`App`].
///
/// This is the per-request recovery boundary: a request whose chain fails or
/// panics gets a `500`; other requests are unaffected.
#[derive(Clone, Debug)]
pub struct AppService {
    app: App,
}

impl AppService {
    #[must_use]
    pub fn new(app: App) -> Self {
        Self { app }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// What the adapter writes back for one request.
pub(crate) enum Reply {
    Response(ResponseWriter),
    InternalError,
}

impl Reply {
    fn write_to(self, res: &mut Response) {
        match self {
            Reply::Response(out) => write_response(res, out),
            Reply::InternalError => write_internal_error(res),
        }
    }
}

impl AppService {
    /// Parse, dispatch and write one request while it counts as in flight.
    ///
    /// Closure cannot be signalled before `write` has run.
    pub(crate) fn respond<P, W>(&self, parse: P, write: W)
    where
        P: FnOnce() -> io::Result<crate::request::Request>,
        W: FnOnce(Reply),
    {
        let _in_flight = self.app.enter();
        let request = match parse() {
            Ok(request) => request,
            Err(err) => {
                error!(error = %err, "Failed to read request body");
                write(Reply::InternalError);
                return;
            }
        };
        write(self.dispatch(request));
    }

    fn dispatch(&self, request: crate::request::Request) -> Reply {
        let request_id = RequestId::from_request(&request);
        let method = request.method().to_string();
        let path = request.path().to_string();
        let start = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.app.serve_with_id(request, request_id)
        }));

        match outcome {
            Ok(Ok(out)) => {
                info!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    status = out.status(),
                    duration_ms = start.elapsed().as_millis(),
                    "Request complete"
                );
                Reply::Response(out)
            }
            Ok(Err(err)) => {
                error!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    error = %err,
                    "Request aborted"
                );
                Reply::InternalError
            }
            Err(panic) => {
                let backtrace = std::backtrace::Backtrace::capture();
                error!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    panic_message = %panic_message(panic.as_ref()),
                    backtrace = %backtrace,
                    "Handler panicked - CRITICAL"
                );
                Reply::InternalError
            }
        }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        self.respond(|| parse_request(req), |reply| reply.write_to(res));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request as CoreRequest;
    use crate::server::{Server, ShutdownHandle};
    use crate::handlers;
    use std::time::Duration;

    fn service_with(path: &str, handlers: Vec<crate::handler::BoxedHandler>) -> AppService {
        let mut server = Server::new();
        server.set_graceful_delay(Duration::ZERO);
        server.get(path, handlers).unwrap();
        AppService::new(server.into_app())
    }

    #[test]
    fn test_closure_waits_for_response_write() {
        let service = service_with(
            "/bye",
            handlers![|shutdown: ShutdownHandle| {
                shutdown.stop();
                "bye"
            }],
        );
        let shutdown = service.app.shutdown_handle();

        let mut closed_at_write = None;
        let mut body = Vec::new();
        service.respond(
            || Ok(CoreRequest::new("GET", "/bye")),
            |reply| {
                closed_at_write = Some(shutdown.is_closed());
                if let Reply::Response(out) = reply {
                    body = out.into_body();
                }
            },
        );

        assert_eq!(closed_at_write, Some(false));
        assert_eq!(body, b"bye");
        assert!(shutdown.is_closed());
    }

    #[test]
    fn test_panic_replies_internal_error() {
        let service = service_with("/panic", handlers![|| -> &'static str { panic!("boom") }]);
        let mut internal_error = false;
        service.respond(
            || Ok(CoreRequest::new("GET", "/panic")),
            |reply| internal_error = matches!(reply, Reply::InternalError),
        );
        assert!(internal_error);
        assert_eq!(service.app.shutdown_handle().active_requests(), 0);
    }

    #[test]
    fn test_unreadable_body_replies_internal_error() {
        let service = service_with("/", handlers![|| "unreachable"]);
        let mut internal_error = false;
        service.respond(
            || Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated body")),
            |reply| internal_error = matches!(reply, Reply::InternalError),
        );
        assert!(internal_error);
    }

    #[test]
    fn test_panic_message_variants() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("boom"));
        assert_eq!(panic_message(owned.as_ref()), "boom");
        let borrowed: Box<dyn Any + Send> = Box::new("bang");
        assert_eq!(panic_message(borrowed.as_ref()), "bang");
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
