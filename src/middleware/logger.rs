use std::time::Instant;

use tracing::{info, warn};

use crate::context::Ctx;
use crate::error::DispatchError;
use crate::handler::BoxedHandler;
use crate::logging::Logger;
use crate::request::Request;

fn log_request(ctx: Ctx, req: Request, logger: Logger) -> Result<(), DispatchError> {
    let start = Instant::now();
    info!(
        parent: logger.span(),
        method = %req.method(),
        path = %req.path(),
        "Started"
    );

    let result = ctx.next();
    let latency_us = start.elapsed().as_micros();
    match &result {
        Ok(()) => {
            let res = ctx.response();
            info!(
                parent: logger.span(),
                method = %req.method(),
                path = %req.path(),
                status = res.status(),
                written = res.written(),
                latency_us = latency_us,
                "Completed"
            );
        }
        Err(err) => warn!(
            parent: logger.span(),
            method = %req.method(),
            path = %req.path(),
            error = %err,
            latency_us = latency_us,
            "Failed"
        ),
    }
    result
}

/// Global middleware logging each request's start, status and latency.
///
/// Wraps the rest of the chain with [`Ctx::next`], so register it first.
#[must_use]
pub fn request_logger() -> BoxedHandler {
    BoxedHandler::new(log_request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{handlers, Server};

    #[test]
    fn test_request_logger_wraps_chain() {
        let mut server = Server::new();
        server.use_boxed(request_logger());
        server.use_handler(|| ());
        server.get("/ping", handlers![|| "pong"]).unwrap();

        let out = server
            .into_app()
            .serve(Request::new("GET", "/ping"))
            .unwrap();
        assert_eq!(out.status(), 200);
        assert_eq!(out.body(), b"pong");
    }

    #[test]
    fn test_request_logger_propagates_failure() {
        let mut server = Server::new();
        server.use_boxed(request_logger());
        server
            .get(
                "/fail",
                handlers![|| -> anyhow::Result<()> { Err(anyhow::anyhow!("nope")) }],
            )
            .unwrap();

        let err = server
            .into_app()
            .serve(Request::new("GET", "/fail"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Handler(_)));
    }
}
