//! Return-value protocols.
//!
//! After every handler invocation the running context hands the handler's
//! [`Returned`] values to a protocol, which decides whether to write the
//! response and whether to stop the chain:
//!
//! | values                         | effect                                  |
//! |--------------------------------|-----------------------------------------|
//! | none, or first is `true`       | nothing                                 |
//! | exactly `[false]`              | write an empty body, stop               |
//! | `[status: Int, body, ..]`      | write `status`, then `body`             |
//! | `[non-Int, body, ..]`          | write `200`, then `body`                |
//! | `[body]`                       | write `body`                            |
//!
//! The middleware protocol also stops its context after any write. The route
//! protocol leaves the route context running; the written response ends its
//! loop anyway.
//!
//! Both are looked up in the container on every invocation, so an application
//! can replace either by mapping its own [`RouteReturnHandler`] or
//! [`MiddlewareReturnHandler`].

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::context::{Ctx, Response, CONTENT_TYPE_BYTES, CONTENT_TYPE_JSON};
use crate::error::DispatchError;
use crate::handler::{ReturnValue, Returned};

type ProtocolFn = dyn Fn(&Ctx, Returned) -> Result<(), DispatchError> + Send + Sync;

/// Interprets values returned by handlers of a matched route chain.
#[derive(Clone)]
pub struct RouteReturnHandler(Arc<ProtocolFn>);

/// Interprets values returned by global middleware and the terminal action.
#[derive(Clone)]
pub struct MiddlewareReturnHandler(Arc<ProtocolFn>);

macro_rules! protocol_handle {
    ($name:ident, $default:ident) => {
        impl $name {
            pub fn new<F>(f: F) -> Self
            where
                F: Fn(&Ctx, Returned) -> Result<(), DispatchError> + Send + Sync + 'static,
            {
                $name(Arc::new(f))
            }

            pub fn handle(&self, ctx: &Ctx, values: Returned) -> Result<(), DispatchError> {
                (self.0)(ctx, values)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::new($default)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(stringify!($name))
            }
        }
    };
}

protocol_handle!(RouteReturnHandler, route_protocol);
protocol_handle!(MiddlewareReturnHandler, middleware_protocol);

/// Default route-level interpretation.
pub fn route_protocol(ctx: &Ctx, values: Returned) -> Result<(), DispatchError> {
    interpret(ctx, values, false)
}

/// Default middleware-level interpretation: stops after any write.
pub fn middleware_protocol(ctx: &Ctx, values: Returned) -> Result<(), DispatchError> {
    interpret(ctx, values, true)
}

fn interpret(ctx: &Ctx, values: Returned, stop_on_write: bool) -> Result<(), DispatchError> {
    let mut values = values.into_values().into_iter();
    let first = match values.next() {
        None | Some(ReturnValue::Bool(true)) => return Ok(()),
        Some(first) => first,
    };
    let res = ctx.response();

    match values.next() {
        None => match first {
            ReturnValue::Bool(false) => {
                trace!("Handler returned false, stopping chain");
                res.write(b"");
                ctx.stop();
                return Ok(());
            }
            body => write_body(&res, body)?,
        },
        Some(body) => {
            let status = match first {
                ReturnValue::Int(code) => status_code(code)?,
                _ => 200,
            };
            res.write_header(status);
            write_body(&res, body)?;
        }
    }

    if stop_on_write {
        ctx.stop();
    }
    Ok(())
}

fn status_code(code: i64) -> Result<u16, DispatchError> {
    u16::try_from(code)
        .ok()
        .filter(|c| (100..=999).contains(c))
        .ok_or(DispatchError::InvalidStatus(code))
}

fn write_body(res: &Response, body: ReturnValue) -> Result<(), DispatchError> {
    match body {
        ReturnValue::Bytes(bytes) => {
            res.set_content_type(CONTENT_TYPE_BYTES);
            res.write(&bytes);
        }
        ReturnValue::Text(text) => res.write_str(&text),
        ReturnValue::Json(value) => write_json(res, &value)?,
        ReturnValue::RawJson(bytes) => {
            res.set_content_type(CONTENT_TYPE_JSON);
            res.write(&bytes);
        }
        ReturnValue::Bool(b) => write_json(res, &b)?,
        ReturnValue::Int(n) => write_json(res, &n)?,
    }
    Ok(())
}

fn write_json<T: serde::Serialize + ?Sized>(res: &Response, value: &T) -> Result<(), DispatchError> {
    let bytes = serde_json::to_vec(value)?;
    res.set_content_type(CONTENT_TYPE_JSON);
    res.write(&bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{RequestContext, RequestScope, RouteContext};
    use crate::handler::BoxedHandler;
    use crate::injector::Injector;
    use serde_json::json;
    use std::rc::Rc;

    fn route_ctx() -> (Ctx, Rc<RouteContext>) {
        let scope = RequestScope::new(Arc::new(Injector::new()));
        let route = RouteContext::new(scope, vec![BoxedHandler::new(|| ())].into());
        (Ctx::new(&route), route)
    }

    #[test]
    fn test_true_passes_through() {
        let (ctx, _route) = route_ctx();
        route_protocol(&ctx, Returned::one(ReturnValue::Bool(true))).unwrap();
        assert!(!ctx.written());
        assert!(!ctx.is_stopped());
    }

    #[test]
    fn test_false_writes_empty_and_stops() {
        let (ctx, _route) = route_ctx();
        route_protocol(&ctx, Returned::one(ReturnValue::Bool(false))).unwrap();
        assert!(ctx.written());
        assert!(ctx.is_stopped());
        let out = ctx.response().take();
        assert_eq!(out.status(), 200);
        assert!(out.body().is_empty());
    }

    #[test]
    fn test_status_and_json_body() {
        let (ctx, _route) = route_ctx();
        let values = Returned::pair(ReturnValue::Int(201), ReturnValue::Json(json!({"id": "7"})));
        route_protocol(&ctx, values).unwrap();
        let out = ctx.response().take();
        assert_eq!(out.status(), 201);
        assert_eq!(out.content_type(), Some(CONTENT_TYPE_JSON));
        assert_eq!(out.body(), br#"{"id":"7"}"#);
    }

    #[test]
    fn test_raw_json_written_verbatim() {
        let (ctx, _route) = route_ctx();
        let body = br#"{"name":"ada","id":7}"#.to_vec();
        route_protocol(&ctx, Returned::one(ReturnValue::RawJson(body.clone()))).unwrap();
        let out = ctx.response().take();
        assert_eq!(out.content_type(), Some(CONTENT_TYPE_JSON));
        assert_eq!(out.body(), body.as_slice());
    }

    #[test]
    fn test_non_int_first_value_defaults_status() {
        let (ctx, _route) = route_ctx();
        let values = Returned::pair(ReturnValue::Text("x".into()), ReturnValue::Bytes(vec![1, 2]));
        route_protocol(&ctx, values).unwrap();
        let out = ctx.response().take();
        assert_eq!(out.status(), 200);
        assert_eq!(out.content_type(), Some(CONTENT_TYPE_BYTES));
        assert_eq!(out.body(), [1, 2]);
    }

    #[test]
    fn test_invalid_status_aborts() {
        let (ctx, _route) = route_ctx();
        let values = Returned::pair(ReturnValue::Int(42), ReturnValue::Text("x".into()));
        let err = route_protocol(&ctx, values).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidStatus(42)));
        assert!(!ctx.written());
    }

    #[test]
    fn test_route_protocol_does_not_stop_on_write() {
        let (ctx, _route) = route_ctx();
        route_protocol(&ctx, Returned::one(ReturnValue::Text("hi".into()))).unwrap();
        assert!(ctx.written());
        assert!(!ctx.is_stopped());
    }

    #[test]
    fn test_middleware_protocol_stops_on_write() {
        let scope = RequestScope::new(Arc::new(Injector::new()));
        let request = RequestContext::new(scope, Vec::new().into(), BoxedHandler::new(|| ()));
        let ctx = Ctx::new(&request);
        middleware_protocol(&ctx, Returned::one(ReturnValue::Text("hi".into()))).unwrap();
        assert!(ctx.written());
        assert!(ctx.is_stopped());
    }
}
