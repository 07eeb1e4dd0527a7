//! Argument resolution for handlers.
//!
//! Each handler parameter type implements [`Resolve`]. Built-in request values
//! resolve from the request container by their own type; arbitrary application
//! values are requested through [`Inject`].

use crate::context::{Ctx, Response};
use crate::error::DispatchError;
use crate::ids::RequestId;
use crate::logging::Logger;
use crate::request::{FormParams, Headers, PathParams, QueryParams, Request};
use crate::router::{MatchedRoute, Routes};
use crate::server::ShutdownHandle;

/// A handler parameter that can be produced from the active context.
pub trait Resolve: Sized {
    fn resolve(ctx: &Ctx) -> Result<Self, DispatchError>;
}

/// An application value looked up in the container by its type.
///
/// ```rust,ignore
/// #[derive(Clone)]
/// struct Db(Pool);
///
/// server.map(Db(pool));
/// server.get("/users", handlers![|Inject(db): Inject<Db>| list_users(&db)])?;
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Inject<T>(pub T);

impl<T: Clone + Send + Sync + 'static> Resolve for Inject<T> {
    fn resolve(ctx: &Ctx) -> Result<Self, DispatchError> {
        ctx.get::<T>()
            .map(Inject)
            .ok_or_else(DispatchError::unresolved::<T>)
    }
}

/// The context running the handler: the request context for global middleware,
/// the route context inside route chains.
impl Resolve for Ctx {
    fn resolve(ctx: &Ctx) -> Result<Self, DispatchError> {
        Ok(ctx.clone())
    }
}

impl Resolve for Response {
    fn resolve(ctx: &Ctx) -> Result<Self, DispatchError> {
        Ok(ctx.response())
    }
}

/// Optional dependency: `None` instead of aborting when the value is absent.
impl<T: Resolve> Resolve for Option<T> {
    fn resolve(ctx: &Ctx) -> Result<Self, DispatchError> {
        match T::resolve(ctx) {
            Ok(value) => Ok(Some(value)),
            Err(DispatchError::Unresolved { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

macro_rules! resolve_from_container {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Resolve for $ty {
                fn resolve(ctx: &Ctx) -> Result<Self, DispatchError> {
                    ctx.get::<$ty>().ok_or_else(DispatchError::unresolved::<$ty>)
                }
            }
        )+
    };
}

resolve_from_container!(
    Request,
    Headers,
    QueryParams,
    FormParams,
    PathParams,
    MatchedRoute,
    RequestId,
    Logger,
    Routes,
    ShutdownHandle,
);
