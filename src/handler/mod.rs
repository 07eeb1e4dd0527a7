//! # Handlers
//!
//! A handler is any function or closure whose parameters can be resolved from
//! the request's dependency container and whose return value can be turned
//! into a response write.
//!
//! ```rust,ignore
//! use yawf::handler::Json;
//! use yawf::request::PathParams;
//!
//! fn get_item(params: PathParams) -> (u16, Json<serde_json::Value>) {
//!     (200, Json(serde_json::json!({ "id": params.get("id") })))
//! }
//! ```
//!
//! Argument types are checked by the compiler at registration: anything that is
//! not a callable with resolvable parameters does not type-check. Whether a
//! value is actually present in the container is only known per request, so a
//! missing value aborts that request with [`DispatchError::Unresolved`].
//!
//! [`DispatchError::Unresolved`]: crate::error::DispatchError::Unresolved

mod core;
mod resolve;
mod returns;

pub use self::core::{BoxedHandler, ErasedHandler, Handler, Signature};
pub use resolve::{Inject, Resolve};
pub use returns::{IntoBody, IntoReturn, Json, ReturnValue, Returned, MAX_INLINE_RETURNS};
