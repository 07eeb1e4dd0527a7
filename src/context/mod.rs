//! Per-request execution contexts and the shared response tracker.

mod core;
mod response;

pub use self::core::{Context, Ctx, RequestContext, RequestScope, RouteContext};
pub use response::{
    Response, ResponseWriter, CONTENT_TYPE_BYTES, CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT,
};
