use http::StatusCode;
use may_minihttp::Response;

use crate::context::{ResponseWriter, CONTENT_TYPE_BYTES, CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT};

/// Canonical reason phrase, or `"Unknown"` for unregistered codes.
pub(crate) fn status_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

fn content_type_header(content_type: &'static str) -> &'static str {
    match content_type {
        CONTENT_TYPE_JSON => "Content-Type: application/json",
        CONTENT_TYPE_BYTES => "Content-Type: application/octet-stream",
        _ => "Content-Type: text/plain; charset=utf-8",
    }
}

/// Copy a buffered response onto the wire.
pub fn write_response(res: &mut Response, out: ResponseWriter) {
    let status = out.status();
    res.status_code(usize::from(status), status_reason(status));
    if let Some(content_type) = out.content_type() {
        res.header(content_type_header(content_type));
    }
    res.body_vec(out.into_body());
}

/// Generic `500` for aborted or panicked requests.
pub fn write_internal_error(res: &mut Response) {
    res.status_code(500, status_reason(500));
    res.header(content_type_header(CONTENT_TYPE_TEXT));
    res.body("Internal Server Error\n");
}
