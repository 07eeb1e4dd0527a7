use std::io::{self, Read};

use may_minihttp::Request as RawRequest;
use tracing::debug;

use crate::request::Request;

/// Convert a `may_minihttp` request into the request handed to the core.
///
/// Header names keep their wire casing; lookups on [`Request`] and
/// [`Headers`](crate::request::Headers) are case-insensitive. The body is
/// read in full after the head has been copied out.
pub fn parse_request(req: RawRequest) -> io::Result<Request> {
    let method = req.method().to_string();
    let target = req.path().to_string();

    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_string(),
                String::from_utf8_lossy(h.value).into_owned(),
            )
        })
        .collect();

    let mut body = Vec::new();
    req.body().read_to_end(&mut body)?;

    debug!(
        method = %method,
        target = %target,
        headers_count = headers.len(),
        body_size_bytes = body.len(),
        "HTTP request parsed"
    );

    let request = headers
        .into_iter()
        .fold(Request::new(method, &target), |req, (name, value)| {
            req.with_header(name, value)
        });
    Ok(request.with_body(body))
}
