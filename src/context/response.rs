use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_BYTES: &str = "application/octet-stream";

/// Buffered response that records whether anything has been written.
///
/// The first status written wins; writing a body first implies `200`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResponseWriter {
    status: Option<u16>,
    content_type: Option<&'static str>,
    body: Vec<u8>,
}

impl ResponseWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_header(&mut self, status: u16) {
        match self.status {
            Some(existing) => debug!(
                existing_status = existing,
                ignored_status = status,
                "Superfluous write_header call"
            ),
            None => self.status = Some(status),
        }
    }

    pub fn write(&mut self, bytes: &[u8]) {
        if self.status.is_none() {
            self.status = Some(200);
        }
        self.body.extend_from_slice(bytes);
    }

    /// Record the body's content type unless one was already recorded.
    pub fn set_content_type(&mut self, content_type: &'static str) {
        self.content_type.get_or_insert(content_type);
    }

    /// Whether a status or any body bytes have been written.
    pub fn written(&self) -> bool {
        self.status.is_some()
    }

    /// Status sent on the wire: `200` unless a handler set one.
    pub fn status(&self) -> u16 {
        self.status.unwrap_or(200)
    }

    pub fn content_type(&self) -> Option<&'static str> {
        self.content_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Handle to the response shared by every context of one request.
///
/// Resolvable as a handler argument for handlers that write directly.
#[derive(Debug, Clone, Default)]
pub struct Response(Rc<RefCell<ResponseWriter>>);

impl Response {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_header(&self, status: u16) {
        self.0.borrow_mut().write_header(status);
    }

    pub fn write(&self, bytes: &[u8]) {
        self.0.borrow_mut().write(bytes);
    }

    pub fn write_str(&self, text: &str) {
        let mut inner = self.0.borrow_mut();
        inner.set_content_type(CONTENT_TYPE_TEXT);
        inner.write(text.as_bytes());
    }

    pub fn set_content_type(&self, content_type: &'static str) {
        self.0.borrow_mut().set_content_type(content_type);
    }

    pub fn written(&self) -> bool {
        self.0.borrow().written()
    }

    pub fn status(&self) -> u16 {
        self.0.borrow().status()
    }

    /// Move the buffered response out, leaving an empty writer behind.
    #[must_use]
    pub fn take(&self) -> ResponseWriter {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_200_unwritten() {
        let w = ResponseWriter::new();
        assert!(!w.written());
        assert_eq!(w.status(), 200);
        assert!(w.body().is_empty());
    }

    #[test]
    fn test_empty_write_marks_written() {
        let mut w = ResponseWriter::new();
        w.write(b"");
        assert!(w.written());
        assert_eq!(w.status(), 200);
    }

    #[test]
    fn test_first_status_wins() {
        let mut w = ResponseWriter::new();
        w.write_header(201);
        w.write_header(500);
        w.write(b"ok");
        assert_eq!(w.status(), 201);
        assert_eq!(w.body(), b"ok");
    }

    #[test]
    fn test_shared_handle_propagates_written() {
        let res = Response::new();
        let other = res.clone();
        other.write_str("hi");
        assert!(res.written());
        let taken = res.take();
        assert_eq!(taken.content_type(), Some(CONTENT_TYPE_TEXT));
        assert_eq!(taken.into_body(), b"hi".to_vec());
    }
}
