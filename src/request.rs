//! Request-scoped values seeded into the dependency container.
//!
//! The HTTP adapter turns each inbound request into a [`Request`] and derives
//! [`Headers`], [`QueryParams`] and [`FormParams`] from it. The router adds
//! [`PathParams`] before running a matched route's chain.

use std::collections::HashMap;
use std::sync::Arc;

/// The raw inbound request as seen by handlers.
///
/// Cheap to clone: the body is shared.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: String,
    path: String,
    query: String,
    headers: Vec<(String, String)>,
    body: Arc<[u8]>,
}

impl Request {
    /// Build a request from a method and a request target (`/path?query`).
    #[must_use]
    pub fn new(method: impl Into<String>, target: &str) -> Self {
        let (path, query) = split_target(target);
        Self {
            method: method.into(),
            path: path.to_string(),
            query: query.to_string(),
            headers: Vec::new(),
            body: Arc::from(Vec::new()),
        }
    }

    /// Append a header. Repeated names are kept as separate entries.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Arc::from(body.into());
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request path without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string without the leading `?`.
    pub fn raw_query(&self) -> &str {
        &self.query
    }

    pub fn header_entries(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of a header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Split a request target into path and query. An empty path becomes `/`.
pub(crate) fn split_target(target: &str) -> (&str, &str) {
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p, q),
        None => (target, ""),
    };
    let path = path.split('#').next().unwrap_or("");
    (if path.is_empty() { "/" } else { path }, query)
}

/// Request headers with names lowercased and repeated values joined by `", "`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers(HashMap<String, String>);

impl Headers {
    #[must_use]
    pub fn from_request(req: &Request) -> Self {
        let mut map: HashMap<String, String> = HashMap::new();
        for (name, value) in req.header_entries() {
            map.entry(name.to_ascii_lowercase())
                .and_modify(|v| {
                    v.push_str(", ");
                    v.push_str(value);
                })
                .or_insert_with(|| value.clone());
        }
        Headers(map)
    }

    /// Look up a header (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Multi-valued `name=value` pairs decoded from `application/x-www-form-urlencoded` text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values(HashMap<String, Vec<String>>);

impl Values {
    /// Decode urlencoded text. Values keep their order of appearance per name.
    #[must_use]
    pub fn parse(input: &[u8]) -> Self {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (k, v) in url::form_urlencoded::parse(input) {
            map.entry(k.into_owned()).or_default().push(v.into_owned());
        }
        Values(map)
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.0.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parsed query string parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(pub Values);

impl QueryParams {
    #[must_use]
    pub fn from_request(req: &Request) -> Self {
        QueryParams(Values::parse(req.raw_query().as_bytes()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.0.get_all(name)
    }
}

/// Parsed form parameters. Only urlencoded bodies are decoded; any other
/// content type yields an empty set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormParams(pub Values);

impl FormParams {
    #[must_use]
    pub fn from_request(req: &Request) -> Self {
        let urlencoded = req
            .header("content-type")
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|ct| {
                ct.trim()
                    .eq_ignore_ascii_case("application/x-www-form-urlencoded")
            });
        if !urlencoded || !matches!(req.method(), "POST" | "PUT" | "PATCH") {
            return FormParams::default();
        }
        FormParams(Values::parse(req.body()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.0.get_all(name)
    }
}

/// Named parameters captured by the matched route pattern.
///
/// `**` wildcards are captured under the positional names `_1`, `_2`, ...
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn into_inner(self) -> HashMap<String, String> {
        self.0
    }
}

impl From<HashMap<String, String>> for PathParams {
    fn from(map: HashMap<String, String>) -> Self {
        PathParams(map)
    }
}
