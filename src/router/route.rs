use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::ConfigError;
use crate::handler::BoxedHandler;

/// Method token registered by [`Router::any`](super::Router::any).
pub const ANY_METHOD: &str = "*";

static PARAM_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":[^/#?()\.\\]+").expect("param token regex is valid"));

static URL_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r":[^/#?()\.\\]+|\(\?P<[a-zA-Z0-9]+>.*\)").expect("url token regex is valid")
});

/// Quality of a method/path match. Higher is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RouteMatch {
    None,
    /// The route was registered for any method.
    Star,
    /// A `HEAD` request served by a `GET` route.
    Overload,
    Exact,
}

impl RouteMatch {
    #[inline]
    #[must_use]
    pub fn better_than(self, other: RouteMatch) -> bool {
        self > other
    }
}

/// A positional argument for reverse URL generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlParam {
    Int(i64),
    Str(String),
}

impl fmt::Display for UrlParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlParam::Int(n) => write!(f, "{n}"),
            UrlParam::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for UrlParam {
    fn from(s: &str) -> Self {
        UrlParam::Str(s.to_string())
    }
}

impl From<String> for UrlParam {
    fn from(s: String) -> Self {
        UrlParam::Str(s)
    }
}

impl From<i64> for UrlParam {
    fn from(n: i64) -> Self {
        UrlParam::Int(n)
    }
}

impl From<i32> for UrlParam {
    fn from(n: i32) -> Self {
        UrlParam::Int(i64::from(n))
    }
}

impl From<u32> for UrlParam {
    fn from(n: u32) -> Self {
        UrlParam::Int(i64::from(n))
    }
}

/// A compiled method + path pattern bound to its handler chain.
///
/// Pattern syntax:
///
/// - `:name` matches one path segment and binds it as `name`
/// - `**` matches the rest of the path and binds it as `_1`, `_2`, ...
/// - anything else is a regular expression fragment
///
/// The whole path must match; a single trailing slash is tolerated.
#[derive(Debug)]
pub struct Route {
    method: String,
    pattern: String,
    regex: Regex,
    handlers: Arc<[BoxedHandler]>,
    name: Option<String>,
}

impl Route {
    /// Compile a route. `pattern` is kept verbatim for reverse routing.
    pub fn new(
        method: impl Into<String>,
        pattern: impl Into<String>,
        handlers: Vec<BoxedHandler>,
    ) -> Result<Self, ConfigError> {
        let pattern = pattern.into();
        let regex = compile(&pattern)?;
        Ok(Self {
            method: method.into(),
            pattern,
            regex,
            handlers: handlers.into(),
            name: None,
        })
    }

    /// Name the route for [`Routes::url_for`](super::Routes::url_for).
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn handlers(&self) -> Arc<[BoxedHandler]> {
        Arc::clone(&self.handlers)
    }

    /// Rank the route's method against `method`.
    #[must_use]
    pub fn match_method(&self, method: &str) -> RouteMatch {
        if method == self.method {
            RouteMatch::Exact
        } else if method == "HEAD" && self.method == "GET" {
            RouteMatch::Overload
        } else if self.method == ANY_METHOD {
            RouteMatch::Star
        } else {
            RouteMatch::None
        }
    }

    /// Rank the route against a request and capture its named parameters.
    ///
    /// Parameters are only populated when the rank is not [`RouteMatch::None`].
    /// Named groups that did not participate in the match bind an empty string.
    #[must_use]
    pub fn matches(&self, method: &str, path: &str) -> (RouteMatch, HashMap<String, String>) {
        let rank = self.match_method(method);
        if rank == RouteMatch::None {
            return (RouteMatch::None, HashMap::new());
        }
        match self.regex.captures(path) {
            Some(caps) => (rank, self.params(&caps)),
            None => (RouteMatch::None, HashMap::new()),
        }
    }

    /// Whether the path matches, ignoring the method.
    #[must_use]
    pub fn matches_path(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    fn params(&self, caps: &Captures<'_>) -> HashMap<String, String> {
        self.regex
            .capture_names()
            .flatten()
            .map(|name| {
                let value = caps.name(name).map_or("", |m| m.as_str());
                (name.to_string(), value.to_string())
            })
            .collect()
    }

    /// Render the pattern, substituting parameter tokens left to right.
    ///
    /// Tokens beyond the supplied arguments keep their literal text.
    ///
    /// ```
    /// # use yawf::router::Route;
    /// let route = Route::new("GET", "/users/:id/posts/:post", Vec::new()).unwrap();
    /// assert_eq!(route.url_with(&["42"]), "/users/42/posts/:post");
    /// ```
    #[must_use]
    pub fn url_with<S: AsRef<str>>(&self, args: &[S]) -> String {
        if args.is_empty() {
            return self.pattern.clone();
        }
        let mut args = args.iter();
        URL_TOKEN
            .replace_all(&self.pattern, |caps: &Captures<'_>| match args.next() {
                Some(arg) => arg.as_ref().to_string(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

/// Translate a route pattern into an anchored regular expression.
fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    let named = PARAM_TOKEN.replace_all(pattern, |caps: &Captures<'_>| {
        format!("(?P<{}>[^/#?]+)", &caps[0][1..])
    });

    let mut source = String::with_capacity(named.len() + 16);
    source.push_str("^(?:");
    let mut wildcard = 0usize;
    let mut rest: &str = &named;
    while let Some(at) = rest.find("**") {
        wildcard += 1;
        source.push_str(&rest[..at]);
        source.push_str("(?P<_");
        source.push_str(&wildcard.to_string());
        source.push_str(">[^#?]*)");
        rest = &rest[at + 2..];
    }
    source.push_str(rest);
    source.push_str(")/?$");

    Regex::new(&source).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(method: &str, pattern: &str) -> Route {
        Route::new(method, pattern, Vec::new()).unwrap()
    }

    #[test]
    fn test_named_param_binds_segment() {
        let r = route("GET", "/users/:id");
        let (rank, params) = r.matches("GET", "/users/42");
        assert_eq!(rank, RouteMatch::Exact);
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_trailing_slash_is_optional() {
        let r = route("GET", "/users/:id");
        assert_eq!(r.matches("GET", "/users/42/").0, RouteMatch::Exact);
        assert_eq!(r.matches("GET", "/users/42/extra").0, RouteMatch::None);
    }

    #[test]
    fn test_whole_path_must_match() {
        let r = route("GET", "/users");
        assert_eq!(r.matches("GET", "/users/42").0, RouteMatch::None);
        assert_eq!(r.matches("GET", "/api/users").0, RouteMatch::None);
    }

    #[test]
    fn test_wildcards_bind_positional_names() {
        let r = route("GET", "/files/**/raw/**");
        let (rank, params) = r.matches("GET", "/files/a/b/raw/c.txt");
        assert_eq!(rank, RouteMatch::Exact);
        assert_eq!(params["_1"], "a/b");
        assert_eq!(params["_2"], "c.txt");
    }

    #[test]
    fn test_method_ranking() {
        assert_eq!(route("GET", "/").match_method("GET"), RouteMatch::Exact);
        assert_eq!(route("GET", "/").match_method("HEAD"), RouteMatch::Overload);
        assert_eq!(route("*", "/").match_method("DELETE"), RouteMatch::Star);
        assert_eq!(route("POST", "/").match_method("GET"), RouteMatch::None);
        assert!(RouteMatch::Exact.better_than(RouteMatch::Overload));
        assert!(RouteMatch::Overload.better_than(RouteMatch::Star));
        assert!(RouteMatch::Star.better_than(RouteMatch::None));
        assert!(!RouteMatch::Star.better_than(RouteMatch::Star));
    }

    #[test]
    fn test_inline_regex_group() {
        let r = route("GET", r"/items/(?P<id>\d+)");
        assert_eq!(r.matches("GET", "/items/7").1["id"], "7");
        assert_eq!(r.matches("GET", "/items/seven").0, RouteMatch::None);
        assert_eq!(r.url_with(&["9"]), "/items/9");
    }

    #[test]
    fn test_url_with() {
        let r = route("GET", "/users/:id/posts/:post");
        assert_eq!(r.url_with::<&str>(&[]), "/users/:id/posts/:post");
        assert_eq!(r.url_with(&["1", "2"]), "/users/1/posts/2");
        assert_eq!(r.url_with(&["1"]), "/users/1/posts/:post");
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = Route::new("GET", "/broken/(", Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }
}
