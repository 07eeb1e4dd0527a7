//! # Router Module
//!
//! Matches incoming requests to registered routes and runs the winning
//! route's handler chain.
//!
//! ## Overview
//!
//! - Routes are registered per method with a path pattern (`/users/:id`,
//!   `/static/**`, or an inline regular expression) and an ordered handler
//!   chain.
//! - Groups share a path prefix and leading handlers between routes.
//! - Every request is ranked against every route: an exact method match beats
//!   a `HEAD` request on a `GET` route, which beats a wildcard-method route.
//!   The earliest registered route wins a tie.
//! - A request that matches nothing runs the not-found chain, a plain `404` by
//!   default.
//!
//! ## Example
//!
//! ```rust
//! use yawf::handlers;
//! use yawf::request::PathParams;
//! use yawf::router::{Router, UrlParam};
//!
//! let mut router = Router::new();
//! router
//!     .get("/users/:id", handlers![|p: PathParams| p.get("id").map(str::to_string)])
//!     .unwrap()
//!     .set_name("user");
//!
//! let url = router.url_for("user", &[UrlParam::from("42")]).unwrap();
//! assert_eq!(url, "/users/42");
//! assert_eq!(router.methods_for("/users/42"), vec!["GET".to_string()]);
//! ```

mod core;
mod route;

pub(crate) use self::core::RouterAction;
pub use self::core::{MatchedRoute, Router, Routes, NOT_FOUND_BODY};
pub use route::{Route, RouteMatch, UrlParam, ANY_METHOD};
