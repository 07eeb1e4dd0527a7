//! Built-in middleware.

mod logger;

pub use logger::request_logger;
