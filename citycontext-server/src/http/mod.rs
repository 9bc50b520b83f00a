//! HTTP surface: error mapping shared by the route handlers.

pub mod error;

pub use error::ApiError;
