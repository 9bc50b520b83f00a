//! citycontext-core: shared pieces of the city model API.
//!
//! Holds runtime configuration, the query error taxonomy, and the SQL
//! safety gate that every piece of LLM-generated SQL must pass before it
//! can reach the database.

pub mod config;
pub mod error;
pub mod sql;

pub use config::Settings;
pub use error::QueryError;
pub use sql::{validate, ValidatedStatement};
