//! Database layer: shared pool lifecycle and validated query execution.

pub mod executor;
pub mod pool;

pub use executor::{run_query, QueryResult};
pub use pool::SharedPool;
