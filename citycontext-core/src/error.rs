//! Error taxonomy for the query pipeline.

use thiserror::Error;

/// Failure of one query through the gate/executor pipeline.
///
/// These are returned to the caller as data, never as a transport-level
/// failure: the query endpoint puts the display string into its `error`
/// field. The display strings are part of the API contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Rejected by the safety gate: first token is not SELECT.
    #[error("Only SELECT queries are allowed.")]
    NotSelect,

    /// Rejected by the safety gate: stacked statements.
    #[error("Multiple statements are not allowed.")]
    MultipleStatements,

    /// Execution exceeded the configured deadline.
    #[error("Query timed out after {seconds} seconds.")]
    Timeout { seconds: u64 },

    /// The database rejected or failed the validated statement.
    #[error("Database error: {0}")]
    Database(String),
}

impl QueryError {
    /// True for gate rejections, which never touched the database.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::NotSelect | Self::MultipleStatements)
    }
}
