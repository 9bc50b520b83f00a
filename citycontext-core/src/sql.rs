//! SQL safety gate for LLM-generated statements.
//!
//! Untrusted SQL text goes through [`validate`] before it may reach the
//! executor. The gate accepts single-statement SELECTs only and appends a
//! row limit when the statement carries none. It is pure and synchronous;
//! deeper SQL semantics are left to the database and its read-only role.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::QueryError;

static LIMIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bLIMIT\b").expect("LIMIT regex is valid"));

/// SQL text that has passed the safety gate.
///
/// The only way to obtain one is [`validate`]; the executor takes this type
/// so unchecked text cannot reach the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedStatement(String);

impl ValidatedStatement {
    /// The normalized SQL text, with the row limit injected if one was added.
    pub fn sql(&self) -> &str {
        &self.0
    }

    pub fn into_sql(self) -> String {
        self.0
    }
}

/// Validate untrusted SQL and inject a row limit if absent.
///
/// Rules, in order:
/// 1. trim whitespace and strip exactly one trailing `;`
/// 2. the first token must be `SELECT` (case-insensitive)
/// 3. no `;` may remain anywhere (blocks stacked statements)
/// 4. append `LIMIT row_limit` unless a LIMIT keyword is already present
///
/// An explicit limit larger than `row_limit` is left untouched: the cap is
/// an injection default, not a ceiling.
pub fn validate(sql: &str, row_limit: i64) -> Result<ValidatedStatement, QueryError> {
    let cleaned = sql.trim();
    let cleaned = cleaned.strip_suffix(';').unwrap_or(cleaned).trim_end();

    let first_token = cleaned.split_whitespace().next().unwrap_or_default();
    if !first_token.eq_ignore_ascii_case("SELECT") {
        return Err(QueryError::NotSelect);
    }

    if cleaned.contains(';') {
        return Err(QueryError::MultipleStatements);
    }

    let sql = if LIMIT_RE.is_match(cleaned) {
        cleaned.to_string()
    } else {
        format!("{cleaned}\nLIMIT {row_limit}")
    };

    Ok(ValidatedStatement(sql))
}
