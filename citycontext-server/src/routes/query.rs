//! Natural-language query endpoint.
//!
//! POST /query generates SQL from a question and, unless `execute` is
//! false, runs it through the safety gate and executor. Generation
//! failures come back with `mode = "error"` and never reach execution;
//! execution failures come back in the `error` field with
//! `executed = false`. Both are data, not transport failures.

use axum::extract::State;
use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::run_query;
use crate::http::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,

    /// When false, return the generated SQL without running it.
    #[serde(default = "default_execute")]
    pub execute: bool,
}

fn default_execute() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub question: String,
    pub sql: String,
    pub explanation: String,
    /// "llm", "placeholder", or "error" when generation itself failed.
    pub mode: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
    pub executed: bool,
    pub error: Option<String>,
}

impl QueryResponse {
    fn unexecuted(question: String, sql: String, explanation: String, mode: String) -> Self {
        Self {
            question,
            sql,
            explanation,
            mode,
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            executed: false,
            error: None,
        }
    }

    fn generation_failed(question: String, message: String) -> Self {
        let mut response =
            Self::unexecuted(question, String::new(), String::new(), "error".to_string());
        response.error = Some(message);
        response
    }
}

/// POST /query
async fn query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    if req.question.trim().is_empty() {
        return Err(ApiError::BadRequest("Question cannot be empty.".to_string()));
    }

    let generation = match state.generator().generate(&req.question).await {
        Ok(generation) => generation,
        Err(err) => {
            tracing::warn!("SQL generation failed: {}", err);
            return Ok(Json(QueryResponse::generation_failed(
                req.question,
                format!("SQL generation failed: {err}"),
            )));
        }
    };

    let mut response = QueryResponse::unexecuted(
        req.question,
        generation.sql.clone(),
        generation.explanation,
        generation.mode.as_str().to_string(),
    );

    if req.execute {
        let settings = state.settings();
        match run_query(
            state.pool(),
            &generation.sql,
            settings.query_row_limit,
            settings.query_timeout_seconds,
        )
        .await
        {
            Ok(result) => {
                response.columns = result.columns;
                response.rows = result.rows;
                response.row_count = result.row_count;
                response.executed = true;
            }
            Err(err) => {
                response.error = Some(err.to_string());
            }
        }
    }

    Ok(Json(response))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/query", post(query))
}
