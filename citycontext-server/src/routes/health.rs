//! Health check route.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub db: &'static str,
    pub llm_mode: &'static str,
}

/// GET /health
///
/// Degraded means the database round-trip failed; the generator's mode is
/// reported but never affects the status.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_ok = match state.pool().acquire().await {
        Ok(pool) => sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&pool)
            .await
            .is_ok(),
        Err(err) => {
            tracing::warn!("health check could not reach database: {}", err);
            false
        }
    };

    Json(HealthResponse {
        status: if db_ok { "ok" } else { "degraded" },
        db: if db_ok { "connected" } else { "unreachable" },
        llm_mode: if state.settings().use_llm() {
            "claude_api"
        } else {
            "placeholder"
        },
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SharedPool;
    use citycontext_core::Settings;
    use citycontext_llm::generator_for;

    #[tokio::test]
    async fn unreachable_database_reports_degraded() {
        let settings = Settings::default();
        let generator = generator_for(&settings);
        let state = AppState::new(
            SharedPool::new("postgres://nobody@localhost:1/none"),
            settings,
            generator,
        );

        let Json(body) = health(State(state)).await;
        assert_eq!(body.status, "degraded");
        assert_eq!(body.db, "unreachable");
        assert_eq!(body.llm_mode, "placeholder");
    }
}
