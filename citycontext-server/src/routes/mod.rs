//! Route handlers for the `/api` surface.

pub mod buildings;
pub mod features;
pub mod health;
pub mod query;

use axum::Router;

use crate::state::AppState;

/// All API routes, nested under `/api` by the caller.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(query::router())
        .merge(buildings::router())
        .merge(features::router())
}
