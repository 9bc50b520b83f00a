//! citycontext-server: HTTP API over the 3D city model database.
//!
//! GeoJSON geometry endpoints for the map frontend plus a natural-language
//! query endpoint backed by an LLM-generated, safety-gated SQL pipeline.

pub mod db;
pub mod http;
pub mod routes;
pub mod state;

use axum::http::Method;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use citycontext_core::Settings;

pub use state::AppState;

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .nest("/api", routes::api_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server.
///
/// Warms the pool up front so a dead database surfaces at startup rather
/// than on the first request. Runs until Ctrl+C, then drains in-flight
/// requests and closes the pool.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let pool = db::SharedPool::new(&settings.database_url);
    pool.acquire().await?;

    let generator = citycontext_llm::generator_for(&settings);

    let addr = settings.bind_addr;
    let state = AppState::new(pool.clone(), settings, generator);
    let app = build_router(state);

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_with_shutdown(listener, app, pool, shutdown_signal()).await
}

/// Run the server until `shutdown` resolves, then close the pool.
async fn serve_with_shutdown(
    listener: tokio::net::TcpListener,
    app: Router,
    pool: db::SharedPool,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    tracing::info!("shutdown signal received, draining");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_runs_the_pool_close_path() {
        let pool = db::SharedPool::new("postgres://nobody@localhost:1/none");
        let settings = Settings::default();
        let generator = citycontext_llm::generator_for(&settings);
        let state = AppState::new(pool.clone(), settings, generator);
        let app = build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (trigger, tripwire) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve_with_shutdown(listener, app, pool, async {
            tripwire.await.ok();
        }));

        trigger.send(()).unwrap();
        // The server must come down on its own and return through the
        // close path rather than running forever.
        tokio::time::timeout(std::time::Duration::from_secs(5), server)
            .await
            .expect("server did not shut down")
            .expect("server task panicked")
            .expect("serve_with_shutdown failed");
    }
}
