//! Shared database connection pool with an explicit lifecycle.
//!
//! One pool exists per process. `acquire` creates it lazily; the creation
//! happens while the slot lock is held, so concurrent first callers wait
//! and then observe the single pool the winner created. `close` tears it
//! down so a later `acquire` rebuilds it.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::Mutex;

const MIN_CONNECTIONS: u32 = 2;
const MAX_CONNECTIONS: u32 = 10;

/// Cheaply cloneable handle to the process-wide pool slot.
#[derive(Clone)]
pub struct SharedPool {
    database_url: Arc<str>,
    slot: Arc<Mutex<Option<PgPool>>>,
}

impl SharedPool {
    /// Create the handle without connecting. The pool itself is built on
    /// the first [`acquire`](Self::acquire).
    pub fn new(database_url: &str) -> Self {
        Self {
            database_url: Arc::from(database_url),
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Return the shared pool, creating it on first call.
    ///
    /// A failed connection leaves the slot empty: nothing ever caches a
    /// broken pool, and the next caller retries creation.
    pub async fn acquire(&self) -> Result<PgPool, sqlx::Error> {
        let mut slot = self.slot.lock().await;
        if let Some(pool) = slot.as_ref() {
            return Ok(pool.clone());
        }

        let pool = PgPoolOptions::new()
            .min_connections(MIN_CONNECTIONS)
            .max_connections(MAX_CONNECTIONS)
            .connect(&self.database_url)
            .await?;

        tracing::info!(max_connections = MAX_CONNECTIONS, "database pool created");
        *slot = Some(pool.clone());
        Ok(pool)
    }

    /// Close all connections and clear the slot.
    pub async fn close(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(pool) = slot.take() {
            pool.close().await;
            tracing::info!("database pool closed");
        }
    }
}
