//! Application state shared across handlers

use std::sync::Arc;

use citycontext_core::Settings;
use citycontext_llm::SqlGenerator;

use crate::db::SharedPool;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: SharedPool,
    settings: Settings,
    generator: Arc<dyn SqlGenerator>,
}

impl AppState {
    pub fn new(pool: SharedPool, settings: Settings, generator: Arc<dyn SqlGenerator>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pool,
                settings,
                generator,
            }),
        }
    }

    pub fn pool(&self) -> &SharedPool {
        &self.inner.pool
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn generator(&self) -> &dyn SqlGenerator {
        self.inner.generator.as_ref()
    }
}
