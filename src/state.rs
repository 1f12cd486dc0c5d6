//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds read-only handles to the identity service and the data store
//! plus the parsed configuration. Nothing authoritative is kept here; the
//! backend owns every row.

use std::sync::Arc;

use crate::backend::{Backends, DataStore, Identity};
use crate::config::AppConfig;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; every field is Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn Identity>,
    pub store: Arc<dyn DataStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(backends: Backends, config: AppConfig) -> Self {
        Self { identity: backends.identity, store: backends.store, config: Arc::new(config) }
    }
}
