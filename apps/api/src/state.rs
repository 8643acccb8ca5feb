use std::sync::Arc;

use crate::catalog::FieldCatalog;
use crate::config::Config;
use crate::store::DocumentStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable session document store. Production: Redis. Tests: in-memory.
    pub store: Arc<dyn DocumentStore>,
    /// Static question catalog; threaded explicitly into every engine call.
    pub catalog: Arc<FieldCatalog>,
    /// Kept for handlers that need deployment settings; currently only main reads it.
    #[allow(dead_code)]
    pub config: Config,
}
