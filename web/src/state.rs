//! Application state shared across HTTP handlers.

use mintpass_core::EventService;
use std::sync::Arc;

/// State handed to every handler: the orchestrator.
#[derive(Clone)]
pub struct AppState {
    /// Event lifecycle orchestrator.
    pub service: Arc<EventService>,
}

impl AppState {
    /// Creates the state.
    #[must_use]
    pub fn new(service: Arc<EventService>) -> Self {
        Self { service }
    }
}
