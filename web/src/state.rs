//! Application state for Axum handlers.

use std::sync::Arc;

use pgpal_runtime::{DuesRunner, TenancyLifecycle};

/// Application state shared across all HTTP handlers.
///
/// Cheap to clone; everything inside is shared.
#[derive(Clone)]
pub struct AppState {
    /// Tenancy lifecycle operations
    pub lifecycle: TenancyLifecycle,
    /// Dues runner shared with the daily schedule
    pub runner: Arc<DuesRunner>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(lifecycle: TenancyLifecycle, runner: Arc<DuesRunner>) -> Self {
        Self { lifecycle, runner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone() {
        // Axum requires Clone state
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<AppState>();
    }
}
