use std::sync::Arc;
use tokio::sync::watch;

use super::catalog_controller::{CatalogState, LoadPhase};

/// What a fetch is loading. Only product fetches drive [`LoadPhase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Products,
    Categories,
    Lookup,
}

/// Marks one fetch as in flight for as long as it lives.
///
/// Counting happens inside the watch channel's write lock, so `is_loading`
/// can never be cleared while another fetch is still outstanding.
pub struct LoadingGuard {
    state: Arc<watch::Sender<CatalogState>>,
}

impl LoadingGuard {
    pub fn acquire(state: &Arc<watch::Sender<CatalogState>>, kind: FetchKind) -> Self {
        state.send_modify(|s| {
            s.in_flight += 1;
            s.is_loading = true;
            if kind == FetchKind::Products {
                s.phase = LoadPhase::Loading;
            }
        });
        Self {
            state: Arc::clone(state),
        }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.state.send_modify(|s| {
            s.in_flight = s.in_flight.saturating_sub(1);
            s.is_loading = s.in_flight > 0;
            // A product fetch that ended without applying (aborted, or every
            // pending result was stale) leaves nothing loaded.
            if !s.is_loading && s.phase == LoadPhase::Loading {
                s.phase = LoadPhase::Idle;
            }
        });
    }
}
