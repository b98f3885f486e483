//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::protocol::WorkspaceView;
use post_planner_core::Planner;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// The planner is the single owner of the workspace, the cache slot and the
/// calendar snapshot; handlers only call its operations.
#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<Planner>,
    pub config: Arc<Config>,
}

impl AppState {
    /// A snapshot of the workspace as the UI should render it.
    pub async fn workspace_view(&self) -> WorkspaceView {
        let workspace = self.planner.workspace().await;
        WorkspaceView::new(&workspace, self.planner.is_busy())
    }
}
