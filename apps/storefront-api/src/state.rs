//! Shared handler state.

use std::sync::Arc;

use emporium_db::Database;

use crate::collaborators::Collaborators;
use crate::config::AppConfig;
use crate::service::Storefront;

/// Cloned into every handler; all clones share one service.
#[derive(Clone)]
pub struct AppState {
    pub storefront: Arc<Storefront>,
}

impl AppState {
    /// State with the default collaborator set for `db`.
    pub fn new(db: Database, config: &AppConfig) -> Self {
        let collaborators = Collaborators::sqlite(&db);
        AppState::with_collaborators(db, collaborators, config)
    }

    pub fn with_collaborators(
        db: Database,
        collaborators: Collaborators,
        config: &AppConfig,
    ) -> Self {
        AppState {
            storefront: Arc::new(Storefront::new(db, collaborators, config)),
        }
    }
}
