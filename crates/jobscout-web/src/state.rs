use std::sync::Arc;

use jobscout_core::{Config, ScrapeQueue};
use jobscout_store::SqliteStore;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub store: Arc<SqliteStore>,
    pub queue: ScrapeQueue,
    /// Supplies the default location and the upload directory.
    pub config: Config,
}
