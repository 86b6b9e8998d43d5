use tokio_rusqlite::Connection;

use crate::ai::skills::find_meeting_time::Collaborators;
use crate::assist::collaborators;
use crate::core::AppConfig;
use crate::store::SqliteStore;

pub struct AppState {
    pub db: Connection,
    pub config: AppConfig,
    pub store: SqliteStore,
    pub collaborators: Collaborators,
}

impl AppState {
    pub fn new(db: Connection, config: AppConfig) -> Self {
        let collaborators = collaborators(&db, &config);
        Self::with_collaborators(db, config, collaborators)
    }

    /// State with collaborators other than the production ones.
    pub fn with_collaborators(db: Connection, config: AppConfig, collaborators: Collaborators) -> Self {
        Self {
            store: SqliteStore::new(db.clone()),
            db,
            config,
            collaborators,
        }
    }
}
