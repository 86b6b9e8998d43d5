//! SQLite backed implementations of the skill's stores.

mod calendar;
mod contacts;
mod meeting_assist;
pub mod models;
mod preferences;

use tokio_rusqlite::Connection;

/// Every store the skill needs on top of a single connection.
/// Cloning is cheap, all clones share the same background thread.
#[derive(Clone)]
pub struct SqliteStore {
    db: Connection,
}

impl SqliteStore {
    pub fn new(db: Connection) -> Self {
        Self { db }
    }
}
