use anyhow::Result;
use tokio_rusqlite::Connection;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS user (
    id TEXT PRIMARY KEY,
    name TEXT,
    email TEXT
);

CREATE TABLE IF NOT EXISTS user_contact_info (
    id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    name TEXT,
    type TEXT NOT NULL DEFAULT 'email',
    is_primary INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (id, user_id)
);

CREATE TABLE IF NOT EXISTS contact (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    name TEXT,
    first_name TEXT,
    last_name TEXT,
    -- JSON array of {"value": ..., "primary": ...}
    emails TEXT NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS chat_meeting_preference (
    user_id TEXT PRIMARY KEY,
    data TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS calendar (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    title TEXT,
    global_primary INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS calendar_integration (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    client_type TEXT,
    enabled INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS meeting_assist (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    window_start_date TEXT NOT NULL,
    window_end_date TEXT NOT NULL,
    data TEXT NOT NULL,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS meeting_assist_attendee (
    id TEXT PRIMARY KEY,
    meeting_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    name TEXT,
    email TEXT NOT NULL,
    timezone TEXT NOT NULL,
    is_host INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS meeting_assist_invite (
    id TEXT PRIMARY KEY,
    meeting_id TEXT NOT NULL,
    email TEXT,
    data TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS session (
    id TEXT PRIMARY KEY,
    -- Dialog state carried between turns, everything except the messages
    state TEXT NOT NULL DEFAULT '{}',
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS chat_message (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    data TEXT NOT NULL
);
"#;

/// Open (or create) the sqlite database stored in the `db_path`
/// directory.
pub async fn async_db(db_path: &str) -> Result<Connection> {
    std::fs::create_dir_all(db_path)?;
    let path = format!("{}/meeting_assist.db", db_path.trim_end_matches('/'));
    let db = Connection::open(path).await?;
    Ok(db)
}

/// Create all tables. Safe to run repeatedly.
pub fn initialize_db(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)
}

/// Bring an existing database up to date with the current schema.
pub fn migrate_db(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    initialize_db(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn it_initializes_schema_twice() {
        let db = Connection::open_in_memory().await.unwrap();
        let tables = db
            .call(|conn| {
                initialize_db(conn)?;
                migrate_db(conn)?;
                let mut stmt = conn.prepare(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
                )?;
                let count: i64 = stmt.query_row([], |row| row.get(0))?;
                Ok(count)
            })
            .await
            .unwrap();
        assert_eq!(tables, 11);
    }
}
