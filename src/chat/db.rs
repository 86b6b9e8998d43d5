//! Conversation persistence. Messages are appended to `chat_message`
//! one row each; the rest of the dialog state lives on the session.

use anyhow::{Error, Result};
use rusqlite::OptionalExtension;
use serde_json::json;
use tokio_rusqlite::Connection;

use crate::ai::skills::find_meeting_time::ConversationState;
use crate::openai::Message;

pub async fn insert_chat_message(
    db: &Connection,
    session_id: &str,
    msg: &Message,
) -> Result<usize, Error> {
    let s_id = session_id.to_owned();
    let data = json!(msg).to_string();
    let result = db
        .call(move |conn| {
            let mut stmt =
                conn.prepare("INSERT INTO chat_message (session_id, data) VALUES (?, ?)")?;
            let result = stmt.execute([s_id, data])?;
            Ok(result)
        })
        .await?;

    Ok(result)
}

pub async fn get_or_create_session(db: &Connection, session_id: &str) -> Result<(), Error> {
    let session_id_owned = session_id.to_owned();
    db.call(move |conn| {
        // Insert a new session record if it doesn't already exist
        conn.execute(
            "INSERT OR IGNORE INTO session (id) VALUES (?)",
            [&session_id_owned],
        )?;
        Ok(())
    })
    .await?;

    Ok(())
}

pub async fn find_chat_session_by_id(
    db: &Connection,
    session_id: &str,
) -> Result<Vec<Message>, Error> {
    let s_id = session_id.to_owned();
    let rows: Vec<String> = db
        .call(move |conn| {
            let mut stmt =
                conn.prepare("SELECT data FROM chat_message WHERE session_id=? ORDER BY id")?;
            let rows = stmt
                .query_map([s_id], |i| i.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(rows)
        })
        .await?;
    let history = rows
        .iter()
        .map(|val| serde_json::from_str(val))
        .collect::<Result<Vec<Message>, _>>()?;
    Ok(history)
}

/// Load the full conversation. Unknown sessions come back empty.
pub async fn load_conversation(db: &Connection, session_id: &str) -> Result<ConversationState> {
    let s_id = session_id.to_owned();
    let state: Option<String> = db
        .call(move |conn| {
            let state = conn
                .query_row("SELECT state FROM session WHERE id = ?", [s_id], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(state)
        })
        .await?;
    let mut conversation: ConversationState = match state {
        Some(state) => serde_json::from_str(&state)?,
        None => ConversationState::default(),
    };
    conversation.messages = find_chat_session_by_id(db, session_id).await?;
    Ok(conversation)
}

/// Write messages added since `stored_messages` and replace the
/// session's dialog state.
pub async fn save_conversation(
    db: &Connection,
    session_id: &str,
    stored_messages: usize,
    conversation: &ConversationState,
) -> Result<()> {
    get_or_create_session(db, session_id).await?;
    for msg in conversation.messages.iter().skip(stored_messages) {
        insert_chat_message(db, session_id, msg).await?;
    }
    let state = serde_json::to_string(&ConversationState {
        messages: vec![],
        ..conversation.clone()
    })?;
    let s_id = session_id.to_owned();
    db.call(move |conn| {
        conn.execute("UPDATE session SET state = ? WHERE id = ?", [state, s_id])?;
        Ok(())
    })
    .await?;
    Ok(())
}
