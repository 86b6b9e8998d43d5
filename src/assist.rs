//! Wires the find meeting time skill to its production collaborators
//! and runs turns against stored conversations. Shared by the HTTP
//! API and the interactive CLI.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::Utc;
use chrono_tz::Tz;
use tokio_rusqlite::Connection;

use crate::ai::extract::OpenAiExtractor;
use crate::ai::skills::find_meeting_time::ports::Mailer;
use crate::ai::skills::find_meeting_time::{
    Collaborators, ConversationState, DialogMode, TurnContext, handle_turn,
};
use crate::chat::{load_conversation, save_conversation};
use crate::core::AppConfig;
use crate::core::datetime::CalendarMath;
use crate::email::{EmailGlobals, LogMailer};
use crate::google::gmail::GmailMailer;
use crate::openai::{Message, Role};
use crate::store::SqliteStore;

/// Production collaborators backed by the database and config.
pub fn collaborators(db: &Connection, config: &AppConfig) -> Collaborators {
    let store = Arc::new(SqliteStore::new(db.clone()));
    let globals = EmailGlobals::from_config(config);
    let mailer: Arc<dyn Mailer> = match config.gmail_credentials() {
        Some((client_id, client_secret, refresh_token)) => Arc::new(GmailMailer::new(
            &config.gmail_api_hostname,
            &config.google_oauth_hostname,
            &client_id,
            &client_secret,
            &refresh_token,
            &config.sender_email,
            globals,
        )),
        None => {
            tracing::warn!("Gmail credentials not set, emails will be logged instead of sent");
            Arc::new(LogMailer::new(globals))
        }
    };

    Collaborators {
        extractor: Arc::new(OpenAiExtractor::new(
            &config.openai_api_hostname,
            &config.openai_api_key,
            &config.openai_model,
        )),
        dates: Arc::new(CalendarMath),
        contacts: store.clone(),
        preferences: store.clone(),
        calendars: store.clone(),
        meeting_assists: store,
        mailer,
        handshake_url: config.handshake_url.clone(),
    }
}

/// The current time in `timezone` as an RFC 3339 timestamp.
pub fn current_time_in(timezone: &str) -> Result<String> {
    let tz: Tz = timezone
        .parse()
        .map_err(|e| anyhow!("Invalid timezone {}: {}", timezone, e))?;
    Ok(Utc::now().with_timezone(&tz).to_rfc3339())
}

#[derive(Clone, Debug)]
pub struct TurnRequest {
    pub conversation_id: String,
    pub user_id: String,
    pub timezone: String,
    pub message: String,
    pub current_time: Option<String>,
}

/// Append the user's message to the conversation, run one turn and
/// store the result. Nothing is stored when the turn fails.
pub async fn run_turn(
    db: &Connection,
    collaborators: &Collaborators,
    request: &TurnRequest,
) -> Result<ConversationState> {
    let current_time = match &request.current_time {
        Some(t) => t.clone(),
        None => current_time_in(&request.timezone)?,
    };
    let mut state = load_conversation(db, &request.conversation_id).await?;
    let stored_messages = state.messages.len();
    state
        .messages
        .push(Message::new(Role::User, &request.message));

    let mode = DialogMode::from_state(&state);
    let ctx = TurnContext {
        user_id: &request.user_id,
        timezone: &request.timezone,
        current_time: &current_time,
    };
    let next = handle_turn(mode, ctx, &state, collaborators)
        .await
        .map_err(|e| {
            tracing::error!(
                "Turn failed for conversation {}: {}",
                request.conversation_id,
                e
            );
            anyhow::Error::from(e)
        })?;

    save_conversation(db, &request.conversation_id, stored_messages, &next).await?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_formats_current_time_with_offset() {
        let actual = current_time_in("Asia/Tokyo").unwrap();
        assert!(actual.ends_with("+09:00"));
        assert!(current_time_in("Mars/Olympus").is_err());
    }
}
