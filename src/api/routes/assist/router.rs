//! Router for the meeting assist API

use std::sync::{Arc, RwLock};

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use super::public;
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::assist::{TurnRequest, run_turn};
use crate::chat::load_conversation;

type SharedState = Arc<RwLock<AppState>>;

/// Run one turn of the conversation with the user's message
async fn assist_handler(
    State(state): State<SharedState>,
    axum::Json(payload): axum::Json<public::AssistRequest>,
) -> Result<axum::Json<public::AssistResponse>, ApiError> {
    let (db, collaborators) = {
        let shared_state = state.read().expect("Unable to read share state");
        (shared_state.db.clone(), shared_state.collaborators.clone())
    };
    let request = TurnRequest {
        conversation_id: payload.conversation_id,
        user_id: payload.user_id,
        timezone: payload.timezone,
        message: payload.message,
        current_time: payload.current_time,
    };
    let next = run_turn(&db, &collaborators, &request).await?;

    Ok(axum::Json(public::AssistResponse {
        conversation_id: request.conversation_id,
        state: next,
    }))
}

/// Get the stored state of a conversation
async fn conversation(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.read().expect("Unable to read share state").db.clone();
    let conversation = load_conversation(&db, &id).await?;

    if conversation.messages.is_empty() {
        return Ok((
            StatusCode::NOT_FOUND,
            format!("Conversation {} not found", id),
        )
            .into_response());
    }

    Ok(axum::Json(public::AssistResponse {
        conversation_id: id,
        state: conversation,
    })
    .into_response())
}

/// Get a meeting assist created by a completed conversation
async fn meeting_assist(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.read().expect("Unable to read share state").store.clone();
    let Some(meeting_assist) = store.find_meeting_assist(&id).await? else {
        return Ok((
            StatusCode::NOT_FOUND,
            format!("Meeting assist {} not found", id),
        )
            .into_response());
    };
    let attendees = store.list_attendees(&id).await?;
    let invites = store.list_invites(&id).await?;

    Ok(axum::Json(public::MeetingAssistResponse {
        meeting_assist,
        attendees,
        invites,
    })
    .into_response())
}

/// Create the meeting assist router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(assist_handler))
        .route("/{id}", get(conversation))
        .route("/meetings/{id}", get(meeting_assist))
}
