//! Runs one conversation turn of the skill: extract, build, validate,
//! and either ask for what's missing or finalize.

use anyhow::anyhow;
use serde_json::json;
use tracing::{debug, info};

use super::attendees::AttendeeResolver;
use super::error::SkillError;
use super::finalize::Finalizer;
use super::models::{
    ConversationState, DateTimeExtraction, DialogQuery, DialogResponse, MeetingRequest,
    PrevDataExtra, RequestExtraction,
};
use super::ports::{Collaborators, PriorExchange, UserInput};
use super::request::{BuildContext, Turn, build_request, merge_requests};
use super::required_fields::{MissingFields, RequiredFieldsSpec};
use super::validate::FieldValidator;
use crate::ai::prompt::{Prompt, templates};
use crate::openai::{Message, Role};
use crate::store::models::ChatMeetingPreferences;

pub const EVENT_NOT_FOUND_MESSAGE: &str = "Oops... I couldn't find your primary calendar or its Google Calendar connection. Connect a calendar in the app and try again.";

/// Which path a turn takes through the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DialogMode {
    /// A new request
    Pending,
    /// An answer to a missing fields question
    MissingFields,
}

impl DialogMode {
    pub fn from_state(state: &ConversationState) -> Self {
        match state.query {
            Some(DialogQuery::MissingFields) => DialogMode::MissingFields,
            _ => DialogMode::Pending,
        }
    }
}

/// Everything a turn needs besides the collaborators.
#[derive(Clone, Copy, Debug)]
pub struct TurnContext<'a> {
    pub user_id: &'a str,
    pub timezone: &'a str,
    pub current_time: &'a str,
}

/// The assistant message for a missing fields response.
pub fn missing_fields_message(missing: &MissingFields) -> Result<String, SkillError> {
    let message = templates()
        .render(
            &Prompt::MissingFields.to_string(),
            &json!({ "fields": missing.prompts() }),
        )
        .map_err(|e| anyhow!("Failed to render missing fields message: {}", e))?;
    Ok(message)
}

/// Run one turn and return the updated conversation state. Errors
/// other than calendar lookups leave `state` as it was.
pub async fn handle_turn(
    mode: DialogMode,
    ctx: TurnContext<'_>,
    state: &ConversationState,
    collaborators: &Collaborators,
) -> Result<ConversationState, SkillError> {
    let utterance = state
        .last_user_message()
        .ok_or(anyhow!("Conversation has no user message"))?
        .to_string();
    info!("Handling {:?} turn for user {}", mode, ctx.user_id);

    let result = match mode {
        DialogMode::Pending => {
            let input = UserInput {
                utterance,
                prior: None,
            };
            process_pending(ctx, &input, collaborators).await
        }
        DialogMode::MissingFields => {
            let (user, assistant) = state
                .prior_exchange()
                .ok_or(SkillError::MissingPriorExchange)?;
            let input = UserInput {
                utterance,
                prior: Some(PriorExchange { user, assistant }),
            };
            process_missing_fields_returned(ctx, &input, state, collaborators).await
        }
    };

    let response = match result {
        Ok(response) => response,
        Err(e) if e.is_event_not_found() => {
            info!("Calendar not found for user {}: {}", ctx.user_id, e);
            DialogResponse::EventNotFound
        }
        Err(e) => return Err(e),
    };

    apply_response(state, response)
}

fn apply_response(
    state: &ConversationState,
    response: DialogResponse,
) -> Result<ConversationState, SkillError> {
    let mut next = state.clone();
    next.query = Some(response.query());
    match response {
        DialogResponse::MissingFields {
            data,
            prev_data,
            prev_data_extra,
            prev_json_body,
            prev_date_json_body,
        } => {
            let message = missing_fields_message(&data)?;
            next.messages.push(Message::new(Role::Assistant, &message));
            next.required = Some(data);
            next.prev_data = Some(prev_data);
            next.prev_data_extra = Some(prev_data_extra);
            next.prev_json_body = Some(prev_json_body);
            next.prev_date_json_body = Some(prev_date_json_body);
        }
        DialogResponse::Completed { data } => {
            next.messages.push(Message::new(Role::Assistant, &data));
            clear_dialog(&mut next);
        }
        DialogResponse::EventNotFound => {
            next.messages
                .push(Message::new(Role::Assistant, EVENT_NOT_FOUND_MESSAGE));
            clear_dialog(&mut next);
        }
    }
    info!("Turn finished with {:?}", next.query);
    Ok(next)
}

fn clear_dialog(state: &mut ConversationState) {
    state.required = None;
    state.prev_data = None;
    state.prev_data_extra = None;
    state.prev_json_body = None;
    state.prev_date_json_body = None;
}

async fn extract(
    ctx: TurnContext<'_>,
    input: &UserInput,
    collaborators: &Collaborators,
) -> Result<(RequestExtraction, DateTimeExtraction), SkillError> {
    let request = collaborators
        .extractor
        .extract_request(input, ctx.current_time)
        .await?;
    let date_time = collaborators
        .extractor
        .extract_date_time(input, ctx.current_time, ctx.timezone)
        .await?;
    debug!("Extracted request {:?} and dates {:?}", request, date_time);
    Ok((request, date_time))
}

/// Handle a brand new request.
pub async fn process_pending(
    ctx: TurnContext<'_>,
    input: &UserInput,
    collaborators: &Collaborators,
) -> Result<DialogResponse, SkillError> {
    let (request, date_time) = extract(ctx, input, collaborators).await?;
    let preferences = collaborators
        .preferences
        .chat_meeting_preferences(ctx.user_id)
        .await?;
    let built = build_request(
        &[Turn::new(&request, &date_time)],
        &build_context(ctx, &preferences, collaborators),
    )?;

    complete_or_ask(
        ctx,
        built.request,
        built.extra,
        request,
        date_time,
        &preferences,
        collaborators,
    )
    .await
}

/// Handle a reply to a missing fields question. This turn is ranked
/// ahead of the previous one and the result is merged into what was
/// already collected.
pub async fn process_missing_fields_returned(
    ctx: TurnContext<'_>,
    input: &UserInput,
    state: &ConversationState,
    collaborators: &Collaborators,
) -> Result<DialogResponse, SkillError> {
    let (request, date_time) = extract(ctx, input, collaborators).await?;
    let preferences = collaborators
        .preferences
        .chat_meeting_preferences(ctx.user_id)
        .await?;

    let prev_request = state.prev_json_body.clone().unwrap_or_default();
    let prev_date_time = state.prev_date_json_body.clone().unwrap_or_default();
    let turns = [
        Turn::new(&request, &date_time),
        Turn::new(&prev_request, &prev_date_time),
    ];
    let built = build_request(&turns, &build_context(ctx, &preferences, collaborators))?;
    let prev_body = state.prev_data.clone().unwrap_or_default();
    let merged = merge_requests(&prev_body, &built.request);

    complete_or_ask(
        ctx,
        merged,
        built.extra,
        request,
        date_time,
        &preferences,
        collaborators,
    )
    .await
}

fn build_context<'a>(
    ctx: TurnContext<'a>,
    preferences: &'a ChatMeetingPreferences,
    collaborators: &'a Collaborators,
) -> BuildContext<'a> {
    BuildContext {
        user_id: ctx.user_id,
        timezone: ctx.timezone,
        current_time: ctx.current_time,
        preferences,
        dates: collaborators.dates.as_ref(),
    }
}

async fn complete_or_ask(
    ctx: TurnContext<'_>,
    request: MeetingRequest,
    extra: PrevDataExtra,
    request_extraction: RequestExtraction,
    date_time_extraction: DateTimeExtraction,
    preferences: &ChatMeetingPreferences,
    collaborators: &Collaborators,
) -> Result<DialogResponse, SkillError> {
    let spec = RequiredFieldsSpec::find_meeting_time();
    let resolver = AttendeeResolver::new(ctx.user_id, collaborators.contacts.as_ref());
    let validation = FieldValidator::new(&spec, resolver)
        .validate(&request)
        .await?;

    if !validation.is_complete() {
        return Ok(DialogResponse::MissingFields {
            data: validation.missing,
            prev_data: request,
            prev_data_extra: extra,
            prev_json_body: request_extraction,
            prev_date_json_body: date_time_extraction,
        });
    }

    let body = MeetingRequest {
        attendees: validation.attendees,
        ..request
    };
    let data = Finalizer::new(collaborators)
        .finalize(&body, validation.host.user.as_ref(), preferences)
        .await?;
    Ok(DialogResponse::Completed { data })
}
