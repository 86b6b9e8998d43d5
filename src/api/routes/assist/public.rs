//! Public types for the meeting assist API
use serde::{Deserialize, Serialize};

use crate::ai::skills::find_meeting_time::ConversationState;
use crate::store::models::{MeetingAssist, MeetingAssistAttendee, MeetingAssistInvite};

#[derive(Deserialize)]
pub struct AssistRequest {
    pub conversation_id: String,
    pub user_id: String,
    pub timezone: String,
    pub message: String,
    // Defaults to now in `timezone`
    pub current_time: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct AssistResponse {
    pub conversation_id: String,
    pub state: ConversationState,
}

#[derive(Serialize, Deserialize)]
pub struct MeetingAssistResponse {
    pub meeting_assist: MeetingAssist,
    pub attendees: Vec<MeetingAssistAttendee>,
    pub invites: Vec<MeetingAssistInvite>,
}
