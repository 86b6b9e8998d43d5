//! Everything the skill talks to outside of itself. Production
//! implementations live in `ai::extract`, `core::datetime`, `store`
//! and `google`; tests swap in fakes.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use super::models::{DateTimeExtraction, RequestExtraction};
use crate::core::datetime::{Boundary, DateComponents};
use crate::email::EmailTemplate;
use crate::store::models::{
    Calendar, CalendarIntegration, ChatMeetingPreferences, Contact, MeetingAssist,
    MeetingAssistAttendee, MeetingAssistInvite, User, UserContactInfo,
};

/// A question the assistant asked and the user message that led to it.
#[derive(Clone, Debug, PartialEq)]
pub struct PriorExchange {
    pub user: String,
    pub assistant: String,
}

/// What extraction runs over. `prior` is set when the utterance
/// answers a follow up question.
#[derive(Clone, Debug, PartialEq)]
pub struct UserInput {
    pub utterance: String,
    pub prior: Option<PriorExchange>,
}

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract_request(
        &self,
        input: &UserInput,
        current_time: &str,
    ) -> Result<RequestExtraction>;

    async fn extract_date_time(
        &self,
        input: &UserInput,
        current_time: &str,
        timezone: &str,
    ) -> Result<DateTimeExtraction>;
}

pub trait DateExtrapolator: Send + Sync {
    /// Resolve partial date components to an ISO timestamp. `None`
    /// when there is nothing to resolve.
    fn extrapolate(
        &self,
        current_time: &str,
        timezone: &str,
        components: &DateComponents,
        boundary: Boundary,
    ) -> Result<Option<String>>;
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    /// `pattern` is a SQL `LIKE` pattern, e.g. `%bob%`.
    async fn find_contact_by_name(&self, user_id: &str, pattern: &str) -> Result<Option<Contact>>;
    async fn find_contact_by_email(&self, user_id: &str, email: &str) -> Result<Option<Contact>>;
    async fn list_user_contact_infos(&self, user_id: &str) -> Result<Vec<UserContactInfo>>;
    async fn find_user_contact_infos(&self, emails: &[String]) -> Result<Vec<UserContactInfo>>;
    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn chat_meeting_preferences(&self, user_id: &str) -> Result<ChatMeetingPreferences>;
}

#[async_trait]
pub trait CalendarStore: Send + Sync {
    async fn primary_calendar(&self, user_id: &str) -> Result<Option<Calendar>>;
    async fn calendar_integration(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<CalendarIntegration>>;
}

#[async_trait]
pub trait MeetingAssistStore: Send + Sync {
    async fn upsert_meeting_assist(&self, meeting_assist: &MeetingAssist) -> Result<()>;
    async fn create_host_attendee(&self, attendee: &MeetingAssistAttendee) -> Result<()>;
    async fn upsert_invitees(&self, invitees: &[MeetingAssistInvite]) -> Result<()>;
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, template: EmailTemplate, locals: &Value, recipient: &str)
    -> Result<()>;
}

/// The full set of collaborators a turn needs.
#[derive(Clone)]
pub struct Collaborators {
    pub extractor: Arc<dyn Extractor>,
    pub dates: Arc<dyn DateExtrapolator>,
    pub contacts: Arc<dyn ContactStore>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub calendars: Arc<dyn CalendarStore>,
    pub meeting_assists: Arc<dyn MeetingAssistStore>,
    pub mailer: Arc<dyn Mailer>,
    /// Base URL invitees open to share their availability
    pub handshake_url: String,
}
