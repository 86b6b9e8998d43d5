//! Data carried through a turn of the find meeting time skill: what
//! extraction produced, the candidate request built from it, and the
//! dialog state persisted between turns.

use serde::{Deserialize, Serialize};

use super::required_fields::MissingFields;
use crate::core::datetime::DateComponents;
use crate::openai::{Message, Role};

/// The "is this slot filled" test used by every fallback chain and by
/// the merge of a new request into the previous one.
pub trait Populated {
    fn is_populated(&self) -> bool;
}

impl Populated for String {
    fn is_populated(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl Populated for i64 {
    fn is_populated(&self) -> bool {
        *self != 0
    }
}

impl<T> Populated for Vec<T> {
    fn is_populated(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Populated> Populated for Option<T> {
    fn is_populated(&self) -> bool {
        self.as_ref().is_some_and(|v| v.is_populated())
    }
}

macro_rules! always_populated {
    ($($t:ty),*) => {
        $(impl Populated for $t {
            fn is_populated(&self) -> bool {
                true
            }
        })*
    };
}

always_populated!(
    BufferTime,
    Transparency,
    Visibility,
    Frequency,
    RecurrenceRule
);

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttendeeDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub is_host: bool,
}

impl AttendeeDraft {
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BufferTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_event: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_event: Option<i64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transparency {
    Opaque,
    Transparent,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Default,
    Public,
    Private,
    Confidential,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeRange {
    pub start_time: String,
    pub end_time: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimePreference {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub day_of_week: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_week_day: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_month_day: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// The candidate meeting request. Rebuilt from scratch every turn.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeetingRequest {
    pub user_id: String,
    pub timezone: String,
    pub title: Option<String>,
    pub attendees: Vec<AttendeeDraft>,
    pub method: Option<String>,
    pub duration: Option<i64>,
    pub description: Option<String>,
    pub conference_app: Option<String>,
    pub window_start_date: Option<String>,
    pub window_end_date: Option<String>,
    pub buffer_time: Option<BufferTime>,
    pub reminders: Vec<i64>,
    pub priority: Option<i64>,
    pub time_preferences: Vec<TimePreference>,
    pub location: Option<String>,
    pub transparency: Option<Transparency>,
    pub visibility: Option<Visibility>,
    pub recur: Option<RecurrenceRule>,
}

impl MeetingRequest {
    pub fn host(&self) -> Option<&AttendeeDraft> {
        self.attendees.iter().find(|a| a.is_host)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskItem {
    pub task: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conference {
    pub app: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecurrenceParams {
    pub frequency: Option<Frequency>,
    pub interval: Option<i64>,
    pub end_date: Option<String>,
}

/// Parameters pulled out of the user's request by extraction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestParams {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub task_list: Vec<TaskItem>,
    pub attendees: Vec<AttendeeDraft>,
    pub conference: Option<Conference>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub buffer_time: Option<BufferTime>,
    pub alarms: Vec<i64>,
    pub priority: Option<i64>,
    pub location: Option<String>,
    pub transparency: Option<Transparency>,
    pub visibility: Option<Visibility>,
    pub recurrence: Option<RecurrenceParams>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestExtraction {
    pub params: RequestParams,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecurExtraction {
    pub frequency: Option<Frequency>,
    pub interval: Option<i64>,
    pub by_week_day: Vec<String>,
    pub by_month_day: Vec<i64>,
    pub occurrence: Option<i64>,
    pub end_date: Option<DateComponents>,
}

/// Date and time information pulled out of the user's request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DateTimeExtraction {
    pub find_time_window_start: Option<DateComponents>,
    pub find_time_window_end: Option<DateComponents>,
    pub duration: Option<i64>,
    pub method: Option<String>,
    pub time_preferences: Vec<TimePreference>,
    pub recur: Option<RecurExtraction>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrevDataExtra {
    pub window_start_date: Option<String>,
    pub window_end_date: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogQuery {
    Pending,
    MissingFields,
    Completed,
    EventNotFound,
}

/// Structured result of one pass through the pipeline.
#[derive(Clone, Debug, PartialEq)]
pub enum DialogResponse {
    MissingFields {
        data: MissingFields,
        prev_data: MeetingRequest,
        prev_data_extra: PrevDataExtra,
        prev_json_body: RequestExtraction,
        prev_date_json_body: DateTimeExtraction,
    },
    Completed {
        data: String,
    },
    EventNotFound,
}

impl DialogResponse {
    pub fn query(&self) -> DialogQuery {
        match self {
            DialogResponse::MissingFields { .. } => DialogQuery::MissingFields,
            DialogResponse::Completed { .. } => DialogQuery::Completed,
            DialogResponse::EventNotFound => DialogQuery::EventNotFound,
        }
    }
}

/// Everything the skill remembers about a conversation between turns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub query: Option<DialogQuery>,
    pub required: Option<MissingFields>,
    pub prev_data: Option<MeetingRequest>,
    pub prev_data_extra: Option<PrevDataExtra>,
    pub prev_json_body: Option<RequestExtraction>,
    pub prev_date_json_body: Option<DateTimeExtraction>,
}

impl ConversationState {
    /// The most recent thing the user said.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| *m.role() == Role::User)
            .and_then(|m| m.content.as_deref())
    }

    /// The user message before the latest one and the assistant reply
    /// that followed it, which is the question the latest message
    /// answers.
    pub fn prior_exchange(&self) -> Option<(String, String)> {
        let latest = self.last_user_message()?;
        let mut assistant: Option<&str> = None;
        for message in self.messages.iter().rev() {
            match message.role() {
                Role::Assistant => {
                    if let Some(content) = message.content.as_deref() {
                        assistant = Some(content);
                    }
                }
                Role::User => {
                    let content = message.content.as_deref().unwrap_or_default();
                    if content != latest {
                        return assistant.map(|a| (content.to_string(), a.to_string()));
                    }
                }
                _ => {}
            }
        }
        None
    }
}
