//! Records read from and written to the store.

use serde::{Deserialize, Serialize};

use crate::ai::skills::find_meeting_time::models::{BufferTime, Frequency, Transparency, Visibility};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactEmail {
    pub value: String,
    pub primary: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub user_id: String,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub emails: Vec<ContactEmail>,
}

impl Contact {
    /// The flagged primary email, else the first one on file.
    pub fn preferred_email(&self) -> Option<&str> {
        let non_empty = |e: &&ContactEmail| !e.value.trim().is_empty();
        self.emails
            .iter()
            .filter(non_empty)
            .find(|e| e.primary)
            .or_else(|| self.emails.iter().find(non_empty))
            .map(|e| e.value.trim())
    }

    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return Some(name.to_string());
        }
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.trim().is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// One way of reaching a registered user. For email entries `id` is
/// the address itself.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserContactInfo {
    pub id: String,
    pub user_id: String,
    pub name: Option<String>,
    pub r#type: String,
    pub primary: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Defaults applied to meetings the user schedules through chat.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatMeetingPreferences {
    pub duration: Option<i64>,
    pub conference_app: Option<String>,
    pub buffer_time: Option<BufferTime>,
    pub reminders: Vec<i64>,
    pub send_updates: Option<String>,
    pub guests_can_invite_others: bool,
    pub transparency: Option<Transparency>,
    pub visibility: Option<Visibility>,
    pub anyone_can_add_self: bool,
    pub guests_can_see_other_guests: bool,
}

impl Default for ChatMeetingPreferences {
    fn default() -> Self {
        Self {
            duration: None,
            conference_app: None,
            buffer_time: None,
            reminders: vec![],
            send_updates: Some(String::from("all")),
            guests_can_invite_others: true,
            transparency: Some(Transparency::Opaque),
            visibility: Some(Visibility::Default),
            anyone_can_add_self: false,
            guests_can_see_other_guests: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Calendar {
    pub id: String,
    pub user_id: String,
    pub title: Option<String>,
    pub global_primary: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CalendarIntegration {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub client_type: Option<String>,
    pub enabled: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub title: String,
}

/// The availability-polling meeting created once a request is
/// complete.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeetingAssist {
    pub id: String,
    pub user_id: String,
    pub summary: Option<String>,
    pub notes: Option<String>,
    pub window_start_date: String,
    pub window_end_date: String,
    pub timezone: String,
    pub location: Location,
    pub priority: i64,
    pub enable_conference: bool,
    pub conference_app: Option<String>,
    pub send_updates: Option<String>,
    pub guests_can_invite_others: bool,
    pub transparency: Option<Transparency>,
    pub visibility: Option<Visibility>,
    pub created_date: String,
    pub updated_at: String,
    pub use_default_alarms: bool,
    pub reminders: Vec<i64>,
    pub cancel_if_any_refuse: bool,
    pub enable_attendee_preferences: bool,
    pub attendee_can_modify: bool,
    pub expire_date: String,
    pub duration: Option<i64>,
    pub calendar_id: String,
    pub buffer_time: Option<BufferTime>,
    pub anyone_can_add_self: bool,
    pub guests_can_see_other_guests: bool,
    pub min_threshold_count: i64,
    pub guarantee_availability: bool,
    pub attendee_responded_count: i64,
    pub attendee_count: i64,
    pub cancelled: bool,
    pub frequency: Option<Frequency>,
    pub interval: Option<i64>,
    pub until: Option<String>,
    pub original_meeting_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeetingAssistAttendee {
    pub id: String,
    pub meeting_id: String,
    pub user_id: String,
    pub name: Option<String>,
    pub email: String,
    pub timezone: String,
    pub is_host: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeetingAssistInvite {
    pub id: String,
    pub host_id: String,
    pub host_name: Option<String>,
    pub user_id: String,
    pub name: Option<String>,
    pub contact_id: Option<String>,
    pub email: Option<String>,
    pub meeting_id: String,
    pub created_date: String,
    pub updated_at: String,
}
