//! Turns a complete request into a meeting assist: persists it with
//! the host and invitees, then emails everyone.

use anyhow::{Context, anyhow};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::SkillError;
use super::models::{AttendeeDraft, MeetingRequest, Populated};
use super::ports::Collaborators;
use crate::core::datetime::{format_in_timezone, shift_days};
use crate::email::EmailTemplate;
use crate::store::models::{
    ChatMeetingPreferences, Location, MeetingAssist, MeetingAssistAttendee, MeetingAssistInvite,
    User, UserContactInfo,
};

pub const GOOGLE_CALENDAR: &str = "google_calendar";

pub const CONFIRMATION: &str = "Successfully sent an email to invitees to get availability and time preferences for finding a meeting time";

/// Link an invitee opens to share their availability.
pub fn invite_link(
    handshake_url: &str,
    meeting_id: &str,
    attendee_id: &str,
    primary_email: Option<&str>,
) -> String {
    let mut link = format!(
        "{}?meetingId={}&attendeeId={}",
        handshake_url,
        urlencoding::encode(meeting_id),
        urlencoding::encode(attendee_id)
    );
    if let Some(email) = primary_email.filter(|e| !e.trim().is_empty()) {
        link.push_str(&format!("&primaryEmail={}", urlencoding::encode(email)));
    }
    link
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InviteRecipient {
    pub name: Option<String>,
    pub email: Option<String>,
    pub link: String,
}

pub struct Finalizer<'a> {
    collaborators: &'a Collaborators,
}

impl<'a> Finalizer<'a> {
    pub fn new(collaborators: &'a Collaborators) -> Self {
        Self { collaborators }
    }

    pub async fn finalize(
        &self,
        request: &MeetingRequest,
        user: Option<&User>,
        preferences: &ChatMeetingPreferences,
    ) -> Result<String, SkillError> {
        let c = self.collaborators;
        let user_id = request.user_id.as_str();

        let calendar = c
            .calendars
            .primary_calendar(user_id)
            .await?
            .filter(|cal| cal.id.is_populated())
            .ok_or_else(|| SkillError::CalendarNotFound(user_id.to_string()))?;
        c.calendars
            .calendar_integration(user_id, GOOGLE_CALENDAR)
            .await?
            .filter(|i| i.client_type.is_populated())
            .ok_or_else(|| SkillError::CalendarIntegrationNotFound(user_id.to_string()))?;

        let host = request
            .host()
            .and_then(|h| h.email().map(|email| (h, email.to_string())))
            .ok_or(anyhow!("Request for user {} has no host email", user_id))?;
        let (host, host_email) = host;
        let host_name = host
            .name()
            .map(|n| n.to_string())
            .or_else(|| user.and_then(|u| u.name.clone()))
            .unwrap_or_default();

        let meeting_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let window_start = request
            .window_start_date
            .clone()
            .ok_or(anyhow!("Request has no window start"))?;
        let window_end = request
            .window_end_date
            .clone()
            .ok_or(anyhow!("Request has no window end"))?;

        let emails: Vec<String> = request
            .attendees
            .iter()
            .filter_map(|a| a.email().map(|e| e.to_string()))
            .collect();
        let contact_infos = c.contacts.find_user_contact_infos(&emails).await?;

        let mut invitees: Vec<MeetingAssistInvite> = vec![];
        for attendee in request.attendees.iter().filter(|a| !a.is_host) {
            invitees.push(
                self.invitee(attendee, user_id, &meeting_id, &host_name, &now, &contact_infos)
                    .await?,
            );
        }

        let meeting_assist = build_meeting_assist(
            request,
            preferences,
            &meeting_id,
            &calendar.id,
            &window_start,
            &window_end,
            &now,
        )?;

        c.meeting_assists
            .upsert_meeting_assist(&meeting_assist)
            .await?;
        c.meeting_assists
            .create_host_attendee(&MeetingAssistAttendee {
                id: Uuid::new_v4().to_string(),
                meeting_id: meeting_id.clone(),
                user_id: user_id.to_string(),
                name: host.name().map(|n| n.to_string()),
                email: host_email.clone(),
                timezone: request.timezone.clone(),
                is_host: true,
            })
            .await?;
        c.meeting_assists.upsert_invitees(&invitees).await?;
        info!(
            "Created meeting assist {} with {} invitee(s)",
            meeting_id,
            invitees.len()
        );

        let recipients: Vec<InviteRecipient> = invitees
            .iter()
            .map(|i| InviteRecipient {
                name: i.name.clone(),
                email: i.email.clone(),
                link: invite_link(&c.handshake_url, &meeting_id, &i.id, i.email.as_deref()),
            })
            .collect();

        let host_locals = json!({
            "hostName": host_name,
            "title": request.title,
            "notes": request.description,
            "windowStartDate": format_in_timezone(&window_start, &request.timezone)?,
            "windowEndDate": format_in_timezone(&window_end, &request.timezone)?,
            "attendees": recipients,
            "displayName": host_name,
            "email": host_email,
        });
        c.mailer
            .send_email(
                EmailTemplate::MeetingInviteDetailsToHost,
                &host_locals,
                &host_email,
            )
            .await
            .context("Failed to send meeting details to host")?;

        for recipient in &recipients {
            let Some(email) = recipient.email.as_deref().filter(|e| !e.is_empty()) else {
                continue;
            };
            let locals = json!({
                "name": recipient.name,
                "hostEmail": host_email,
                "hostName": host_name,
                "link": recipient.link,
                "displayName": recipient.name,
                "email": email,
            });
            c.mailer
                .send_email(EmailTemplate::BulkMeetingInvite, &locals, email)
                .await
                .with_context(|| format!("Failed to send meeting invite to {}", email))?;
            debug!("Sent meeting invite to {}", email);
        }

        Ok(CONFIRMATION.to_string())
    }

    async fn invitee(
        &self,
        attendee: &AttendeeDraft,
        host_id: &str,
        meeting_id: &str,
        host_name: &str,
        now: &str,
        contact_infos: &[UserContactInfo],
    ) -> Result<MeetingAssistInvite, SkillError> {
        let email = attendee.email();
        let contact = match email {
            Some(email) => {
                self.collaborators
                    .contacts
                    .find_contact_by_email(host_id, email)
                    .await?
            }
            None => None,
        };
        // Invitees that aren't registered users get a fresh id
        let user_id = email
            .and_then(|e| contact_infos.iter().find(|i| i.id.eq_ignore_ascii_case(e)))
            .map(|i| i.user_id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(MeetingAssistInvite {
            id: Uuid::new_v4().to_string(),
            host_id: host_id.to_string(),
            host_name: Some(host_name.to_string()).filter(|n| n.is_populated()),
            user_id,
            name: attendee
                .name()
                .map(|n| n.to_string())
                .or_else(|| contact.as_ref().and_then(|c| c.display_name())),
            contact_id: contact.map(|c| c.id),
            email: email.map(|e| e.to_string()),
            meeting_id: meeting_id.to_string(),
            created_date: now.to_string(),
            updated_at: now.to_string(),
        })
    }
}

/// The meeting assist record for a complete request.
pub fn build_meeting_assist(
    request: &MeetingRequest,
    preferences: &ChatMeetingPreferences,
    meeting_id: &str,
    calendar_id: &str,
    window_start: &str,
    window_end: &str,
    now: &str,
) -> anyhow::Result<MeetingAssist> {
    let conference_app = request
        .conference_app
        .clone()
        .filter(|a| a.is_populated())
        .or(preferences.conference_app.clone().filter(|a| a.is_populated()));
    let use_default_alarms =
        !(request.reminders.is_populated() || preferences.reminders.is_populated());
    let reminders = if request.reminders.is_populated() {
        request.reminders.clone()
    } else {
        preferences.reminders.clone()
    };

    Ok(MeetingAssist {
        id: meeting_id.to_string(),
        user_id: request.user_id.clone(),
        summary: request.title.clone(),
        notes: request.description.clone(),
        window_start_date: window_start.to_string(),
        window_end_date: window_end.to_string(),
        timezone: request.timezone.clone(),
        location: Location {
            title: request.location.clone().unwrap_or_default(),
        },
        priority: request.priority.filter(|p| p.is_populated()).unwrap_or(1),
        enable_conference: conference_app.is_some(),
        conference_app,
        send_updates: preferences.send_updates.clone(),
        guests_can_invite_others: preferences.guests_can_invite_others,
        transparency: preferences.transparency,
        visibility: preferences.visibility,
        created_date: now.to_string(),
        updated_at: now.to_string(),
        use_default_alarms,
        reminders,
        cancel_if_any_refuse: false,
        enable_attendee_preferences: true,
        attendee_can_modify: false,
        expire_date: shift_days(window_end, -1)?,
        duration: request.duration,
        calendar_id: calendar_id.to_string(),
        buffer_time: request.buffer_time.clone(),
        anyone_can_add_self: preferences.anyone_can_add_self,
        guests_can_see_other_guests: preferences.guests_can_see_other_guests,
        min_threshold_count: request.attendees.len() as i64,
        guarantee_availability: false,
        attendee_responded_count: 1,
        attendee_count: 1,
        cancelled: false,
        frequency: request.recur.as_ref().map(|r| r.frequency),
        interval: request.recur.as_ref().and_then(|r| r.interval),
        until: request.recur.as_ref().and_then(|r| r.end_date.clone()),
        original_meeting_id: request.recur.as_ref().map(|_| meeting_id.to_string()),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::ai::skills::find_meeting_time::attendees::tests::FakeContacts;
    use crate::ai::skills::find_meeting_time::models::{
        DateTimeExtraction, Frequency, RecurrenceRule, RequestExtraction,
    };
    use crate::ai::skills::find_meeting_time::ports::{
        CalendarStore, Extractor, Mailer, MeetingAssistStore, PreferenceStore, UserInput,
    };
    use crate::core::datetime::CalendarMath;
    use crate::store::models::{Calendar, CalendarIntegration};

    /// Extractor that returns canned results regardless of input.
    #[derive(Default)]
    pub struct FakeExtractor {
        pub request: RequestExtraction,
        pub date_time: DateTimeExtraction,
        pub inputs: Mutex<Vec<UserInput>>,
    }

    #[async_trait]
    impl Extractor for FakeExtractor {
        async fn extract_request(
            &self,
            input: &UserInput,
            _current_time: &str,
        ) -> Result<RequestExtraction> {
            self.inputs.lock().unwrap().push(input.clone());
            Ok(self.request.clone())
        }

        async fn extract_date_time(
            &self,
            _input: &UserInput,
            _current_time: &str,
            _timezone: &str,
        ) -> Result<DateTimeExtraction> {
            Ok(self.date_time.clone())
        }
    }

    #[derive(Default)]
    pub struct FakePreferences(pub ChatMeetingPreferences);

    #[async_trait]
    impl PreferenceStore for FakePreferences {
        async fn chat_meeting_preferences(&self, _user_id: &str) -> Result<ChatMeetingPreferences> {
            Ok(self.0.clone())
        }
    }

    pub struct FakeCalendars {
        pub calendar: Option<Calendar>,
        pub integration: Option<CalendarIntegration>,
    }

    impl Default for FakeCalendars {
        fn default() -> Self {
            Self {
                calendar: Some(Calendar {
                    id: "cal-1".to_string(),
                    user_id: "user-1".to_string(),
                    title: Some("Primary".to_string()),
                    global_primary: true,
                }),
                integration: Some(CalendarIntegration {
                    id: "int-1".to_string(),
                    user_id: "user-1".to_string(),
                    name: GOOGLE_CALENDAR.to_string(),
                    client_type: Some("web".to_string()),
                    enabled: true,
                }),
            }
        }
    }

    #[async_trait]
    impl CalendarStore for FakeCalendars {
        async fn primary_calendar(&self, _user_id: &str) -> Result<Option<Calendar>> {
            Ok(self.calendar.clone())
        }

        async fn calendar_integration(
            &self,
            _user_id: &str,
            _name: &str,
        ) -> Result<Option<CalendarIntegration>> {
            Ok(self.integration.clone())
        }
    }

    #[derive(Default)]
    pub struct FakeMeetingAssists {
        pub meeting_assists: Mutex<Vec<MeetingAssist>>,
        pub hosts: Mutex<Vec<MeetingAssistAttendee>>,
        pub invitees: Mutex<Vec<MeetingAssistInvite>>,
    }

    #[async_trait]
    impl MeetingAssistStore for FakeMeetingAssists {
        async fn upsert_meeting_assist(&self, meeting_assist: &MeetingAssist) -> Result<()> {
            self.meeting_assists
                .lock()
                .unwrap()
                .push(meeting_assist.clone());
            Ok(())
        }

        async fn create_host_attendee(&self, attendee: &MeetingAssistAttendee) -> Result<()> {
            self.hosts.lock().unwrap().push(attendee.clone());
            Ok(())
        }

        async fn upsert_invitees(&self, invitees: &[MeetingAssistInvite]) -> Result<()> {
            self.invitees.lock().unwrap().extend_from_slice(invitees);
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct FakeMailer {
        pub sent: Mutex<Vec<(EmailTemplate, Value, String)>>,
    }

    #[async_trait]
    impl Mailer for FakeMailer {
        async fn send_email(
            &self,
            template: EmailTemplate,
            locals: &Value,
            recipient: &str,
        ) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((template, locals.clone(), recipient.to_string()));
            Ok(())
        }
    }

    /// Handles on every fake so tests can inspect what happened.
    pub struct Fakes {
        pub extractor: Arc<FakeExtractor>,
        pub contacts: Arc<FakeContacts>,
        pub preferences: Arc<FakePreferences>,
        pub calendars: Arc<FakeCalendars>,
        pub meeting_assists: Arc<FakeMeetingAssists>,
        pub mailer: Arc<FakeMailer>,
    }

    impl Fakes {
        pub fn new(extractor: FakeExtractor, contacts: FakeContacts) -> Self {
            Self {
                extractor: Arc::new(extractor),
                contacts: Arc::new(contacts),
                preferences: Arc::new(FakePreferences::default()),
                calendars: Arc::new(FakeCalendars::default()),
                meeting_assists: Arc::new(FakeMeetingAssists::default()),
                mailer: Arc::new(FakeMailer::default()),
            }
        }

        pub fn collaborators(&self) -> Collaborators {
            Collaborators {
                extractor: self.extractor.clone(),
                dates: Arc::new(CalendarMath),
                contacts: self.contacts.clone(),
                preferences: self.preferences.clone(),
                calendars: self.calendars.clone(),
                meeting_assists: self.meeting_assists.clone(),
                mailer: self.mailer.clone(),
                handshake_url: "https://handshake.example.com/v1".to_string(),
            }
        }
    }

    fn complete_request() -> MeetingRequest {
        MeetingRequest {
            user_id: "user-1".to_string(),
            timezone: "America/New_York".to_string(),
            title: Some("Sync".to_string()),
            attendees: vec![
                AttendeeDraft {
                    name: Some("Bob".to_string()),
                    email: Some("bob@example.com".to_string()),
                    is_host: false,
                },
                AttendeeDraft {
                    name: Some("Me".to_string()),
                    email: Some("me@example.com".to_string()),
                    is_host: true,
                },
            ],
            duration: Some(30),
            window_start_date: Some("2024-05-01T12:00:00-04:00".to_string()),
            window_end_date: Some("2024-05-08T12:00:00-04:00".to_string()),
            priority: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn it_encodes_invite_links() {
        assert_eq!(
            invite_link("https://h.example.com", "m 1", "a1", Some("bob+x@example.com")),
            "https://h.example.com?meetingId=m%201&attendeeId=a1&primaryEmail=bob%2Bx%40example.com"
        );
        assert_eq!(
            invite_link("https://h.example.com", "m1", "a1", None),
            "https://h.example.com?meetingId=m1&attendeeId=a1"
        );
    }

    #[test]
    fn it_builds_meeting_assist_defaults() {
        let prefs = ChatMeetingPreferences::default();
        let request = complete_request();
        let actual = build_meeting_assist(
            &request,
            &prefs,
            "m1",
            "cal-1",
            "2024-05-01T12:00:00-04:00",
            "2024-05-08T12:00:00-04:00",
            "2024-05-01T16:00:00+00:00",
        )
        .unwrap();
        assert!(actual.use_default_alarms);
        assert!(!actual.enable_conference);
        assert_eq!(actual.expire_date, "2024-05-07T12:00:00-04:00");
        assert_eq!(actual.min_threshold_count, 2);
        assert_eq!(actual.attendee_count, 1);
        assert_eq!(actual.original_meeting_id, None);
        assert_eq!(actual.summary.as_deref(), Some("Sync"));
    }

    #[test]
    fn it_uses_preference_reminders_and_conference() {
        let prefs = ChatMeetingPreferences {
            reminders: vec![10],
            conference_app: Some("zoom".to_string()),
            ..Default::default()
        };
        let request = MeetingRequest {
            recur: Some(RecurrenceRule {
                frequency: Frequency::Weekly,
                interval: Some(1),
                by_week_day: vec![],
                by_month_day: vec![],
                occurrence: None,
                end_date: Some("2024-07-01T00:00:00-04:00".to_string()),
            }),
            ..complete_request()
        };
        let actual = build_meeting_assist(
            &request,
            &prefs,
            "m1",
            "cal-1",
            "2024-05-01T12:00:00-04:00",
            "2024-05-08T12:00:00-04:00",
            "2024-05-01T16:00:00+00:00",
        )
        .unwrap();
        assert!(!actual.use_default_alarms);
        assert_eq!(actual.reminders, vec![10]);
        assert!(actual.enable_conference);
        assert_eq!(actual.conference_app.as_deref(), Some("zoom"));
        assert_eq!(actual.frequency, Some(Frequency::Weekly));
        assert_eq!(actual.until.as_deref(), Some("2024-07-01T00:00:00-04:00"));
        assert_eq!(actual.original_meeting_id.as_deref(), Some("m1"));
    }

    #[tokio::test]
    async fn it_persists_and_emails_invitees() {
        let fakes = Fakes::new(FakeExtractor::default(), FakeContacts::default());
        let collaborators = fakes.collaborators();
        let request = complete_request();
        let actual = Finalizer::new(&collaborators)
            .finalize(&request, None, &ChatMeetingPreferences::default())
            .await
            .unwrap();
        assert_eq!(actual, CONFIRMATION);

        let stored = fakes.meeting_assists.meeting_assists.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].window_start_date, "2024-05-01T12:00:00-04:00");
        assert_eq!(stored[0].window_end_date, "2024-05-08T12:00:00-04:00");
        assert_eq!(stored[0].calendar_id, "cal-1");

        let hosts = fakes.meeting_assists.hosts.lock().unwrap();
        assert_eq!(hosts[0].email, "me@example.com");
        let invitees = fakes.meeting_assists.invitees.lock().unwrap();
        assert_eq!(invitees.len(), 1);
        assert_eq!(invitees[0].email.as_deref(), Some("bob@example.com"));
        assert_eq!(invitees[0].host_id, "user-1");

        let sent = fakes.mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, EmailTemplate::MeetingInviteDetailsToHost);
        assert_eq!(sent[0].2, "me@example.com");
        assert_eq!(sent[0].1["windowStartDate"], "Wednesday, May 1, 2024 12:00 PM");
        assert_eq!(sent[1].0, EmailTemplate::BulkMeetingInvite);
        assert_eq!(sent[1].2, "bob@example.com");
        let link = sent[1].1["link"].as_str().unwrap();
        assert!(link.starts_with("https://handshake.example.com/v1?meetingId="));
        assert!(link.ends_with("&primaryEmail=bob%40example.com"));
    }

    #[tokio::test]
    async fn it_fails_with_calendar_not_found() {
        let mut fakes = Fakes::new(FakeExtractor::default(), FakeContacts::default());
        fakes.calendars = Arc::new(FakeCalendars {
            calendar: None,
            ..Default::default()
        });
        let collaborators = fakes.collaborators();
        let err = Finalizer::new(&collaborators)
            .finalize(&complete_request(), None, &ChatMeetingPreferences::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SkillError::CalendarNotFound(_)));
        assert!(fakes.meeting_assists.meeting_assists.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn it_requires_integration_client_type() {
        let mut fakes = Fakes::new(FakeExtractor::default(), FakeContacts::default());
        let mut calendars = FakeCalendars::default();
        if let Some(integration) = calendars.integration.as_mut() {
            integration.client_type = None;
        }
        fakes.calendars = Arc::new(calendars);
        let collaborators = fakes.collaborators();
        let err = Finalizer::new(&collaborators)
            .finalize(&complete_request(), None, &ChatMeetingPreferences::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SkillError::CalendarIntegrationNotFound(_)));
    }
}
