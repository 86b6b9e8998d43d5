//! Fills in attendee emails from the user's contacts and works out who
//! the host is.

use anyhow::Result;
use tracing::debug;

use super::models::AttendeeDraft;
use super::ports::ContactStore;
use crate::store::models::User;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedAttendees {
    /// Attendees that have an email, in their original order
    pub resolved: Vec<AttendeeDraft>,
    /// Attendees no email could be found for
    pub unresolved: Vec<AttendeeDraft>,
}

/// The host and the user record it may have been built from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Host {
    pub attendee: AttendeeDraft,
    pub user: Option<User>,
}

impl Host {
    pub fn email(&self) -> Option<&str> {
        self.attendee.email()
    }
}

pub struct AttendeeResolver<'a> {
    user_id: &'a str,
    contacts: &'a dyn ContactStore,
}

impl<'a> AttendeeResolver<'a> {
    pub fn new(user_id: &'a str, contacts: &'a dyn ContactStore) -> Self {
        Self { user_id, contacts }
    }

    /// Look up an email for every attendee that doesn't have one by
    /// matching their name against the user's contacts.
    pub async fn resolve_emails(&self, attendees: &[AttendeeDraft]) -> Result<ResolvedAttendees> {
        let mut out = ResolvedAttendees::default();
        for attendee in attendees {
            if attendee.email().is_some() {
                out.resolved.push(attendee.clone());
                continue;
            }
            let found = match attendee.name() {
                Some(name) => {
                    let pattern = format!("%{}%", name);
                    self.contacts
                        .find_contact_by_name(self.user_id, &pattern)
                        .await?
                }
                None => None,
            };
            match found.as_ref().and_then(|c| c.preferred_email()) {
                Some(email) => {
                    debug!("Resolved {:?} to {}", attendee.name(), email);
                    out.resolved.push(AttendeeDraft {
                        email: Some(email.to_string()),
                        ..attendee.clone()
                    });
                }
                None => {
                    debug!("No email found for attendee {:?}", attendee.name());
                    out.unresolved.push(attendee.clone());
                }
            }
        }
        Ok(out)
    }

    /// Build a host from the user's primary email contact info, falling
    /// back to the user record.
    pub async fn synthesize_host(&self) -> Result<Host> {
        let infos = self.contacts.list_user_contact_infos(self.user_id).await?;
        let primary = infos.into_iter().find(|i| i.primary && i.r#type == "email");
        let user = self.contacts.get_user(self.user_id).await?;

        let name = primary
            .as_ref()
            .and_then(|p| p.name.clone())
            .filter(|n| !n.trim().is_empty())
            .or_else(|| user.as_ref().and_then(|u| u.name.clone()));
        let email = primary
            .as_ref()
            .map(|p| p.id.clone())
            .filter(|e| !e.trim().is_empty())
            .or_else(|| user.as_ref().and_then(|u| u.email.clone()));

        Ok(Host {
            attendee: AttendeeDraft {
                name,
                email,
                is_host: true,
            },
            user,
        })
    }

    /// The provided host if there is one, otherwise a synthesized one.
    pub async fn resolve_host(&self, attendees: &[AttendeeDraft]) -> Result<Host> {
        let synthesized = self.synthesize_host().await?;
        match attendees.iter().find(|a| a.is_host && a.email().is_some()) {
            Some(provided) => Ok(Host {
                attendee: provided.clone(),
                user: synthesized.user,
            }),
            None => Ok(synthesized),
        }
    }
}

/// Make `host` the only host in the list, appending it when it isn't
/// already there and has an email.
pub fn ensure_host(attendees: Vec<AttendeeDraft>, host: &AttendeeDraft) -> Vec<AttendeeDraft> {
    let host_email = host.email();
    let mut found = false;
    let mut out: Vec<AttendeeDraft> = attendees
        .into_iter()
        .map(|mut a| {
            let same = match (a.email(), host_email) {
                (Some(a_email), Some(h_email)) => a_email.eq_ignore_ascii_case(h_email),
                _ => false,
            };
            a.is_host = same && !found;
            found |= a.is_host;
            a
        })
        .collect();
    if !found && host_email.is_some() {
        out.push(AttendeeDraft {
            is_host: true,
            ..host.clone()
        });
    }
    out
}
