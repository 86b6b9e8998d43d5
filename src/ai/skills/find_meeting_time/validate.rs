//! Checks a candidate request against the required fields tree.
//!
//! Checks run in a fixed order and all of them run, so a single turn
//! can report several gaps at once.

use anyhow::Result;
use tracing::debug;

use super::attendees::{AttendeeResolver, Host, ensure_host};
use super::models::{AttendeeDraft, MeetingRequest, Populated};
use super::required_fields::{Field, MissingFields, RequiredFieldsSpec};

#[derive(Clone, Debug, PartialEq)]
pub struct Validation {
    pub missing: MissingFields,
    /// Attendees with emails plus the host
    pub attendees: Vec<AttendeeDraft>,
    pub host: Host,
}

impl Validation {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

pub struct FieldValidator<'a> {
    spec: &'a RequiredFieldsSpec,
    resolver: AttendeeResolver<'a>,
}

impl<'a> FieldValidator<'a> {
    pub fn new(spec: &'a RequiredFieldsSpec, resolver: AttendeeResolver<'a>) -> Self {
        Self { spec, resolver }
    }

    pub async fn validate(&self, request: &MeetingRequest) -> Result<Validation> {
        let mut missing = MissingFields::default();

        if !request.title.is_populated() {
            missing.required.push(self.spec.requirement(Field::Title));
        }

        if request.attendees.is_empty() {
            missing.required.push(self.spec.requirement(Field::AttendeeName));
        }

        let resolved = self.resolver.resolve_emails(&request.attendees).await?;
        for _ in &resolved.unresolved {
            missing.required.push(self.spec.leaf(Field::AttendeeEmail));
        }

        let host = self.resolver.resolve_host(&resolved.resolved).await?;
        if host.email().is_none() {
            missing.required.push(self.spec.leaf(Field::HostEmail));
        }
        let attendees = ensure_host(resolved.resolved, &host.attendee);

        debug!("Validation found {} missing field(s)", missing.required.len());
        Ok(Validation {
            missing,
            attendees,
            host,
        })
    }
}
