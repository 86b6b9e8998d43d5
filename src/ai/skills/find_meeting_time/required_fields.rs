//! Declarative tree of the fields the skill needs before it can send
//! invites. The tree is what gets stored as `required` on the
//! conversation and what the missing fields prompt is rendered from.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "attendees[].name")]
    AttendeeName,
    #[serde(rename = "attendees[].host.email")]
    HostEmail,
    #[serde(rename = "attendees[].email")]
    AttendeeEmail,
    #[serde(rename = "duration")]
    Duration,
    #[serde(rename = "windowStartDate")]
    WindowStartDate,
    #[serde(rename = "windowEndDate")]
    WindowEndDate,
    #[serde(rename = "description")]
    Description,
    #[serde(rename = "conferenceApp")]
    ConferenceApp,
    #[serde(rename = "bufferTime")]
    BufferTime,
    #[serde(rename = "reminders")]
    Reminders,
    #[serde(rename = "priority")]
    Priority,
    #[serde(rename = "timePreferences")]
    TimePreferences,
    #[serde(rename = "location")]
    Location,
    #[serde(rename = "recur")]
    Recur,
}

impl Field {
    /// What to ask the user for when this field is missing.
    pub fn prompt(&self) -> &'static str {
        match self {
            Field::Title => "a title for the meeting",
            Field::AttendeeName => "who should be invited",
            Field::HostEmail => "your email address as the host",
            Field::AttendeeEmail => "an email address for each invitee",
            Field::Duration => "how long the meeting should be",
            Field::WindowStartDate => "the earliest date the meeting can happen",
            Field::WindowEndDate => "the latest date the meeting can happen",
            Field::Description => "a description",
            Field::ConferenceApp => "a conference app",
            Field::BufferTime => "buffer time before or after the meeting",
            Field::Reminders => "reminders",
            Field::Priority => "a priority",
            Field::TimePreferences => "preferred times",
            Field::Location => "a location",
            Field::Recur => "how often the meeting repeats",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    Chat,
    DateTime,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequiredField {
    Leaf {
        value: Field,
        r#type: FieldKind,
    },
    AllOf {
        and: Vec<RequiredField>,
    },
    OneOf {
        #[serde(rename = "oneOf")]
        one_of: Vec<RequiredField>,
    },
}

impl RequiredField {
    pub fn chat(value: Field) -> Self {
        RequiredField::Leaf {
            value,
            r#type: FieldKind::Chat,
        }
    }

    pub fn date_time(value: Field) -> Self {
        RequiredField::Leaf {
            value,
            r#type: FieldKind::DateTime,
        }
    }

    /// Leaf fields in depth first order.
    pub fn leaves(&self) -> Vec<Field> {
        match self {
            RequiredField::Leaf { value, .. } => vec![*value],
            RequiredField::AllOf { and: children } | RequiredField::OneOf { one_of: children } => {
                children.iter().flat_map(|c| c.leaves()).collect()
            }
        }
    }

    pub fn find(&self, field: Field) -> Option<&RequiredField> {
        match self {
            RequiredField::Leaf { value, .. } if *value == field => Some(self),
            RequiredField::Leaf { .. } => None,
            RequiredField::AllOf { and: children } | RequiredField::OneOf { one_of: children } => {
                children.iter().find_map(|c| c.find(field))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequiredFieldsSpec {
    pub required: Vec<RequiredField>,
    pub optional: Vec<RequiredField>,
}

impl RequiredFieldsSpec {
    pub fn find_meeting_time() -> Self {
        Self {
            required: vec![
                RequiredField::chat(Field::Title),
                RequiredField::AllOf {
                    and: vec![
                        RequiredField::chat(Field::AttendeeName),
                        RequiredField::chat(Field::HostEmail),
                        RequiredField::chat(Field::AttendeeEmail),
                    ],
                },
            ],
            optional: vec![
                RequiredField::chat(Field::Duration),
                RequiredField::date_time(Field::WindowStartDate),
                RequiredField::date_time(Field::WindowEndDate),
                RequiredField::chat(Field::Description),
                RequiredField::chat(Field::ConferenceApp),
                RequiredField::chat(Field::BufferTime),
                RequiredField::chat(Field::Reminders),
                RequiredField::chat(Field::Priority),
                RequiredField::date_time(Field::TimePreferences),
                RequiredField::chat(Field::Location),
                RequiredField::date_time(Field::Recur),
            ],
        }
    }

    /// The leaf describing `field`, or a bare chat leaf when the tree
    /// doesn't mention it.
    pub fn leaf(&self, field: Field) -> RequiredField {
        self.required
            .iter()
            .chain(self.optional.iter())
            .find_map(|r| r.find(field))
            .cloned()
            .unwrap_or_else(|| RequiredField::chat(field))
    }

    /// The top level requirement that `field` belongs to.
    pub fn requirement(&self, field: Field) -> RequiredField {
        self.required
            .iter()
            .chain(self.optional.iter())
            .find(|r| r.find(field).is_some())
            .cloned()
            .unwrap_or_else(|| RequiredField::chat(field))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DateTimeFields {
    pub required: Vec<RequiredField>,
}

/// What a turn found missing, in the order the checks ran.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingFields {
    pub required: Vec<RequiredField>,
    #[serde(default)]
    pub date_time: DateTimeFields,
}

impl MissingFields {
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.date_time.required.is_empty()
    }

    /// Prompts for every missing leaf, first occurrence wins.
    pub fn prompts(&self) -> Vec<&'static str> {
        let mut fields: Vec<Field> = Vec::new();
        for requirement in self.required.iter().chain(self.date_time.required.iter()) {
            for field in requirement.leaves() {
                if !fields.contains(&field) {
                    fields.push(field);
                }
            }
        }
        fields.iter().map(|f| f.prompt()).collect()
    }
}
