//! Reusable prompts using Handlebars for templating. Handlebars adds
//! additional security controls since it can't do much out of the box
//! without registering your own helpers. This is ideal since output
//! from LLMs should be considered untrusted and Handlebars forces you
//! to add only what you need.

use std::fmt;

use handlebars::{Handlebars, handlebars_helper};

// A simple `inc` helper for use with `each` and `@index` so that
// there can be natural number sequences when rendering (instead of
// starting at 0).
handlebars_helper!(inc: |v: i64| format!("{}", v + 1));

#[derive(Debug)]
pub enum Prompt {
    ExtractRequest,
    ExtractDateTime,
    MissingFields,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// Implement the Into trait so that Prompt can be converted to an &str
impl From<Prompt> for String {
    fn from(item: Prompt) -> String {
        format!("{:?}", item)
    }
}

const EXTRACT_REQUEST_PROMPT: &str = r#"
You extract the details of a meeting the user wants to find a time for. The current time is {{current_time}}.

Respond with a single JSON object of the form {"params": {...}} and nothing else. Only include fields the user actually mentioned. Available fields:

- title, summary, description, notes: strings
- taskList: [{"task": string}]
- attendees: [{"name": string, "email": string, "isHost": boolean}]
- conference: {"app": "zoom" | "google" | string}
- startTime, endTime: ISO 8601 timestamps, only if the user gave exact ones
- bufferTime: {"beforeEvent": minutes, "afterEvent": minutes}
- alarms: [minutes before the meeting]
- priority: integer, 1 is the default
- location: string
- transparency: "opaque" | "transparent"
- visibility: "default" | "public" | "private" | "confidential"
- recurrence: {"frequency": "daily" | "weekly" | "monthly" | "yearly", "interval": integer, "endDate": ISO 8601 timestamp}
{{#if prior}}

The user is answering a follow up question. Use the earlier exchange for context but only extract what the latest message adds or changes.

Earlier user message:
{{{prior.user}}}

Assistant question:
{{{prior.assistant}}}
{{/if}}
"#;

const EXTRACT_DATE_TIME_PROMPT: &str = r#"
You extract date and time information for finding a meeting time. The current time is {{current_time}} and the user's timezone is {{timezone}}.

Respond with a single JSON object and nothing else. Only include fields the user actually mentioned. Never compute absolute dates yourself, return the components the user said.

Date components have the shape {"year": int, "month": int, "day": int, "isoWeekday": 1-7, "hour": 0-23, "minute": 0-59, "startTime": "HH:mm", "relativeTimeChangeFromNow": "add" | "subtract", "relativeTimeFromNow": [{"unit": "minute" | "hour" | "day" | "week" | "month" | "year", "value": int}]}.

Available fields:

- findTimeWindowStart: date components for the earliest time to meet
- findTimeWindowEnd: date components for the latest time to meet
- duration: meeting length in minutes
- method: string
- timePreferences: [{"dayOfWeek": [1-7], "timeRange": {"startTime": "HH:mm", "endTime": "HH:mm"}}]
- recur: {"frequency": "daily" | "weekly" | "monthly" | "yearly", "interval": int, "byWeekDay": ["MO", ...], "byMonthDay": [int], "occurrence": int, "endDate": date components}
{{#if prior}}

The user is answering a follow up question. Use the earlier exchange for context but only extract what the latest message adds or changes.

Earlier user message:
{{{prior.user}}}

Assistant question:
{{{prior.assistant}}}
{{/if}}
"#;

const MISSING_FIELDS_MESSAGE: &str = r"I can send out the invites once I have a few more details. Could you tell me:{{#each fields}}
{{inc @index}}. {{{this}}}{{/each}}";

pub fn templates<'a>() -> Handlebars<'a> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry.register_helper("inc", Box::new(inc));
    registry
        .register_template_string(&Prompt::ExtractRequest.to_string(), EXTRACT_REQUEST_PROMPT)
        .expect("Failed to register template");
    registry
        .register_template_string(&Prompt::ExtractDateTime.to_string(), EXTRACT_DATE_TIME_PROMPT)
        .expect("Failed to register template");
    registry
        .register_template_string(&Prompt::MissingFields.to_string(), MISSING_FIELDS_MESSAGE)
        .expect("Failed to register template");
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn it_renders_missing_fields_as_numbered_list() {
        let actual = templates()
            .render(
                &Prompt::MissingFields.to_string(),
                &json!({"fields": ["a title for the meeting", "who should be invited"]}),
            )
            .unwrap();
        assert_eq!(
            actual,
            "I can send out the invites once I have a few more details. Could you tell me:\n1. a title for the meeting\n2. who should be invited"
        );
    }

    #[test]
    fn it_includes_prior_exchange_when_present() {
        let registry = templates();
        let with_prior = registry
            .render(
                &Prompt::ExtractRequest.to_string(),
                &json!({
                    "current_time": "2024-05-01T12:00:00Z",
                    "prior": {"user": "find a time with bob", "assistant": "What's it called?"}
                }),
            )
            .unwrap();
        assert!(with_prior.contains("What's it called?"));

        let without_prior = registry
            .render(
                &Prompt::ExtractDateTime.to_string(),
                &json!({
                    "current_time": "2024-05-01T12:00:00Z",
                    "timezone": "America/New_York",
                    "prior": null
                }),
            )
            .unwrap();
        assert!(!without_prior.contains("Earlier user message"));
        assert!(without_prior.contains("America/New_York"));
    }
}
