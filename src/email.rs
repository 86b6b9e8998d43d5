//! Email templates sent by the meeting assist flow. Rendered with
//! Handlebars the same way prompts are so recipient names and titles
//! coming out of extraction are escaped.

use std::fmt;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use handlebars::Handlebars;
use serde_json::Value;

use crate::ai::skills::find_meeting_time::ports::Mailer;
use crate::core::AppConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmailTemplate {
    MeetingInviteDetailsToHost,
    BulkMeetingInvite,
}

impl EmailTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            EmailTemplate::MeetingInviteDetailsToHost => "meeting-invite-details-to-host",
            EmailTemplate::BulkMeetingInvite => "bulk-meeting-invite",
        }
    }

    fn part(&self, part: &str) -> String {
        format!("{}.{}", self.name(), part)
    }
}

impl fmt::Display for EmailTemplate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

const HOST_SUBJECT: &str = "Availability requested for {{title}}";

const HOST_HTML: &str = r#"<p>Hi {{hostName}},</p>
<p>We emailed your invitees to collect their availability for <strong>{{title}}</strong> between {{windowStartDate}} and {{windowEndDate}}.</p>
{{#if notes}}<p>{{notes}}</p>{{/if}}
{{#each attendees}}<p><a href="mailto:{{email}}">{{#if name}}{{name}}{{else}}{{email}}{{/if}}</a> - <a href="{{link}}">link</a></p>
{{/each}}
<p><a href="{{clientUrl}}">Open Atomic</a></p>
"#;

const HOST_TEXT: &str = r#"Hi {{hostName}},

We emailed your invitees to collect their availability for {{title}} between {{windowStartDate}} and {{windowEndDate}}.

{{#each attendees}}{{name}} ({{email}}) - {{link}}
{{/each}}
"#;

const INVITE_SUBJECT: &str = "{{hostName}} wants to find a time to meet";

const INVITE_HTML: &str = r#"<p>Hi {{#if name}}{{name}}{{else}}there{{/if}},</p>
<p>{{hostName}} ({{hostEmail}}) is looking for a time to meet. Share your availability and time preferences here:</p>
<p><a href="{{link}}">{{link}}</a></p>
"#;

const INVITE_TEXT: &str = r#"Hi {{#if name}}{{name}}{{else}}there{{/if}},

{{hostName}} ({{hostEmail}}) is looking for a time to meet. Share your availability and time preferences here:

{{link}}
"#;

pub fn templates<'a>() -> Handlebars<'a> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    let parts = [
        (EmailTemplate::MeetingInviteDetailsToHost, HOST_SUBJECT, HOST_HTML, HOST_TEXT),
        (EmailTemplate::BulkMeetingInvite, INVITE_SUBJECT, INVITE_HTML, INVITE_TEXT),
    ];
    for (template, subject, html, text) in parts {
        registry
            .register_template_string(&template.part("subject"), subject)
            .expect("Failed to register template");
        registry
            .register_template_string(&template.part("html"), html)
            .expect("Failed to register template");
        registry
            .register_template_string(&template.part("text"), text)
            .expect("Failed to register template");
    }
    registry
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Values every template can reference.
#[derive(Clone, Debug, PartialEq)]
pub struct EmailGlobals {
    pub locale: String,
    pub client_url: String,
}

impl EmailGlobals {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            locale: config.locale.clone(),
            client_url: config.client_url.clone(),
        }
    }

    fn apply(&self, locals: &Value) -> Result<Value> {
        let mut merged = locals.clone();
        let obj = merged
            .as_object_mut()
            .ok_or(anyhow!("Email locals must be an object, got {}", locals))?;
        obj.entry("locale")
            .or_insert_with(|| Value::from(self.locale.clone()));
        obj.entry("clientUrl")
            .or_insert_with(|| Value::from(self.client_url.clone()));
        Ok(merged)
    }
}

pub fn render(
    registry: &Handlebars,
    globals: &EmailGlobals,
    template: EmailTemplate,
    locals: &Value,
) -> Result<RenderedEmail> {
    let data = globals.apply(locals)?;
    Ok(RenderedEmail {
        subject: registry.render(&template.part("subject"), &data)?,
        html: registry.render(&template.part("html"), &data)?,
        text: registry.render(&template.part("text"), &data)?,
    })
}

/// Renders emails and writes them to the log instead of sending them.
/// Used when no email credentials are configured.
pub struct LogMailer {
    registry: Handlebars<'static>,
    globals: EmailGlobals,
}

impl LogMailer {
    pub fn new(globals: EmailGlobals) -> Self {
        Self {
            registry: templates(),
            globals,
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_email(
        &self,
        template: EmailTemplate,
        locals: &Value,
        recipient: &str,
    ) -> Result<()> {
        let email = render(&self.registry, &self.globals, template, locals)?;
        tracing::info!(
            "Not sending {} email to {}: {}\n{}",
            template,
            recipient,
            email.subject,
            email.text
        );
        Ok(())
    }
}
