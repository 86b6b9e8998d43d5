//! Send the meeting assist emails through the Gmail API.

use anyhow::Result;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use handlebars::Handlebars;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::ai::skills::find_meeting_time::ports::Mailer;
use crate::email::{EmailGlobals, EmailTemplate, RenderedEmail, render, templates};
use crate::google::oauth::refresh_access_token;

#[derive(Debug, Deserialize)]
pub struct SentMessage {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
}

/// Build an RFC 2822 multipart message with a plain text and an HTML
/// alternative.
pub fn mime_message(from: &str, to: &str, email: &RenderedEmail) -> String {
    let boundary = format!("meeting-assist-{}", uuid::Uuid::new_v4().simple());
    format!(
        "From: {from}\r\n\
         To: {to}\r\n\
         Subject: {subject}\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n\
         \r\n\
         --{boundary}\r\n\
         Content-Type: text/plain; charset=\"UTF-8\"\r\n\
         \r\n\
         {text}\r\n\
         --{boundary}\r\n\
         Content-Type: text/html; charset=\"UTF-8\"\r\n\
         \r\n\
         {html}\r\n\
         --{boundary}--\r\n",
        subject = email.subject,
        text = email.text,
        html = email.html,
    )
}

/// Send a raw message as the authenticated user
pub async fn send_message(
    gmail_hostname: &str,
    access_token: &str,
    raw_message: &str,
) -> Result<SentMessage> {
    let url = format!(
        "{}/gmail/v1/users/me/messages/send",
        gmail_hostname.trim_end_matches('/')
    );
    let payload = json!({ "raw": URL_SAFE.encode(raw_message.as_bytes()) });
    let res = Client::new()
        .post(&url)
        .bearer_auth(access_token)
        .json(&payload)
        .send()
        .await?;
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        anyhow::bail!("Send failed: {} ({})", status, text);
    }
    let sent: SentMessage = serde_json::from_str(&text)?;
    Ok(sent)
}

pub struct GmailMailer {
    gmail_hostname: String,
    oauth_hostname: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    sender: String,
    globals: EmailGlobals,
    registry: Handlebars<'static>,
}

impl GmailMailer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gmail_hostname: &str,
        oauth_hostname: &str,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
        sender: &str,
        globals: EmailGlobals,
    ) -> Self {
        Self {
            gmail_hostname: gmail_hostname.to_string(),
            oauth_hostname: oauth_hostname.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            refresh_token: refresh_token.to_string(),
            sender: sender.to_string(),
            globals,
            registry: templates(),
        }
    }
}

#[async_trait]
impl Mailer for GmailMailer {
    async fn send_email(
        &self,
        template: EmailTemplate,
        locals: &Value,
        recipient: &str,
    ) -> Result<()> {
        let email = render(&self.registry, &self.globals, template, locals)?;
        let oauth = refresh_access_token(
            &self.oauth_hostname,
            &self.client_id,
            &self.client_secret,
            &self.refresh_token,
        )
        .await?;
        let raw = mime_message(&self.sender, recipient, &email);
        let sent = send_message(&self.gmail_hostname, &oauth.access_token, &raw).await?;
        tracing::info!("Sent {} email to {} ({})", template, recipient, sent.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn globals() -> EmailGlobals {
        EmailGlobals {
            locale: "en".to_string(),
            client_url: "https://example.com".to_string(),
        }
    }

    #[test]
    fn test_mime_message() {
        let email = RenderedEmail {
            subject: "Hello".to_string(),
            html: "<p>Hi</p>".to_string(),
            text: "Hi".to_string(),
        };
        let actual = mime_message("noreply@example.com", "bob@example.com", &email);
        assert!(actual.starts_with("From: noreply@example.com\r\nTo: bob@example.com\r\nSubject: Hello\r\n"));
        assert!(actual.contains("Content-Type: text/html; charset=\"UTF-8\"\r\n\r\n<p>Hi</p>"));
        assert!(actual.trim_end().ends_with("--"));
    }

    #[tokio::test]
    async fn test_send_email() {
        let mut server = mockito::Server::new_async().await;
        let token_mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "access_456"}"#)
            .create_async()
            .await;
        let send_mock = server
            .mock("POST", "/gmail/v1/users/me/messages/send")
            .match_header("authorization", "Bearer access_456")
            .match_body(Matcher::Regex(r#""raw":""#.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "msg_001", "threadId": "thr_001"}"#)
            .create_async()
            .await;

        let mailer = GmailMailer::new(
            &server.url(),
            &server.url(),
            "client",
            "secret",
            "refresh",
            "noreply@example.com",
            globals(),
        );
        let locals = json!({
            "name": "Bob",
            "hostName": "Me",
            "hostEmail": "me@example.com",
            "link": "https://h.example.com?meetingId=m1",
            "displayName": "Bob",
            "email": "bob@example.com"
        });
        mailer
            .send_email(EmailTemplate::BulkMeetingInvite, &locals, "bob@example.com")
            .await
            .unwrap();
        token_mock.assert_async().await;
        send_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_message_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/gmail/v1/users/me/messages/send")
            .with_status(401)
            .with_body(r#"{"error": {"message": "Unauthorized"}}"#)
            .create_async()
            .await;

        let result = send_message(&server.url(), "bad_token", "From: a\r\n").await;
        assert!(result.is_err());
    }
}
