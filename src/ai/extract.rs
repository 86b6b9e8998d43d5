//! Structured extraction over the chat completions API. The model is
//! asked for a JSON object and the response is parsed into the
//! extraction types the skill works with.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use handlebars::Handlebars;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::ai::prompt::{Prompt, templates};
use crate::ai::skills::find_meeting_time::models::{DateTimeExtraction, RequestExtraction};
use crate::ai::skills::find_meeting_time::ports::{Extractor, UserInput};
use crate::openai::{Message, ResponseFormat, Role, completion_content};

pub struct OpenAiExtractor {
    api_hostname: String,
    api_key: String,
    model: String,
    registry: Handlebars<'static>,
}

impl OpenAiExtractor {
    pub fn new(api_hostname: &str, api_key: &str, model: &str) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            registry: templates(),
        }
    }

    async fn extract<T: DeserializeOwned>(
        &self,
        prompt: Prompt,
        data: Value,
        input: &UserInput,
    ) -> Result<T> {
        let system_msg = self
            .registry
            .render(&prompt.to_string(), &data)
            .map_err(|e| anyhow!("Failed to render {} prompt: {}", prompt, e))?;
        let messages = vec![
            Message::new(Role::System, &system_msg),
            Message::new(Role::User, &input.utterance),
        ];
        let content = completion_content(
            &messages,
            ResponseFormat::JsonObject,
            &self.api_hostname,
            &self.api_key,
            &self.model,
        )
        .await?;
        tracing::debug!("{} extraction: {}", prompt, content);
        serde_json::from_str(&content)
            .map_err(|e| anyhow!("Invalid {} response {}: {}", prompt, content, e))
    }
}

// Strict mode requires the key to exist even when there is no prior
// exchange.
fn prior(input: &UserInput) -> Value {
    match &input.prior {
        Some(p) => json!({"user": p.user, "assistant": p.assistant}),
        None => Value::Null,
    }
}

#[async_trait]
impl Extractor for OpenAiExtractor {
    async fn extract_request(
        &self,
        input: &UserInput,
        current_time: &str,
    ) -> Result<RequestExtraction> {
        let data = json!({
            "current_time": current_time,
            "prior": prior(input),
        });
        self.extract(Prompt::ExtractRequest, data, input).await
    }

    async fn extract_date_time(
        &self,
        input: &UserInput,
        current_time: &str,
        timezone: &str,
    ) -> Result<DateTimeExtraction> {
        let data = json!({
            "current_time": current_time,
            "timezone": timezone,
            "prior": prior(input),
        });
        self.extract(Prompt::ExtractDateTime, data, input).await
    }
}
