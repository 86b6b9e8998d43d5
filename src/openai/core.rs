use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "user")]
    User,
    #[serde(rename = "tool")]
    Tool,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Message {
    role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            content: Some(content.to_string()),
        }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }
}

/// Output mode requested from the completion API.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

pub async fn completion(
    messages: &[Message],
    response_format: ResponseFormat,
    api_hostname: &str,
    api_key: &str,
    model: &str,
) -> Result<Value, Error> {
    let mut payload = json!({
        "model": model,
        "messages": messages,
    });
    if response_format == ResponseFormat::JsonObject {
        payload["response_format"] = json!({"type": "json_object"});
    }
    let url = format!("{}/v1/chat/completions", api_hostname.trim_end_matches("/"));
    let response = reqwest::Client::new()
        .post(url)
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(60 * 2))
        .json(&payload)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(response)
}

/// Run a completion and return the content of the first choice.
pub async fn completion_content(
    messages: &[Message],
    response_format: ResponseFormat,
    api_hostname: &str,
    api_key: &str,
    model: &str,
) -> Result<String, Error> {
    let resp = completion(messages, response_format, api_hostname, api_key, model).await?;
    resp["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or(anyhow!("No message received. Resp:\n\n {}", resp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), r#""system""#);
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            r#""assistant""#
        );
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
        assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), r#""tool""#);
    }

    #[test]
    fn test_message_new() {
        let msg = Message::new(Role::User, "Hello world");
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"role":"user","content":"Hello world"}"#
        );
        assert_eq!(*msg.role(), Role::User);
    }

    #[tokio::test]
    async fn test_completion_requests_json_object() {
        let mut server = mockito::Server::new_async().await;

        let response_body = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1694268190,
            "model": "gpt-4",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "{\"params\": {}}"
                },
                "finish_reason": "stop"
            }]
        }"#;

        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::PartialJson(
                json!({"response_format": {"type": "json_object"}}),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(response_body)
            .create();

        let messages = vec![Message::new(Role::User, "Hi")];
        let result = completion_content(
            &messages,
            ResponseFormat::JsonObject,
            server.url().as_str(),
            "test-key",
            "gpt-4",
        )
        .await;

        mock.assert();
        assert_eq!(result.unwrap(), r#"{"params": {}}"#);
    }

    #[tokio::test]
    async fn test_completion_content_errors_without_content() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": [{"message": {"role": "assistant"}}]}"#)
            .create();

        let messages = vec![Message::new(Role::User, "Hi")];
        let result = completion_content(
            &messages,
            ResponseFormat::Text,
            server.url().as_str(),
            "test-key",
            "gpt-4",
        )
        .await;

        assert!(result.is_err());
    }
}
