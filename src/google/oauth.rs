//! Exchange a long lived refresh token for an access token.

use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
}

pub async fn refresh_access_token(
    oauth_hostname: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<OAuthTokens> {
    let url = format!("{}/token", oauth_hostname.trim_end_matches('/'));
    let params = [
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];
    let res = Client::new().post(&url).form(&params).send().await?;
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        anyhow::bail!("Token refresh failed: {} ({})", status, text);
    }
    let tokens: OAuthTokens = serde_json::from_str(&text)?;
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_refresh_access_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "refresh_123".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "access_456", "expires_in": 3599, "token_type": "Bearer"}"#)
            .create_async()
            .await;

        let tokens = refresh_access_token(&server.url(), "client", "secret", "refresh_123")
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(tokens.access_token, "access_456");
    }

    #[tokio::test]
    async fn test_refresh_access_token_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create_async()
            .await;

        let result = refresh_access_token(&server.url(), "client", "secret", "expired").await;
        assert!(result.is_err());
    }
}
