use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub storage_path: String,
    pub db_path: String,
    pub handshake_url: String,
    pub openai_model: String,
    pub openai_api_hostname: String,
    pub openai_api_key: String,
    pub gmail_api_hostname: String,
    pub google_oauth_hostname: String,
    pub gmail_api_client_id: Option<String>,
    pub gmail_api_client_secret: Option<String>,
    pub gmail_refresh_token: Option<String>,
    pub sender_email: String,
    pub locale: String,
    pub client_url: String,
}

impl AppConfig {
    /// Credentials needed to send email through Gmail. When any of
    /// them is missing emails are logged instead of sent.
    pub fn gmail_credentials(&self) -> Option<(String, String, String)> {
        match (
            &self.gmail_api_client_id,
            &self.gmail_api_client_secret,
            &self.gmail_refresh_token,
        ) {
            (Some(id), Some(secret), Some(token)) => {
                Some((id.clone(), secret.clone(), token.clone()))
            }
            _ => None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let storage_path = env::var("MEETING_ASSIST_STORAGE_PATH").unwrap_or("./".to_string());
        let db_path = format!("{}/db", storage_path);
        let handshake_url = env::var("MEETING_ASSIST_HANDSHAKE_URL")
            .unwrap_or_else(|_| "https://atomiclife.app/v1/handshake".to_string());
        let openai_api_hostname = env::var("MEETING_ASSIST_LLM_HOST")
            .unwrap_or_else(|_| "https://api.openai.com".to_string());
        let openai_api_key =
            env::var("OPENAI_API_KEY").unwrap_or_else(|_| "thiswontworkforopenai".to_string());
        let openai_model =
            env::var("MEETING_ASSIST_LLM_MODEL").unwrap_or_else(|_| "gpt-4.1-mini".to_string());
        let gmail_api_hostname = env::var("MEETING_ASSIST_GMAIL_HOST")
            .unwrap_or_else(|_| "https://gmail.googleapis.com".to_string());
        let google_oauth_hostname = env::var("MEETING_ASSIST_GOOGLE_OAUTH_HOST")
            .unwrap_or_else(|_| "https://oauth2.googleapis.com".to_string());
        let gmail_api_client_id = env::var("MEETING_ASSIST_GMAIL_CLIENT_ID").ok();
        let gmail_api_client_secret = env::var("MEETING_ASSIST_GMAIL_CLIENT_SECRET").ok();
        let gmail_refresh_token = env::var("MEETING_ASSIST_GMAIL_REFRESH_TOKEN").ok();
        let sender_email = env::var("MEETING_ASSIST_SENDER_EMAIL")
            .unwrap_or_else(|_| "noreply@atomiclife.app".to_string());
        let locale = env::var("MEETING_ASSIST_LOCALE").unwrap_or_else(|_| "en".to_string());
        let client_url = env::var("MEETING_ASSIST_CLIENT_URL")
            .unwrap_or_else(|_| "https://atomiclife.app".to_string());

        Self {
            storage_path,
            db_path,
            handshake_url,
            openai_model,
            openai_api_hostname,
            openai_api_key,
            gmail_api_hostname,
            google_oauth_hostname,
            gmail_api_client_id,
            gmail_api_client_secret,
            gmail_refresh_token,
            sender_email,
            locale,
            client_url,
        }
    }
}
