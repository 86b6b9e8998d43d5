//! Test utilities for integration tests
use std::sync::{Arc, RwLock};

use axum::{Router, body::Body};
use tempfile::TempDir;

use meeting_assist::api::AppState;
use meeting_assist::api::app;
use meeting_assist::core::AppConfig;
use meeting_assist::core::db::async_db;
use meeting_assist::core::db::initialize_db;
use meeting_assist::store::SqliteStore;
use meeting_assist::store::models::{
    Calendar, CalendarIntegration, Contact, ContactEmail, User, UserContactInfo,
};

pub const USER_ID: &str = "user-1";

/// An app backed by a fresh database in a temporary directory. The
/// directory is removed when this is dropped.
pub struct TestApp {
    pub router: Router,
    pub store: SqliteStore,
    _dir: TempDir,
}

/// Creates a test application with a user that has a primary
/// calendar, a Google Calendar integration, and a contact named Bob
/// with no email on file.
///
/// `llm_hostname` is where extraction requests are sent, usually a
/// `mockito` server. Emails are logged since no Gmail credentials are
/// configured.
pub async fn test_app(llm_hostname: &str) -> TestApp {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = dir.path().join("db");
    let db_path = db_path.to_str().unwrap();

    let db = async_db(db_path)
        .await
        .expect("Failed to connect to async db");
    db.call(|conn| {
        initialize_db(conn).expect("Failed to migrate db");
        Ok(())
    })
    .await
    .unwrap();

    let store = SqliteStore::new(db.clone());
    seed(&store).await;

    let app_config = AppConfig {
        storage_path: dir.path().display().to_string(),
        db_path: db_path.to_string(),
        handshake_url: String::from("https://handshake.example.com/v1"),
        openai_model: String::from("gpt-4o"),
        openai_api_hostname: llm_hostname.to_string(),
        openai_api_key: String::from("test-api-key"),
        gmail_api_hostname: String::from("http://localhost:1"),
        google_oauth_hostname: String::from("http://localhost:1"),
        gmail_api_client_id: None,
        gmail_api_client_secret: None,
        gmail_refresh_token: None,
        sender_email: String::from("noreply@example.com"),
        locale: String::from("en"),
        client_url: String::from("https://example.com"),
    };
    let app_state = AppState::new(db, app_config);
    TestApp {
        router: app(Arc::new(RwLock::new(app_state))),
        store,
        _dir: dir,
    }
}

async fn seed(store: &SqliteStore) {
    store
        .upsert_user(&User {
            id: USER_ID.to_string(),
            name: Some("Me".to_string()),
            email: Some("me@example.com".to_string()),
        })
        .await
        .unwrap();
    store
        .upsert_user_contact_info(&UserContactInfo {
            id: "me@example.com".to_string(),
            user_id: USER_ID.to_string(),
            name: Some("Me".to_string()),
            r#type: "email".to_string(),
            primary: true,
        })
        .await
        .unwrap();
    store
        .upsert_calendar(&Calendar {
            id: "cal-1".to_string(),
            user_id: USER_ID.to_string(),
            title: Some("Primary".to_string()),
            global_primary: true,
        })
        .await
        .unwrap();
    store
        .upsert_calendar_integration(&CalendarIntegration {
            id: "int-1".to_string(),
            user_id: USER_ID.to_string(),
            name: "google_calendar".to_string(),
            client_type: Some("web".to_string()),
            enabled: true,
        })
        .await
        .unwrap();
    store
        .upsert_contact(&Contact {
            id: "contact-bob".to_string(),
            user_id: USER_ID.to_string(),
            name: Some("Bob".to_string()),
            first_name: Some("Bob".to_string()),
            last_name: None,
            emails: vec![ContactEmail {
                value: String::new(),
                primary: true,
            }],
        })
        .await
        .unwrap();
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
