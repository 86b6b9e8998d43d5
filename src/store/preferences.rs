use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};

use super::SqliteStore;
use super::models::ChatMeetingPreferences;
use crate::ai::skills::find_meeting_time::ports::PreferenceStore;

impl SqliteStore {
    pub async fn set_chat_meeting_preferences(
        &self,
        user_id: &str,
        preferences: &ChatMeetingPreferences,
    ) -> Result<()> {
        let user_id = user_id.to_owned();
        let data = serde_json::to_string(preferences)?;
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO chat_meeting_preference (user_id, data) VALUES (?1, ?2)
                     ON CONFLICT(user_id) DO UPDATE SET data = excluded.data",
                    params![user_id, data],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for SqliteStore {
    /// Users that never saved preferences get the defaults.
    async fn chat_meeting_preferences(&self, user_id: &str) -> Result<ChatMeetingPreferences> {
        let user_id = user_id.to_owned();
        let data: Option<String> = self
            .db
            .call(move |conn| {
                let data = conn
                    .query_row(
                        "SELECT data FROM chat_meeting_preference WHERE user_id = ?1",
                        [user_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(data)
            })
            .await?;
        match data {
            Some(data) => Ok(serde_json::from_str(&data)?),
            None => Ok(ChatMeetingPreferences::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::test_store;

    #[tokio::test]
    async fn it_defaults_missing_preferences() {
        let store = test_store().await;
        let prefs = store.chat_meeting_preferences("user-1").await.unwrap();
        assert_eq!(prefs, ChatMeetingPreferences::default());
    }

    #[tokio::test]
    async fn it_saves_preferences() {
        let store = test_store().await;
        let prefs = ChatMeetingPreferences {
            duration: Some(45),
            reminders: vec![10, 30],
            ..Default::default()
        };
        store
            .set_chat_meeting_preferences("user-1", &prefs)
            .await
            .unwrap();
        let actual = store.chat_meeting_preferences("user-1").await.unwrap();
        assert_eq!(actual, prefs);
    }
}
