use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};

use super::SqliteStore;
use super::models::{Calendar, CalendarIntegration};
use crate::ai::skills::find_meeting_time::ports::CalendarStore;

impl SqliteStore {
    pub async fn upsert_calendar(&self, calendar: &Calendar) -> Result<()> {
        let calendar = calendar.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO calendar (id, user_id, title, global_primary) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO UPDATE SET
                       title = excluded.title,
                       global_primary = excluded.global_primary",
                    params![
                        calendar.id,
                        calendar.user_id,
                        calendar.title,
                        calendar.global_primary
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn upsert_calendar_integration(&self, integration: &CalendarIntegration) -> Result<()> {
        let integration = integration.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO calendar_integration (id, user_id, name, client_type, enabled)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(id) DO UPDATE SET
                       name = excluded.name,
                       client_type = excluded.client_type,
                       enabled = excluded.enabled",
                    params![
                        integration.id,
                        integration.user_id,
                        integration.name,
                        integration.client_type,
                        integration.enabled
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CalendarStore for SqliteStore {
    async fn primary_calendar(&self, user_id: &str) -> Result<Option<Calendar>> {
        let user_id = user_id.to_owned();
        let calendar = self
            .db
            .call(move |conn| {
                let calendar = conn
                    .query_row(
                        "SELECT id, user_id, title, global_primary FROM calendar
                         WHERE user_id = ?1 AND global_primary = 1
                         LIMIT 1",
                        [user_id],
                        |row| {
                            Ok(Calendar {
                                id: row.get(0)?,
                                user_id: row.get(1)?,
                                title: row.get(2)?,
                                global_primary: row.get(3)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(calendar)
            })
            .await?;
        Ok(calendar)
    }

    async fn calendar_integration(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<CalendarIntegration>> {
        let user_id = user_id.to_owned();
        let name = name.to_owned();
        let integration = self
            .db
            .call(move |conn| {
                let integration = conn
                    .query_row(
                        "SELECT id, user_id, name, client_type, enabled FROM calendar_integration
                         WHERE user_id = ?1 AND name = ?2
                         LIMIT 1",
                        params![user_id, name],
                        |row| {
                            Ok(CalendarIntegration {
                                id: row.get(0)?,
                                user_id: row.get(1)?,
                                name: row.get(2)?,
                                client_type: row.get(3)?,
                                enabled: row.get(4)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(integration)
            })
            .await?;
        Ok(integration)
    }
}
