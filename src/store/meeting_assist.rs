use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};

use super::SqliteStore;
use super::models::{MeetingAssist, MeetingAssistAttendee, MeetingAssistInvite};
use crate::ai::skills::find_meeting_time::ports::MeetingAssistStore;

impl SqliteStore {
    pub async fn find_meeting_assist(&self, id: &str) -> Result<Option<MeetingAssist>> {
        let id = id.to_owned();
        let data: Option<String> = self
            .db
            .call(move |conn| {
                let data = conn
                    .query_row("SELECT data FROM meeting_assist WHERE id = ?1", [id], |row| {
                        row.get(0)
                    })
                    .optional()?;
                Ok(data)
            })
            .await?;
        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    pub async fn list_meeting_assists(&self, user_id: &str) -> Result<Vec<MeetingAssist>> {
        let user_id = user_id.to_owned();
        let rows: Vec<String> = self
            .db
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT data FROM meeting_assist WHERE user_id = ?1 ORDER BY window_start_date",
                )?;
                let rows = stmt
                    .query_map([user_id], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(rows)
            })
            .await?;
        let meeting_assists = rows
            .iter()
            .map(|data| serde_json::from_str(data))
            .collect::<Result<Vec<MeetingAssist>, _>>()?;
        Ok(meeting_assists)
    }

    pub async fn list_attendees(&self, meeting_id: &str) -> Result<Vec<MeetingAssistAttendee>> {
        let meeting_id = meeting_id.to_owned();
        let attendees = self
            .db
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, meeting_id, user_id, name, email, timezone, is_host
                     FROM meeting_assist_attendee WHERE meeting_id = ?1",
                )?;
                let rows = stmt
                    .query_map([meeting_id], |row| {
                        Ok(MeetingAssistAttendee {
                            id: row.get(0)?,
                            meeting_id: row.get(1)?,
                            user_id: row.get(2)?,
                            name: row.get(3)?,
                            email: row.get(4)?,
                            timezone: row.get(5)?,
                            is_host: row.get(6)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(attendees)
    }

    pub async fn list_invites(&self, meeting_id: &str) -> Result<Vec<MeetingAssistInvite>> {
        let meeting_id = meeting_id.to_owned();
        let rows: Vec<String> = self
            .db
            .call(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT data FROM meeting_assist_invite WHERE meeting_id = ?1")?;
                let rows = stmt
                    .query_map([meeting_id], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(rows)
            })
            .await?;
        let invites = rows
            .iter()
            .map(|data| serde_json::from_str(data))
            .collect::<Result<Vec<MeetingAssistInvite>, _>>()?;
        Ok(invites)
    }
}

#[async_trait]
impl MeetingAssistStore for SqliteStore {
    async fn upsert_meeting_assist(&self, meeting_assist: &MeetingAssist) -> Result<()> {
        let data = serde_json::to_string(meeting_assist)?;
        let id = meeting_assist.id.clone();
        let user_id = meeting_assist.user_id.clone();
        let start = meeting_assist.window_start_date.clone();
        let end = meeting_assist.window_end_date.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO meeting_assist (id, user_id, window_start_date, window_end_date, data)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(id) DO UPDATE SET
                       window_start_date = excluded.window_start_date,
                       window_end_date = excluded.window_end_date,
                       data = excluded.data,
                       updated_at = CURRENT_TIMESTAMP",
                    params![id, user_id, start, end, data],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn create_host_attendee(&self, attendee: &MeetingAssistAttendee) -> Result<()> {
        let a = attendee.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO meeting_assist_attendee
                       (id, meeting_id, user_id, name, email, timezone, is_host)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![a.id, a.meeting_id, a.user_id, a.name, a.email, a.timezone, a.is_host],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn upsert_invitees(&self, invitees: &[MeetingAssistInvite]) -> Result<()> {
        let mut rows = Vec::with_capacity(invitees.len());
        for i in invitees {
            let data = serde_json::to_string(i)?;
            rows.push((i.id.clone(), i.meeting_id.clone(), i.email.clone(), data));
        }
        self.db
            .call(move |conn| {
                // All invitees are written or none are
                let tx = conn.transaction()?;
                for (id, meeting_id, email, data) in &rows {
                    tx.execute(
                        "INSERT INTO meeting_assist_invite (id, meeting_id, email, data)
                         VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT(id) DO UPDATE SET email = excluded.email, data = excluded.data",
                        params![id, meeting_id, email, data],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}
