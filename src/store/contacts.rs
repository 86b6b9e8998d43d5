use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

use super::SqliteStore;
use super::models::{Contact, ContactEmail, User, UserContactInfo};
use crate::ai::skills::find_meeting_time::ports::ContactStore;

const CONTACT_COLUMNS: &str = "c.id, c.user_id, c.name, c.first_name, c.last_name, c.emails";

fn contact_from_row(row: &Row) -> Result<Contact, rusqlite::Error> {
    let emails: String = row.get(5)?;
    let emails: Vec<ContactEmail> = serde_json::from_str(&emails).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Contact {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        emails,
    })
}

fn contact_info_from_row(row: &Row) -> Result<UserContactInfo, rusqlite::Error> {
    Ok(UserContactInfo {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        r#type: row.get(3)?,
        primary: row.get(4)?,
    })
}

impl SqliteStore {
    pub async fn upsert_user(&self, user: &User) -> Result<()> {
        let user = user.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO user (id, name, email) VALUES (?1, ?2, ?3)
                     ON CONFLICT(id) DO UPDATE SET name = excluded.name, email = excluded.email",
                    params![user.id, user.name, user.email],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn upsert_contact(&self, contact: &Contact) -> Result<()> {
        let contact = contact.clone();
        let emails = serde_json::to_string(&contact.emails)?;
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO contact (id, user_id, name, first_name, last_name, emails)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(id) DO UPDATE SET
                       name = excluded.name,
                       first_name = excluded.first_name,
                       last_name = excluded.last_name,
                       emails = excluded.emails",
                    params![
                        contact.id,
                        contact.user_id,
                        contact.name,
                        contact.first_name,
                        contact.last_name,
                        emails
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn upsert_user_contact_info(&self, info: &UserContactInfo) -> Result<()> {
        let info = info.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO user_contact_info (id, user_id, name, type, is_primary)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(id, user_id) DO UPDATE SET
                       name = excluded.name,
                       type = excluded.type,
                       is_primary = excluded.is_primary",
                    params![info.id, info.user_id, info.name, info.r#type, info.primary],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ContactStore for SqliteStore {
    async fn find_contact_by_name(&self, user_id: &str, pattern: &str) -> Result<Option<Contact>> {
        let user_id = user_id.to_owned();
        let pattern = pattern.to_owned();
        let contact = self
            .db
            .call(move |conn| {
                let sql = format!(
                    "SELECT {CONTACT_COLUMNS} FROM contact c
                     WHERE c.user_id = ?1
                       AND (c.name LIKE ?2
                            OR (COALESCE(c.first_name, '') || ' ' || COALESCE(c.last_name, '')) LIKE ?2)
                     ORDER BY c.name
                     LIMIT 1"
                );
                let contact = conn
                    .query_row(&sql, params![user_id, pattern], contact_from_row)
                    .optional()?;
                Ok(contact)
            })
            .await?;
        Ok(contact)
    }

    async fn find_contact_by_email(&self, user_id: &str, email: &str) -> Result<Option<Contact>> {
        let user_id = user_id.to_owned();
        let email = email.trim().to_lowercase();
        let contact = self
            .db
            .call(move |conn| {
                let sql = format!(
                    "SELECT {CONTACT_COLUMNS} FROM contact c, json_each(c.emails) e
                     WHERE c.user_id = ?1
                       AND lower(json_extract(e.value, '$.value')) = ?2
                     LIMIT 1"
                );
                let contact = conn
                    .query_row(&sql, params![user_id, email], contact_from_row)
                    .optional()?;
                Ok(contact)
            })
            .await?;
        Ok(contact)
    }

    async fn list_user_contact_infos(&self, user_id: &str) -> Result<Vec<UserContactInfo>> {
        let user_id = user_id.to_owned();
        let infos = self
            .db
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, name, type, is_primary FROM user_contact_info
                     WHERE user_id = ?1
                     ORDER BY is_primary DESC, id",
                )?;
                let rows = stmt
                    .query_map([user_id], contact_info_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(infos)
    }

    async fn find_user_contact_infos(&self, emails: &[String]) -> Result<Vec<UserContactInfo>> {
        if emails.is_empty() {
            return Ok(vec![]);
        }
        let emails: Vec<String> = emails.iter().map(|e| e.trim().to_lowercase()).collect();
        let infos = self
            .db
            .call(move |conn| {
                let placeholders = vec!["?"; emails.len()].join(", ");
                let sql = format!(
                    "SELECT id, user_id, name, type, is_primary FROM user_contact_info
                     WHERE lower(id) IN ({placeholders})"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(emails.iter()), contact_info_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(infos)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let user_id = user_id.to_owned();
        let user = self
            .db
            .call(move |conn| {
                let user = conn
                    .query_row(
                        "SELECT id, name, email FROM user WHERE id = ?1",
                        [user_id],
                        |row| {
                            Ok(User {
                                id: row.get(0)?,
                                name: row.get(1)?,
                                email: row.get(2)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(user)
            })
            .await?;
        Ok(user)
    }
}
