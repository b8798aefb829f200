//! User records.

use super::{Database, now_ms};
use crate::error::RequestError;
use crate::types::User;
use anyhow::Result;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

fn parse_user_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        created_at: row.get("created_at")?,
    })
}

/// Internal helper to assert a user exists using an existing connection.
pub(crate) fn ensure_user_exists(conn: &Connection, user_id: &str) -> Result<()> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    if count == 0 {
        return Err(RequestError::user_not_found(user_id).into());
    }
    Ok(())
}

impl Database {
    /// Create a new user with a unique, non-empty username.
    pub fn create_user(&self, username: &str) -> Result<User> {
        if username.trim().is_empty() {
            return Err(RequestError::missing_field("username").into());
        }

        let id = Uuid::now_v7().to_string();
        let now = now_ms();

        self.with_conn(|conn| {
            let taken: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )?;
            if taken > 0 {
                return Err(
                    RequestError::already_exists(&format!("username {}", username)).into(),
                );
            }

            conn.execute(
                "INSERT INTO users (id, username, created_at) VALUES (?1, ?2, ?3)",
                params![&id, username, now],
            )?;

            Ok(User {
                id: id.clone(),
                username: username.to_string(),
                created_at: now,
            })
        })
    }

    /// Get a user by id.
    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let result = conn.query_row(
                "SELECT id, username, created_at FROM users WHERE id = ?1",
                params![user_id],
                parse_user_row,
            );

            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// List all users ordered by username.
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, username, created_at FROM users ORDER BY username")?;

            let users = stmt
                .query_map([], parse_user_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(users)
        })
    }
}
