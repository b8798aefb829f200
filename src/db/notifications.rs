//! Notification emitter and read-state operations.

use super::{Database, now_ms};
use crate::types::{Notification, NotificationKind};
use anyhow::Result;
use rusqlite::{Row, params};
use uuid::Uuid;

fn parse_notification_row(row: &Row) -> rusqlite::Result<Notification> {
    let kind: String = row.get("kind")?;

    Ok(Notification {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        kind: NotificationKind::from_str(&kind).unwrap_or(NotificationKind::TaskDue),
        message: row.get("message")?,
        task_id: row.get("task_id")?,
        event_id: row.get("event_id")?,
        read: row.get::<_, i64>("read")? != 0,
        created_at: row.get("created_at")?,
    })
}

impl Database {
    /// Create a notification addressed to one user, optionally referencing
    /// a task and/or an event. Rows are write-once except for the read
    /// flag.
    pub fn notify(
        &self,
        user_id: &str,
        kind: NotificationKind,
        message: &str,
        task_id: Option<&str>,
        event_id: Option<&str>,
    ) -> Result<Notification> {
        let id = Uuid::now_v7().to_string();
        let now = now_ms();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, user_id, kind, message, task_id, event_id, read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
                params![&id, user_id, kind.as_str(), message, task_id, event_id, now],
            )?;

            Ok(Notification {
                id: id.clone(),
                user_id: user_id.to_string(),
                kind,
                message: message.to_string(),
                task_id: task_id.map(|s| s.to_string()),
                event_id: event_id.map(|s| s.to_string()),
                read: false,
                created_at: now,
            })
        })
    }

    /// List a user's notifications, newest first.
    pub fn list_notifications(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Notification>> {
        self.with_conn(|conn| {
            let limit_clause = limit.map(|l| format!(" LIMIT {}", l)).unwrap_or_default();
            let sql = format!(
                "SELECT * FROM notifications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC{}",
                limit_clause
            );

            let mut stmt = conn.prepare(&sql)?;

            let notifications = stmt
                .query_map(params![user_id], parse_notification_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(notifications)
        })
    }

    /// Get unread notification count for a user.
    pub fn unread_notification_count(&self, user_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read = 0",
                params![user_id],
                |row| row.get(0),
            )?;

            Ok(count)
        })
    }

    /// Mark one notification read. Returns false when no such row exists.
    pub fn mark_notification_read(&self, notification_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET read = 1 WHERE id = ?1",
                params![notification_id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Mark all of a user's unread notifications read. Returns the count.
    pub fn mark_all_notifications_read(&self, user_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
                params![user_id],
            )?;
            Ok(changed as i64)
        })
    }
}
