//! Event and invitation CRUD, plus the sweeper's time-window queries.

use super::users::ensure_user_exists;
use super::{Database, now_ms};
use crate::error::RequestError;
use crate::types::{Event, EventStatus, Invitation, InvitationStatus};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

fn parse_event_row(row: &Row) -> rusqlite::Result<Event> {
    let status: String = row.get("status")?;

    Ok(Event {
        id: row.get("id")?,
        title: row.get("title")?,
        host_id: row.get("host_id")?,
        description: row.get("description")?,
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
        status: EventStatus::from_str(&status).unwrap_or(EventStatus::Upcoming),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_invitation_row(row: &Row) -> rusqlite::Result<Invitation> {
    let status: String = row.get("status")?;

    Ok(Invitation {
        id: row.get("id")?,
        event_id: row.get("event_id")?,
        guest_id: row.get("guest_id")?,
        status: InvitationStatus::from_str(&status).unwrap_or(InvitationStatus::Pending),
        invited_at: row.get("invited_at")?,
        responded_at: row.get("responded_at")?,
    })
}

/// Internal helper to get an event using an existing connection.
fn get_event_internal(conn: &Connection, event_id: &str) -> Result<Option<Event>> {
    let mut stmt = conn.prepare("SELECT * FROM events WHERE id = ?1")?;

    let result = stmt.query_row(params![event_id], parse_event_row);

    match result {
        Ok(event) => Ok(Some(event)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn get_invitation_by_pair(
    conn: &Connection,
    event_id: &str,
    guest_id: &str,
) -> Result<Option<Invitation>> {
    let mut stmt =
        conn.prepare("SELECT * FROM invitations WHERE event_id = ?1 AND guest_id = ?2")?;

    let result = stmt.query_row(params![event_id, guest_id], parse_invitation_row);

    match result {
        Ok(invitation) => Ok(Some(invitation)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Database {
    /// Create a new event, optionally with an initial guest list. Each
    /// guest gets a pending Invitation. Transactional: an unknown guest
    /// fails the event creation as well.
    pub fn create_event(
        &self,
        title: &str,
        host_id: Option<&str>,
        description: &str,
        start_time: i64,
        end_time: i64,
        guest_ids: &[String],
    ) -> Result<Event> {
        if title.trim().is_empty() {
            return Err(RequestError::missing_field("title").into());
        }
        if end_time <= start_time {
            return Err(
                RequestError::invalid_value("end_time", "end_time must be after start_time")
                    .into(),
            );
        }

        let event_id = Uuid::now_v7().to_string();
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if let Some(host) = host_id {
                ensure_user_exists(&tx, host)?;
            }

            tx.execute(
                "INSERT INTO events (id, title, host_id, description, start_time, end_time, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'upcoming', ?7, ?8)",
                params![&event_id, title, host_id, description, start_time, end_time, now, now],
            )?;

            for guest_id in guest_ids {
                ensure_user_exists(&tx, guest_id)?;
                insert_invitation_if_absent(&tx, &event_id, guest_id, now)?;
            }

            let event = get_event_internal(&tx, &event_id)?
                .ok_or_else(|| anyhow!("event {} missing right after insert", event_id))?;

            tx.commit()?;
            Ok(event)
        })
    }

    /// Get an event by id.
    pub fn get_event(&self, event_id: &str) -> Result<Option<Event>> {
        self.with_conn(|conn| get_event_internal(conn, event_id))
    }

    /// List events hosted by a user, soonest first.
    pub fn list_events_by_host(&self, host_id: &str) -> Result<Vec<Event>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM events WHERE host_id = ?1 ORDER BY start_time, id")?;

            let events = stmt
                .query_map(params![host_id], parse_event_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(events)
        })
    }

    /// Field-level partial update. Status is deliberately absent: it is
    /// time-derived, written only by the event reconciler and the sweeper.
    pub fn update_event(
        &self,
        event_id: &str,
        title: Option<&str>,
        description: Option<&str>,
        start_time: Option<i64>,
        end_time: Option<i64>,
    ) -> Result<Event> {
        if let Some(t) = title {
            if t.trim().is_empty() {
                return Err(
                    RequestError::invalid_value("title", "title must not be empty").into(),
                );
            }
        }

        self.with_conn(|conn| {
            let current = get_event_internal(conn, event_id)?
                .ok_or_else(|| RequestError::event_not_found(event_id))?;

            let new_start = start_time.unwrap_or(current.start_time);
            let new_end = end_time.unwrap_or(current.end_time);
            if new_end <= new_start {
                return Err(RequestError::invalid_value(
                    "end_time",
                    "end_time must be after start_time",
                )
                .into());
            }

            let mut sets: Vec<String> = Vec::new();
            let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(title) = title {
                sets.push(format!("title = ?{}", values.len() + 1));
                values.push(Box::new(title.to_string()));
            }
            if let Some(description) = description {
                sets.push(format!("description = ?{}", values.len() + 1));
                values.push(Box::new(description.to_string()));
            }
            if let Some(start) = start_time {
                sets.push(format!("start_time = ?{}", values.len() + 1));
                values.push(Box::new(start));
            }
            if let Some(end) = end_time {
                sets.push(format!("end_time = ?{}", values.len() + 1));
                values.push(Box::new(end));
            }

            sets.push(format!("updated_at = ?{}", values.len() + 1));
            values.push(Box::new(now_ms()));

            let sql = format!(
                "UPDATE events SET {} WHERE id = ?{}",
                sets.join(", "),
                values.len() + 1
            );
            values.push(Box::new(event_id.to_string()));

            let value_refs: Vec<&dyn rusqlite::ToSql> =
                values.iter().map(|b| b.as_ref()).collect();

            conn.execute(&sql, value_refs.as_slice())?;

            get_event_internal(conn, event_id)?
                .ok_or_else(|| anyhow!("event {} missing right after update", event_id))
        })
    }

    /// Delete an event. Invitations cascade; notification references null
    /// out. There is no cancelled status: this is the terminal operation.
    pub fn delete_event(&self, event_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM events WHERE id = ?1", params![event_id])?;
            Ok(deleted > 0)
        })
    }

    /// Status setter reserved for the event reconciler and the sweeper.
    pub(crate) fn set_event_status(&self, event_id: &str, status: EventStatus) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE events SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), now_ms(), event_id],
            )?;
            Ok(())
        })
    }

    /// Get-or-create an invitation for the (event, guest) pair. Never
    /// duplicates and never overwrites an existing response. Returns the
    /// invitation and whether it was created by this call.
    pub fn get_or_create_invitation(
        &self,
        event_id: &str,
        guest_id: &str,
    ) -> Result<(Invitation, bool)> {
        self.with_conn(|conn| {
            if get_event_internal(conn, event_id)?.is_none() {
                return Err(RequestError::event_not_found(event_id).into());
            }
            ensure_user_exists(conn, guest_id)?;

            let created = insert_invitation_if_absent(conn, event_id, guest_id, now_ms())?;
            let invitation = get_invitation_by_pair(conn, event_id, guest_id)?.ok_or_else(|| {
                anyhow!("invitation missing right after insert for event {}", event_id)
            })?;

            Ok((invitation, created))
        })
    }

    /// Get an invitation by id.
    pub fn get_invitation(&self, invitation_id: &str) -> Result<Option<Invitation>> {
        self.with_conn(|conn| {
            let result = conn.query_row(
                "SELECT * FROM invitations WHERE id = ?1",
                params![invitation_id],
                parse_invitation_row,
            );

            match result {
                Ok(invitation) => Ok(Some(invitation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// List all invitations on an event, oldest first.
    pub fn list_invitations_for_event(&self, event_id: &str) -> Result<Vec<Invitation>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM invitations WHERE event_id = ?1 ORDER BY invited_at, id",
            )?;

            let invitations = stmt
                .query_map(params![event_id], parse_invitation_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(invitations)
        })
    }

    /// List accepted invitations on an event.
    pub fn list_accepted_invitations(&self, event_id: &str) -> Result<Vec<Invitation>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM invitations
                 WHERE event_id = ?1 AND status = 'accepted'
                 ORDER BY invited_at, id",
            )?;

            let invitations = stmt
                .query_map(params![event_id], parse_invitation_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(invitations)
        })
    }

    /// List invitations addressed to a guest, newest first.
    pub fn list_invitations_for_guest(&self, guest_id: &str) -> Result<Vec<Invitation>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM invitations WHERE guest_id = ?1 ORDER BY invited_at DESC, id DESC",
            )?;

            let invitations = stmt
                .query_map(params![guest_id], parse_invitation_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(invitations)
        })
    }

    /// Count of guests who accepted.
    pub fn count_accepted_invitations(&self, event_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM invitations WHERE event_id = ?1 AND status = 'accepted'",
                params![event_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Total guest count (any response state).
    pub fn count_invitations(&self, event_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM invitations WHERE event_id = ?1",
                params![event_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Response setter reserved for the invitation reconciler. Re-stamps
    /// responded_at on repeated calls.
    pub(crate) fn set_invitation_response(
        &self,
        invitation_id: &str,
        status: InvitationStatus,
        responded_at: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE invitations SET status = ?1, responded_at = ?2 WHERE id = ?3",
                params![status.as_str(), responded_at, invitation_id],
            )?;
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Sweeper support.
    // ------------------------------------------------------------------

    /// Upcoming events whose window now contains `now` ([start, end)).
    /// Returns (event id, title, start_time).
    pub fn started_event_candidates(&self, now: i64) -> Result<Vec<(String, String, i64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, start_time FROM events
                 WHERE start_time <= ?1 AND end_time > ?1 AND status = 'upcoming'
                 ORDER BY start_time, id",
            )?;

            let rows = stmt
                .query_map(params![now], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Bulk-mark matching upcoming events ongoing. Returns the row count.
    pub fn mark_events_ongoing(&self, now: i64) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE events SET status = 'ongoing', updated_at = ?1
                 WHERE start_time <= ?1 AND end_time > ?1 AND status = 'upcoming'",
                params![now],
            )?;
            Ok(changed)
        })
    }

    /// Events past their end time and not yet ended. Returns (event id,
    /// title, end_time).
    pub fn ended_event_candidates(&self, now: i64) -> Result<Vec<(String, String, i64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, end_time FROM events
                 WHERE end_time < ?1 AND status IN ('upcoming', 'ongoing')
                 ORDER BY end_time, id",
            )?;

            let rows = stmt
                .query_map(params![now], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Bulk-mark matching events ended. Returns the row count.
    pub fn mark_events_ended(&self, now: i64) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE events SET status = 'ended', updated_at = ?1
                 WHERE end_time < ?1 AND status IN ('upcoming', 'ongoing')",
                params![now],
            )?;
            Ok(changed)
        })
    }
}

/// Insert a pending invitation unless the (event, guest) pair already has
/// one. Returns whether a row was inserted.
fn insert_invitation_if_absent(
    conn: &Connection,
    event_id: &str,
    guest_id: &str,
    now: i64,
) -> Result<bool> {
    let id = Uuid::now_v7().to_string();

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO invitations (id, event_id, guest_id, status, invited_at)
         VALUES (?1, ?2, ?3, 'pending', ?4)",
        params![&id, event_id, guest_id, now],
    )?;

    Ok(inserted > 0)
}
