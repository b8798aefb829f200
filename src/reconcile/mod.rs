//! Status/notification reconciliation engine.
//!
//! Four cooperating procedures derive Task, Assignment, Event, and
//! Invitation statuses from related state and wall-clock time, emitting
//! notifications as a side effect of each pass. Every entry point takes
//! the current instant as an explicit parameter so behavior is
//! deterministic under test.
//!
//! Reminder, overdue, started, and ended notices are re-emitted on every
//! qualifying call rather than only on the transition edge; callers that
//! poll these entry points will fan out duplicates.

pub mod assignment;
pub mod event;
pub mod invitation;
pub mod task;

use crate::db::Database;
use crate::error::{RequestError, RequestResult};
use crate::types::{Assignment, Event, Invitation, Task, User};
use chrono::DateTime;

/// Render an epoch-millisecond instant for notification messages.
pub(crate) fn fmt_instant(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

pub(crate) fn load_user(db: &Database, user_id: &str) -> RequestResult<User> {
    db.get_user(user_id)
        .map_err(RequestError::from)?
        .ok_or_else(|| RequestError::user_not_found(user_id))
}

pub(crate) fn load_task(db: &Database, task_id: &str) -> RequestResult<Task> {
    db.get_task(task_id)
        .map_err(RequestError::from)?
        .ok_or_else(|| RequestError::task_not_found(task_id))
}

pub(crate) fn load_assignment(db: &Database, assignment_id: &str) -> RequestResult<Assignment> {
    db.get_assignment(assignment_id)
        .map_err(RequestError::from)?
        .ok_or_else(|| RequestError::assignment_not_found(assignment_id))
}

pub(crate) fn load_event(db: &Database, event_id: &str) -> RequestResult<Event> {
    db.get_event(event_id)
        .map_err(RequestError::from)?
        .ok_or_else(|| RequestError::event_not_found(event_id))
}

pub(crate) fn load_invitation(db: &Database, invitation_id: &str) -> RequestResult<Invitation> {
    db.get_invitation(invitation_id)
        .map_err(RequestError::from)?
        .ok_or_else(|| RequestError::invitation_not_found(invitation_id))
}

/// Authorize an event operation: the actor must be the host. Hostless
/// events have no one who may run host operations.
pub(crate) fn require_host<'a>(event: &'a Event, actor: &str) -> RequestResult<&'a str> {
    match event.host_id.as_deref() {
        Some(host) if host == actor => Ok(host),
        _ => Err(RequestError::not_host(actor, &event.id)),
    }
}
