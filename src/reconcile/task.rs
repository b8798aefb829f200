//! Task status reconciliation.

use super::{load_task, load_user};
use crate::db::Database;
use crate::error::{ErrorCode, RequestError, RequestResult};
use crate::types::{NotificationKind, TaskStatus};
use chrono::{DateTime, Utc};

/// What a refresh pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub status: TaskStatus,
    pub status_changed: bool,
    pub notifications_sent: u32,
}

/// Re-derive a task's status from its assignments and the due date.
///
/// A task completes when no assignment remains outstanding and at least
/// one completed; it goes overdue when assignments remain past the due
/// date. Outstanding assignees receive a reminder or overdue notice on
/// every call. Makes at most one status write per call.
pub fn refresh_status(
    db: &Database,
    task_id: &str,
    now: DateTime<Utc>,
) -> RequestResult<RefreshOutcome> {
    let task = load_task(db, task_id)?;
    let remaining = db.remaining_assignments(task_id)?;

    if remaining.is_empty() {
        // Completion requires at least one finished assignment; a task
        // with no assignments at all keeps its current status.
        if db.has_completed_assignment(task_id)? && task.status != TaskStatus::Complete {
            db.set_task_status(task_id, TaskStatus::Complete)?;

            let mut notifications_sent = 0;
            if let Some(owner) = &task.owner_id {
                db.notify(
                    owner,
                    NotificationKind::TaskCompleted,
                    &format!("All assignees have completed the task {}.", task.title),
                    Some(task_id),
                    None,
                )?;
                notifications_sent = 1;
            }

            return Ok(RefreshOutcome {
                status: TaskStatus::Complete,
                status_changed: true,
                notifications_sent,
            });
        }

        return Ok(RefreshOutcome {
            status: task.status,
            status_changed: false,
            notifications_sent: 0,
        });
    }

    let today = now.date_naive();
    let past_due = task.due_date.is_some_and(|due| due < today);

    if past_due {
        let status_changed = task.status != TaskStatus::Overdue;
        if status_changed {
            db.set_task_status(task_id, TaskStatus::Overdue)?;
        }

        let mut notifications_sent = 0;
        for assignment in &remaining {
            db.notify(
                &assignment.user_id,
                NotificationKind::TaskOverdue,
                &format!("The task {} is overdue. Please complete it.", task.title),
                Some(task_id),
                None,
            )?;
            notifications_sent += 1;
        }

        Ok(RefreshOutcome {
            status: TaskStatus::Overdue,
            status_changed,
            notifications_sent,
        })
    } else {
        let due_text = task
            .due_date
            .map(|due| format!(" is due on {}", due.format("%Y-%m-%d")))
            .unwrap_or_default();

        let mut notifications_sent = 0;
        for assignment in &remaining {
            db.notify(
                &assignment.user_id,
                NotificationKind::TaskDue,
                &format!("Reminder: Task {}{}.", task.title, due_text),
                Some(task_id),
                None,
            )?;
            notifications_sent += 1;
        }

        Ok(RefreshOutcome {
            status: task.status,
            status_changed: false,
            notifications_sent,
        })
    }
}

/// Notify every current assignee that the task was created, referencing
/// the owner name and the due date when set. Owner-only when the task has
/// an owner. Returns the count sent.
pub fn send_created_notifications(
    db: &Database,
    task_id: &str,
    actor: &str,
) -> RequestResult<u32> {
    let task = load_task(db, task_id)?;

    if let Some(owner) = &task.owner_id {
        if owner != actor {
            return Err(RequestError::not_owner(actor, task_id));
        }
    }

    let assignments = db.list_assignments_for_task(task_id)?;
    if assignments.is_empty() {
        return Err(RequestError::new(
            ErrorCode::InvalidState,
            "No assignees to notify.",
        ));
    }

    let owner_name = match &task.owner_id {
        Some(owner) => load_user(db, owner)?.username,
        None => "someone".to_string(),
    };
    let due_text = task
        .due_date
        .map(|due| format!(" and due date is {}", due.format("%Y-%m-%d")))
        .unwrap_or_default();
    let message = format!(
        "The task {} is created by {}{}.",
        task.title, owner_name, due_text
    );

    let mut sent = 0;
    for assignment in &assignments {
        db.notify(
            &assignment.user_id,
            NotificationKind::TaskCreated,
            &message,
            Some(task_id),
            None,
        )?;
        sent += 1;
    }

    Ok(sent)
}
