//! Assignment completion, the one path that cascades into task state.

use super::task::{self, RefreshOutcome};
use super::{load_assignment, load_task};
use crate::db::Database;
use crate::error::{RequestError, RequestResult};
use crate::types::{AssignmentStatus, NotificationKind};
use chrono::{DateTime, Utc};

/// What a completion call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub newly_completed: bool,
    /// The parent task refresh that followed, when the completion was new.
    pub task: Option<RefreshOutcome>,
}

/// Complete an assignment as its assignee.
///
/// The assignment write commits before the parent task recheck reads
/// assignment state, so the cascade ordering is visible in this one call
/// path. Completing an already-completed assignment is a no-op.
pub fn complete(
    db: &Database,
    assignment_id: &str,
    actor: &str,
    now: DateTime<Utc>,
) -> RequestResult<CompletionOutcome> {
    let assignment = load_assignment(db, assignment_id)?;

    if assignment.user_id != actor {
        return Err(RequestError::not_assignee(actor, assignment_id));
    }

    if assignment.status == AssignmentStatus::Completed {
        return Ok(CompletionOutcome {
            newly_completed: false,
            task: None,
        });
    }

    db.set_assignment_completed(assignment_id, now.timestamp_millis())?;

    let parent = load_task(db, &assignment.task_id)?;
    db.notify(
        &assignment.user_id,
        NotificationKind::AssignmentCompleted,
        &format!(
            "You have completed your assignment on task {}.",
            parent.title
        ),
        Some(&parent.id),
        None,
    )?;

    let refresh = task::refresh_status(db, &assignment.task_id, now)?;

    Ok(CompletionOutcome {
        newly_completed: true,
        task: Some(refresh),
    })
}
