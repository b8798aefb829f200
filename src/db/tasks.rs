//! Task and assignment CRUD, plus the sweeper's bulk status queries.

use super::users::ensure_user_exists;
use super::{Database, now_ms};
use crate::error::RequestError;
use crate::types::{Assignment, AssignmentStatus, Task, TaskStatus};
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

const DATE_FMT: &str = "%Y-%m-%d";

fn date_to_text(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

fn text_to_date(text: Option<String>) -> Option<NaiveDate> {
    text.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FMT).ok())
}

pub(crate) fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let due_date: Option<String> = row.get("due_date")?;
    let status: String = row.get("status")?;

    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        owner_id: row.get("owner_id")?,
        description: row.get("description")?,
        due_date: text_to_date(due_date),
        status: TaskStatus::from_str(&status).unwrap_or(TaskStatus::Pending),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_assignment_row(row: &Row) -> rusqlite::Result<Assignment> {
    let status: String = row.get("status")?;

    Ok(Assignment {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        user_id: row.get("user_id")?,
        status: AssignmentStatus::from_str(&status).unwrap_or(AssignmentStatus::Pending),
        assigned_at: row.get("assigned_at")?,
        accepted_at: row.get("accepted_at")?,
        completed_at: row.get("completed_at")?,
        assigned_by: row.get("assigned_by")?,
    })
}

/// Internal helper to get a task using an existing connection.
pub(crate) fn get_task_internal(conn: &Connection, task_id: &str) -> Result<Option<Task>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1")?;

    let result = stmt.query_row(params![task_id], parse_task_row);

    match result {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Insert an assignment row, mapping the (task, user) UNIQUE constraint to
/// a structured already-exists error.
fn insert_assignment(
    conn: &Connection,
    task_id: &str,
    user_id: &str,
    assigned_by: Option<&str>,
    now: i64,
) -> Result<Assignment> {
    let id = Uuid::now_v7().to_string();

    let result = conn.execute(
        "INSERT INTO assignments (id, task_id, user_id, status, assigned_at, assigned_by)
         VALUES (?1, ?2, ?3, 'pending', ?4, ?5)",
        params![&id, task_id, user_id, now, assigned_by],
    );

    match result {
        Ok(_) => Ok(Assignment {
            id,
            task_id: task_id.to_string(),
            user_id: user_id.to_string(),
            status: AssignmentStatus::Pending,
            assigned_at: now,
            accepted_at: None,
            completed_at: None,
            assigned_by: assigned_by.map(|s| s.to_string()),
        }),
        Err(err) if is_unique_violation(&err) => Err(RequestError::already_exists(&format!(
            "assignment of task {} to user {}",
            task_id, user_id
        ))
        .into()),
        Err(err) => Err(err.into()),
    }
}

impl Database {
    /// Create a new task, optionally with an initial set of assignees.
    /// Each assignee gets an Assignment stamped assigned_by = owner.
    /// The whole create is transactional: an unknown assignee fails the
    /// task creation as well.
    pub fn create_task(
        &self,
        title: &str,
        owner_id: Option<&str>,
        description: &str,
        due_date: Option<NaiveDate>,
        assignee_ids: &[String],
    ) -> Result<Task> {
        if title.trim().is_empty() {
            return Err(RequestError::missing_field("title").into());
        }

        let task_id = Uuid::now_v7().to_string();
        let now = now_ms();
        let due_text = due_date.map(date_to_text);

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if let Some(owner) = owner_id {
                ensure_user_exists(&tx, owner)?;
            }

            tx.execute(
                "INSERT INTO tasks (id, title, owner_id, description, due_date, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7)",
                params![&task_id, title, owner_id, description, due_text, now, now],
            )?;

            for user_id in assignee_ids {
                ensure_user_exists(&tx, user_id)?;
                insert_assignment(&tx, &task_id, user_id, owner_id, now)?;
            }

            let task = get_task_internal(&tx, &task_id)?
                .ok_or_else(|| anyhow!("task {} missing right after insert", task_id))?;

            tx.commit()?;
            Ok(task)
        })
    }

    /// Get a task by id.
    pub fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// List tasks owned by a user, newest first.
    pub fn list_tasks_by_owner(&self, owner_id: &str) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT * FROM tasks WHERE owner_id = ?1 ORDER BY created_at DESC")?;

            let tasks = stmt
                .query_map(params![owner_id], parse_task_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(tasks)
        })
    }

    /// Field-level partial update. Status is deliberately absent: it is
    /// derived state, written only by the reconcilers and the sweeper.
    /// `due_date: Some(None)` clears the due date.
    pub fn update_task(
        &self,
        task_id: &str,
        title: Option<&str>,
        description: Option<&str>,
        due_date: Option<Option<NaiveDate>>,
    ) -> Result<Task> {
        if let Some(t) = title {
            if t.trim().is_empty() {
                return Err(
                    RequestError::invalid_value("title", "title must not be empty").into(),
                );
            }
        }

        self.with_conn(|conn| {
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
            if let Some(due) = due_date {
                sets.push(format!("due_date = ?{}", values.len() + 1));
                values.push(Box::new(due.map(date_to_text)));
            }

            sets.push(format!("updated_at = ?{}", values.len() + 1));
            values.push(Box::new(now_ms()));

            let sql = format!(
                "UPDATE tasks SET {} WHERE id = ?{}",
                sets.join(", "),
                values.len() + 1
            );
            values.push(Box::new(task_id.to_string()));

            let value_refs: Vec<&dyn rusqlite::ToSql> =
                values.iter().map(|b| b.as_ref()).collect();

            let changed = conn.execute(&sql, value_refs.as_slice())?;
            if changed == 0 {
                return Err(RequestError::task_not_found(task_id).into());
            }

            get_task_internal(conn, task_id)?
                .ok_or_else(|| anyhow!("task {} missing right after update", task_id))
        })
    }

    /// Delete a task. Assignments cascade; notification references null out.
    pub fn delete_task(&self, task_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            Ok(deleted > 0)
        })
    }

    /// Status setter reserved for the reconcilers and the sweeper.
    pub(crate) fn set_task_status(&self, task_id: &str, status: TaskStatus) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), now_ms(), task_id],
            )?;
            Ok(())
        })
    }

    /// Assign a task to a user. Fails with an already-exists error when the
    /// (task, user) pair is already assigned.
    pub fn create_assignment(
        &self,
        task_id: &str,
        user_id: &str,
        assigned_by: Option<&str>,
    ) -> Result<Assignment> {
        self.with_conn(|conn| {
            if get_task_internal(conn, task_id)?.is_none() {
                return Err(RequestError::task_not_found(task_id).into());
            }
            ensure_user_exists(conn, user_id)?;
            if let Some(by) = assigned_by {
                ensure_user_exists(conn, by)?;
            }

            insert_assignment(conn, task_id, user_id, assigned_by, now_ms())
        })
    }

    /// Get an assignment by id.
    pub fn get_assignment(&self, assignment_id: &str) -> Result<Option<Assignment>> {
        self.with_conn(|conn| {
            let result = conn.query_row(
                "SELECT * FROM assignments WHERE id = ?1",
                params![assignment_id],
                parse_assignment_row,
            );

            match result {
                Ok(assignment) => Ok(Some(assignment)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// List all assignments on a task, oldest first.
    pub fn list_assignments_for_task(&self, task_id: &str) -> Result<Vec<Assignment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM assignments WHERE task_id = ?1 ORDER BY assigned_at, id",
            )?;

            let assignments = stmt
                .query_map(params![task_id], parse_assignment_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(assignments)
        })
    }

    /// List assignments where the user is the assignee, newest first.
    pub fn list_assignments_for_user(&self, user_id: &str) -> Result<Vec<Assignment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM assignments WHERE user_id = ?1 ORDER BY assigned_at DESC, id DESC",
            )?;

            let assignments = stmt
                .query_map(params![user_id], parse_assignment_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(assignments)
        })
    }

    /// Assignments still outstanding on a task. Rejected, removed, and
    /// completed rows count as settled.
    pub fn remaining_assignments(&self, task_id: &str) -> Result<Vec<Assignment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM assignments
                 WHERE task_id = ?1 AND status NOT IN ('rejected', 'removed', 'completed')
                 ORDER BY assigned_at, id",
            )?;

            let assignments = stmt
                .query_map(params![task_id], parse_assignment_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(assignments)
        })
    }

    /// Whether at least one assignment on the task is completed.
    pub fn has_completed_assignment(&self, task_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM assignments WHERE task_id = ?1 AND status = 'completed'",
                params![task_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Remove an assignment.
    pub fn delete_assignment(&self, assignment_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM assignments WHERE id = ?1",
                params![assignment_id],
            )?;
            Ok(deleted > 0)
        })
    }

    /// Stamp acceptance on an assignment.
    pub fn mark_assignment_accepted(&self, assignment_id: &str, accepted_at: i64) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE assignments SET accepted_at = ?1 WHERE id = ?2",
                params![accepted_at, assignment_id],
            )?;
            if changed == 0 {
                return Err(RequestError::assignment_not_found(assignment_id).into());
            }
            Ok(())
        })
    }

    /// Stamp completion on an assignment. The assignment reconciler goes
    /// through here before rechecking the parent task.
    pub fn set_assignment_completed(
        &self,
        assignment_id: &str,
        completed_at: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE assignments SET status = 'completed', completed_at = ?1 WHERE id = ?2",
                params![completed_at, assignment_id],
            )?;
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Sweeper support: candidate listings and matching bulk updates. The
    // candidate query and the update share their WHERE clause so a dry run
    // reports exactly what a live run would write.
    // ------------------------------------------------------------------

    /// Pending tasks due on or before `today`. Tasks due exactly today are
    /// excluded unless `include_due_today` (the grace-window cutoff has
    /// passed).
    pub fn overdue_task_candidates(
        &self,
        today: NaiveDate,
        include_due_today: bool,
    ) -> Result<Vec<(String, String, Option<NaiveDate>)>> {
        let cmp = if include_due_today { "<=" } else { "<" };
        let today_text = date_to_text(today);

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, title, due_date FROM tasks
                 WHERE due_date IS NOT NULL AND due_date {} ?1 AND status = 'pending'
                 ORDER BY due_date, id",
                cmp
            );
            let mut stmt = conn.prepare(&sql)?;

            let rows = stmt
                .query_map(params![today_text], |row| {
                    let id: String = row.get(0)?;
                    let title: String = row.get(1)?;
                    let due: Option<String> = row.get(2)?;
                    Ok((id, title, due))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows
                .into_iter()
                .map(|(id, title, due)| (id, title, text_to_date(due)))
                .collect())
        })
    }

    /// Bulk-mark matching pending tasks overdue. Returns the row count.
    pub fn mark_tasks_overdue(
        &self,
        today: NaiveDate,
        include_due_today: bool,
        now: i64,
    ) -> Result<usize> {
        let cmp = if include_due_today { "<=" } else { "<" };
        let today_text = date_to_text(today);

        self.with_conn(|conn| {
            let sql = format!(
                "UPDATE tasks SET status = 'overdue', updated_at = ?1
                 WHERE due_date IS NOT NULL AND due_date {} ?2 AND status = 'pending'",
                cmp
            );
            let changed = conn.execute(&sql, params![now, today_text])?;
            Ok(changed)
        })
    }

    /// Pending assignments whose parent task is due strictly before `today`
    /// and not yet complete. Returns (assignment id, task title, assignee
    /// username, task due date).
    pub fn overdue_assignment_candidates(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<(String, String, String, Option<NaiveDate>)>> {
        let today_text = date_to_text(today);

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id, t.title, u.username, t.due_date
                 FROM assignments a
                 JOIN tasks t ON t.id = a.task_id
                 JOIN users u ON u.id = a.user_id
                 WHERE t.due_date IS NOT NULL AND t.due_date < ?1
                   AND t.status IN ('pending', 'overdue')
                   AND a.status = 'pending'
                 ORDER BY t.due_date, a.id",
            )?;

            let rows = stmt
                .query_map(params![today_text], |row| {
                    let id: String = row.get(0)?;
                    let title: String = row.get(1)?;
                    let username: String = row.get(2)?;
                    let due: Option<String> = row.get(3)?;
                    Ok((id, title, username, due))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows
                .into_iter()
                .map(|(id, title, username, due)| (id, title, username, text_to_date(due)))
                .collect())
        })
    }

    /// Bulk-mark matching pending assignments overdue. Returns the row count.
    pub fn mark_assignments_overdue(&self, today: NaiveDate) -> Result<usize> {
        let today_text = date_to_text(today);

        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE assignments SET status = 'overdue'
                 WHERE status = 'pending' AND task_id IN (
                     SELECT id FROM tasks
                     WHERE due_date IS NOT NULL AND due_date < ?1
                       AND status IN ('pending', 'overdue')
                 )",
                params![today_text],
            )?;
            Ok(changed)
        })
    }

    /// Pending assignments whose parent task is already complete. Returns
    /// (assignment id, task title, assignee username).
    pub fn settled_assignment_candidates(&self) -> Result<Vec<(String, String, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id, t.title, u.username
                 FROM assignments a
                 JOIN tasks t ON t.id = a.task_id
                 JOIN users u ON u.id = a.user_id
                 WHERE t.status = 'complete' AND a.status = 'pending'
                 ORDER BY a.id",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Bulk-complete pending assignments under complete tasks, stamping the
    /// sweep time. Returns the row count.
    pub fn complete_assignments_for_finished_tasks(&self, completed_at: i64) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE assignments SET status = 'completed', completed_at = ?1
                 WHERE status = 'pending' AND task_id IN (
                     SELECT id FROM tasks WHERE status = 'complete'
                 )",
                params![completed_at],
            )?;
            Ok(changed)
        })
    }
}
