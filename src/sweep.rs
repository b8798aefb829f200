//! Periodic bulk status correction over tasks, assignments, and events.
//!
//! Each rule is evaluated independently as a single bulk update; a
//! failing rule is logged and skipped so the rest of the sweep still
//! runs. Unlike the interactive reconcilers, the sweep emits no
//! notifications. Dry-run mode performs all matching reads and reports
//! what would change without writing.

use crate::db::Database;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::Serialize;
use std::fmt;
use tracing::error;

/// A task the sweep marked (or would mark) overdue.
#[derive(Debug, Clone, Serialize)]
pub struct SweptTask {
    pub id: String,
    pub title: String,
    pub due_date: Option<NaiveDate>,
}

/// An assignment the sweep retargeted (or would retarget).
#[derive(Debug, Clone, Serialize)]
pub struct SweptAssignment {
    pub id: String,
    pub task_title: String,
    pub username: String,
    pub due_date: Option<NaiveDate>,
}

/// An event the sweep transitioned (or would transition).
#[derive(Debug, Clone, Serialize)]
pub struct SweptEvent {
    pub id: String,
    pub title: String,
    pub boundary: i64,
}

/// Summary of one sweep pass.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub dry_run: bool,
    pub swept_at: DateTime<Utc>,
    pub tasks_overdue: Vec<SweptTask>,
    pub assignments_overdue: Vec<SweptAssignment>,
    pub assignments_completed: Vec<SweptAssignment>,
    pub events_started: Vec<SweptEvent>,
    pub events_ended: Vec<SweptEvent>,
    /// Rules that failed and were skipped.
    pub failures: u32,
}

impl SweepReport {
    pub fn total_changes(&self) -> usize {
        self.tasks_overdue.len()
            + self.assignments_overdue.len()
            + self.assignments_completed.len()
            + self.events_started.len()
            + self.events_ended.len()
    }
}

/// Run one sweep at the given instant.
///
/// `overdue_cutoff_hour` is the hour of day before which tasks due today
/// are left pending, so a task is not marked overdue moments after
/// midnight server time.
pub fn run(
    db: &Database,
    overdue_cutoff_hour: u32,
    now: DateTime<Utc>,
    dry_run: bool,
) -> SweepReport {
    let today = now.date_naive();
    let include_due_today = now.hour() >= overdue_cutoff_hour;
    let now_ms = now.timestamp_millis();

    let mut report = SweepReport {
        dry_run,
        swept_at: now,
        tasks_overdue: Vec::new(),
        assignments_overdue: Vec::new(),
        assignments_completed: Vec::new(),
        events_started: Vec::new(),
        events_ended: Vec::new(),
        failures: 0,
    };

    match sweep_overdue_tasks(db, today, include_due_today, now_ms, dry_run) {
        Ok(items) => report.tasks_overdue = items,
        Err(err) => {
            error!(error = %err, "overdue task sweep failed");
            report.failures += 1;
        }
    }

    match sweep_overdue_assignments(db, today, dry_run) {
        Ok(items) => report.assignments_overdue = items,
        Err(err) => {
            error!(error = %err, "overdue assignment sweep failed");
            report.failures += 1;
        }
    }

    match sweep_settled_assignments(db, now_ms, dry_run) {
        Ok(items) => report.assignments_completed = items,
        Err(err) => {
            error!(error = %err, "settled assignment sweep failed");
            report.failures += 1;
        }
    }

    match sweep_started_events(db, now_ms, dry_run) {
        Ok(items) => report.events_started = items,
        Err(err) => {
            error!(error = %err, "started event sweep failed");
            report.failures += 1;
        }
    }

    match sweep_ended_events(db, now_ms, dry_run) {
        Ok(items) => report.events_ended = items,
        Err(err) => {
            error!(error = %err, "ended event sweep failed");
            report.failures += 1;
        }
    }

    report
}

fn sweep_overdue_tasks(
    db: &Database,
    today: NaiveDate,
    include_due_today: bool,
    now_ms: i64,
    dry_run: bool,
) -> anyhow::Result<Vec<SweptTask>> {
    let candidates = db.overdue_task_candidates(today, include_due_today)?;

    if !dry_run && !candidates.is_empty() {
        db.mark_tasks_overdue(today, include_due_today, now_ms)?;
    }

    Ok(candidates
        .into_iter()
        .map(|(id, title, due_date)| SweptTask {
            id,
            title,
            due_date,
        })
        .collect())
}

fn sweep_overdue_assignments(
    db: &Database,
    today: NaiveDate,
    dry_run: bool,
) -> anyhow::Result<Vec<SweptAssignment>> {
    let candidates = db.overdue_assignment_candidates(today)?;

    if !dry_run && !candidates.is_empty() {
        db.mark_assignments_overdue(today)?;
    }

    Ok(candidates
        .into_iter()
        .map(|(id, task_title, username, due_date)| SweptAssignment {
            id,
            task_title,
            username,
            due_date,
        })
        .collect())
}

fn sweep_settled_assignments(
    db: &Database,
    now_ms: i64,
    dry_run: bool,
) -> anyhow::Result<Vec<SweptAssignment>> {
    let candidates = db.settled_assignment_candidates()?;

    if !dry_run && !candidates.is_empty() {
        db.complete_assignments_for_finished_tasks(now_ms)?;
    }

    Ok(candidates
        .into_iter()
        .map(|(id, task_title, username)| SweptAssignment {
            id,
            task_title,
            username,
            due_date: None,
        })
        .collect())
}

fn sweep_started_events(
    db: &Database,
    now_ms: i64,
    dry_run: bool,
) -> anyhow::Result<Vec<SweptEvent>> {
    let candidates = db.started_event_candidates(now_ms)?;

    if !dry_run && !candidates.is_empty() {
        db.mark_events_ongoing(now_ms)?;
    }

    Ok(candidates
        .into_iter()
        .map(|(id, title, start_time)| SweptEvent {
            id,
            title,
            boundary: start_time,
        })
        .collect())
}

fn sweep_ended_events(
    db: &Database,
    now_ms: i64,
    dry_run: bool,
) -> anyhow::Result<Vec<SweptEvent>> {
    let candidates = db.ended_event_candidates(now_ms)?;

    if !dry_run && !candidates.is_empty() {
        db.mark_events_ended(now_ms)?;
    }

    Ok(candidates
        .into_iter()
        .map(|(id, title, end_time)| SweptEvent {
            id,
            title,
            boundary: end_time,
        })
        .collect())
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = if self.dry_run { "Would update" } else { "Updated" };

        if self.dry_run {
            writeln!(f, "DRY RUN MODE - no updates will be made")?;
        }

        if !self.tasks_overdue.is_empty() {
            writeln!(
                f,
                "{} {} tasks to overdue status",
                action,
                self.tasks_overdue.len()
            )?;
            for task in &self.tasks_overdue {
                let due = task
                    .due_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string());
                writeln!(f, "  - Task: {} (due: {})", task.title, due)?;
            }
        }

        if !self.assignments_overdue.is_empty() {
            writeln!(
                f,
                "{} {} assignments to overdue status",
                action,
                self.assignments_overdue.len()
            )?;
            for assignment in &self.assignments_overdue {
                let due = assignment
                    .due_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string());
                writeln!(
                    f,
                    "  - Assignment: {} to {} (due: {})",
                    assignment.task_title, assignment.username, due
                )?;
            }
        }

        if !self.assignments_completed.is_empty() {
            writeln!(
                f,
                "{} {} assignments to completed status (task already completed)",
                action,
                self.assignments_completed.len()
            )?;
            for assignment in &self.assignments_completed {
                writeln!(
                    f,
                    "  - Assignment: {} to {}",
                    assignment.task_title, assignment.username
                )?;
            }
        }

        if !self.events_started.is_empty() {
            writeln!(
                f,
                "{} {} events to ongoing status",
                action,
                self.events_started.len()
            )?;
            for event in &self.events_started {
                writeln!(
                    f,
                    "  - Event: {} (started: {})",
                    event.title,
                    crate::reconcile::fmt_instant(event.boundary)
                )?;
            }
        }

        if !self.events_ended.is_empty() {
            writeln!(
                f,
                "{} {} events to ended status",
                action,
                self.events_ended.len()
            )?;
            for event in &self.events_ended {
                writeln!(
                    f,
                    "  - Event: {} (ended: {})",
                    event.title,
                    crate::reconcile::fmt_instant(event.boundary)
                )?;
            }
        }

        if self.failures > 0 {
            writeln!(f, "{} rule(s) failed and were skipped", self.failures)?;
        }

        if self.dry_run {
            write!(f, "Dry run completed - no changes were made")
        } else {
            write!(
                f,
                "Status update completed at {}",
                self.swept_at.format("%Y-%m-%d %H:%M:%S")
            )
        }
    }
}
