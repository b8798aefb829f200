//! Core domain types for the planboard backend.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A registered user. Authentication lives outside this crate; every
/// owner/host/assignee/guest reference resolves to one of these rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub created_at: i64,
}

/// Task lifecycle status. Derived from assignment state and the due date
/// once assignments exist; only the reconcilers and the sweeper write it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Complete,
    Overdue,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Complete => "complete",
            TaskStatus::Overdue => "overdue",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "complete" => Some(TaskStatus::Complete),
            "overdue" => Some(TaskStatus::Overdue),
            _ => None,
        }
    }
}

/// A task with an optional owner and due date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub owner_id: Option<String>,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Per-assignee status on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Completed,
    Overdue,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Overdue => "overdue",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AssignmentStatus::Pending),
            "completed" => Some(AssignmentStatus::Completed),
            "overdue" => Some(AssignmentStatus::Overdue),
            _ => None,
        }
    }
}

/// Links one task to one assignee. At most one row per (task, user) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub task_id: String,
    pub user_id: String,
    pub status: AssignmentStatus,
    pub assigned_at: i64,
    pub accepted_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub assigned_by: Option<String>,
}

/// Event lifecycle status, purely time-derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Ended,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "upcoming",
            EventStatus::Ongoing => "ongoing",
            EventStatus::Ended => "ended",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "upcoming" => Some(EventStatus::Upcoming),
            "ongoing" => Some(EventStatus::Ongoing),
            "ended" => Some(EventStatus::Ended),
            _ => None,
        }
    }
}

/// An event with an optional host and a [start, end] window.
/// There is no cancelled status; deletion by the host is the only way to
/// retire an event before its end time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub host_id: Option<String>,
    pub description: String,
    pub start_time: i64,
    pub end_time: i64,
    pub status: EventStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Guest response to an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(InvitationStatus::Pending),
            "accepted" => Some(InvitationStatus::Accepted),
            "rejected" => Some(InvitationStatus::Rejected),
            _ => None,
        }
    }
}

/// Links one event to one guest. At most one row per (event, guest) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: String,
    pub event_id: String,
    pub guest_id: String,
    pub status: InvitationStatus,
    pub invited_at: i64,
    pub responded_at: Option<i64>,
}

/// Closed set of notification kinds. Adding a kind forces every match site
/// to handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TaskCreated,
    TaskDue,
    TaskOverdue,
    TaskCompleted,
    AssignmentCompleted,
    EventInvited,
    EventInvitedHost,
    EventReminder,
    EventStarted,
    EventEnded,
    InvitationAccepted,
    InvitationAcceptedHost,
    InvitationRejected,
    InvitationRejectedHost,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::TaskCreated => "task_created",
            NotificationKind::TaskDue => "task_due",
            NotificationKind::TaskOverdue => "task_overdue",
            NotificationKind::TaskCompleted => "task_completed",
            NotificationKind::AssignmentCompleted => "assignment_completed",
            NotificationKind::EventInvited => "event_invited",
            NotificationKind::EventInvitedHost => "event_invited_host",
            NotificationKind::EventReminder => "event_reminder",
            NotificationKind::EventStarted => "event_started",
            NotificationKind::EventEnded => "event_ended",
            NotificationKind::InvitationAccepted => "invitation_accepted",
            NotificationKind::InvitationAcceptedHost => "invitation_accepted_host",
            NotificationKind::InvitationRejected => "invitation_rejected",
            NotificationKind::InvitationRejectedHost => "invitation_rejected_host",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "task_created" => Some(NotificationKind::TaskCreated),
            "task_due" => Some(NotificationKind::TaskDue),
            "task_overdue" => Some(NotificationKind::TaskOverdue),
            "task_completed" => Some(NotificationKind::TaskCompleted),
            "assignment_completed" => Some(NotificationKind::AssignmentCompleted),
            "event_invited" => Some(NotificationKind::EventInvited),
            "event_invited_host" => Some(NotificationKind::EventInvitedHost),
            "event_reminder" => Some(NotificationKind::EventReminder),
            "event_started" => Some(NotificationKind::EventStarted),
            "event_ended" => Some(NotificationKind::EventEnded),
            "invitation_accepted" => Some(NotificationKind::InvitationAccepted),
            "invitation_accepted_host" => Some(NotificationKind::InvitationAcceptedHost),
            "invitation_rejected" => Some(NotificationKind::InvitationRejected),
            "invitation_rejected_host" => Some(NotificationKind::InvitationRejectedHost),
            _ => None,
        }
    }
}

/// A notification addressed to one user. Write-once except for the read
/// flag; task/event references are weak and null out if the referent is
/// deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub message: String,
    pub task_id: Option<String>,
    pub event_id: Option<String>,
    pub read: bool,
    pub created_at: i64,
}
