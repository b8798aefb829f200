//! Structured error types for engine entry points.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    InvalidState,

    // Not found errors
    UserNotFound,
    TaskNotFound,
    AssignmentNotFound,
    EventNotFound,
    InvitationNotFound,

    // Conflict and authorization errors
    AlreadyExists,
    NotOwner,
    NotHost,
    NotAssignee,
    NotGuest,

    // Internal errors
    DatabaseError,
    InternalError,
}

/// Structured error surfaced by reconciliation entry points.
#[derive(Debug, Serialize)]
pub struct RequestError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl RequestError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn user_not_found(user_id: &str) -> Self {
        Self::new(
            ErrorCode::UserNotFound,
            format!("User not found: {}", user_id),
        )
    }

    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn assignment_not_found(assignment_id: &str) -> Self {
        Self::new(
            ErrorCode::AssignmentNotFound,
            format!("Assignment not found: {}", assignment_id),
        )
    }

    pub fn event_not_found(event_id: &str) -> Self {
        Self::new(
            ErrorCode::EventNotFound,
            format!("Event not found: {}", event_id),
        )
    }

    pub fn invitation_not_found(invitation_id: &str) -> Self {
        Self::new(
            ErrorCode::InvitationNotFound,
            format!("Invitation not found: {}", invitation_id),
        )
    }

    pub fn already_exists(what: &str) -> Self {
        Self::new(ErrorCode::AlreadyExists, format!("{} already exists", what))
    }

    pub fn not_owner(user_id: &str, task_id: &str) -> Self {
        Self::new(
            ErrorCode::NotOwner,
            format!("User {} does not own task {}", user_id, task_id),
        )
    }

    pub fn not_host(user_id: &str, event_id: &str) -> Self {
        Self::new(
            ErrorCode::NotHost,
            format!("User {} does not host event {}", user_id, event_id),
        )
    }

    pub fn not_assignee(user_id: &str, assignment_id: &str) -> Self {
        Self::new(
            ErrorCode::NotAssignee,
            format!(
                "User {} is not the assignee of assignment {}",
                user_id, assignment_id
            ),
        )
    }

    pub fn not_guest(user_id: &str, invitation_id: &str) -> Self {
        Self::new(
            ErrorCode::NotGuest,
            format!(
                "User {} is not the guest of invitation {}",
                user_id, invitation_id
            ),
        )
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RequestError {}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for RequestError {
    fn from(err: anyhow::Error) -> Self {
        // Try to downcast to RequestError first
        match err.downcast::<RequestError>() {
            Ok(req_err) => req_err,
            Err(err) => RequestError::database(err),
        }
    }
}

/// Result type for engine operations.
pub type RequestResult<T> = std::result::Result<T, RequestError>;
