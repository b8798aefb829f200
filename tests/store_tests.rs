//! Integration tests for the entity store.

use chrono::NaiveDate;
use planboard::db::Database;
use planboard::error::{ErrorCode, RequestError};
use planboard::types::{NotificationKind, TaskStatus, User};

fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn user(db: &Database, name: &str) -> User {
    db.create_user(name).expect("Failed to create user")
}

fn date(y: i32, mo: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, mo, d).unwrap()
}

/// Extract the structured error from a store failure.
fn request_error(err: anyhow::Error) -> RequestError {
    RequestError::from(err)
}

mod open_tests {
    use super::*;

    #[test]
    fn open_on_disk_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planboard.db");

        {
            let db = Database::open(&path).unwrap();
            db.create_user("alice").unwrap();
        }

        let db = Database::open(&path).unwrap();
        let users = db.list_users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "alice");
    }
}

mod user_tests {
    use super::*;

    #[test]
    fn create_user_rejects_empty_username() {
        let db = setup_db();

        let err = request_error(db.create_user("  ").unwrap_err());

        assert_eq!(err.code, ErrorCode::MissingRequiredField);
    }

    #[test]
    fn create_user_rejects_duplicate_username() {
        let db = setup_db();
        db.create_user("alice").unwrap();

        let err = request_error(db.create_user("alice").unwrap_err());

        assert_eq!(err.code, ErrorCode::AlreadyExists);
    }

    #[test]
    fn get_user_returns_none_for_unknown_id() {
        let db = setup_db();

        assert!(db.get_user("missing").unwrap().is_none());
    }

    #[test]
    fn list_users_orders_by_username() {
        let db = setup_db();
        db.create_user("zoe").unwrap();
        db.create_user("alice").unwrap();

        let users = db.list_users().unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].username, "alice");
        assert_eq!(users[1].username, "zoe");
    }
}

mod task_store_tests {
    use super::*;

    #[test]
    fn create_task_with_assignees_stamps_assigned_by() {
        let db = setup_db();
        let owner = user(&db, "owner");
        let alice = user(&db, "alice");

        let task = db
            .create_task(
                "Plan",
                Some(&owner.id),
                "details",
                Some(date(2026, 9, 1)),
                &[alice.id.clone()],
            )
            .unwrap();

        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.due_date, Some(date(2026, 9, 1)));
        let assignments = db.list_assignments_for_task(&task.id).unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].user_id, alice.id);
        assert_eq!(assignments[0].assigned_by.as_deref(), Some(owner.id.as_str()));
    }

    #[test]
    fn create_task_with_unknown_assignee_creates_nothing() {
        let db = setup_db();
        let owner = user(&db, "owner");

        let err = request_error(
            db.create_task("Plan", Some(&owner.id), "", None, &["ghost".to_string()])
                .unwrap_err(),
        );

        assert_eq!(err.code, ErrorCode::UserNotFound);
        assert!(db.list_tasks_by_owner(&owner.id).unwrap().is_empty());
    }

    #[test]
    fn duplicate_assignment_for_same_task_and_user_fails() {
        let db = setup_db();
        let owner = user(&db, "owner");
        let alice = user(&db, "alice");
        let task = db
            .create_task("Plan", Some(&owner.id), "", None, &[alice.id.clone()])
            .unwrap();

        let err = request_error(
            db.create_assignment(&task.id, &alice.id, Some(&owner.id))
                .unwrap_err(),
        );

        assert_eq!(err.code, ErrorCode::AlreadyExists);
        assert_eq!(db.list_assignments_for_task(&task.id).unwrap().len(), 1);
    }

    #[test]
    fn update_task_changes_fields_but_never_status() {
        let db = setup_db();
        let owner = user(&db, "owner");
        let task = db
            .create_task("Old title", Some(&owner.id), "", Some(date(2026, 9, 1)), &[])
            .unwrap();

        let updated = db
            .update_task(&task.id, Some("New title"), Some("new body"), Some(None))
            .unwrap();

        assert_eq!(updated.title, "New title");
        assert_eq!(updated.description, "new body");
        assert_eq!(updated.due_date, None);
        assert_eq!(updated.status, TaskStatus::Pending);
    }

    #[test]
    fn update_task_rejects_empty_title() {
        let db = setup_db();
        let owner = user(&db, "owner");
        let task = db
            .create_task("Title", Some(&owner.id), "", None, &[])
            .unwrap();

        let err = request_error(db.update_task(&task.id, Some(""), None, None).unwrap_err());

        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
        assert_eq!(err.field.as_deref(), Some("title"));
    }

    #[test]
    fn update_unknown_task_is_not_found() {
        let db = setup_db();

        let err = request_error(db.update_task("missing", Some("x"), None, None).unwrap_err());

        assert_eq!(err.code, ErrorCode::TaskNotFound);
    }

    #[test]
    fn deleting_a_task_cascades_assignments_and_clears_notification_refs() {
        let db = setup_db();
        let owner = user(&db, "owner");
        let alice = user(&db, "alice");
        let task = db
            .create_task("Doomed", Some(&owner.id), "", None, &[alice.id.clone()])
            .unwrap();
        let a = db.list_assignments_for_task(&task.id).unwrap().remove(0);
        db.notify(
            &alice.id,
            NotificationKind::TaskCreated,
            "created",
            Some(&task.id),
            None,
        )
        .unwrap();

        assert!(db.delete_task(&task.id).unwrap());

        assert!(db.get_assignment(&a.id).unwrap().is_none());
        let notes = db.list_notifications(&alice.id, None).unwrap();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].task_id.is_none());
    }

    #[test]
    fn mark_assignment_accepted_stamps_the_time() {
        let db = setup_db();
        let owner = user(&db, "owner");
        let alice = user(&db, "alice");
        let task = db
            .create_task("Accepted", Some(&owner.id), "", None, &[alice.id.clone()])
            .unwrap();
        let a = db.list_assignments_for_task(&task.id).unwrap().remove(0);

        db.mark_assignment_accepted(&a.id, 1_700_000_000_000).unwrap();

        let stored = db.get_assignment(&a.id).unwrap().unwrap();
        assert_eq!(stored.accepted_at, Some(1_700_000_000_000));
    }
}

mod event_store_tests {
    use super::*;

    #[test]
    fn create_event_rejects_inverted_window() {
        let db = setup_db();
        let host = user(&db, "host");

        let err = request_error(
            db.create_event("Backwards", Some(&host.id), "", 2_000, 1_000, &[])
                .unwrap_err(),
        );

        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
        assert_eq!(err.field.as_deref(), Some("end_time"));
    }

    #[test]
    fn get_or_create_invitation_is_idempotent() {
        let db = setup_db();
        let host = user(&db, "host");
        let guest = user(&db, "guest");
        let ev = db
            .create_event("Party", Some(&host.id), "", 1_000, 2_000, &[])
            .unwrap();

        let (first, created_first) = db.get_or_create_invitation(&ev.id, &guest.id).unwrap();
        let (second, created_second) = db.get_or_create_invitation(&ev.id, &guest.id).unwrap();

        assert!(created_first);
        assert!(!created_second);
        assert_eq!(first.id, second.id);
        assert_eq!(db.list_invitations_for_event(&ev.id).unwrap().len(), 1);
    }

    #[test]
    fn update_event_rejects_a_window_that_would_invert() {
        let db = setup_db();
        let host = user(&db, "host");
        let ev = db
            .create_event("Window", Some(&host.id), "", 1_000, 2_000, &[])
            .unwrap();

        let err = request_error(
            db.update_event(&ev.id, None, None, Some(3_000), None)
                .unwrap_err(),
        );

        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
        // Untouched on failure.
        let stored = db.get_event(&ev.id).unwrap().unwrap();
        assert_eq!(stored.start_time, 1_000);
        assert_eq!(stored.end_time, 2_000);
    }

    #[test]
    fn list_invitations_for_guest_sees_all_events() {
        let db = setup_db();
        let host = user(&db, "host");
        let guest = user(&db, "guest");
        db.create_event("One", Some(&host.id), "", 1_000, 2_000, &[guest.id.clone()])
            .unwrap();
        db.create_event("Two", Some(&host.id), "", 3_000, 4_000, &[guest.id.clone()])
            .unwrap();

        let invitations = db.list_invitations_for_guest(&guest.id).unwrap();

        assert_eq!(invitations.len(), 2);
    }
}

mod notification_store_tests {
    use super::*;

    #[test]
    fn notifications_list_newest_first() {
        let db = setup_db();
        let alice = user(&db, "alice");
        for message in ["first", "second", "third"] {
            db.notify(&alice.id, NotificationKind::TaskDue, message, None, None)
                .unwrap();
            // Small delay to ensure timestamp difference
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let notes = db.list_notifications(&alice.id, None).unwrap();

        assert_eq!(notes.len(), 3);
        assert_eq!(notes[0].message, "third");
        assert_eq!(notes[2].message, "first");

        let limited = db.list_notifications(&alice.id, Some(2)).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn unread_count_and_mark_read_work_together() {
        let db = setup_db();
        let alice = user(&db, "alice");
        let first = db
            .notify(&alice.id, NotificationKind::TaskDue, "a", None, None)
            .unwrap();
        db.notify(&alice.id, NotificationKind::TaskDue, "b", None, None)
            .unwrap();

        assert_eq!(db.unread_notification_count(&alice.id).unwrap(), 2);

        assert!(db.mark_notification_read(&first.id).unwrap());
        assert_eq!(db.unread_notification_count(&alice.id).unwrap(), 1);

        assert!(!db.mark_notification_read("missing").unwrap());
    }

    #[test]
    fn mark_all_read_returns_the_count_and_is_idempotent() {
        let db = setup_db();
        let alice = user(&db, "alice");
        db.notify(&alice.id, NotificationKind::TaskDue, "a", None, None)
            .unwrap();
        db.notify(&alice.id, NotificationKind::TaskOverdue, "b", None, None)
            .unwrap();

        assert_eq!(db.mark_all_notifications_read(&alice.id).unwrap(), 2);
        assert_eq!(db.mark_all_notifications_read(&alice.id).unwrap(), 0);
        assert_eq!(db.unread_notification_count(&alice.id).unwrap(), 0);
    }

    #[test]
    fn notifications_only_reach_their_addressee() {
        let db = setup_db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        db.notify(&alice.id, NotificationKind::TaskDue, "for alice", None, None)
            .unwrap();

        assert!(db.list_notifications(&bob.id, None).unwrap().is_empty());
    }
}
