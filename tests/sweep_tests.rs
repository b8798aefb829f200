//! Integration tests for the batch sweeper.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use planboard::db::Database;
use planboard::sweep;
use planboard::types::{AssignmentStatus, EventStatus, TaskStatus, User};

const CUTOFF_HOUR: u32 = 23;

fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn user(db: &Database, name: &str) -> User {
    db.create_user(name).expect("Failed to create user")
}

fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

fn date(y: i32, mo: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, mo, d).unwrap()
}

mod task_rules {
    use super::*;

    #[test]
    fn task_past_due_becomes_overdue() {
        let db = setup_db();
        let owner = user(&db, "owner");
        let task = db
            .create_task("Late", Some(&owner.id), "", Some(date(2026, 8, 1)), &[])
            .unwrap();

        let report = sweep::run(&db, CUTOFF_HOUR, dt(2026, 8, 6, 10, 0), false);

        assert_eq!(report.tasks_overdue.len(), 1);
        assert_eq!(report.tasks_overdue[0].id, task.id);
        assert_eq!(
            db.get_task(&task.id).unwrap().unwrap().status,
            TaskStatus::Overdue
        );
    }

    #[test]
    fn task_due_today_is_spared_before_the_cutoff_hour() {
        let db = setup_db();
        let owner = user(&db, "owner");
        let task = db
            .create_task("Today", Some(&owner.id), "", Some(date(2026, 8, 6)), &[])
            .unwrap();

        let report = sweep::run(&db, CUTOFF_HOUR, dt(2026, 8, 6, 10, 0), false);

        assert!(report.tasks_overdue.is_empty());
        assert_eq!(
            db.get_task(&task.id).unwrap().unwrap().status,
            TaskStatus::Pending
        );
    }

    #[test]
    fn task_due_today_goes_overdue_at_the_cutoff_hour() {
        let db = setup_db();
        let owner = user(&db, "owner");
        let task = db
            .create_task("Today", Some(&owner.id), "", Some(date(2026, 8, 6)), &[])
            .unwrap();

        let report = sweep::run(&db, CUTOFF_HOUR, dt(2026, 8, 6, 23, 0), false);

        assert_eq!(report.tasks_overdue.len(), 1);
        assert_eq!(
            db.get_task(&task.id).unwrap().unwrap().status,
            TaskStatus::Overdue
        );
    }

    #[test]
    fn complete_and_undated_tasks_are_left_alone() {
        let db = setup_db();
        let owner = user(&db, "owner");
        let worker = user(&db, "worker");
        let undated = db
            .create_task("Undated", Some(&owner.id), "", None, &[])
            .unwrap();
        let done = db
            .create_task(
                "Done",
                Some(&owner.id),
                "",
                Some(date(2026, 8, 1)),
                &[worker.id.clone()],
            )
            .unwrap();
        let a = db.list_assignments_for_task(&done.id).unwrap().remove(0);
        db.set_assignment_completed(&a.id, dt(2026, 8, 2, 9, 0).timestamp_millis())
            .unwrap();
        planboard::reconcile::task::refresh_status(&db, &done.id, dt(2026, 8, 2, 9, 0)).unwrap();

        let report = sweep::run(&db, CUTOFF_HOUR, dt(2026, 8, 6, 10, 0), false);

        assert!(report.tasks_overdue.is_empty());
        assert_eq!(
            db.get_task(&undated.id).unwrap().unwrap().status,
            TaskStatus::Pending
        );
        assert_eq!(
            db.get_task(&done.id).unwrap().unwrap().status,
            TaskStatus::Complete
        );
    }
}

mod assignment_rules {
    use super::*;

    #[test]
    fn pending_assignment_under_a_late_task_becomes_overdue() {
        let db = setup_db();
        let owner = user(&db, "owner");
        let alice = user(&db, "alice");
        let task = db
            .create_task(
                "Late",
                Some(&owner.id),
                "",
                Some(date(2026, 8, 1)),
                &[alice.id.clone()],
            )
            .unwrap();

        let report = sweep::run(&db, CUTOFF_HOUR, dt(2026, 8, 6, 10, 0), false);

        assert_eq!(report.assignments_overdue.len(), 1);
        assert_eq!(report.assignments_overdue[0].username, "alice");
        let a = db.list_assignments_for_task(&task.id).unwrap().remove(0);
        assert_eq!(a.status, AssignmentStatus::Overdue);
    }

    #[test]
    fn assignment_due_today_is_not_touched() {
        let db = setup_db();
        let owner = user(&db, "owner");
        let alice = user(&db, "alice");
        let task = db
            .create_task(
                "Today",
                Some(&owner.id),
                "",
                Some(date(2026, 8, 6)),
                &[alice.id.clone()],
            )
            .unwrap();

        let report = sweep::run(&db, CUTOFF_HOUR, dt(2026, 8, 6, 23, 30), false);

        // The task itself goes overdue at the cutoff, but its assignments
        // only follow once the due date is strictly past.
        assert_eq!(report.tasks_overdue.len(), 1);
        assert!(report.assignments_overdue.is_empty());
        let a = db.list_assignments_for_task(&task.id).unwrap().remove(0);
        assert_eq!(a.status, AssignmentStatus::Pending);
    }

    #[test]
    fn pending_assignment_under_a_complete_task_is_completed_with_sweep_time() {
        let db = setup_db();
        let owner = user(&db, "owner");
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let task = db
            .create_task("Wrapped", Some(&owner.id), "", None, &[alice.id.clone()])
            .unwrap();
        let a = db.list_assignments_for_task(&task.id).unwrap().remove(0);
        planboard::reconcile::assignment::complete(&db, &a.id, &alice.id, dt(2026, 8, 5, 9, 0))
            .unwrap();
        // A straggler assigned after the task already completed.
        db.create_assignment(&task.id, &bob.id, Some(&owner.id))
            .unwrap();

        let now = dt(2026, 8, 6, 10, 0);
        let report = sweep::run(&db, CUTOFF_HOUR, now, false);

        assert_eq!(report.assignments_completed.len(), 1);
        assert_eq!(report.assignments_completed[0].username, "bob");
        let straggler = db
            .list_assignments_for_task(&task.id)
            .unwrap()
            .into_iter()
            .find(|x| x.user_id == bob.id)
            .unwrap();
        assert_eq!(straggler.status, AssignmentStatus::Completed);
        assert_eq!(straggler.completed_at, Some(now.timestamp_millis()));
    }
}

mod event_rules {
    use super::*;

    fn make_event(db: &Database, host: &User, title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        db.create_event(
            title,
            Some(&host.id),
            "",
            start.timestamp_millis(),
            end.timestamp_millis(),
            &[],
        )
        .unwrap()
        .id
    }

    #[test]
    fn upcoming_event_inside_its_window_becomes_ongoing() {
        let db = setup_db();
        let host = user(&db, "host");
        let now = dt(2026, 8, 6, 18, 0);
        let id = make_event(
            &db,
            &host,
            "Running",
            now - chrono::Duration::hours(1),
            now + chrono::Duration::hours(1),
        );

        let report = sweep::run(&db, CUTOFF_HOUR, now, false);

        assert_eq!(report.events_started.len(), 1);
        assert_eq!(
            db.get_event(&id).unwrap().unwrap().status,
            EventStatus::Ongoing
        );
    }

    #[test]
    fn events_past_their_end_become_ended() {
        let db = setup_db();
        let host = user(&db, "host");
        let now = dt(2026, 8, 6, 18, 0);
        let upcoming_id = make_event(
            &db,
            &host,
            "Missed",
            now - chrono::Duration::hours(3),
            now - chrono::Duration::hours(2),
        );
        let ongoing_id = make_event(
            &db,
            &host,
            "Finished",
            now - chrono::Duration::hours(5),
            now - chrono::Duration::hours(4),
        );
        db.mark_events_ongoing((now - chrono::Duration::hours(5)).timestamp_millis())
            .unwrap();

        let report = sweep::run(&db, CUTOFF_HOUR, now, false);

        assert_eq!(report.events_ended.len(), 2);
        assert_eq!(
            db.get_event(&upcoming_id).unwrap().unwrap().status,
            EventStatus::Ended
        );
        assert_eq!(
            db.get_event(&ongoing_id).unwrap().unwrap().status,
            EventStatus::Ended
        );
    }

    #[test]
    fn future_events_stay_upcoming() {
        let db = setup_db();
        let host = user(&db, "host");
        let now = dt(2026, 8, 6, 18, 0);
        let id = make_event(
            &db,
            &host,
            "Later",
            now + chrono::Duration::hours(1),
            now + chrono::Duration::hours(2),
        );

        let report = sweep::run(&db, CUTOFF_HOUR, now, false);

        assert!(report.events_started.is_empty());
        assert!(report.events_ended.is_empty());
        assert_eq!(
            db.get_event(&id).unwrap().unwrap().status,
            EventStatus::Upcoming
        );
    }
}

mod sweep_behavior {
    use super::*;

    #[test]
    fn dry_run_reports_without_writing() {
        let db = setup_db();
        let owner = user(&db, "owner");
        let alice = user(&db, "alice");
        let task = db
            .create_task(
                "Late",
                Some(&owner.id),
                "",
                Some(date(2026, 8, 1)),
                &[alice.id.clone()],
            )
            .unwrap();
        let now = dt(2026, 8, 6, 18, 0);
        let event = db
            .create_event(
                "Past",
                Some(&owner.id),
                "",
                (now - chrono::Duration::hours(2)).timestamp_millis(),
                (now - chrono::Duration::hours(1)).timestamp_millis(),
                &[],
            )
            .unwrap();

        let report = sweep::run(&db, CUTOFF_HOUR, now, true);

        assert!(report.dry_run);
        assert_eq!(report.tasks_overdue.len(), 1);
        assert_eq!(report.assignments_overdue.len(), 1);
        assert_eq!(report.events_ended.len(), 1);

        assert_eq!(
            db.get_task(&task.id).unwrap().unwrap().status,
            TaskStatus::Pending
        );
        let a = db.list_assignments_for_task(&task.id).unwrap().remove(0);
        assert_eq!(a.status, AssignmentStatus::Pending);
        assert_eq!(
            db.get_event(&event.id).unwrap().unwrap().status,
            EventStatus::Upcoming
        );
    }

    #[test]
    fn sweep_emits_no_notifications() {
        let db = setup_db();
        let owner = user(&db, "owner");
        let alice = user(&db, "alice");
        db.create_task(
            "Late",
            Some(&owner.id),
            "",
            Some(date(2026, 8, 1)),
            &[alice.id.clone()],
        )
        .unwrap();

        let report = sweep::run(&db, CUTOFF_HOUR, dt(2026, 8, 6, 10, 0), false);

        assert!(report.total_changes() > 0);
        assert!(db.list_notifications(&owner.id, None).unwrap().is_empty());
        assert!(db.list_notifications(&alice.id, None).unwrap().is_empty());
    }

    #[test]
    fn sweeping_twice_finds_nothing_the_second_time() {
        let db = setup_db();
        let owner = user(&db, "owner");
        let alice = user(&db, "alice");
        db.create_task(
            "Late",
            Some(&owner.id),
            "",
            Some(date(2026, 8, 1)),
            &[alice.id.clone()],
        )
        .unwrap();

        let now = dt(2026, 8, 6, 10, 0);
        let first = sweep::run(&db, CUTOFF_HOUR, now, false);
        let second = sweep::run(&db, CUTOFF_HOUR, now, false);

        assert!(first.total_changes() > 0);
        assert_eq!(second.total_changes(), 0);
    }

    #[test]
    fn report_renders_a_human_readable_summary() {
        let db = setup_db();
        let owner = user(&db, "owner");
        db.create_task("Late", Some(&owner.id), "", Some(date(2026, 8, 1)), &[])
            .unwrap();

        let report = sweep::run(&db, CUTOFF_HOUR, dt(2026, 8, 6, 10, 0), true);
        let text = report.to_string();

        assert!(text.contains("DRY RUN MODE"));
        assert!(text.contains("Would update 1 tasks to overdue status"));
        assert!(text.contains("- Task: Late (due: 2026-08-01)"));
        assert!(text.contains("Dry run completed"));
    }
}
