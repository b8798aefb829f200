//! Event status reconciliation and invitation fanout.

use super::{fmt_instant, load_event, require_host};
use crate::db::Database;
use crate::error::{RequestError, RequestResult};
use crate::types::{EventStatus, NotificationKind};
use chrono::{DateTime, Utc};

/// What an update_status call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusOutcome {
    pub status: EventStatus,
    pub notifications_sent: u32,
}

/// What an invite fanout did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InviteOutcome {
    /// Invitations newly created by this call (existing responses are
    /// never overwritten).
    pub invitations_created: u32,
    /// Guests notified: one per guest in the set, whether or not the
    /// invitation already existed.
    pub guests_notified: u32,
    /// The event's total guest count reported to the host.
    pub guest_total: i64,
}

/// Re-derive an event's status from `now` against [start_time, end_time].
///
/// Entering or sitting in the ongoing/ended window notifies the host and
/// every accepted guest, on every call rather than only the transition
/// edge. Host-only.
pub fn update_status(
    db: &Database,
    event_id: &str,
    actor: &str,
    now: DateTime<Utc>,
) -> RequestResult<StatusOutcome> {
    let event = load_event(db, event_id)?;
    let host = require_host(&event, actor)?;

    let now_ms = now.timestamp_millis();

    if now_ms < event.start_time {
        db.set_event_status(event_id, EventStatus::Upcoming)?;
        return Ok(StatusOutcome {
            status: EventStatus::Upcoming,
            notifications_sent: 0,
        });
    }

    if now_ms <= event.end_time {
        db.set_event_status(event_id, EventStatus::Ongoing)?;

        db.notify(
            host,
            NotificationKind::EventStarted,
            &format!("Your event {} has started.", event.title),
            None,
            Some(event_id),
        )?;
        let mut notifications_sent = 1;

        for invitation in db.list_accepted_invitations(event_id)? {
            db.notify(
                &invitation.guest_id,
                NotificationKind::EventStarted,
                &format!("The event {} has started.", event.title),
                None,
                Some(event_id),
            )?;
            notifications_sent += 1;
        }

        return Ok(StatusOutcome {
            status: EventStatus::Ongoing,
            notifications_sent,
        });
    }

    db.set_event_status(event_id, EventStatus::Ended)?;

    db.notify(
        host,
        NotificationKind::EventEnded,
        &format!("Your event {} has ended.", event.title),
        None,
        Some(event_id),
    )?;
    let mut notifications_sent = 1;

    for invitation in db.list_accepted_invitations(event_id)? {
        db.notify(
            &invitation.guest_id,
            NotificationKind::EventEnded,
            &format!("The event {} has ended.", event.title),
            None,
            Some(event_id),
        )?;
        notifications_sent += 1;
    }

    Ok(StatusOutcome {
        status: EventStatus::Ended,
        notifications_sent,
    })
}

/// Invite a set of guests to an event. Host-only.
///
/// Each guest gets an invitation unless one already exists for the
/// (event, guest) pair (get-or-create, never overwriting an existing
/// response) and an invited notification either way. The host then gets
/// one summary notification carrying the event's total guest count. All
/// guest ids are validated before any invitation or notification is
/// written.
pub fn invite(
    db: &Database,
    event_id: &str,
    actor: &str,
    guest_ids: &[String],
) -> RequestResult<InviteOutcome> {
    let event = load_event(db, event_id)?;
    let host = require_host(&event, actor)?;

    for guest_id in guest_ids {
        if db.get_user(guest_id)?.is_none() {
            return Err(RequestError::user_not_found(guest_id));
        }
    }

    let window = format!(
        "{} - {}",
        fmt_instant(event.start_time),
        fmt_instant(event.end_time)
    );

    let mut invitations_created = 0;
    let mut guests_notified = 0;
    for guest_id in guest_ids {
        let (_, created) = db.get_or_create_invitation(event_id, guest_id)?;
        if created {
            invitations_created += 1;
        }

        db.notify(
            guest_id,
            NotificationKind::EventInvited,
            &format!("You have been invited to {} on {}.", event.title, window),
            None,
            Some(event_id),
        )?;
        guests_notified += 1;
    }

    let guest_total = db.count_invitations(event_id)?;
    db.notify(
        host,
        NotificationKind::EventInvitedHost,
        &format!(
            "You have invited {} guests to {}.",
            guest_total, event.title
        ),
        None,
        Some(event_id),
    )?;

    Ok(InviteOutcome {
        invitations_created,
        guests_notified,
        guest_total,
    })
}

/// Count of guests who accepted. Pure query.
pub fn count_guests(db: &Database, event_id: &str) -> RequestResult<i64> {
    load_event(db, event_id)?;
    Ok(db.count_accepted_invitations(event_id)?)
}

/// Remind the host and every accepted guest about the event. Host-only,
/// no status change. Returns the count sent.
pub fn send_reminder(db: &Database, event_id: &str, actor: &str) -> RequestResult<u32> {
    let event = load_event(db, event_id)?;
    let host = require_host(&event, actor)?;

    let window = format!(
        "{} - {}",
        fmt_instant(event.start_time),
        fmt_instant(event.end_time)
    );

    db.notify(
        host,
        NotificationKind::EventReminder,
        &format!(
            "Reminder: You host the event {} on {}.",
            event.title, window
        ),
        None,
        Some(event_id),
    )?;
    let mut sent = 1;

    for invitation in db.list_accepted_invitations(event_id)? {
        db.notify(
            &invitation.guest_id,
            NotificationKind::EventReminder,
            &format!("Reminder: You have an event {} on {}.", event.title, window),
            None,
            Some(event_id),
        )?;
        sent += 1;
    }

    Ok(sent)
}

/// Delete an event outright. Host-only. Invitations cascade and
/// notification references null out; there is no cancelled status.
pub fn delete(db: &Database, event_id: &str, actor: &str) -> RequestResult<()> {
    let event = load_event(db, event_id)?;
    require_host(&event, actor)?;

    db.delete_event(event_id)?;
    Ok(())
}
