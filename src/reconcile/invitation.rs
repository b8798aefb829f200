//! Invitation responses.

use super::{load_event, load_invitation, load_user};
use crate::db::Database;
use crate::error::{RequestError, RequestResult};
use crate::types::{InvitationStatus, NotificationKind};
use chrono::{DateTime, Utc};

/// Accept an invitation as its guest. Notifies the guest and the host.
///
/// Responding again to an already-responded invitation is permitted: the
/// response time is re-stamped and both notifications are re-sent.
pub fn accept(
    db: &Database,
    invitation_id: &str,
    actor: &str,
    now: DateTime<Utc>,
) -> RequestResult<u32> {
    respond(db, invitation_id, actor, now, InvitationStatus::Accepted)
}

/// Decline an invitation as its guest. Notifies the guest and the host.
pub fn decline(
    db: &Database,
    invitation_id: &str,
    actor: &str,
    now: DateTime<Utc>,
) -> RequestResult<u32> {
    respond(db, invitation_id, actor, now, InvitationStatus::Rejected)
}

fn respond(
    db: &Database,
    invitation_id: &str,
    actor: &str,
    now: DateTime<Utc>,
    status: InvitationStatus,
) -> RequestResult<u32> {
    let invitation = load_invitation(db, invitation_id)?;

    if invitation.guest_id != actor {
        return Err(RequestError::not_guest(actor, invitation_id));
    }

    let event = load_event(db, &invitation.event_id)?;

    db.set_invitation_response(invitation_id, status, now.timestamp_millis())?;

    let (guest_kind, host_kind, verb) = match status {
        InvitationStatus::Accepted => (
            NotificationKind::InvitationAccepted,
            NotificationKind::InvitationAcceptedHost,
            "accepted",
        ),
        InvitationStatus::Rejected => (
            NotificationKind::InvitationRejected,
            NotificationKind::InvitationRejectedHost,
            "rejected",
        ),
        InvitationStatus::Pending => {
            return Err(RequestError::internal("cannot respond with pending"));
        }
    };

    db.notify(
        &invitation.guest_id,
        guest_kind,
        &format!("You have {} the invitation to {}.", verb, event.title),
        None,
        Some(&event.id),
    )?;
    let mut sent = 1;

    if let Some(host) = &event.host_id {
        let guest = load_user(db, &invitation.guest_id)?;
        db.notify(
            host,
            host_kind,
            &format!(
                "{} has {} the invitation to {}.",
                guest.username, verb, event.title
            ),
            None,
            Some(&event.id),
        )?;
        sent += 1;
    }

    Ok(sent)
}
