//! Read and mutate scheduled meetings.
//!
//! Meetings only come into existence through request approval; this module
//! covers everything after that point. Terminal meetings (completed or
//! cancelled) are frozen, updates and cancellation against them are conflicts.

use chrono::{DateTime, Utc};

use crate::db::{Meeting, MeetingDb, MeetingFilter};
use crate::error::WorkflowError;
use crate::notify::{self, Notifier};
use crate::types::MeetingChanges;

pub fn get_meeting(db: &MeetingDb, id: &str) -> Result<Meeting, WorkflowError> {
    db.get_meeting(id)?
        .ok_or_else(|| WorkflowError::NotFound(format!("Meeting {id} not found")))
}

pub fn list_meetings(
    db: &MeetingDb,
    filter: &MeetingFilter,
    now: DateTime<Utc>,
) -> Result<Vec<Meeting>, WorkflowError> {
    Ok(db.list_meetings(filter, now)?)
}

/// Meetings in the next `hours` where the user is requester or approver,
/// not yet completed or cancelled, soonest first.
pub fn upcoming_for_user(
    db: &MeetingDb,
    user_email: &str,
    hours: i64,
    now: DateTime<Utc>,
) -> Result<Vec<Meeting>, WorkflowError> {
    let meetings = db.active_meetings_in_window(now, hours)?;
    Ok(meetings
        .into_iter()
        .filter(|m| m.participants().contains(&user_email))
        .collect())
}

/// Apply a partial update to a non-terminal meeting.
pub fn update_meeting(
    db: &MeetingDb,
    id: &str,
    changes: &MeetingChanges,
    now: DateTime<Utc>,
) -> Result<Meeting, WorkflowError> {
    if let Some(duration) = changes.duration_minutes {
        if duration <= 0 {
            return Err(WorkflowError::Validation(
                "durationMinutes must be positive".to_string(),
            ));
        }
    }

    let meeting = get_meeting(db, id)?;
    if meeting.status.is_terminal() {
        return Err(WorkflowError::Conflict(format!(
            "Meeting {id} is {} and can no longer change",
            meeting.status.as_str()
        )));
    }

    db.update_meeting(id, changes, now)?;
    get_meeting(db, id)
}

/// Cancel a non-terminal meeting and tell everyone involved.
pub fn cancel_meeting(
    db: &MeetingDb,
    notifier: &dyn Notifier,
    id: &str,
    now: DateTime<Utc>,
) -> Result<Meeting, WorkflowError> {
    let meeting = get_meeting(db, id)?;

    let affected = db.cancel_meeting(id, now)?;
    if affected == 0 {
        return Err(WorkflowError::Conflict(format!(
            "Meeting {id} is {} and cannot be cancelled",
            meeting.status.as_str()
        )));
    }

    for recipient in meeting.participants() {
        let notification = notify::meeting_cancelled_notification(recipient, &meeting);
        if let Err(e) = notifier.send(&notification) {
            log::warn!(
                "Failed to notify {} about cancellation of {}: {}",
                recipient,
                id,
                e
            );
        }
    }

    log::info!("Cancelled meeting {}", id);
    get_meeting(db, id)
}
