//! Meeting request lifecycle: submit, approve, reject, delete.
//!
//! Approval is the only dual-write in the system. It creates the confirmed
//! meeting and flips the request inside one transaction, with a conditional
//! update on `status = 'pending'` so two racing approvals cannot both win.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::{Meeting, MeetingDb, MeetingRequest, RequestFilter};
use crate::error::WorkflowError;
use crate::notify::{self, Notifier};
use crate::types::{ensure_utc, MeetingKind, MeetingStatus, RequestDraft, RequestStatus};

const DEFAULT_DURATION_MINUTES: i64 = 60;

fn require_email(value: &str, field: &str) -> Result<(), WorkflowError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return Err(WorkflowError::Validation(format!(
            "{field} must be a valid email address"
        )));
    }
    Ok(())
}

/// Validate and persist a new pending request, then tell the approver.
pub fn submit_request(
    db: &MeetingDb,
    notifier: &dyn Notifier,
    draft: RequestDraft,
    now: DateTime<Utc>,
) -> Result<MeetingRequest, WorkflowError> {
    if draft.project_id.trim().is_empty() {
        return Err(WorkflowError::Validation(
            "projectId must not be empty".to_string(),
        ));
    }
    require_email(&draft.requester_email, "requesterEmail")?;
    require_email(&draft.approver_email, "approverEmail")?;
    if draft.agenda.trim().is_empty() {
        return Err(WorkflowError::Validation(
            "agenda must not be empty".to_string(),
        ));
    }
    if let Some(duration) = draft.duration_minutes {
        if duration <= 0 {
            return Err(WorkflowError::Validation(
                "durationMinutes must be positive".to_string(),
            ));
        }
    }

    let preferred_at = ensure_utc(draft.preferred_at);

    let request = MeetingRequest {
        id: Uuid::new_v4().to_string(),
        project_id: draft.project_id.trim().to_string(),
        requester_email: draft.requester_email.trim().to_string(),
        approver_email: draft.approver_email.trim().to_string(),
        title: draft.title,
        agenda: draft.agenda,
        preferred_at,
        duration_minutes: draft.duration_minutes,
        kind: draft.kind,
        location: draft.location,
        status: RequestStatus::Pending,
        rejection_reason: None,
        meeting_id: None,
        created_at: now,
        updated_at: now,
    };
    db.insert_request(&request)?;

    let notification = notify::request_submitted_notification(
        &request.approver_email,
        &request.requester_email,
        request.title.as_deref(),
    );
    if let Err(e) = notifier.send(&notification) {
        log::warn!(
            "Failed to notify approver {} about request {}: {}",
            request.approver_email,
            request.id,
            e
        );
    }

    log::info!(
        "Submitted meeting request {} for project {}",
        request.id,
        request.project_id
    );
    Ok(request)
}

/// Approve a pending request: create the confirmed meeting and link it to the
/// request atomically. A request that is no longer pending is a conflict.
/// The approver may override the instant; otherwise the requester's preferred
/// time stands.
pub fn approve_request(
    db: &MeetingDb,
    notifier: &dyn Notifier,
    id: &str,
    override_at: Option<chrono::DateTime<chrono::FixedOffset>>,
    now: DateTime<Utc>,
) -> Result<Meeting, WorkflowError> {
    let request = db
        .get_request(id)?
        .ok_or_else(|| WorkflowError::NotFound(format!("Meeting request {id} not found")))?;
    if request.status != RequestStatus::Pending {
        return Err(WorkflowError::Conflict(format!(
            "Meeting request {id} is already {}",
            request.status.as_str()
        )));
    }

    let scheduled_at = override_at.map(ensure_utc).unwrap_or(request.preferred_at);

    let meeting = Meeting {
        id: Uuid::new_v4().to_string(),
        project_id: request.project_id.clone(),
        title: request.title.clone(),
        scheduled_at,
        duration_minutes: request
            .duration_minutes
            .unwrap_or(DEFAULT_DURATION_MINUTES),
        location: request.location.clone(),
        meeting_link: None,
        kind: request.kind.unwrap_or(MeetingKind::Virtual),
        status: MeetingStatus::Confirmed,
        requester_email: request.requester_email.clone(),
        approver_email: request.approver_email.clone(),
        agenda: Some(request.agenda.clone()),
        notes: None,
        is_recurring: false,
        recurrence_pattern: None,
        recurrence_end_date: None,
        created_at: now,
        updated_at: now,
    };

    db.with_transaction(|db| {
        db.insert_meeting(&meeting)?;
        let affected = db.mark_request_approved(id, &meeting.id, now)?;
        if affected == 0 {
            // A concurrent approve or reject got here first
            return Err(WorkflowError::Conflict(format!(
                "Meeting request {id} is no longer pending"
            )));
        }
        Ok(())
    })?;

    let notification = notify::request_approved_notification(&request.requester_email, &meeting);
    if let Err(e) = notifier.send(&notification) {
        log::warn!(
            "Failed to notify requester {} about approval of {}: {}",
            request.requester_email,
            id,
            e
        );
    }

    log::info!("Approved request {} as meeting {}", id, meeting.id);
    Ok(meeting)
}

/// Reject a pending request. A reason is required and is surfaced to the
/// requester.
pub fn reject_request(
    db: &MeetingDb,
    notifier: &dyn Notifier,
    id: &str,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<MeetingRequest, WorkflowError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(WorkflowError::Validation(
            "A rejection reason is required".to_string(),
        ));
    }

    let request = db
        .get_request(id)?
        .ok_or_else(|| WorkflowError::NotFound(format!("Meeting request {id} not found")))?;
    if request.status != RequestStatus::Pending {
        return Err(WorkflowError::Conflict(format!(
            "Meeting request {id} is already {}",
            request.status.as_str()
        )));
    }

    let affected = db.mark_request_rejected(id, reason, now)?;
    if affected == 0 {
        return Err(WorkflowError::Conflict(format!(
            "Meeting request {id} is no longer pending"
        )));
    }

    let notification = notify::request_rejected_notification(&request.requester_email, reason);
    if let Err(e) = notifier.send(&notification) {
        log::warn!(
            "Failed to notify requester {} about rejection of {}: {}",
            request.requester_email,
            id,
            e
        );
    }

    log::info!("Rejected request {}", id);
    db.get_request(id)?
        .ok_or_else(|| WorkflowError::NotFound(format!("Meeting request {id} not found")))
}

/// Remove a request outright, whatever its status. Approved requests keep
/// their meeting; only the request row goes away.
pub fn delete_request(db: &MeetingDb, id: &str) -> Result<(), WorkflowError> {
    let affected = db.delete_request(id)?;
    if affected == 0 {
        return Err(WorkflowError::NotFound(format!(
            "Meeting request {id} not found"
        )));
    }
    log::info!("Deleted request {}", id);
    Ok(())
}

pub fn get_request(db: &MeetingDb, id: &str) -> Result<MeetingRequest, WorkflowError> {
    db.get_request(id)?
        .ok_or_else(|| WorkflowError::NotFound(format!("Meeting request {id} not found")))
}

pub fn list_requests(
    db: &MeetingDb,
    filter: &RequestFilter,
) -> Result<Vec<MeetingRequest>, WorkflowError> {
    Ok(db.list_requests(filter)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;
    use crate::error::WorkflowError;
    use crate::notify::test_utils::RecordingNotifier;
    use chrono::{FixedOffset, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 20, 9, 0, 0).unwrap()
    }

    fn sample_draft() -> RequestDraft {
        RequestDraft {
            project_id: "proj-1".into(),
            requester_email: "student@example.com".into(),
            approver_email: "supervisor@example.com".into(),
            title: Some("Thesis check-in".into()),
            agenda: "Review chapter 3 draft".into(),
            preferred_at: FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2025, 6, 1, 10, 0, 0)
                .unwrap(),
            duration_minutes: Some(30),
            kind: None,
            location: None,
        }
    }

    #[test]
    fn test_submit_persists_pending_and_notifies_approver() {
        let db = test_db();
        let notifier = RecordingNotifier::default();

        let request = submit_request(&db, &notifier, sample_draft(), now()).expect("submit");
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(request.meeting_id.is_none());

        let stored = db.get_request(&request.id).unwrap().unwrap();
        assert_eq!(stored.agenda, "Review chapter 3 draft");

        let to_approver = notifier.sent_to("supervisor@example.com");
        assert_eq!(to_approver.len(), 1);
        assert!(to_approver[0].body.contains("student@example.com"));
    }

    #[test]
    fn test_submit_rejects_blank_agenda_and_bad_email() {
        let db = test_db();
        let notifier = RecordingNotifier::default();

        let mut draft = sample_draft();
        draft.agenda = "   ".into();
        let err = submit_request(&db, &notifier, draft, now()).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        let mut draft = sample_draft();
        draft.approver_email = "not-an-email".into();
        let err = submit_request(&db, &notifier, draft, now()).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        assert_eq!(notifier.count(), 0);
    }

    #[test]
    fn test_submit_normalizes_offset_to_utc() {
        let db = test_db();
        let notifier = RecordingNotifier::default();

        let mut draft = sample_draft();
        // 10:00 at +02:00 is 08:00 UTC
        draft.preferred_at = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 6, 1, 10, 0, 0)
            .unwrap();
        let request = submit_request(&db, &notifier, draft, now()).expect("submit");
        assert_eq!(
            request.preferred_at,
            Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_approve_creates_confirmed_meeting_and_links_request() {
        let db = test_db();
        let notifier = RecordingNotifier::default();
        let request = submit_request(&db, &notifier, sample_draft(), now()).unwrap();

        let meeting = approve_request(&db, &notifier, &request.id, None, now()).expect("approve");

        assert_eq!(meeting.status, MeetingStatus::Confirmed);
        assert_eq!(meeting.scheduled_at, request.preferred_at);
        assert_eq!(meeting.duration_minutes, 30);
        assert_eq!(meeting.agenda.as_deref(), Some("Review chapter 3 draft"));

        let stored = db.get_request(&request.id).unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Approved);
        assert_eq!(stored.meeting_id.as_deref(), Some(meeting.id.as_str()));

        let to_requester = notifier.sent_to("student@example.com");
        assert_eq!(to_requester.len(), 1);
        assert!(to_requester[0].title.contains("approved"));
    }

    #[test]
    fn test_approve_override_instant_wins_and_is_utc_normalized() {
        let db = test_db();
        let notifier = RecordingNotifier::default();
        let request = submit_request(&db, &notifier, sample_draft(), now()).unwrap();

        // 15:00 at +02:00 is 13:00 UTC
        let override_at = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 6, 2, 15, 0, 0)
            .unwrap();
        let meeting =
            approve_request(&db, &notifier, &request.id, Some(override_at), now()).unwrap();
        assert_eq!(
            meeting.scheduled_at,
            Utc.with_ymd_and_hms(2025, 6, 2, 13, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_approve_applies_duration_and_kind_defaults() {
        let db = test_db();
        let notifier = RecordingNotifier::default();
        let mut draft = sample_draft();
        draft.duration_minutes = None;
        draft.kind = None;
        let request = submit_request(&db, &notifier, draft, now()).unwrap();

        let meeting = approve_request(&db, &notifier, &request.id, None, now()).unwrap();
        assert_eq!(meeting.duration_minutes, 60);
        assert_eq!(meeting.kind, MeetingKind::Virtual);
    }

    #[test]
    fn test_second_approve_is_a_conflict() {
        let db = test_db();
        let notifier = RecordingNotifier::default();
        let request = submit_request(&db, &notifier, sample_draft(), now()).unwrap();

        approve_request(&db, &notifier, &request.id, None, now()).expect("first approve");
        let err = approve_request(&db, &notifier, &request.id, None, now()).unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));

        // Exactly one meeting exists for the request
        let stored = db.get_request(&request.id).unwrap().unwrap();
        let count: i64 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM meetings", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(stored.status, RequestStatus::Approved);
    }

    #[test]
    fn test_approve_missing_request_is_not_found() {
        let db = test_db();
        let notifier = RecordingNotifier::default();
        let err = approve_request(&db, &notifier, "nope", None, now()).unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[test]
    fn test_reject_requires_reason_and_records_it() {
        let db = test_db();
        let notifier = RecordingNotifier::default();
        let request = submit_request(&db, &notifier, sample_draft(), now()).unwrap();

        let err = reject_request(&db, &notifier, &request.id, "  ", now()).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        let rejected =
            reject_request(&db, &notifier, &request.id, "Out of office that week", now())
                .expect("reject");
        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert_eq!(
            rejected.rejection_reason.as_deref(),
            Some("Out of office that week")
        );

        let to_requester = notifier.sent_to("student@example.com");
        assert_eq!(to_requester.len(), 1);
        assert!(to_requester[0].body.contains("Out of office that week"));
    }

    #[test]
    fn test_reject_after_approve_is_a_conflict() {
        let db = test_db();
        let notifier = RecordingNotifier::default();
        let request = submit_request(&db, &notifier, sample_draft(), now()).unwrap();

        approve_request(&db, &notifier, &request.id, None, now()).unwrap();
        let err = reject_request(&db, &notifier, &request.id, "Too late", now()).unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));
    }

    #[test]
    fn test_delete_removes_any_request() {
        let db = test_db();
        let notifier = RecordingNotifier::default();
        let pending = submit_request(&db, &notifier, sample_draft(), now()).unwrap();
        let decided = submit_request(&db, &notifier, sample_draft(), now()).unwrap();
        let meeting = approve_request(&db, &notifier, &decided.id, None, now()).unwrap();

        delete_request(&db, &pending.id).expect("delete pending");
        assert!(db.get_request(&pending.id).unwrap().is_none());

        // Deleting a decided request drops the row but not its meeting
        delete_request(&db, &decided.id).expect("delete approved");
        assert!(db.get_meeting(&meeting.id).unwrap().is_some());

        let err = delete_request(&db, &pending.id).unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[test]
    fn test_notification_failure_does_not_block_state_change() {
        let db = test_db();
        let notifier = RecordingNotifier::default();
        notifier.fail_sends_to("supervisor@example.com");

        let request = submit_request(&db, &notifier, sample_draft(), now()).expect("submit");
        assert!(db.get_request(&request.id).unwrap().is_some());
        assert_eq!(notifier.count(), 0);
    }
}
