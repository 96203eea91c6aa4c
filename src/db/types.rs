//! Shared type definitions for the database layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{MeetingKind, MeetingStatus, RequestStatus};

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),

    #[error("Corrupt row {id}: {reason}")]
    CorruptRow { id: String, reason: String },
}

/// A row from the `meeting_requests` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRequest {
    pub id: String,
    pub project_id: String,
    pub requester_email: String,
    pub approver_email: String,
    pub title: Option<String>,
    pub agenda: String,
    /// Always UTC-normalized.
    pub preferred_at: DateTime<Utc>,
    pub duration_minutes: Option<i64>,
    pub kind: Option<MeetingKind>,
    pub location: Option<String>,
    pub status: RequestStatus,
    /// Present iff status is `Rejected`.
    pub rejection_reason: Option<String>,
    /// Back-reference to the created Meeting, present iff status is `Approved`.
    pub meeting_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `meetings` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: String,
    pub project_id: String,
    pub title: Option<String>,
    /// Always UTC-normalized.
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub location: Option<String>,
    pub meeting_link: Option<String>,
    pub kind: MeetingKind,
    pub status: MeetingStatus,
    pub requester_email: String,
    pub approver_email: String,
    pub agenda: Option<String>,
    pub notes: Option<String>,
    pub is_recurring: bool,
    pub recurrence_pattern: Option<String>,
    pub recurrence_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    /// Distinct non-empty participant emails, requester first.
    pub fn participants(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(2);
        for email in [self.requester_email.as_str(), self.approver_email.as_str()] {
            if !email.is_empty() && !out.contains(&email) {
                out.push(email);
            }
        }
        out
    }
}

/// A row from the `meeting_reminders` table — the dedup ledger for sent
/// reminders, keyed by (meeting_id, recipient_email, minutes_before).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRecord {
    pub id: String,
    pub meeting_id: String,
    pub recipient_email: String,
    pub minutes_before: i64,
    pub is_sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Filters for listing meeting requests. Empty filter returns everything.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub requester_email: Option<String>,
    pub approver_email: Option<String>,
    pub status: Option<RequestStatus>,
    pub project_id: Option<String>,
}

/// Filters for listing meetings. Empty filter returns everything.
#[derive(Debug, Clone, Default)]
pub struct MeetingFilter {
    pub project_id: Option<String>,
    /// Matches either participant.
    pub user_email: Option<String>,
    pub status: Option<MeetingStatus>,
    /// Only meetings scheduled after `now` and not cancelled.
    pub upcoming_only: bool,
}

/// Parse an RFC 3339 timestamp column into a UTC instant.
pub(crate) fn parse_utc(id: &str, value: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::CorruptRow {
            id: id.to_string(),
            reason: format!("bad timestamp '{}': {}", value, e),
        })
}

/// Parse an optional RFC 3339 timestamp column.
pub(crate) fn parse_utc_opt(
    id: &str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, DbError> {
    value.map(|v| parse_utc(id, v)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_utc_accepts_offsets() {
        let dt = parse_utc("x", "2025-06-01T12:00:00+02:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-06-01T10:00:00+00:00");
    }

    #[test]
    fn test_parse_utc_rejects_garbage() {
        let err = parse_utc("row-9", "next tuesday").unwrap_err();
        match err {
            DbError::CorruptRow { id, .. } => assert_eq!(id, "row-9"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_utc_opt_passes_through_none() {
        assert_eq!(parse_utc_opt("x", None).unwrap(), None);

        let stored = Some("2025-06-01T10:00:00+00:00".to_string());
        let dt = parse_utc_opt("x", stored.as_deref()).unwrap().unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-06-01T10:00:00+00:00");

        let bad = Some("garbage".to_string());
        assert!(parse_utc_opt("x", bad.as_deref()).is_err());
    }

    #[test]
    fn test_participants_dedup_and_skip_empty() {
        let mut meeting = crate::db::test_utils::sample_meeting("m-1");
        assert_eq!(
            meeting.participants(),
            vec!["student@example.com", "supervisor@example.com"]
        );

        meeting.approver_email = meeting.requester_email.clone();
        assert_eq!(meeting.participants(), vec!["student@example.com"]);

        meeting.approver_email = String::new();
        assert_eq!(meeting.participants(), vec!["student@example.com"]);
    }
}
