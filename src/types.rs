//! Shared domain types: status enums, submission drafts, configuration.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Lifecycle of a meeting request. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "rejected" => Some(RequestStatus::Rejected),
            "cancelled" => Some(RequestStatus::Cancelled),
            _ => None,
        }
    }
}

/// Lifecycle of a scheduled meeting. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl MeetingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Pending => "pending",
            MeetingStatus::Confirmed => "confirmed",
            MeetingStatus::Completed => "completed",
            MeetingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MeetingStatus::Pending),
            "confirmed" => Some(MeetingStatus::Confirmed),
            "completed" => Some(MeetingStatus::Completed),
            "cancelled" => Some(MeetingStatus::Cancelled),
            _ => None,
        }
    }

    /// True once no further transitions are allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MeetingStatus::Completed | MeetingStatus::Cancelled)
    }
}

/// How the meeting is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeetingKind {
    #[serde(rename = "virtual")]
    Virtual,
    #[serde(rename = "in-person")]
    InPerson,
}

impl MeetingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingKind::Virtual => "virtual",
            MeetingKind::InPerson => "in-person",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "virtual" => Some(MeetingKind::Virtual),
            "in-person" => Some(MeetingKind::InPerson),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Drafts and change sets
// ---------------------------------------------------------------------------

/// Input for submitting a new meeting request.
///
/// The preferred instant may carry any offset; it is normalized to UTC before
/// persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDraft {
    pub project_id: String,
    pub requester_email: String,
    pub approver_email: String,
    pub title: Option<String>,
    pub agenda: String,
    pub preferred_at: DateTime<FixedOffset>,
    pub duration_minutes: Option<i64>,
    pub kind: Option<MeetingKind>,
    pub location: Option<String>,
}

/// Editable fields of a meeting. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingChanges {
    pub title: Option<String>,
    pub scheduled_at: Option<DateTime<FixedOffset>>,
    pub duration_minutes: Option<i64>,
    pub location: Option<String>,
    pub meeting_link: Option<String>,
    pub kind: Option<MeetingKind>,
    pub agenda: Option<String>,
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Top-level configuration, loaded from `~/.meetflow/config.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Override for the SQLite database path. Default: `~/.meetflow/meetflow.db`.
    #[serde(default)]
    pub db_path: Option<String>,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Reminder scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Minutes between reconciliation ticks. The due window is sized to this.
    #[serde(default = "default_tick_minutes")]
    pub tick_minutes: i64,
    /// How far ahead to scan for upcoming meetings, in hours.
    #[serde(default = "default_lookahead_hours")]
    pub lookahead_hours: i64,
    /// Reminder lead times in minutes before the scheduled instant.
    #[serde(default = "default_lead_times")]
    pub lead_times_minutes: Vec<i64>,
    /// Hours past the scheduled instant before a confirmed meeting is
    /// auto-completed.
    #[serde(default = "default_completion_grace_hours")]
    pub completion_grace_hours: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_minutes: default_tick_minutes(),
            lookahead_hours: default_lookahead_hours(),
            lead_times_minutes: default_lead_times(),
            completion_grace_hours: default_completion_grace_hours(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_tick_minutes() -> i64 {
    5
}

fn default_lookahead_hours() -> i64 {
    24
}

fn default_lead_times() -> Vec<i64> {
    vec![1440, 60, 30]
}

fn default_completion_grace_hours() -> i64 {
    2
}

// ---------------------------------------------------------------------------
// Time helpers
// ---------------------------------------------------------------------------

/// Normalize an offset-carrying instant to UTC.
pub fn ensure_utc(dt: DateTime<FixedOffset>) -> DateTime<Utc> {
    dt.with_timezone(&Utc)
}
