//! Notification delivery seam.
//!
//! The workflow and the reminder scheduler both emit notifications through the
//! [`Notifier`] trait so the delivery channel (email, push, in-app) can be
//! swapped without touching scheduling logic. The default [`LogNotifier`]
//! writes to the process log, which is also what the tests capture against.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::Meeting;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification channel unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to deliver notification: {0}")]
    Delivery(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
}

/// A rendered message, ready for whatever channel the notifier backs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub recipient: String,
    pub title: String,
    pub body: String,
    pub category: String,
    pub priority: NotificationPriority,
    pub link: Option<String>,
}

pub trait Notifier: Send + Sync {
    fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the process log. Used as the default channel and
/// by `meetflowd` when no real delivery backend is configured.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        log::info!(
            "[notify] to={} priority={:?} category={} title={:?} body={:?}",
            notification.recipient,
            notification.priority,
            notification.category,
            notification.title,
            notification.body
        );
        Ok(())
    }
}

fn meeting_label(meeting: &Meeting) -> &str {
    meeting.title.as_deref().unwrap_or("Meeting")
}

fn lead_time_phrase(minutes_before: i64) -> String {
    if minutes_before >= 60 && minutes_before % 60 == 0 {
        let hours = minutes_before / 60;
        if hours == 1 {
            "in 1 hour".to_string()
        } else {
            format!("in {} hours", hours)
        }
    } else {
        format!("in {} minutes", minutes_before)
    }
}

/// Reminder for an upcoming meeting, one per recipient and lead time.
pub fn reminder_notification(
    meeting: &Meeting,
    recipient: &str,
    minutes_before: i64,
) -> Notification {
    let priority = if minutes_before <= 30 {
        NotificationPriority::High
    } else {
        NotificationPriority::Normal
    };
    Notification {
        recipient: recipient.to_string(),
        title: "Meeting reminder".to_string(),
        body: format!(
            "\"{}\" starts {} ({})",
            meeting_label(meeting),
            lead_time_phrase(minutes_before),
            meeting.scheduled_at.format("%Y-%m-%d %H:%M UTC")
        ),
        category: "meeting_reminder".to_string(),
        priority,
        link: meeting.meeting_link.clone(),
    }
}

/// Tells the approver a new request is waiting on them.
pub fn request_submitted_notification(
    approver_email: &str,
    requester_email: &str,
    title: Option<&str>,
) -> Notification {
    Notification {
        recipient: approver_email.to_string(),
        title: "New meeting request".to_string(),
        body: format!(
            "{} requested a meeting{}",
            requester_email,
            title.map(|t| format!(": \"{t}\"")).unwrap_or_default()
        ),
        category: "meeting_request".to_string(),
        priority: NotificationPriority::Normal,
        link: None,
    }
}

/// Tells the requester their request was approved and a meeting scheduled.
pub fn request_approved_notification(requester_email: &str, meeting: &Meeting) -> Notification {
    Notification {
        recipient: requester_email.to_string(),
        title: "Meeting request approved".to_string(),
        body: format!(
            "\"{}\" is scheduled for {}",
            meeting_label(meeting),
            meeting.scheduled_at.format("%Y-%m-%d %H:%M UTC")
        ),
        category: "meeting_request".to_string(),
        priority: NotificationPriority::Normal,
        link: meeting.meeting_link.clone(),
    }
}

/// Tells the requester their request was turned down, with the reason.
pub fn request_rejected_notification(requester_email: &str, reason: &str) -> Notification {
    Notification {
        recipient: requester_email.to_string(),
        title: "Meeting request declined".to_string(),
        body: format!("Your meeting request was declined: {reason}"),
        category: "meeting_request".to_string(),
        priority: NotificationPriority::Normal,
        link: None,
    }
}

/// Tells every participant a scheduled meeting was called off.
pub fn meeting_cancelled_notification(recipient: &str, meeting: &Meeting) -> Notification {
    Notification {
        recipient: recipient.to_string(),
        title: "Meeting cancelled".to_string(),
        body: format!(
            "\"{}\" on {} has been cancelled",
            meeting_label(meeting),
            meeting.scheduled_at.format("%Y-%m-%d %H:%M UTC")
        ),
        category: "meeting_update".to_string(),
        priority: NotificationPriority::High,
        link: None,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::sample_meeting;

    #[test]
    fn test_lead_time_phrasing() {
        assert_eq!(lead_time_phrase(1440), "in 24 hours");
        assert_eq!(lead_time_phrase(60), "in 1 hour");
        assert_eq!(lead_time_phrase(30), "in 30 minutes");
        assert_eq!(lead_time_phrase(90), "in 90 minutes");
    }

    #[test]
    fn test_reminder_priority_rises_near_start() {
        let meeting = sample_meeting("m-1");
        let early = reminder_notification(&meeting, "a@example.com", 1440);
        assert_eq!(early.priority, NotificationPriority::Normal);

        let late = reminder_notification(&meeting, "a@example.com", 30);
        assert_eq!(late.priority, NotificationPriority::High);
        assert_eq!(late.recipient, "a@example.com");
        assert!(late.body.contains("Thesis check-in"));
    }

    #[test]
    fn test_rejected_body_carries_reason() {
        let n = request_rejected_notification("student@example.com", "Out of office");
        assert!(n.body.contains("Out of office"));
        assert_eq!(n.category, "meeting_request");
    }

    #[test]
    fn test_untitled_meeting_falls_back_to_generic_label() {
        let mut meeting = sample_meeting("m-1");
        meeting.title = None;
        let n = reminder_notification(&meeting, "a@example.com", 60);
        assert!(n.body.contains("\"Meeting\""));
    }
}
