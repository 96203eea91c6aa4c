use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use super::*;

fn map_record(row: &Row) -> rusqlite::Result<(String, String, String, i64, bool, Option<String>, Option<String>, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn into_record(
    raw: (String, String, String, i64, bool, Option<String>, Option<String>, String),
) -> Result<ReminderRecord, DbError> {
    let (id, meeting_id, recipient_email, minutes_before, is_sent, sent_at, scheduled_for, created_at) =
        raw;
    Ok(ReminderRecord {
        sent_at: parse_utc_opt(&id, sent_at.as_deref())?,
        scheduled_for: parse_utc_opt(&id, scheduled_for.as_deref())?,
        created_at: parse_utc(&id, &created_at)?,
        id,
        meeting_id,
        recipient_email,
        minutes_before,
        is_sent,
    })
}

impl MeetingDb {
    // =========================================================================
    // Reminder records
    // =========================================================================

    /// Whether a reminder for this (meeting, recipient, lead time) has already
    /// been sent. This is the scheduler's at-most-once check.
    pub fn sent_reminder_exists(
        &self,
        meeting_id: &str,
        recipient_email: &str,
        minutes_before: i64,
    ) -> Result<bool, DbError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM meeting_reminders
             WHERE meeting_id = ?1 AND recipient_email = ?2
               AND minutes_before = ?3 AND is_sent = 1",
            params![meeting_id, recipient_email, minutes_before],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Persist a sent reminder. The partial unique index on
    /// (meeting_id, recipient_email, minutes_before) rejects a second sent
    /// row for the same key, so a concurrent duplicate surfaces as an error
    /// rather than a double delivery.
    pub fn record_sent_reminder(
        &self,
        meeting_id: &str,
        recipient_email: &str,
        minutes_before: i64,
        scheduled_for: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO meeting_reminders
                (id, meeting_id, recipient_email, minutes_before, is_sent,
                 sent_at, scheduled_for, created_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?5)",
            params![
                uuid::Uuid::new_v4().to_string(),
                meeting_id,
                recipient_email,
                minutes_before,
                now.to_rfc3339(),
                scheduled_for.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All reminder records for a meeting, oldest first.
    pub fn reminders_for_meeting(&self, meeting_id: &str) -> Result<Vec<ReminderRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, meeting_id, recipient_email, minutes_before, is_sent,
                    sent_at, scheduled_for, created_at
             FROM meeting_reminders
             WHERE meeting_id = ?1
             ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map(params![meeting_id], map_record)?;

        let mut records = Vec::new();
        for raw in rows {
            records.push(into_record(raw?)?);
        }
        Ok(records)
    }
}
