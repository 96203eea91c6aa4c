use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Row};

use super::*;
use crate::types::{MeetingChanges, MeetingKind, MeetingStatus};

const MEETING_COLUMNS: &str = "id, project_id, title, scheduled_at, duration_minutes, location,
     meeting_link, meeting_kind, status, requester_email, approver_email,
     agenda, notes, is_recurring, recurrence_pattern, recurrence_end_date,
     created_at, updated_at";

struct RawMeeting {
    id: String,
    project_id: String,
    title: Option<String>,
    scheduled_at: String,
    duration_minutes: i64,
    location: Option<String>,
    meeting_link: Option<String>,
    meeting_kind: String,
    status: String,
    requester_email: String,
    approver_email: String,
    agenda: Option<String>,
    notes: Option<String>,
    is_recurring: bool,
    recurrence_pattern: Option<String>,
    recurrence_end_date: Option<String>,
    created_at: String,
    updated_at: String,
}

fn map_raw(row: &Row) -> rusqlite::Result<RawMeeting> {
    Ok(RawMeeting {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        scheduled_at: row.get(3)?,
        duration_minutes: row.get(4)?,
        location: row.get(5)?,
        meeting_link: row.get(6)?,
        meeting_kind: row.get(7)?,
        status: row.get(8)?,
        requester_email: row.get(9)?,
        approver_email: row.get(10)?,
        agenda: row.get(11)?,
        notes: row.get(12)?,
        is_recurring: row.get(13)?,
        recurrence_pattern: row.get(14)?,
        recurrence_end_date: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

fn into_meeting(raw: RawMeeting) -> Result<Meeting, DbError> {
    let status = MeetingStatus::parse(&raw.status).ok_or_else(|| DbError::CorruptRow {
        id: raw.id.clone(),
        reason: format!("unknown meeting status '{}'", raw.status),
    })?;
    let kind = MeetingKind::parse(&raw.meeting_kind).ok_or_else(|| DbError::CorruptRow {
        id: raw.id.clone(),
        reason: format!("unknown meeting kind '{}'", raw.meeting_kind),
    })?;
    Ok(Meeting {
        scheduled_at: parse_utc(&raw.id, &raw.scheduled_at)?,
        recurrence_end_date: parse_utc_opt(&raw.id, raw.recurrence_end_date.as_deref())?,
        created_at: parse_utc(&raw.id, &raw.created_at)?,
        updated_at: parse_utc(&raw.id, &raw.updated_at)?,
        id: raw.id,
        project_id: raw.project_id,
        title: raw.title,
        duration_minutes: raw.duration_minutes,
        location: raw.location,
        meeting_link: raw.meeting_link,
        kind,
        status,
        requester_email: raw.requester_email,
        approver_email: raw.approver_email,
        agenda: raw.agenda,
        notes: raw.notes,
        is_recurring: raw.is_recurring,
        recurrence_pattern: raw.recurrence_pattern,
    })
}

impl MeetingDb {
    // =========================================================================
    // Meetings
    // =========================================================================

    pub fn insert_meeting(&self, meeting: &Meeting) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO meetings
                (id, project_id, title, scheduled_at, duration_minutes, location,
                 meeting_link, meeting_kind, status, requester_email, approver_email,
                 agenda, notes, is_recurring, recurrence_pattern, recurrence_end_date,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                meeting.id,
                meeting.project_id,
                meeting.title,
                meeting.scheduled_at.to_rfc3339(),
                meeting.duration_minutes,
                meeting.location,
                meeting.meeting_link,
                meeting.kind.as_str(),
                meeting.status.as_str(),
                meeting.requester_email,
                meeting.approver_email,
                meeting.agenda,
                meeting.notes,
                meeting.is_recurring,
                meeting.recurrence_pattern,
                meeting.recurrence_end_date.map(|d| d.to_rfc3339()),
                meeting.created_at.to_rfc3339(),
                meeting.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_meeting(&self, id: &str) -> Result<Option<Meeting>, DbError> {
        let sql = format!("SELECT {MEETING_COLUMNS} FROM meetings WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id], map_raw)?;

        match rows.next() {
            Some(raw) => Ok(Some(into_meeting(raw?)?)),
            None => Ok(None),
        }
    }

    /// List meetings matching the filter, soonest first. `now` only matters
    /// when `upcoming_only` is set.
    pub fn list_meetings(
        &self,
        filter: &MeetingFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<Meeting>, DbError> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(ref project) = filter.project_id {
            values.push(project.clone());
            clauses.push(format!("project_id = ?{}", values.len()));
        }
        if let Some(ref email) = filter.user_email {
            values.push(email.clone());
            let n = values.len();
            clauses.push(format!("(requester_email = ?{n} OR approver_email = ?{n})"));
        }
        if let Some(status) = filter.status {
            values.push(status.as_str().to_string());
            clauses.push(format!("status = ?{}", values.len()));
        }
        if filter.upcoming_only {
            values.push(now.to_rfc3339());
            clauses.push(format!("scheduled_at >= ?{}", values.len()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let sql = format!(
            "SELECT {MEETING_COLUMNS} FROM meetings {where_sql}
             ORDER BY scheduled_at ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::types::ToSql> = values
            .iter()
            .map(|v| v as &dyn rusqlite::types::ToSql)
            .collect();
        let rows = stmt.query_map(param_refs.as_slice(), map_raw)?;

        let mut meetings = Vec::new();
        for raw in rows {
            meetings.push(into_meeting(raw?)?);
        }
        Ok(meetings)
    }

    /// Non-terminal meetings starting between `now` and `now + lookahead_hours`,
    /// inclusive at both ends. This is the scheduler's candidate set.
    pub fn active_meetings_in_window(
        &self,
        now: DateTime<Utc>,
        lookahead_hours: i64,
    ) -> Result<Vec<Meeting>, DbError> {
        let until = now + Duration::hours(lookahead_hours);
        let sql = format!(
            "SELECT {MEETING_COLUMNS} FROM meetings
             WHERE status NOT IN ('cancelled', 'completed')
               AND scheduled_at >= ?1 AND scheduled_at <= ?2
             ORDER BY scheduled_at ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![now.to_rfc3339(), until.to_rfc3339()], map_raw)?;

        let mut meetings = Vec::new();
        for raw in rows {
            meetings.push(into_meeting(raw?)?);
        }
        Ok(meetings)
    }

    /// Mark confirmed meetings whose start time is more than `grace_hours` in
    /// the past as completed. Returns how many rows changed.
    pub fn complete_overdue_meetings(
        &self,
        now: DateTime<Utc>,
        grace_hours: i64,
    ) -> Result<usize, DbError> {
        let cutoff = now - Duration::hours(grace_hours);
        let affected = self.conn.execute(
            "UPDATE meetings
             SET status = 'completed', updated_at = ?2
             WHERE status = 'confirmed' AND scheduled_at < ?1",
            params![cutoff.to_rfc3339(), now.to_rfc3339()],
        )?;
        Ok(affected)
    }

    /// Apply a partial update. Only set fields change; everything else keeps
    /// its stored value. Returns rows changed (0 = meeting absent).
    pub fn update_meeting(
        &self,
        id: &str,
        changes: &MeetingChanges,
        now: DateTime<Utc>,
    ) -> Result<usize, DbError> {
        let mut sets: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref title) = changes.title {
            values.push(Box::new(title.clone()));
            sets.push(format!("title = ?{}", values.len()));
        }
        if let Some(scheduled_at) = changes.scheduled_at {
            values.push(Box::new(crate::types::ensure_utc(scheduled_at).to_rfc3339()));
            sets.push(format!("scheduled_at = ?{}", values.len()));
        }
        if let Some(duration) = changes.duration_minutes {
            values.push(Box::new(duration));
            sets.push(format!("duration_minutes = ?{}", values.len()));
        }
        if let Some(ref location) = changes.location {
            values.push(Box::new(location.clone()));
            sets.push(format!("location = ?{}", values.len()));
        }
        if let Some(ref link) = changes.meeting_link {
            values.push(Box::new(link.clone()));
            sets.push(format!("meeting_link = ?{}", values.len()));
        }
        if let Some(kind) = changes.kind {
            values.push(Box::new(kind.as_str().to_string()));
            sets.push(format!("meeting_kind = ?{}", values.len()));
        }
        if let Some(ref agenda) = changes.agenda {
            values.push(Box::new(agenda.clone()));
            sets.push(format!("agenda = ?{}", values.len()));
        }
        if let Some(ref notes) = changes.notes {
            values.push(Box::new(notes.clone()));
            sets.push(format!("notes = ?{}", values.len()));
        }

        if sets.is_empty() {
            // Nothing to change; still bump updated_at only if the row exists
            return Ok(self.conn.execute(
                "UPDATE meetings SET updated_at = ?1 WHERE id = ?2",
                params![now.to_rfc3339(), id],
            )?);
        }

        values.push(Box::new(now.to_rfc3339()));
        sets.push(format!("updated_at = ?{}", values.len()));
        values.push(Box::new(id.to_string()));
        let id_slot = values.len();

        let sql = format!(
            "UPDATE meetings SET {} WHERE id = ?{id_slot}",
            sets.join(", ")
        );
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(|v| v.as_ref()).collect();
        let affected = self.conn.execute(&sql, param_refs.as_slice())?;
        Ok(affected)
    }

    /// Conditionally cancel a meeting that has not already reached a terminal
    /// state. Returns rows changed (0 = absent or already terminal).
    pub fn cancel_meeting(&self, id: &str, now: DateTime<Utc>) -> Result<usize, DbError> {
        let affected = self.conn.execute(
            "UPDATE meetings
             SET status = 'cancelled', updated_at = ?2
             WHERE id = ?1 AND status IN ('pending', 'confirmed')",
            params![id, now.to_rfc3339()],
        )?;
        Ok(affected)
    }
}
