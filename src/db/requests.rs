use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use super::*;
use crate::types::{MeetingKind, RequestStatus};

const REQUEST_COLUMNS: &str = "id, project_id, requester_email, approver_email, title, agenda,
     preferred_at, duration_minutes, meeting_kind, location, status,
     rejection_reason, meeting_id, created_at, updated_at";

/// Raw row before timestamp/status parsing.
struct RawRequest {
    id: String,
    project_id: String,
    requester_email: String,
    approver_email: String,
    title: Option<String>,
    agenda: String,
    preferred_at: String,
    duration_minutes: Option<i64>,
    meeting_kind: Option<String>,
    location: Option<String>,
    status: String,
    rejection_reason: Option<String>,
    meeting_id: Option<String>,
    created_at: String,
    updated_at: String,
}

fn map_raw(row: &Row) -> rusqlite::Result<RawRequest> {
    Ok(RawRequest {
        id: row.get(0)?,
        project_id: row.get(1)?,
        requester_email: row.get(2)?,
        approver_email: row.get(3)?,
        title: row.get(4)?,
        agenda: row.get(5)?,
        preferred_at: row.get(6)?,
        duration_minutes: row.get(7)?,
        meeting_kind: row.get(8)?,
        location: row.get(9)?,
        status: row.get(10)?,
        rejection_reason: row.get(11)?,
        meeting_id: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

fn into_request(raw: RawRequest) -> Result<MeetingRequest, DbError> {
    let status = RequestStatus::parse(&raw.status).ok_or_else(|| DbError::CorruptRow {
        id: raw.id.clone(),
        reason: format!("unknown request status '{}'", raw.status),
    })?;
    let kind = match raw.meeting_kind.as_deref() {
        None => None,
        Some(k) => Some(MeetingKind::parse(k).ok_or_else(|| DbError::CorruptRow {
            id: raw.id.clone(),
            reason: format!("unknown meeting kind '{}'", k),
        })?),
    };
    Ok(MeetingRequest {
        preferred_at: parse_utc(&raw.id, &raw.preferred_at)?,
        created_at: parse_utc(&raw.id, &raw.created_at)?,
        updated_at: parse_utc(&raw.id, &raw.updated_at)?,
        id: raw.id,
        project_id: raw.project_id,
        requester_email: raw.requester_email,
        approver_email: raw.approver_email,
        title: raw.title,
        agenda: raw.agenda,
        duration_minutes: raw.duration_minutes,
        kind,
        location: raw.location,
        status,
        rejection_reason: raw.rejection_reason,
        meeting_id: raw.meeting_id,
    })
}

impl MeetingDb {
    // =========================================================================
    // Meeting requests
    // =========================================================================

    pub fn insert_request(&self, request: &MeetingRequest) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO meeting_requests
                (id, project_id, requester_email, approver_email, title, agenda,
                 preferred_at, duration_minutes, meeting_kind, location, status,
                 rejection_reason, meeting_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                request.id,
                request.project_id,
                request.requester_email,
                request.approver_email,
                request.title,
                request.agenda,
                request.preferred_at.to_rfc3339(),
                request.duration_minutes,
                request.kind.map(|k| k.as_str()),
                request.location,
                request.status.as_str(),
                request.rejection_reason,
                request.meeting_id,
                request.created_at.to_rfc3339(),
                request.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Look up a single request by id.
    pub fn get_request(&self, id: &str) -> Result<Option<MeetingRequest>, DbError> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM meeting_requests WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id], map_raw)?;

        match rows.next() {
            Some(raw) => Ok(Some(into_request(raw?)?)),
            None => Ok(None),
        }
    }

    /// List requests matching the filter, newest first.
    pub fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<MeetingRequest>, DbError> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(ref email) = filter.requester_email {
            values.push(email.clone());
            clauses.push("requester_email = ?");
        }
        if let Some(ref email) = filter.approver_email {
            values.push(email.clone());
            clauses.push("approver_email = ?");
        }
        if let Some(status) = filter.status {
            values.push(status.as_str().to_string());
            clauses.push("status = ?");
        }
        if let Some(ref project) = filter.project_id {
            values.push(project.clone());
            clauses.push("project_id = ?");
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            // Positional placeholders are filled left to right
            let numbered: Vec<String> = clauses
                .iter()
                .enumerate()
                .map(|(i, c)| c.replace('?', &format!("?{}", i + 1)))
                .collect();
            format!("WHERE {}", numbered.join(" AND "))
        };

        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM meeting_requests {where_sql}
             ORDER BY created_at DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::types::ToSql> = values
            .iter()
            .map(|v| v as &dyn rusqlite::types::ToSql)
            .collect();
        let rows = stmt.query_map(param_refs.as_slice(), map_raw)?;

        let mut requests = Vec::new();
        for raw in rows {
            requests.push(into_request(raw?)?);
        }
        Ok(requests)
    }

    /// Conditionally mark a pending request approved and link the created
    /// meeting. Returns the number of rows changed — 0 means the request was
    /// no longer pending (or absent) and the caller must treat it as a
    /// conflict.
    pub fn mark_request_approved(
        &self,
        id: &str,
        meeting_id: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, DbError> {
        let affected = self.conn.execute(
            "UPDATE meeting_requests
             SET status = 'approved', meeting_id = ?2, updated_at = ?3
             WHERE id = ?1 AND status = 'pending'",
            params![id, meeting_id, now.to_rfc3339()],
        )?;
        Ok(affected)
    }

    /// Conditionally mark a pending request rejected with a reason.
    /// Returns the number of rows changed (0 = not pending or absent).
    pub fn mark_request_rejected(
        &self,
        id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, DbError> {
        let affected = self.conn.execute(
            "UPDATE meeting_requests
             SET status = 'rejected', rejection_reason = ?2, updated_at = ?3
             WHERE id = ?1 AND status = 'pending'",
            params![id, reason, now.to_rfc3339()],
        )?;
        Ok(affected)
    }

    /// Remove a request outright. Returns rows deleted (0 = absent).
    pub fn delete_request(&self, id: &str) -> Result<usize, DbError> {
        let affected = self
            .conn
            .execute("DELETE FROM meeting_requests WHERE id = ?1", params![id])?;
        Ok(affected)
    }
}
