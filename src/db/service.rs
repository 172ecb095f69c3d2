use crate::db::models::{DeletionRequest, Message, Session};
use chrono::{DateTime, Duration, Utc};
use duckdb::{params, Connection, Result as DbResult, Row};
use uuid::Uuid;

pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

/// Session titles are a truncated prefix of the first user message.
pub fn derive_title(content: &str) -> String {
    let prefix: String = content.chars().take(50).collect();
    if content.chars().count() > 50 {
        format!("{}...", prefix)
    } else {
        prefix
    }
}

pub struct DbService;

impl DbService {
    fn row_to_session(row: &Row) -> DbResult<Session> {
        // Timestamps are selected as text; fall back to now() if the driver
        // hands back something unparseable.
        let created_str: String = row.get(2)?;
        let updated_str: String = row.get(3)?;
        let created_at = created_str
            .parse::<DateTime<Utc>>()
            .unwrap_or_else(|_| Utc::now());
        let updated_at = updated_str
            .parse::<DateTime<Utc>>()
            .unwrap_or_else(|_| Utc::now());

        Ok(Session {
            id: row.get::<_, String>(0)?.parse().unwrap_or_default(),
            title: row.get::<_, String>(1)?,
            created_at,
            updated_at,
        })
    }

    fn row_to_message(row: &Row) -> DbResult<Message> {
        let created_str: String = row.get(4)?;
        let created_at = created_str
            .parse::<DateTime<Utc>>()
            .unwrap_or_else(|_| Utc::now());

        Ok(Message {
            id: row.get(0)?,
            session_id: row.get::<_, String>(1)?.parse().unwrap_or_default(),
            role: row.get::<_, String>(2)?,
            content: row.get::<_, String>(3)?,
            created_at,
        })
    }

    fn row_to_deletion_request(row: &Row) -> DbResult<DeletionRequest> {
        let created_str: String = row.get(2)?;
        let expires_str: String = row.get(3)?;
        let confirmed_str: Option<String> = row.get(4)?;

        Ok(DeletionRequest {
            token: row.get::<_, String>(0)?.parse().unwrap_or_default(),
            email: row.get::<_, String>(1)?,
            created_at: created_str
                .parse::<DateTime<Utc>>()
                .unwrap_or_else(|_| Utc::now()),
            expires_at: expires_str
                .parse::<DateTime<Utc>>()
                .unwrap_or_else(|_| Utc::now()),
            confirmed_at: confirmed_str.and_then(|s| s.parse::<DateTime<Utc>>().ok()),
        })
    }

    // --- Session Operations ---

    pub fn insert_session(conn: &Connection, title: &str) -> DbResult<Session> {
        let id = Uuid::new_v4();

        conn.execute(
            "INSERT INTO sessions (id, title) VALUES (?, ?)",
            params![id.to_string(), title],
        )?;

        Self::get_session(conn, id)?.ok_or(duckdb::Error::QueryReturnedNoRows)
    }

    pub fn get_session(conn: &Connection, id: Uuid) -> DbResult<Option<Session>> {
        let mut stmt = conn.prepare(
            "SELECT id, title, CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR) FROM sessions WHERE id = ?",
        )?;
        let mut rows = stmt.query_map(params![id.to_string()], Self::row_to_session)?;

        if let Some(row) = rows.next() {
            Ok(Some(row?))
        } else {
            Ok(None)
        }
    }

    pub fn list_sessions(conn: &Connection, limit: usize, offset: usize) -> DbResult<Vec<Session>> {
        let mut stmt = conn.prepare(
            "SELECT id, title, CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR) FROM sessions ORDER BY updated_at DESC LIMIT ? OFFSET ?",
        )?;
        let rows = stmt.query_map(params![limit as i64, offset as i64], Self::row_to_session)?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    /// Deleting a session cascades to its messages.
    pub fn delete_session(conn: &Connection, id: Uuid) -> DbResult<()> {
        conn.execute("BEGIN TRANSACTION", [])?;

        let id_str = id.to_string();

        if let Err(e) = conn.execute("DELETE FROM messages WHERE session_id = ?", params![id_str]) {
            let _ = conn.execute("ROLLBACK", []);
            return Err(e);
        }

        if let Err(e) = conn.execute("DELETE FROM sessions WHERE id = ?", params![id_str]) {
            let _ = conn.execute("ROLLBACK", []);
            return Err(e);
        }

        conn.execute("COMMIT", [])?;
        Ok(())
    }

    // --- Message Operations ---

    /// Persists a message and touches the session's `updated_at`. The first
    /// user message in a still-untitled session also titles it, so every
    /// surface (HTTP, REPL) gets the same behavior.
    pub fn insert_message(
        conn: &Connection,
        session_id: Uuid,
        role: &str,
        content: &str,
    ) -> DbResult<Message> {
        if role == "user" {
            Self::maybe_title_session(conn, session_id, content)?;
        }

        conn.execute(
            "INSERT INTO messages (session_id, role, content) VALUES (?, ?, ?)",
            params![session_id.to_string(), role, content],
        )?;

        conn.execute(
            "UPDATE sessions SET updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![session_id.to_string()],
        )?;

        // Fetch the message we just inserted (ID is generated by sequence)
        let mut stmt = conn.prepare(
            "SELECT id, session_id, role, content, CAST(created_at AS VARCHAR)
             FROM messages
             WHERE session_id = ?
             ORDER BY id DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![session_id.to_string()], Self::row_to_message)?;

        Ok(rows.next().unwrap()?)
    }

    fn maybe_title_session(conn: &Connection, session_id: Uuid, content: &str) -> DbResult<()> {
        let mut stmt = conn.prepare(
            "SELECT COUNT(*) FROM messages WHERE session_id = ? AND role = 'user'",
        )?;
        let count: i64 = stmt.query_row(params![session_id.to_string()], |row| row.get(0))?;
        if count > 0 {
            return Ok(());
        }

        conn.execute(
            "UPDATE sessions SET title = ? WHERE id = ? AND title = ?",
            params![
                derive_title(content),
                session_id.to_string(),
                DEFAULT_SESSION_TITLE
            ],
        )?;
        Ok(())
    }

    pub fn get_messages(
        conn: &Connection,
        session_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> DbResult<Vec<Message>> {
        let mut stmt = conn.prepare(
            "SELECT id, session_id, role, content, CAST(created_at AS VARCHAR)
             FROM messages
             WHERE session_id = ?
             ORDER BY created_at ASC, id ASC
             LIMIT ? OFFSET ?",
        )?;

        let rows = stmt.query_map(
            params![session_id.to_string(), limit as i64, offset as i64],
            Self::row_to_message,
        )?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    // --- Account Deletion Operations ---

    pub fn insert_deletion_request(
        conn: &Connection,
        email: &str,
        ttl_hours: u32,
    ) -> DbResult<DeletionRequest> {
        let token = Uuid::new_v4();
        let now = Utc::now();
        let expires_at = now + Duration::hours(ttl_hours as i64);

        conn.execute(
            "INSERT INTO deletion_requests (token, email, created_at, expires_at) VALUES (?, ?, ?, ?)",
            params![
                token.to_string(),
                email,
                now.to_rfc3339(),
                expires_at.to_rfc3339()
            ],
        )?;

        Ok(DeletionRequest {
            token,
            email: email.to_string(),
            created_at: now,
            expires_at,
            confirmed_at: None,
        })
    }

    /// Looks up an unconfirmed, unexpired request for the token.
    pub fn find_pending_request(
        conn: &Connection,
        token: Uuid,
    ) -> DbResult<Option<DeletionRequest>> {
        let mut stmt = conn.prepare(
            "SELECT token, email, created_at, expires_at, confirmed_at
             FROM deletion_requests
             WHERE token = ? AND confirmed_at IS NULL",
        )?;
        let mut rows = stmt.query_map(params![token.to_string()], Self::row_to_deletion_request)?;

        match rows.next() {
            Some(row) => {
                let request = row?;
                if request.expires_at <= Utc::now() {
                    Ok(None)
                } else {
                    Ok(Some(request))
                }
            }
            None => Ok(None),
        }
    }

    /// Marks the request confirmed and wipes all chat data. The server is
    /// single-tenant, so "the account" is everything in it.
    pub fn confirm_deletion(conn: &Connection, token: Uuid) -> DbResult<bool> {
        if Self::find_pending_request(conn, token)?.is_none() {
            return Ok(false);
        }

        conn.execute("BEGIN TRANSACTION", [])?;

        for sql in ["DELETE FROM messages", "DELETE FROM sessions"] {
            if let Err(e) = conn.execute(sql, []) {
                let _ = conn.execute("ROLLBACK", []);
                return Err(e);
            }
        }

        if let Err(e) = conn.execute(
            "UPDATE deletion_requests SET confirmed_at = ? WHERE token = ?",
            params![Utc::now().to_rfc3339(), token.to_string()],
        ) {
            let _ = conn.execute("ROLLBACK", []);
            return Err(e);
        }

        conn.execute("COMMIT", [])?;
        Ok(true)
    }
}
