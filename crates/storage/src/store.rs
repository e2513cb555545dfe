//! SQLite event store implementation.

use crate::{Error, Event, EventKind, Result, SessionId};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use std::path::Path;

/// Per-session overview for listings.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: SessionId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub message_count: usize,
    pub tool_call_count: usize,
}

/// SQLite-backed event store.
pub struct EventStore {
    conn: Connection,
}

impl EventStore {
    /// Open or create an event store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Create an in-memory event store.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                session_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                kind TEXT NOT NULL,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_events_session
                ON events(session_id, seq);
            "#,
        )?;
        Ok(Self { conn })
    }

    /// Append an event.
    pub fn append(&self, event: &Event) -> Result<()> {
        self.conn.execute(
            "INSERT INTO events (id, session_id, timestamp, kind, data) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.id.to_string(),
                event.session_id.to_string(),
                event.timestamp.to_rfc3339(),
                event.kind.name(),
                serde_json::to_string(&event.kind)?,
            ],
        )?;
        Ok(())
    }

    /// Load all events for a session in insertion order.
    pub fn load_session(&self, session_id: SessionId) -> Result<Vec<Event>> {
        self.load_events(session_id, None)
    }

    /// Load a session's events, optionally only those of one kind
    /// (`message`, `tool_call`, `tool_result`, `session_start`, `session_end`).
    pub fn load_events(&self, session_id: SessionId, kind: Option<&str>) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, timestamp, data FROM events
             WHERE session_id = ?1 AND (?2 IS NULL OR kind = ?2)
             ORDER BY seq",
        )?;

        let rows = stmt.query_map(params![session_id.to_string(), kind], read_row)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(decode(row?)?);
        }
        Ok(events)
    }

    /// Summaries of every session, most recent first.
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT session_id,
                    MIN(timestamp),
                    MAX(CASE WHEN kind = 'session_end' THEN timestamp END),
                    SUM(CASE WHEN kind = 'message' THEN 1 ELSE 0 END),
                    SUM(CASE WHEN kind = 'tool_call' THEN 1 ELSE 0 END)
             FROM events
             GROUP BY session_id
             ORDER BY MIN(seq) DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, started, ended, messages, tool_calls) = row?;
            sessions.push(SessionSummary {
                id: parse_session_id(&id)?,
                started_at: parse_timestamp(&id, &started)?,
                ended_at: ended.map(|t| parse_timestamp(&id, &t)).transpose()?,
                message_count: messages as usize,
                tool_call_count: tool_calls as usize,
            });
        }
        Ok(sessions)
    }
}

type RawRow = (String, String, String, String);

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn decode((id, session_id, timestamp, data): RawRow) -> Result<Event> {
    let kind: EventKind = serde_json::from_str(&data)?;
    Ok(Event {
        id: id.parse().map_err(|e| corrupt(&id, e))?,
        session_id: parse_session_id(&session_id)?,
        timestamp: parse_timestamp(&id, &timestamp)?,
        kind,
    })
}

fn parse_session_id(raw: &str) -> Result<SessionId> {
    raw.parse().map_err(|e| corrupt(raw, e))
}

fn parse_timestamp(id: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt(id, e))
}

fn corrupt(id: &str, reason: impl std::fmt::Display) -> Error {
    Error::Corrupt {
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use serde_json::json;

    #[test]
    fn append_and_load_in_order() {
        let store = EventStore::in_memory().unwrap();
        let session = SessionId::new();

        store.append(&Event::new(session, EventKind::SessionStart)).unwrap();
        store.append(&Event::message(session, Role::User, "find x")).unwrap();
        store
            .append(&Event::tool_call(session, "web", "search", json!({"q": "x"})))
            .unwrap();
        store
            .append(&Event::tool_result(session, "search", json!("result-y")))
            .unwrap();

        let events = store.load_session(session).unwrap();
        let kinds: Vec<_> = events.iter().map(|e| e.kind.name()).collect();
        assert_eq!(kinds, ["session_start", "message", "tool_call", "tool_result"]);
        assert_eq!(
            events[2].kind,
            EventKind::ToolCall {
                toolkit: "web".into(),
                name: "search".into(),
                input: json!({"q": "x"}),
            }
        );
    }

    #[test]
    fn load_events_filters_by_kind() {
        let store = EventStore::in_memory().unwrap();
        let session = SessionId::new();
        store.append(&Event::message(session, Role::User, "hi")).unwrap();
        store.append(&Event::message(session, Role::Assistant, "hello")).unwrap();
        store
            .append(&Event::tool_result(session, "noop", json!(null)))
            .unwrap();

        let messages = store.load_events(session, Some("message")).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(store.load_events(session, Some("tool_call")).unwrap().is_empty());
    }

    #[test]
    fn sessions_are_isolated() {
        let store = EventStore::in_memory().unwrap();
        let a = SessionId::new();
        let b = SessionId::new();
        store.append(&Event::message(a, Role::User, "a")).unwrap();
        store.append(&Event::message(b, Role::User, "b")).unwrap();

        assert_eq!(store.load_session(a).unwrap().len(), 1);
        assert_eq!(store.load_session(b).unwrap().len(), 1);
    }

    #[test]
    fn list_sessions_summarizes() {
        let store = EventStore::in_memory().unwrap();
        let first = SessionId::new();
        let second = SessionId::new();

        store.append(&Event::new(first, EventKind::SessionStart)).unwrap();
        store.append(&Event::message(first, Role::User, "hi")).unwrap();
        store
            .append(&Event::tool_call(first, "web", "search", json!({})))
            .unwrap();
        store.append(&Event::new(first, EventKind::SessionEnd)).unwrap();
        store.append(&Event::new(second, EventKind::SessionStart)).unwrap();

        let sessions = store.list_sessions().unwrap();
        assert_eq!(sessions.len(), 2);

        assert_eq!(sessions[0].id, second);
        assert!(sessions[0].ended_at.is_none());

        assert_eq!(sessions[1].id, first);
        assert_eq!(sessions[1].message_count, 1);
        assert_eq!(sessions[1].tool_call_count, 1);
        assert!(sessions[1].ended_at.is_some());
    }
}
