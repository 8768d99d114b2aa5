//! SQLite-backed session store.
//!
//! One table holds every session:
//!
//! ```text
//! sessions(id TEXT PRIMARY KEY, created_at TEXT NOT NULL, data TEXT NOT NULL)
//! ```
//!
//! `data` is the codec's JSON array.  Every operation commits (or fails)
//! before returning, and a save is a single `UPDATE`, so readers never see
//! a half-written transcript.  Writers in other processes are serialized by
//! SQLite's own locking; `busy_timeout_ms` bounds how long we wait for them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use ck_domain::config::StoreConfig;
use ck_domain::error::{Error, Result};
use ck_domain::message::Message;
use ck_domain::trace::TraceEvent;

use crate::codec::{self, EMPTY_TRANSCRIPT};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Identifiers & summaries
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Opaque session identifier (a UUID v4 rendered as a string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// One row of the session listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    /// ISO-8601 UTC creation time, exactly as stored.
    pub created_at: String,
    /// Number of messages in the stored transcript (0 when corrupted).
    pub turn_count: usize,
    /// The stored payload could not be read as a transcript.
    pub corrupted: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Durable store of session transcripts.
///
/// Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct SessionStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// Open (or create) the database at `config.path` and ensure the schema.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let path = &config.path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::StoreUnavailable(format!("creating {}: {e}", parent.display()))
            })?;
        }

        let conn = Connection::open(path).map_err(from_sqlite)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(from_sqlite)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;",
        )
        .map_err(from_sqlite)?;

        Self::init(conn, Some(path.clone()))
    }

    /// Open a private in-memory database (tests, dry runs).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(from_sqlite)?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id         TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                data       TEXT NOT NULL
            );",
        )
        .map_err(from_sqlite)?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        };

        TraceEvent::StoreOpened {
            path: store.display_path(),
            sessions: store.count()?,
        }
        .emit();

        Ok(store)
    }

    /// The database file, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn display_path(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".into())
    }

    /// Run `f` with exclusive use of the connection.  The guard is released
    /// when `f` returns, on success and error alike.
    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> rusqlite::Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        f(&mut conn).map_err(from_sqlite)
    }

    /// Number of stored sessions.
    pub fn count(&self) -> Result<usize> {
        let n: i64 = self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
        })?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    /// Create a session with an empty transcript and return its id.
    pub fn create(&self) -> Result<SessionId> {
        let id = SessionId::generate();
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false);

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, created_at, data) VALUES (?1, ?2, ?3)",
                params![id.as_str(), created_at, EMPTY_TRANSCRIPT],
            )
        })?;

        TraceEvent::SessionCreated {
            session_id: id.to_string(),
            created_at,
        }
        .emit();

        Ok(id)
    }

    /// All sessions, most recently created first.
    ///
    /// A row whose payload cannot be read is still listed, with
    /// `turn_count = 0` and `corrupted = true`.
    pub fn list(&self) -> Result<Vec<SessionSummary>> {
        let rows: Vec<(String, String, Option<String>)> = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, created_at, data FROM sessions
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, read_payload(row, 2)?))
            })?;
            rows.collect()
        })?;

        let summaries = rows
            .into_iter()
            .map(|(id, created_at, data)| {
                let count = data.as_deref().and_then(codec::count_messages);
                if count.is_none() {
                    TraceEvent::CorruptTranscriptSkipped {
                        session_id: id.clone(),
                        error: "payload does not decode as a transcript".into(),
                    }
                    .emit();
                }
                SessionSummary {
                    id: SessionId(id),
                    created_at,
                    turn_count: count.unwrap_or(0),
                    corrupted: count.is_none(),
                }
            })
            .collect();

        Ok(summaries)
    }

    /// Summary of a single session, `None` if the id is unknown.
    pub fn get(&self, id: &SessionId) -> Result<Option<SessionSummary>> {
        let row: Option<(String, Option<String>)> = self.with_conn(|conn| {
            conn.query_row(
                "SELECT created_at, data FROM sessions WHERE id = ?1",
                params![id.as_str()],
                |row| Ok((row.get(0)?, read_payload(row, 1)?)),
            )
            .optional()
        })?;

        Ok(row.map(|(created_at, data)| {
            let count = data.as_deref().and_then(codec::count_messages);
            SessionSummary {
                id: id.clone(),
                created_at,
                turn_count: count.unwrap_or(0),
                corrupted: count.is_none(),
            }
        }))
    }

    /// The stored transcript for `id`.
    ///
    /// An unknown id yields the empty transcript.  A payload that does not
    /// decode yields [`Error::CorruptTranscript`].
    pub fn load(&self, id: &SessionId) -> Result<Vec<Message>> {
        let payload: Option<Option<String>> = self.with_conn(|conn| {
            conn.query_row(
                "SELECT data FROM sessions WHERE id = ?1",
                params![id.as_str()],
                |row| read_payload(row, 0),
            )
            .optional()
        })?;

        let found = payload.is_some();
        let messages = match payload {
            None => Vec::new(),
            Some(None) => {
                return Err(Error::CorruptTranscript(format!(
                    "session {id}: payload is not UTF-8 text"
                )))
            }
            Some(Some(raw)) => codec::decode(&raw).map_err(|e| match e {
                Error::CorruptTranscript(reason) => {
                    Error::CorruptTranscript(format!("session {id}: {reason}"))
                }
                other => other,
            })?,
        };

        TraceEvent::SessionLoaded {
            session_id: id.to_string(),
            messages: messages.len(),
            found,
        }
        .emit();

        Ok(messages)
    }

    /// Replace the stored transcript for `id` in one atomic update.
    ///
    /// Saving to an unknown id does nothing.
    pub fn save(&self, id: &SessionId, messages: &[Message]) -> Result<()> {
        let payload = codec::encode(messages)?;

        let updated = self.with_conn(|conn| {
            conn.execute(
                "UPDATE sessions SET data = ?1 WHERE id = ?2",
                params![payload, id.as_str()],
            )
        })?;

        if updated == 0 {
            tracing::debug!(session_id = %id, "save to unknown session ignored");
        }

        TraceEvent::TranscriptSaved {
            session_id: id.to_string(),
            messages: messages.len(),
            bytes: payload.len(),
            updated: updated > 0,
        }
        .emit();

        Ok(())
    }

    /// [`load`](Self::load) on the blocking pool.
    pub async fn load_async(&self, id: &SessionId) -> Result<Vec<Message>> {
        let store = self.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || store.load(&id))
            .await
            .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))?
    }

    /// [`save`](Self::save) on the blocking pool.
    pub async fn save_async(&self, id: &SessionId, messages: &[Message]) -> Result<()> {
        let store = self.clone();
        let id = id.clone();
        let messages = messages.to_vec();
        tokio::task::spawn_blocking(move || store.save(&id, &messages))
            .await
            .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))?
    }
}

// ── Private helpers ───────────────────────────────────────────────

/// Convert a [`rusqlite::Error`] into the domain [`Error`] type.
fn from_sqlite(e: rusqlite::Error) -> Error {
    Error::StoreUnavailable(e.to_string())
}

/// Read the `data` column as text.  Anything that is not valid UTF-8 text
/// (a blob of garbage, a NULL, a number) reads as `None`.
fn read_payload(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    let value = match row.get_ref(idx)? {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            std::str::from_utf8(bytes).ok().map(str::to_owned)
        }
        _ => None,
    };
    Ok(value)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn corrupt_row(store: &SessionStore, id: &SessionId, data: rusqlite::types::Value) {
        store
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE sessions SET data = ?1 WHERE id = ?2",
                    params![data, id.as_str()],
                )
            })
            .unwrap();
    }

    fn set_created_at(store: &SessionStore, id: &SessionId, created_at: &str) {
        store
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE sessions SET created_at = ?1 WHERE id = ?2",
                    params![created_at, id.as_str()],
                )
            })
            .unwrap();
    }

    #[test]
    fn create_yields_distinct_ids() {
        let store = SessionStore::open_in_memory().unwrap();
        let ids: HashSet<SessionId> = (0..50).map(|_| store.create().unwrap()).collect();
        assert_eq!(ids.len(), 50);
        assert_eq!(store.count().unwrap(), 50);
    }

    #[test]
    fn new_session_has_empty_transcript() {
        let store = SessionStore::open_in_memory().unwrap();
        let id = store.create().unwrap();
        assert!(store.load(&id).unwrap().is_empty());

        let summary = store.get(&id).unwrap().unwrap();
        assert_eq!(summary.turn_count, 0);
        assert!(!summary.corrupted);
    }

    #[test]
    fn list_is_newest_first() {
        let store = SessionStore::open_in_memory().unwrap();
        let a = store.create().unwrap();
        let b = store.create().unwrap();
        let c = store.create().unwrap();
        set_created_at(&store, &a, "2025-01-01T10:00:00.000000+00:00");
        set_created_at(&store, &b, "2025-01-02T10:00:00.000000+00:00");
        set_created_at(&store, &c, "2025-01-03T10:00:00.000000+00:00");

        let ids: Vec<SessionId> = store.list().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![c, b, a]);
    }

    #[test]
    fn identical_timestamps_list_latest_insert_first() {
        let store = SessionStore::open_in_memory().unwrap();
        let a = store.create().unwrap();
        let b = store.create().unwrap();
        set_created_at(&store, &a, "2025-01-01T10:00:00.000000+00:00");
        set_created_at(&store, &b, "2025-01-01T10:00:00.000000+00:00");

        let ids: Vec<SessionId> = store.list().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn save_then_load_returns_same_transcript() {
        let store = SessionStore::open_in_memory().unwrap();
        let id = store.create().unwrap();
        let transcript = vec![Message::user("hi"), Message::assistant("hello there")];

        store.save(&id, &transcript).unwrap();
        assert_eq!(store.load(&id).unwrap(), transcript);
        assert_eq!(store.list().unwrap()[0].turn_count, 2);
    }

    #[test]
    fn save_replaces_wholesale() {
        let store = SessionStore::open_in_memory().unwrap();
        let id = store.create().unwrap();
        store
            .save(&id, &[Message::user("one"), Message::assistant("two")])
            .unwrap();
        let shorter = vec![Message::user("fresh start")];
        store.save(&id, &shorter).unwrap();
        assert_eq!(store.load(&id).unwrap(), shorter);
    }

    #[test]
    fn load_missing_id_is_empty() {
        let store = SessionStore::open_in_memory().unwrap();
        let messages = store.load(&SessionId::from("does-not-exist")).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn save_missing_id_is_a_silent_noop() {
        let store = SessionStore::open_in_memory().unwrap();
        let ghost = SessionId::from("ghost");
        store.save(&ghost, &[Message::user("hello?")]).unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.get(&ghost).unwrap().is_none());
    }

    #[test]
    fn corrupt_row_is_isolated_in_listing() {
        let store = SessionStore::open_in_memory().unwrap();
        let good = store.create().unwrap();
        let bad = store.create().unwrap();
        store
            .save(&good, &[Message::user("q"), Message::assistant("a"), Message::user("q2")])
            .unwrap();
        corrupt_row(&store, &bad, rusqlite::types::Value::Text("{not json".into()));

        let list = store.list().unwrap();
        assert_eq!(list.len(), 2);
        let bad_row = list.iter().find(|s| s.id == bad).unwrap();
        assert_eq!(bad_row.turn_count, 0);
        assert!(bad_row.corrupted);
        let good_row = list.iter().find(|s| s.id == good).unwrap();
        assert_eq!(good_row.turn_count, 3);
        assert!(!good_row.corrupted);
    }

    #[test]
    fn binary_garbage_is_isolated_in_listing() {
        let store = SessionStore::open_in_memory().unwrap();
        let bad = store.create().unwrap();
        let _ok = store.create().unwrap();
        corrupt_row(&store, &bad, rusqlite::types::Value::Blob(vec![0xff, 0xfe, 0x00, 0x9c]));

        let list = store.list().unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.iter().find(|s| s.id == bad).unwrap().corrupted);
        assert!(matches!(store.load(&bad), Err(Error::CorruptTranscript(_))));
    }

    #[test]
    fn listing_flags_exactly_the_rows_load_rejects() {
        let store = SessionStore::open_in_memory().unwrap();
        let payloads = [
            r#"[1,"x",{"v":99}]"#,
            r#"[{"v":99,"role":"user","content":[],"timestamp":"2025-01-01T00:00:00Z"}]"#,
            r#"[{"kind":"request"}]"#,
            r#"[{"role":"user","content":[],"timestamp":"2025-01-01T00:00:00Z"}]"#,
            "[]",
        ];
        for payload in payloads {
            corrupt_row(&store, &store.create().unwrap(), rusqlite::types::Value::Text(payload.into()));
        }

        for summary in store.list().unwrap() {
            let loaded = store.load(&summary.id);
            assert_eq!(summary.corrupted, loaded.is_err(), "{}", summary.id);
            assert_eq!(store.get(&summary.id).unwrap().as_ref(), Some(&summary));
            match loaded {
                Ok(messages) => assert_eq!(summary.turn_count, messages.len()),
                Err(_) => assert_eq!(summary.turn_count, 0),
            }
        }
        assert_eq!(store.list().unwrap().iter().filter(|s| s.corrupted).count(), 3);
    }

    #[test]
    fn load_corrupt_row_is_an_error() {
        let store = SessionStore::open_in_memory().unwrap();
        let id = store.create().unwrap();
        corrupt_row(&store, &id, rusqlite::types::Value::Text("[{\"role\": 7}]".into()));

        match store.load(&id) {
            Err(Error::CorruptTranscript(msg)) => assert!(msg.contains(id.as_str())),
            other => panic!("expected CorruptTranscript, got {other:?}"),
        }
    }

    #[test]
    fn empty_payload_loads_as_empty_transcript() {
        let store = SessionStore::open_in_memory().unwrap();
        let id = store.create().unwrap();
        corrupt_row(&store, &id, rusqlite::types::Value::Text("   ".into()));
        assert!(store.load(&id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn async_wrappers_roundtrip() {
        let store = SessionStore::open_in_memory().unwrap();
        let id = store.create().unwrap();
        let transcript = vec![Message::user("async"), Message::assistant("works")];
        store.save_async(&id, &transcript).await.unwrap();
        assert_eq!(store.load_async(&id).await.unwrap(), transcript);
    }
}
