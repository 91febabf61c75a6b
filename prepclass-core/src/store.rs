//! SQLite session store for generated documents.
//!
//! Each successful generation becomes one immutable row:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS documents (
//!     id          INTEGER PRIMARY KEY AUTOINCREMENT,
//!     owner       TEXT NOT NULL,
//!     topic       TEXT NOT NULL,
//!     difficulty  TEXT NOT NULL,
//!     doc_type    TEXT NOT NULL,
//!     created_at  TEXT NOT NULL,
//!     body        TEXT NOT NULL
//! );
//! ```
//!
//! Writes are append-only; "the latest materials for a topic" is a read
//! question ([`SessionStore::latest_for_topic`]), not an update. WAL mode
//! keeps history reads cheap while a generation is being written.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info};

use crate::config::PersistenceConfig;
use crate::error::{CoreError, Result};
use crate::types::{GenerationRequest, GenerationResult, RecordId};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS documents (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    owner       TEXT NOT NULL,
    topic       TEXT NOT NULL,
    difficulty  TEXT NOT NULL,
    doc_type    TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    body        TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_owner
    ON documents(owner, created_at);";

/// Handle to an open SQLite database that stores [`GenerationResult`]s.
///
/// # Usage
///
/// ```no_run
/// # use prepclass_core::store::SessionStore;
/// # use prepclass_core::config::PersistenceConfig;
/// # use prepclass_core::types::{Difficulty, DocumentType, GenerationRequest, GenerationResult};
/// let store = SessionStore::open("prepclass.db", &PersistenceConfig::default())?;
/// let request = GenerationRequest::new("SQL Joins", Difficulty::Beginner, DocumentType::PreClass)?;
/// let result = GenerationResult::assemble(request, "…generated text…", "mentor");
/// let id = store.save(&result)?;
/// let loaded = store.get_by_id(id)?;
/// # Ok::<(), prepclass_core::CoreError>(())
/// ```
pub struct SessionStore {
    conn: Connection,
    db_path: PathBuf,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Open (or create) the session database at `path`.
    ///
    /// The schema is created if it does not exist. WAL mode is enabled
    /// when `config.wal_mode` is `true`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch(&format!(
            "PRAGMA busy_timeout = {};",
            config.busy_timeout_ms
        ))?;

        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "session store opened"
        );

        Ok(Self { conn, db_path })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Database`] on SQLite failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            db_path: PathBuf::from(":memory:"),
        })
    }

    // ------------------------------------------------------------------
    // Core operations
    // ------------------------------------------------------------------

    /// Persist a [`GenerationResult`] and return its new [`RecordId`].
    ///
    /// Append-only: saving never overwrites an earlier record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Database`] on SQLite failures.
    pub fn save(&self, result: &GenerationResult) -> Result<RecordId> {
        let start = Instant::now();

        self.conn.execute(
            "INSERT INTO documents (owner, topic, difficulty, doc_type, created_at, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                result.owner,
                result.request.topic,
                result.request.difficulty.to_string(),
                result.request.document_type.to_string(),
                result.created_at.to_rfc3339(),
                result.generated_text,
            ],
        )?;

        let id = RecordId(self.conn.last_insert_rowid());

        debug!(
            id = %id,
            owner = %result.owner,
            topic = %result.request.topic,
            doc_type = %result.request.document_type,
            bytes = result.generated_text.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "generation record saved"
        );

        Ok(id)
    }

    /// Load one record by ID.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no row exists for the ID, or
    /// [`CoreError::Database`] on SQLite failures.
    pub fn get_by_id(&self, id: RecordId) -> Result<GenerationResult> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT owner, topic, difficulty, doc_type, created_at, body
             FROM documents WHERE id = ?1",
        )?;

        let row: Option<StoredRow> = stmt
            .query_row(params![id.0], StoredRow::from_row)
            .optional()?;

        row.map_or(Err(CoreError::NotFound(id)), StoredRow::into_result)
    }

    /// All records belonging to `owner`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Database`] on SQLite failures.
    pub fn list_by_owner(&self, owner: &str) -> Result<Vec<GenerationResult>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT owner, topic, difficulty, doc_type, created_at, body
             FROM documents WHERE owner = ?1
             ORDER BY created_at DESC, id DESC",
        )?;

        let rows = stmt.query_map(params![owner], StoredRow::from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?.into_result()?);
        }
        Ok(results)
    }

    /// IDs and records of `owner`, newest first, for history displays.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Database`] on SQLite failures.
    pub fn list_with_ids(&self, owner: &str) -> Result<Vec<(RecordId, GenerationResult)>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, owner, topic, difficulty, doc_type, created_at, body
             FROM documents WHERE owner = ?1
             ORDER BY created_at DESC, id DESC",
        )?;

        let rows = stmt.query_map(params![owner], |row| {
            Ok((row.get::<_, i64>(0)?, StoredRow::from_row_offset(row, 1)?))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (id, stored) = row?;
            results.push((RecordId(id), stored.into_result()?));
        }
        Ok(results)
    }

    /// The most recent record per document type for a topic.
    ///
    /// Mentors regenerate materials for the same topic; this returns the
    /// current set without mutating the older generations.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Database`] on SQLite failures.
    pub fn latest_for_topic(&self, owner: &str, topic: &str) -> Result<Vec<GenerationResult>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT owner, topic, difficulty, doc_type, created_at, body
             FROM documents d
             WHERE owner = ?1 AND topic = ?2
               AND id = (SELECT MAX(id) FROM documents
                         WHERE owner = ?1 AND topic = ?2 AND doc_type = d.doc_type)
             ORDER BY id",
        )?;

        let rows = stmt.query_map(params![owner, topic], StoredRow::from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?.into_result()?);
        }
        Ok(results)
    }

    /// Distinct topics `owner` has generated for, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Database`] on SQLite failures.
    pub fn topics_for_owner(&self, owner: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT topic FROM documents WHERE owner = ?1
             GROUP BY topic ORDER BY MAX(id) DESC",
        )?;

        let rows = stmt.query_map(params![owner], |row| row.get::<_, String>(0))?;

        let mut topics = Vec::new();
        for row in rows {
            topics.push(row?);
        }
        Ok(topics)
    }

    /// Delete all of `owner`'s records. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Database`] on SQLite failures.
    pub fn clear_owner(&self, owner: &str) -> Result<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM documents WHERE owner = ?1", params![owner])?;
        info!(owner, deleted, "history cleared");
        Ok(deleted)
    }

    /// Number of records stored for `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Database`] on SQLite failures.
    pub fn count_by_owner(&self, owner: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE owner = ?1",
            params![owner],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// `owner`'s full history as pretty-printed JSON (for download).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] if encoding fails, or
    /// [`CoreError::Database`] on SQLite failures.
    pub fn history_json(&self, owner: &str) -> Result<String> {
        let records = self.list_by_owner(owner)?;
        serde_json::to_string_pretty(&records).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    /// Return the path to the database file (or `:memory:`).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Raw column values of one `documents` row, before domain validation.
struct StoredRow {
    owner: String,
    topic: String,
    difficulty: String,
    doc_type: String,
    created_at: String,
    body: String,
}

impl StoredRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Self::from_row_offset(row, 0)
    }

    fn from_row_offset(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            owner: row.get(offset)?,
            topic: row.get(offset + 1)?,
            difficulty: row.get(offset + 2)?,
            doc_type: row.get(offset + 3)?,
            created_at: row.get(offset + 4)?,
            body: row.get(offset + 5)?,
        })
    }

    fn into_result(self) -> Result<GenerationResult> {
        let created_at = chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| CoreError::Serialization(format!("bad created_at column: {e}")))?
            .with_timezone(&chrono::Utc);

        Ok(GenerationResult {
            request: GenerationRequest {
                topic: self.topic,
                difficulty: self.difficulty.parse()?,
                document_type: self.doc_type.parse()?,
            },
            generated_text: self.body,
            created_at,
            owner: self.owner,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Difficulty, DocumentType};

    fn sample(topic: &str, doc_type: DocumentType, owner: &str) -> GenerationResult {
        let request = GenerationRequest::new(topic, Difficulty::Beginner, doc_type)
            .expect("valid request");
        GenerationResult::assemble(request, format!("body for {topic}"), owner)
    }

    #[test]
    fn round_trip_save_get() {
        let store = SessionStore::open_in_memory().expect("open");
        let result = sample("Binary Search Trees", DocumentType::PreClass, "mentor");

        let id = store.save(&result).expect("save");
        let loaded = store.get_by_id(id).expect("get");

        assert_eq!(loaded.request, result.request);
        assert_eq!(loaded.generated_text, result.generated_text);
        assert_eq!(loaded.owner, "mentor");
        assert_eq!(loaded.created_at.to_rfc3339(), result.created_at.to_rfc3339());
    }

    #[test]
    fn get_absent_id_is_not_found() {
        let store = SessionStore::open_in_memory().expect("open");
        let err = store.get_by_id(RecordId(999)).expect_err("must fail");
        assert!(matches!(err, CoreError::NotFound(RecordId(999))));
    }

    #[test]
    fn list_by_owner_is_newest_first_and_scoped() {
        let store = SessionStore::open_in_memory().expect("open");
        store
            .save(&sample("Graphs", DocumentType::PreClass, "mentor"))
            .expect("save");
        store
            .save(&sample("Heaps", DocumentType::PreClass, "mentor"))
            .expect("save");
        store
            .save(&sample("Tries", DocumentType::PreClass, "other"))
            .expect("save");

        let listed = store.list_by_owner("mentor").expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].request.topic, "Heaps");
        assert_eq!(listed[1].request.topic, "Graphs");
    }

    #[test]
    fn latest_for_topic_picks_newest_per_doc_type() {
        let store = SessionStore::open_in_memory().expect("open");
        store
            .save(&sample("Graphs", DocumentType::PreClass, "mentor"))
            .expect("save");
        store
            .save(&sample("Graphs", DocumentType::InClass, "mentor"))
            .expect("save");

        let request = GenerationRequest::new("Graphs", Difficulty::Advanced, DocumentType::PreClass)
            .expect("valid");
        let regenerated = GenerationResult::assemble(request, "fresh pre-class", "mentor");
        store.save(&regenerated).expect("save");

        let latest = store.latest_for_topic("mentor", "Graphs").expect("latest");
        assert_eq!(latest.len(), 2, "one per generated doc type");

        let pre = latest
            .iter()
            .find(|r| r.request.document_type == DocumentType::PreClass)
            .expect("pre-class present");
        assert_eq!(pre.generated_text, "fresh pre-class");
        assert_eq!(pre.request.difficulty, Difficulty::Advanced);
    }

    #[test]
    fn clear_owner_removes_only_that_owner() {
        let store = SessionStore::open_in_memory().expect("open");
        store
            .save(&sample("Graphs", DocumentType::PreClass, "mentor"))
            .expect("save");
        store
            .save(&sample("Tries", DocumentType::PreClass, "other"))
            .expect("save");

        let deleted = store.clear_owner("mentor").expect("clear");
        assert_eq!(deleted, 1);
        assert_eq!(store.count_by_owner("mentor").expect("count"), 0);
        assert_eq!(store.count_by_owner("other").expect("count"), 1);
    }

    #[test]
    fn topics_for_owner_newest_first_distinct() {
        let store = SessionStore::open_in_memory().expect("open");
        store
            .save(&sample("Graphs", DocumentType::PreClass, "mentor"))
            .expect("save");
        store
            .save(&sample("Heaps", DocumentType::PreClass, "mentor"))
            .expect("save");
        store
            .save(&sample("Graphs", DocumentType::PostClass, "mentor"))
            .expect("save");

        let topics = store.topics_for_owner("mentor").expect("topics");
        assert_eq!(topics, vec!["Graphs".to_string(), "Heaps".to_string()]);
    }

    #[test]
    fn history_json_contains_records() {
        let store = SessionStore::open_in_memory().expect("open");
        store
            .save(&sample("Graphs", DocumentType::PreClass, "mentor"))
            .expect("save");

        let json = store.history_json("mentor").expect("json");
        assert!(json.contains("Graphs"));
        assert!(json.contains("body for Graphs"));
    }

    #[test]
    fn file_based_open_persists_across_handles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("prepclass_test.db");
        let config = PersistenceConfig::default();

        let id = {
            let store = SessionStore::open(&db_path, &config).expect("open");
            store
                .save(&sample("Graphs", DocumentType::PreClass, "mentor"))
                .expect("save")
        };

        let store = SessionStore::open(&db_path, &config).expect("reopen");
        let loaded = store.get_by_id(id).expect("get");
        assert_eq!(loaded.request.topic, "Graphs");
    }
}
