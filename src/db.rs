// SQLite persistence for in-progress drafts and session state.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::squad::{DraftSnapshot, GameweekId};

/// SQLite-backed storage for draft autosaves and key-value session state.
///
/// Committed squads live on the platform; this database only keeps the
/// local working copy so an interrupted edit session can pick up where it
/// left off.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database at `path` and ensure the schema exists.
    /// Pass `":memory:"` for an ephemeral database (useful for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS draft_autosaves (
                gameweek   INTEGER PRIMARY KEY,
                snapshot   TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS session_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Draft autosaves
    // ------------------------------------------------------------------

    /// Persist the working draft for its gameweek. Overwrites any previous
    /// autosave for the same gameweek.
    pub fn save_draft(&self, snapshot: &DraftSnapshot) -> Result<()> {
        let conn = self.conn();
        let json = serde_json::to_string(snapshot).context("failed to serialize draft snapshot")?;
        conn.execute(
            "INSERT OR REPLACE INTO draft_autosaves (gameweek, snapshot, updated_at)
             VALUES (?1, ?2, ?3)",
            params![
                snapshot.gameweek.0,
                json,
                chrono::Utc::now().to_rfc3339(),
            ],
        )
        .context("failed to save draft autosave")?;
        Ok(())
    }

    /// Load the autosaved draft for a gameweek, if one exists.
    pub fn load_draft(&self, gameweek: GameweekId) -> Result<Option<DraftSnapshot>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT snapshot FROM draft_autosaves WHERE gameweek = ?1")
            .context("failed to prepare load_draft query")?;

        let mut rows = stmt
            .query_map(params![gameweek.0], |row| {
                let json: String = row.get(0)?;
                Ok(json)
            })
            .context("failed to query draft autosave")?;

        match rows.next() {
            Some(row) => {
                let json = row.context("failed to read autosave row")?;
                let snapshot: DraftSnapshot = serde_json::from_str(&json)
                    .context("failed to deserialize draft snapshot")?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    /// Drop the autosave for a gameweek (after a successful commit).
    pub fn clear_draft(&self, gameweek: GameweekId) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM draft_autosaves WHERE gameweek = ?1",
            params![gameweek.0],
        )
        .context("failed to clear draft autosave")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Key-value session state
    // ------------------------------------------------------------------

    /// Persist an arbitrary JSON value under `key`. Repeated saves
    /// overwrite the previous value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn();
        let json = serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO session_state (key, value) VALUES (?1, ?2)",
            params![key, json],
        )
        .context("failed to save state")?;
        Ok(())
    }

    /// Load a previously saved JSON value by `key`. Returns `None` if the
    /// key does not exist.
    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT value FROM session_state WHERE key = ?1")
            .context("failed to prepare load_state query")?;

        let mut rows = stmt
            .query_map(params![key], |row| {
                let json: String = row.get(0)?;
                Ok(json)
            })
            .context("failed to query session state")?;

        match rows.next() {
            Some(row) => {
                let json = row.context("failed to read state row")?;
                let value: serde_json::Value =
                    serde_json::from_str(&json).context("failed to deserialize state value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Last-gameweek convenience
    // ------------------------------------------------------------------

    const LAST_GAMEWEEK_KEY: &'static str = "last_gameweek";

    /// The gameweek the user was last editing, if recorded.
    pub fn last_gameweek(&self) -> Result<Option<GameweekId>> {
        let value = self.load_state(Self::LAST_GAMEWEEK_KEY)?;
        Ok(value
            .and_then(|v| v.as_u64())
            .map(|gw| GameweekId(gw as u32)))
    }

    pub fn set_last_gameweek(&self, gameweek: GameweekId) -> Result<()> {
        self.save_state(
            Self::LAST_GAMEWEEK_KEY,
            &serde_json::Value::from(gameweek.0),
        )
    }
}
