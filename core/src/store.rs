//! SQLite-backed savegame storage.
//!
//! RULE: Only store.rs talks to the database.
//! The session controller sees it through the SavegameService trait.
//!
//! Savegame "paths" are keys into the savegame table. The kind of a
//! savegame is derived from its path prefix, and rotation keeps the
//! newest N autosaves and quicksaves by insertion sequence.

use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension};

use crate::{
    config::SessionSettings,
    error::{SimError, SimResult},
    services::{SavegameKind, SavegameService},
    snapshot::SessionSnapshot,
};

const AUTOSAVE_DIR:  &str = "autosave";
const QUICKSAVE_DIR: &str = "quicksave";
const SAVEGAME_DIR:  &str = "saves";
const EXTENSION:     &str = "sav";

/// How many rotating savegames survive cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    pub autosaves:  usize,
    pub quicksaves: usize,
}

impl From<&SessionSettings> for Retention {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            autosaves:  settings.autosave_max_count,
            quicksaves: settings.quicksave_max_count,
        }
    }
}

pub struct SqliteSavegameStore {
    conn:      Connection,
    retention: Retention,
    next_seq:  i64,
    issued:    u64,
}

impl SqliteSavegameStore {
    /// Open (or create) the savegame database at `path`.
    pub fn open(path: &str, retention: Retention) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: saves don't block readers of older slots.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn, retention)
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory(retention: Retention) -> SimResult<Self> {
        Self::init(Connection::open_in_memory()?, retention)
    }

    fn init(conn: Connection, retention: Retention) -> SimResult<Self> {
        conn.execute_batch(include_str!("../migrations/001_savegames.sql"))?;
        let max_seq: Option<i64> =
            conn.query_row("SELECT MAX(seq) FROM savegame", [], |row| row.get(0))?;
        let max_seq = max_seq.unwrap_or(0);
        Ok(Self {
            conn,
            retention,
            next_seq: max_seq + 1,
            // Count on past earlier opens; rotating_name skips taken names.
            issued: u64::try_from(max_seq).unwrap_or(0),
        })
    }

    pub fn count(&self, kind: SavegameKind) -> SimResult<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM savegame WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// Savegame paths of one kind, newest first.
    pub fn list(&self, kind: SavegameKind) -> SimResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT path FROM savegame WHERE kind = ?1 ORDER BY seq DESC",
        )?;
        let paths = stmt
            .query_map(params![kind.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(paths)
    }

    fn exists(&self, path: &str) -> SimResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM savegame WHERE path = ?1", params![path], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// A fresh timestamped name under `dir`. Never one already stored.
    fn rotating_name(&mut self, dir: &str) -> String {
        let stamp = Local::now().format("%Y-%m-%dT%H-%M-%S");
        loop {
            self.issued += 1;
            let path = format!("{dir}/{stamp}-{:03}.{EXTENSION}", self.issued);
            match self.exists(&path) {
                Ok(false) => return path,
                Ok(true) => continue,
                Err(e) => {
                    log::warn!("store: cannot check {path}: {e}");
                    return path;
                }
            }
        }
    }
}

fn kind_of(path: &str) -> SavegameKind {
    if path.starts_with(&format!("{AUTOSAVE_DIR}/")) {
        SavegameKind::Autosave
    } else if path.starts_with(&format!("{QUICKSAVE_DIR}/")) {
        SavegameKind::Quicksave
    } else {
        SavegameKind::Regular
    }
}

impl SavegameService for SqliteSavegameStore {
    fn create_autosave_filename(&mut self) -> String {
        self.rotating_name(AUTOSAVE_DIR)
    }

    fn create_quicksave_filename(&mut self) -> String {
        self.rotating_name(QUICKSAVE_DIR)
    }

    fn create_filename(&mut self, name: &str) -> String {
        let clean: String = name
            .trim()
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' || c == ' ' { c } else { '_' })
            .collect();
        format!("{SAVEGAME_DIR}/{clean}.{EXTENSION}")
    }

    fn delete_dispensable_savegames(&mut self, kind: SavegameKind) -> SimResult<()> {
        let keep = match kind {
            SavegameKind::Autosave  => self.retention.autosaves,
            SavegameKind::Quicksave => self.retention.quicksaves,
            SavegameKind::Regular   => return Ok(()),
        };
        let deleted = self.conn.execute(
            "DELETE FROM savegame WHERE kind = ?1 AND path NOT IN (
                 SELECT path FROM savegame WHERE kind = ?1 ORDER BY seq DESC LIMIT ?2
             )",
            params![kind.as_str(), keep as i64],
        )?;
        if deleted > 0 {
            log::debug!("store: removed {deleted} old {} savegame(s)", kind.as_str());
        }
        Ok(())
    }

    fn get_quicksaves(&self) -> SimResult<Vec<String>> {
        self.list(SavegameKind::Quicksave)
    }

    fn write_savegame(&mut self, path: &str, snapshot: &SessionSnapshot) -> SimResult<()> {
        let json = snapshot.to_json()?;
        self.conn.execute(
            "INSERT OR REPLACE INTO savegame (path, kind, seq, run_id, tick, saved_at, state_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                path,
                kind_of(path).as_str(),
                self.next_seq,
                snapshot.run_id,
                snapshot.clock.current_tick as i64,
                Local::now().to_rfc3339(),
                json,
            ],
        )?;
        self.next_seq += 1;
        Ok(())
    }

    fn read_savegame(&self, path: &str) -> SimResult<SessionSnapshot> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT state_json FROM savegame WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;
        let json = json.ok_or_else(|| SimError::SavegameNotFound { path: path.to_string() })?;
        SessionSnapshot::from_json(&json)
    }
}
