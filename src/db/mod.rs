//! SQLite database layer for songflow
//!
//! Connections run in WAL mode with a busy timeout, so a second writer waits
//! for the first instead of failing. Stage changes use `BEGIN IMMEDIATE`
//! (see [`Database::immediate_transaction`]).

mod alerts;
mod assets;
mod catalog;
mod checklist;

pub use checklist::ChecklistItemRow;

use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::config::SongflowPaths;
use crate::models::{Actor, Song, SongNote, StageTransitionRecord};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id            TEXT PRIMARY KEY,
            name          TEXT NOT NULL,
            role_level    INTEGER NOT NULL DEFAULT 100,
            department    TEXT
        )
        "#,
    ),
    (
        "works",
        r#"
        CREATE TABLE IF NOT EXISTS works (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            title         TEXT NOT NULL,
            iswc          TEXT
        )
        "#,
    ),
    (
        "songs",
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id                    INTEGER PRIMARY KEY AUTOINCREMENT,
            title                 TEXT NOT NULL,
            artist                TEXT,
            genre                 TEXT,
            language              TEXT,
            priority              TEXT NOT NULL DEFAULT 'normal',
            target_release_date   TEXT,
            stage                 TEXT NOT NULL DEFAULT 'draft',
            stage_entered_at      INTEGER NOT NULL,
            stage_deadline        TEXT,
            assigned_department   TEXT,
            assigned_user         TEXT,
            is_blocked            INTEGER NOT NULL DEFAULT 0,
            blocked_reason        TEXT,
            internal_notes        TEXT,
            created_by            TEXT NOT NULL,
            work_id               INTEGER,
            checklist_progress    REAL NOT NULL DEFAULT 0,
            created_at            INTEGER NOT NULL,
            updated_at            INTEGER NOT NULL,
            FOREIGN KEY (work_id) REFERENCES works(id)
        )
        "#,
    ),
    (
        "splits",
        r#"
        CREATE TABLE IF NOT EXISTS splits (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            scope         TEXT NOT NULL,
            object_id     INTEGER NOT NULL,
            right_type    TEXT NOT NULL,
            party         TEXT NOT NULL,
            share         TEXT NOT NULL
        )
        "#,
    ),
    (
        "recordings",
        r#"
        CREATE TABLE IF NOT EXISTS recordings (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            song_id             INTEGER NOT NULL,
            title               TEXT NOT NULL,
            isrc                TEXT,
            master_audio        TEXT,
            instrumental_audio  TEXT,
            FOREIGN KEY (song_id) REFERENCES songs(id)
        )
        "#,
    ),
    (
        "credits",
        r#"
        CREATE TABLE IF NOT EXISTS credits (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            recording_id  INTEGER NOT NULL,
            party         TEXT NOT NULL,
            role          TEXT NOT NULL,
            FOREIGN KEY (recording_id) REFERENCES recordings(id)
        )
        "#,
    ),
    (
        "releases",
        r#"
        CREATE TABLE IF NOT EXISTS releases (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            song_id       INTEGER NOT NULL,
            title         TEXT NOT NULL,
            release_type  TEXT,
            release_date  TEXT,
            upc           TEXT,
            FOREIGN KEY (song_id) REFERENCES songs(id)
        )
        "#,
    ),
    (
        "publications",
        r#"
        CREATE TABLE IF NOT EXISTS publications (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            release_id    INTEGER NOT NULL,
            platform      TEXT NOT NULL,
            url           TEXT,
            FOREIGN KEY (release_id) REFERENCES releases(id)
        )
        "#,
    ),
    (
        "song_checklist_items",
        r#"
        CREATE TABLE IF NOT EXISTS song_checklist_items (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            song_id          INTEGER NOT NULL,
            stage            TEXT NOT NULL,
            category         TEXT NOT NULL,
            item_name        TEXT NOT NULL,
            description      TEXT NOT NULL,
            item_order       INTEGER NOT NULL,
            required         INTEGER NOT NULL,
            validation_type  TEXT NOT NULL,
            validation_rule  TEXT NOT NULL,
            is_complete      INTEGER NOT NULL DEFAULT 0,
            completed_at     INTEGER,
            completed_by     TEXT,
            help_text        TEXT,
            FOREIGN KEY (song_id) REFERENCES songs(id)
        )
        "#,
    ),
    (
        "song_stage_transitions",
        r#"
        CREATE TABLE IF NOT EXISTS song_stage_transitions (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            song_id         INTEGER NOT NULL,
            from_stage      TEXT NOT NULL,
            to_stage        TEXT NOT NULL,
            actor           TEXT NOT NULL,
            timestamp       INTEGER NOT NULL,
            notes           TEXT,
            admin_override  INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (song_id) REFERENCES songs(id)
        )
        "#,
    ),
    (
        "song_assets",
        r#"
        CREATE TABLE IF NOT EXISTS song_assets (
            id                        TEXT PRIMARY KEY,
            song_id                   INTEGER NOT NULL,
            stage                     TEXT NOT NULL,
            asset_type                TEXT NOT NULL,
            title                     TEXT,
            location                  TEXT NOT NULL,
            width                     INTEGER,
            height                    INTEGER,
            status                    TEXT NOT NULL DEFAULT 'pending',
            submitted_by              TEXT NOT NULL,
            submitted_by_department   TEXT,
            reviewer                  TEXT,
            review_notes              TEXT,
            submitted_at              INTEGER NOT NULL,
            reviewed_at               INTEGER,
            FOREIGN KEY (song_id) REFERENCES songs(id)
        )
        "#,
    ),
    (
        "song_alerts",
        r#"
        CREATE TABLE IF NOT EXISTS song_alerts (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            song_id            INTEGER NOT NULL,
            alert_type         TEXT NOT NULL,
            target_department  TEXT,
            target_user        TEXT,
            priority           TEXT NOT NULL,
            title              TEXT NOT NULL,
            message            TEXT NOT NULL,
            is_read            INTEGER NOT NULL DEFAULT 0,
            created_at         INTEGER NOT NULL,
            FOREIGN KEY (song_id) REFERENCES songs(id)
        )
        "#,
    ),
    (
        "song_notes",
        r#"
        CREATE TABLE IF NOT EXISTS song_notes (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            song_id         INTEGER NOT NULL,
            author          TEXT NOT NULL,
            body            TEXT NOT NULL,
            is_sales_pitch  INTEGER NOT NULL DEFAULT 0,
            pitched_to      TEXT,
            created_at      INTEGER NOT NULL,
            FOREIGN KEY (song_id) REFERENCES songs(id)
        )
        "#,
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_songs_stage ON songs(stage)",
    "CREATE INDEX IF NOT EXISTS idx_songs_department ON songs(assigned_department)",
    "CREATE INDEX IF NOT EXISTS idx_checklist_song_stage ON song_checklist_items(song_id, stage)",
    "CREATE INDEX IF NOT EXISTS idx_transitions_song ON song_stage_transitions(song_id)",
    "CREATE INDEX IF NOT EXISTS idx_alerts_department ON song_alerts(target_department, is_read)",
    "CREATE INDEX IF NOT EXISTS idx_alerts_user ON song_alerts(target_user, is_read)",
    "CREATE INDEX IF NOT EXISTS idx_splits_object ON splits(scope, object_id)",
    "CREATE INDEX IF NOT EXISTS idx_assets_song ON song_assets(song_id)",
];

const SONG_COLUMNS: &str = "id, title, artist, genre, language, priority, target_release_date, \
     stage, stage_entered_at, stage_deadline, assigned_department, assigned_user, is_blocked, \
     blocked_reason, internal_notes, created_by, work_id, checklist_progress, created_at, updated_at";

/// Current Unix timestamp in seconds
pub fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Read a text column through `FromStr`, failing the row on unknown values
pub(crate) fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

pub(crate) fn parse_optional_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr<Err = String>,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        s.parse()
            .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
    })
    .transpose()
}

fn song_from_row(row: &Row<'_>) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        genre: row.get(3)?,
        language: row.get(4)?,
        priority: parse_column(row, 5)?,
        target_release_date: row.get(6)?,
        stage: parse_column(row, 7)?,
        stage_entered_at: row.get(8)?,
        stage_deadline: row.get(9)?,
        assigned_department: parse_optional_column(row, 10)?,
        assigned_user: row.get(11)?,
        is_blocked: row.get(12)?,
        blocked_reason: row.get(13)?,
        internal_notes: row.get(14)?,
        created_by: row.get(15)?,
        work_id: row.get(16)?,
        checklist_progress: row.get(17)?,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<Actor> {
    Ok(Actor {
        id: row.get(0)?,
        name: row.get(1)?,
        role_level: row.get(2)?,
        department: parse_optional_column(row, 3)?,
    })
}

fn transition_from_row(row: &Row<'_>) -> rusqlite::Result<StageTransitionRecord> {
    Ok(StageTransitionRecord {
        id: row.get(0)?,
        song_id: row.get(1)?,
        from_stage: parse_column(row, 2)?,
        to_stage: parse_column(row, 3)?,
        actor: row.get(4)?,
        timestamp: row.get(5)?,
        notes: row.get(6)?,
        admin_override: row.get(7)?,
    })
}

/// Database wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open an existing database
    pub fn open(paths: &SongflowPaths) -> Result<Self> {
        let conn = Connection::open(&paths.db_file).context("Failed to open songflow database")?;
        Self::configure(&conn)?;
        Ok(Self { conn })
    }

    /// Initialize a new database with schema
    pub fn init(paths: &SongflowPaths) -> Result<Self> {
        Self::init_at(&paths.db_file)
    }

    /// Open (creating if needed) a database file and ensure the schema exists
    pub fn init_at(path: impl AsRef<Path>) -> Result<Self> {
        let conn =
            Connection::open(path.as_ref()).context("Failed to create songflow database")?;
        Self::configure(&conn)?;
        let db = Self { conn };
        db.create_schema()?;
        Ok(db)
    }

    /// Private in-memory database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::configure(&conn)?;
        let db = Self { conn };
        db.create_schema()?;
        Ok(db)
    }

    fn configure(conn: &Connection) -> Result<()> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("Failed to set busy timeout")?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .context("Failed to enable WAL mode")?;
        conn.pragma_update(None, "foreign_keys", true)
            .context("Failed to enable foreign keys")?;
        Ok(())
    }

    fn create_schema(&self) -> Result<()> {
        for (table, sql) in SCHEMA {
            self.conn
                .execute(sql, [])
                .with_context(|| format!("Failed to create {} table", table))?;
        }
        for sql in INDEXES {
            self.conn.execute(sql, []).context("Failed to create index")?;
        }
        Ok(())
    }

    /// Start a `BEGIN IMMEDIATE` transaction on this connection
    ///
    /// The write lock is taken up front, so reads made inside the
    /// transaction cannot be invalidated by another writer before commit.
    /// Dropping the returned transaction without committing rolls back.
    pub fn immediate_transaction(&self) -> Result<Transaction<'_>> {
        Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .context("Failed to begin immediate transaction")
    }

    // ---- users ----

    /// Insert or replace a user profile
    pub fn upsert_user(&self, user: &Actor) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO users (id, name, role_level, department) VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    role_level = excluded.role_level,
                    department = excluded.department
                "#,
                params![
                    user.id,
                    user.name,
                    user.role_level,
                    user.department.map(|d| d.to_string())
                ],
            )
            .context("Failed to save user")?;
        Ok(())
    }

    pub fn get_user(&self, id: &str) -> Result<Option<Actor>> {
        self.conn
            .query_row(
                "SELECT id, name, role_level, department FROM users WHERE id = ?1",
                params![id],
                user_from_row,
            )
            .optional()
            .context("Failed to load user")
    }

    pub fn list_users(&self) -> Result<Vec<Actor>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, role_level, department FROM users ORDER BY id")?;
        let rows = stmt.query_map([], user_from_row)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    // ---- songs ----

    /// Insert a song and return its new id (`song.id` is ignored)
    pub fn insert_song(&self, song: &Song) -> Result<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO songs (
                    title, artist, genre, language, priority, target_release_date, stage,
                    stage_entered_at, stage_deadline, assigned_department, assigned_user,
                    is_blocked, blocked_reason, internal_notes, created_by, work_id,
                    checklist_progress, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
                "#,
                params![
                    song.title,
                    song.artist,
                    song.genre,
                    song.language,
                    song.priority.to_string(),
                    song.target_release_date,
                    song.stage.to_string(),
                    song.stage_entered_at,
                    song.stage_deadline,
                    song.assigned_department.map(|d| d.to_string()),
                    song.assigned_user,
                    song.is_blocked,
                    song.blocked_reason,
                    song.internal_notes,
                    song.created_by,
                    song.work_id,
                    song.checklist_progress,
                    song.created_at,
                    song.updated_at,
                ],
            )
            .context("Failed to insert song")?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Persist every mutable column of a song
    pub fn update_song(&self, song: &Song) -> Result<()> {
        let changed = self
            .conn
            .execute(
                r#"
                UPDATE songs SET
                    title = ?1, artist = ?2, genre = ?3, language = ?4, priority = ?5,
                    target_release_date = ?6, stage = ?7, stage_entered_at = ?8,
                    stage_deadline = ?9, assigned_department = ?10, assigned_user = ?11,
                    is_blocked = ?12, blocked_reason = ?13, internal_notes = ?14,
                    work_id = ?15, checklist_progress = ?16, updated_at = ?17
                WHERE id = ?18
                "#,
                params![
                    song.title,
                    song.artist,
                    song.genre,
                    song.language,
                    song.priority.to_string(),
                    song.target_release_date,
                    song.stage.to_string(),
                    song.stage_entered_at,
                    song.stage_deadline,
                    song.assigned_department.map(|d| d.to_string()),
                    song.assigned_user,
                    song.is_blocked,
                    song.blocked_reason,
                    song.internal_notes,
                    song.work_id,
                    song.checklist_progress,
                    song.updated_at,
                    song.id,
                ],
            )
            .context("Failed to update song")?;
        anyhow::ensure!(changed == 1, "Song {} disappeared during update", song.id);
        Ok(())
    }

    /// Cache recomputed checklist progress on the song row
    pub fn set_checklist_progress(&self, song_id: i64, progress: f64) -> Result<()> {
        self.conn
            .execute(
                "UPDATE songs SET checklist_progress = ?1 WHERE id = ?2",
                params![progress, song_id],
            )
            .context("Failed to cache checklist progress")?;
        Ok(())
    }

    pub fn get_song(&self, id: i64) -> Result<Option<Song>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM songs WHERE id = ?1", SONG_COLUMNS),
                params![id],
                song_from_row,
            )
            .optional()
            .context("Failed to load song")
    }

    /// All songs, most recently updated first
    pub fn list_songs(&self) -> Result<Vec<Song>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM songs ORDER BY updated_at DESC, id DESC",
            SONG_COLUMNS
        ))?;
        let rows = stmt.query_map([], song_from_row)?;

        let mut songs = Vec::new();
        for row in rows {
            songs.push(row?);
        }
        Ok(songs)
    }

    // ---- audit trail ----

    pub fn insert_transition(&self, record: &StageTransitionRecord) -> Result<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO song_stage_transitions
                    (song_id, from_stage, to_stage, actor, timestamp, notes, admin_override)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    record.song_id,
                    record.from_stage.to_string(),
                    record.to_stage.to_string(),
                    record.actor,
                    record.timestamp,
                    record.notes,
                    record.admin_override,
                ],
            )
            .context("Failed to record stage transition")?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Transitions for a song, oldest first
    pub fn list_transitions(&self, song_id: i64) -> Result<Vec<StageTransitionRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, song_id, from_stage, to_stage, actor, timestamp, notes, admin_override
            FROM song_stage_transitions WHERE song_id = ?1 ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![song_id], transition_from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    // ---- notes ----

    pub fn insert_note(&self, note: &SongNote) -> Result<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO song_notes (song_id, author, body, is_sales_pitch, pitched_to, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    note.song_id,
                    note.author,
                    note.body,
                    note.is_sales_pitch,
                    note.pitched_to,
                    note.created_at,
                ],
            )
            .context("Failed to save note")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_notes(&self, song_id: i64) -> Result<Vec<SongNote>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, song_id, author, body, is_sales_pitch, pitched_to, created_at
            FROM song_notes WHERE song_id = ?1 ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![song_id], |row| {
            Ok(SongNote {
                id: row.get(0)?,
                song_id: row.get(1)?,
                author: row.get(2)?,
                body: row.get(3)?,
                is_sales_pitch: row.get(4)?,
                pitched_to: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;

        let mut notes = Vec::new();
        for row in rows {
            notes.push(row?);
        }
        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::testing::song;
    use crate::models::{Department, Stage};

    #[test]
    fn song_round_trips_through_storage() {
        let db = Database::open_in_memory().unwrap();
        let mut s = song(Stage::Publishing);
        s.stage_deadline = chrono::NaiveDate::from_ymd_opt(2025, 4, 1);
        s.internal_notes = Some("advance pending".to_string());

        let id = db.insert_song(&s).unwrap();
        let loaded = db.get_song(id).unwrap().unwrap();
        assert_eq!(loaded.title, s.title);
        assert_eq!(loaded.stage, Stage::Publishing);
        assert_eq!(loaded.stage_deadline, s.stage_deadline);
        assert_eq!(loaded.assigned_department, Some(Department::Publishing));

        assert!(db.get_song(id + 100).unwrap().is_none());
    }

    #[test]
    fn unknown_stage_text_fails_the_row() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_song(&song(Stage::Draft)).unwrap();
        db.conn
            .execute("UPDATE songs SET stage = 'mastering' WHERE id = ?1", params![id])
            .unwrap();
        assert!(db.get_song(id).is_err());
    }

    #[test]
    fn users_upsert() {
        let db = Database::open_in_memory().unwrap();
        let mut user = Actor::new("lbl-1", "Lena", 100, Some(Department::Label));
        db.upsert_user(&user).unwrap();
        user.role_level = 300;
        db.upsert_user(&user).unwrap();

        let users = db.list_users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(db.get_user("lbl-1").unwrap().unwrap().role_level, 300);
    }

    #[test]
    fn dropped_transaction_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        {
            let _tx = db.immediate_transaction().unwrap();
            db.insert_song(&song(Stage::Draft)).unwrap();
        }
        assert!(db.list_songs().unwrap().is_empty());

        let tx = db.immediate_transaction().unwrap();
        db.insert_song(&song(Stage::Draft)).unwrap();
        tx.commit().unwrap();
        assert_eq!(db.list_songs().unwrap().len(), 1);
    }
}
