//! Catalog entities: works, splits, recordings, credits, releases, publications

use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::str::FromStr;

use super::{parse_column, Database};
use crate::models::{
    Credit, Publication, Recording, RecordingBundle, Release, ReleaseBundle, Song, SongContext,
    Split, SplitScope, Work,
};

fn split_row(row: &Row<'_>) -> rusqlite::Result<Split> {
    let share: String = row.get(5)?;
    Ok(Split {
        id: row.get(0)?,
        scope: parse_column(row, 1)?,
        object_id: row.get(2)?,
        right_type: parse_column(row, 3)?,
        party: row.get(4)?,
        share: Decimal::from_str(&share)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?,
    })
}

fn recording_row(row: &Row<'_>) -> rusqlite::Result<Recording> {
    Ok(Recording {
        id: row.get(0)?,
        song_id: row.get(1)?,
        title: row.get(2)?,
        isrc: row.get(3)?,
        master_audio: row.get(4)?,
        instrumental_audio: row.get(5)?,
    })
}

fn release_row(row: &Row<'_>) -> rusqlite::Result<Release> {
    Ok(Release {
        id: row.get(0)?,
        song_id: row.get(1)?,
        title: row.get(2)?,
        release_type: row.get(3)?,
        release_date: row.get(4)?,
        upc: row.get(5)?,
    })
}

impl Database {
    // ---- works ----

    pub fn insert_work(&self, title: &str, iswc: Option<&str>) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO works (title, iswc) VALUES (?1, ?2)",
                params![title, iswc],
            )
            .context("Failed to insert work")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_work_iswc(&self, work_id: i64, iswc: Option<&str>) -> Result<()> {
        self.conn
            .execute(
                "UPDATE works SET iswc = ?1 WHERE id = ?2",
                params![iswc, work_id],
            )
            .context("Failed to update work")?;
        Ok(())
    }

    pub fn get_work(&self, id: i64) -> Result<Option<Work>> {
        self.conn
            .query_row(
                "SELECT id, title, iswc FROM works WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Work {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        iswc: row.get(2)?,
                    })
                },
            )
            .optional()
            .context("Failed to load work")
    }

    /// Id of a song linked to the work, if any
    pub fn song_for_work(&self, work_id: i64) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT id FROM songs WHERE work_id = ?1 ORDER BY id LIMIT 1",
                params![work_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up song for work")
    }

    // ---- splits ----

    pub fn insert_split(&self, split: &Split) -> Result<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO splits (scope, object_id, right_type, party, share)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    split.scope.to_string(),
                    split.object_id,
                    split.right_type.to_string(),
                    split.party,
                    split.share.to_string(),
                ],
            )
            .context("Failed to insert split")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_splits(&self, scope: SplitScope, object_id: i64) -> Result<Vec<Split>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, scope, object_id, right_type, party, share
            FROM splits WHERE scope = ?1 AND object_id = ?2 ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![scope.to_string(), object_id], split_row)?;

        let mut splits = Vec::new();
        for row in rows {
            splits.push(row?);
        }
        Ok(splits)
    }

    // ---- recordings ----

    pub fn insert_recording(&self, recording: &Recording) -> Result<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO recordings (song_id, title, isrc, master_audio, instrumental_audio)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    recording.song_id,
                    recording.title,
                    recording.isrc,
                    recording.master_audio,
                    recording.instrumental_audio,
                ],
            )
            .context("Failed to insert recording")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_recording(&self, id: i64) -> Result<Option<Recording>> {
        self.conn
            .query_row(
                r#"
                SELECT id, song_id, title, isrc, master_audio, instrumental_audio
                FROM recordings WHERE id = ?1
                "#,
                params![id],
                recording_row,
            )
            .optional()
            .context("Failed to load recording")
    }

    /// Recordings of a song, oldest (primary) first
    pub fn list_recordings(&self, song_id: i64) -> Result<Vec<Recording>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, song_id, title, isrc, master_audio, instrumental_audio
            FROM recordings WHERE song_id = ?1 ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![song_id], recording_row)?;

        let mut recordings = Vec::new();
        for row in rows {
            recordings.push(row?);
        }
        Ok(recordings)
    }

    pub fn insert_credit(&self, credit: &Credit) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO credits (recording_id, party, role) VALUES (?1, ?2, ?3)",
                params![credit.recording_id, credit.party, credit.role],
            )
            .context("Failed to insert credit")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_credits(&self, recording_id: i64) -> Result<Vec<Credit>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, recording_id, party, role FROM credits WHERE recording_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![recording_id], |row| {
            Ok(Credit {
                id: row.get(0)?,
                recording_id: row.get(1)?,
                party: row.get(2)?,
                role: row.get(3)?,
            })
        })?;

        let mut credits = Vec::new();
        for row in rows {
            credits.push(row?);
        }
        Ok(credits)
    }

    // ---- releases ----

    pub fn insert_release(&self, release: &Release) -> Result<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO releases (song_id, title, release_type, release_date, upc)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    release.song_id,
                    release.title,
                    release.release_type,
                    release.release_date,
                    release.upc,
                ],
            )
            .context("Failed to insert release")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_release(&self, id: i64) -> Result<Option<Release>> {
        self.conn
            .query_row(
                r#"
                SELECT id, song_id, title, release_type, release_date, upc
                FROM releases WHERE id = ?1
                "#,
                params![id],
                release_row,
            )
            .optional()
            .context("Failed to load release")
    }

    /// Releases of a song, oldest (primary) first
    pub fn list_releases(&self, song_id: i64) -> Result<Vec<Release>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, song_id, title, release_type, release_date, upc
            FROM releases WHERE song_id = ?1 ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![song_id], release_row)?;

        let mut releases = Vec::new();
        for row in rows {
            releases.push(row?);
        }
        Ok(releases)
    }

    pub fn insert_publication(&self, publication: &Publication) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO publications (release_id, platform, url) VALUES (?1, ?2, ?3)",
                params![publication.release_id, publication.platform, publication.url],
            )
            .context("Failed to insert publication")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_publications(&self, release_id: i64) -> Result<Vec<Publication>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, release_id, platform, url FROM publications WHERE release_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![release_id], |row| {
            Ok(Publication {
                id: row.get(0)?,
                release_id: row.get(1)?,
                platform: row.get(2)?,
                url: row.get(3)?,
            })
        })?;

        let mut publications = Vec::new();
        for row in rows {
            publications.push(row?);
        }
        Ok(publications)
    }

    /// Load everything the checklist validators look at for `song`
    pub fn load_song_context(&self, song: Song) -> Result<SongContext> {
        let (work, work_splits) = match song.work_id {
            Some(work_id) => (
                self.get_work(work_id)?,
                self.list_splits(SplitScope::Work, work_id)?,
            ),
            None => (None, Vec::new()),
        };

        let mut recordings = Vec::new();
        for recording in self.list_recordings(song.id)? {
            recordings.push(RecordingBundle {
                credits: self.list_credits(recording.id)?,
                splits: self.list_splits(SplitScope::Recording, recording.id)?,
                recording,
            });
        }

        let mut releases = Vec::new();
        for release in self.list_releases(song.id)? {
            releases.push(ReleaseBundle {
                publications: self.list_publications(release.id)?,
                release,
            });
        }

        let assets = self.list_assets(song.id)?;

        Ok(SongContext {
            song,
            work,
            work_splits,
            recordings,
            releases,
            assets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::testing::song;
    use crate::models::{RightType, Stage};

    #[test]
    fn context_collects_primary_entities_in_order() {
        let db = Database::open_in_memory().unwrap();
        let work_id = db.insert_work("Night Drive", Some("T-123.456.789-0")).unwrap();
        let mut s = song(Stage::LabelRecording);
        s.work_id = Some(work_id);
        let song_id = db.insert_song(&s).unwrap();
        s.id = song_id;

        db.insert_split(&Split {
            id: 0,
            scope: SplitScope::Work,
            object_id: work_id,
            right_type: RightType::Writer,
            party: "Writer A".to_string(),
            share: Decimal::from_str("62.5").unwrap(),
        })
        .unwrap();

        for title in ["Master", "Radio edit"] {
            db.insert_recording(&Recording {
                id: 0,
                song_id,
                title: title.to_string(),
                isrc: None,
                master_audio: None,
                instrumental_audio: None,
            })
            .unwrap();
        }

        let ctx = db.load_song_context(s).unwrap();
        assert_eq!(ctx.work.as_ref().unwrap().id, work_id);
        assert_eq!(ctx.work_splits[0].share, Decimal::from_str("62.5").unwrap());
        assert_eq!(ctx.recordings.len(), 2);
        assert_eq!(ctx.primary_recording().unwrap().recording.title, "Master");
        assert!(ctx.primary_release().is_none());
        assert_eq!(db.song_for_work(work_id).unwrap(), Some(song_id));
    }
}
