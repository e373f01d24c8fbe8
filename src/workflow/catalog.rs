//! Catalog writes made through the workflow
//!
//! Each write needs edit rights on the owning song and revalidates the
//! song's checklist in the same transaction, so automatic items follow
//! the catalog.

use rust_decimal::Decimal;
use tracing::info;

use super::service::Access;
use super::{SongWorkflow, WorkflowError};
use crate::models::{
    Actor, Credit, NewRecording, NewRelease, Publication, Recording, Release, RightType, Song,
    Split, SplitScope, Work,
};
use crate::permissions::user_can_view_splits;
use crate::validation;

fn invalid(e: anyhow::Error) -> WorkflowError {
    WorkflowError::ValidationFailed(e.to_string())
}

fn required(value: &str, what: &str) -> Result<(), WorkflowError> {
    if value.trim().is_empty() {
        return Err(WorkflowError::ValidationFailed(format!("{} is required", what)));
    }
    Ok(())
}

fn normalized(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SongWorkflow {
    /// Create the song's work and link it
    pub fn create_work(
        &self,
        actor: &Actor,
        song_id: i64,
        title: &str,
        iswc: Option<String>,
    ) -> Result<Work, WorkflowError> {
        required(title, "work title")?;
        let iswc = normalized(iswc);
        if let Some(code) = &iswc {
            validation::validate_iswc(code).map_err(invalid)?;
        }

        let work = self.write(|| {
            let mut song = self.song_for(actor, song_id, Access::Edit)?;
            if let Some(existing) = song.work_id {
                return Err(WorkflowError::ValidationFailed(format!(
                    "Song {} is already linked to work {}",
                    song.id, existing
                )));
            }

            let work_id = self.database().insert_work(title.trim(), iswc.as_deref())?;
            song.work_id = Some(work_id);
            song.updated_at = crate::db::now_ts();
            self.database().update_song(&song)?;
            self.refresh_checklist(&song)?;

            self.database()
                .get_work(work_id)?
                .ok_or_else(|| WorkflowError::not_found("Work", work_id))
        })?;

        info!(song_id, work_id = work.id, "work linked");
        Ok(work)
    }

    /// Set or replace the ISWC on the song's work
    pub fn assign_iswc(&self, actor: &Actor, song_id: i64, iswc: &str) -> Result<Work, WorkflowError> {
        validation::validate_iswc(iswc).map_err(invalid)?;

        self.write(|| {
            let song = self.song_for(actor, song_id, Access::Edit)?;
            let work_id = linked_work(&song)?;
            self.database().update_work_iswc(work_id, Some(iswc.trim()))?;
            self.refresh_checklist(&song)?;

            self.database()
                .get_work(work_id)?
                .ok_or_else(|| WorkflowError::not_found("Work", work_id))
        })
    }

    /// Record a rights share on the song's work or on one of its recordings
    ///
    /// Writer and publisher shares go on the work; master shares go on a
    /// recording (the primary one unless `recording_id` is given).
    pub fn add_split(
        &self,
        actor: &Actor,
        song_id: i64,
        right_type: RightType,
        party: &str,
        share: Decimal,
        recording_id: Option<i64>,
    ) -> Result<Split, WorkflowError> {
        required(party, "split party")?;
        validation::validate_share(share).map_err(invalid)?;
        let scope = right_type.scope();
        if scope == SplitScope::Work && recording_id.is_some() {
            return Err(WorkflowError::ValidationFailed(format!(
                "{} splits belong to the work, not a recording",
                right_type
            )));
        }

        let split = self.write(|| {
            let song = self.song_for(actor, song_id, Access::Edit)?;
            if !user_can_view_splits(actor, &song) {
                return Err(WorkflowError::PermissionDenied(format!(
                    "{} cannot manage splits in {}",
                    actor.id, song.stage
                )));
            }

            let object_id = match scope {
                SplitScope::Work => linked_work(&song)?,
                SplitScope::Recording => self.recording_for_split(&song, recording_id)?,
            };

            let mut split = Split {
                id: 0,
                scope,
                object_id,
                right_type,
                party: party.trim().to_string(),
                share,
            };
            split.id = self.database().insert_split(&split)?;
            self.refresh_checklist(&song)?;
            Ok(split)
        })?;

        info!(
            song_id,
            scope = %split.scope,
            right_type = %split.right_type,
            share = %split.share,
            "split recorded"
        );
        Ok(split)
    }

    fn recording_for_split(&self, song: &Song, recording_id: Option<i64>) -> Result<i64, WorkflowError> {
        match recording_id {
            Some(id) => {
                let recording = self
                    .database()
                    .get_recording(id)?
                    .filter(|r| r.song_id == song.id)
                    .ok_or_else(|| WorkflowError::not_found("Recording", id))?;
                Ok(recording.id)
            }
            None => self
                .database()
                .list_recordings(song.id)?
                .first()
                .map(|r| r.id)
                .ok_or_else(|| {
                    WorkflowError::ValidationFailed(format!(
                        "Song {} has no recording to attach master splits to",
                        song.id
                    ))
                }),
        }
    }

    pub fn add_recording(
        &self,
        actor: &Actor,
        song_id: i64,
        new: NewRecording,
    ) -> Result<Recording, WorkflowError> {
        required(&new.title, "recording title")?;
        let isrc = normalized(new.isrc);
        if let Some(code) = &isrc {
            validation::validate_isrc(code).map_err(invalid)?;
        }

        let recording = self.write(|| {
            let song = self.song_for(actor, song_id, Access::Edit)?;
            let mut recording = Recording {
                id: 0,
                song_id: song.id,
                title: new.title.trim().to_string(),
                isrc,
                master_audio: normalized(new.master_audio),
                instrumental_audio: normalized(new.instrumental_audio),
            };
            recording.id = self.database().insert_recording(&recording)?;
            self.refresh_checklist(&song)?;
            Ok(recording)
        })?;

        info!(song_id, recording_id = recording.id, "recording added");
        Ok(recording)
    }

    pub fn add_credit(
        &self,
        actor: &Actor,
        recording_id: i64,
        party: &str,
        role: &str,
    ) -> Result<Credit, WorkflowError> {
        required(party, "credit party")?;
        required(role, "credit role")?;

        self.write(|| {
            let recording = self
                .database()
                .get_recording(recording_id)?
                .ok_or_else(|| WorkflowError::not_found("Recording", recording_id))?;
            let song = self.song_for(actor, recording.song_id, Access::Edit)?;

            let mut credit = Credit {
                id: 0,
                recording_id,
                party: party.trim().to_string(),
                role: role.trim().to_string(),
            };
            credit.id = self.database().insert_credit(&credit)?;
            self.refresh_checklist(&song)?;
            Ok(credit)
        })
    }

    pub fn add_release(
        &self,
        actor: &Actor,
        song_id: i64,
        new: NewRelease,
    ) -> Result<Release, WorkflowError> {
        required(&new.title, "release title")?;
        let upc = normalized(new.upc);
        if let Some(code) = &upc {
            validation::validate_upc(code).map_err(invalid)?;
        }

        let release = self.write(|| {
            let song = self.song_for(actor, song_id, Access::Edit)?;
            let mut release = Release {
                id: 0,
                song_id: song.id,
                title: new.title.trim().to_string(),
                release_type: normalized(new.release_type),
                release_date: new.release_date,
                upc,
            };
            release.id = self.database().insert_release(&release)?;
            self.refresh_checklist(&song)?;
            Ok(release)
        })?;

        info!(song_id, release_id = release.id, "release added");
        Ok(release)
    }

    /// List a release on a distribution platform
    pub fn add_publication(
        &self,
        actor: &Actor,
        release_id: i64,
        platform: &str,
        url: Option<String>,
    ) -> Result<Publication, WorkflowError> {
        required(platform, "platform")?;

        self.write(|| {
            let release = self
                .database()
                .get_release(release_id)?
                .ok_or_else(|| WorkflowError::not_found("Release", release_id))?;
            let song = self.song_for(actor, release.song_id, Access::Edit)?;

            let mut publication = Publication {
                id: 0,
                release_id,
                platform: platform.trim().to_string(),
                url: normalized(url),
            };
            publication.id = self.database().insert_publication(&publication)?;
            self.refresh_checklist(&song)?;
            Ok(publication)
        })
    }
}

fn linked_work(song: &Song) -> Result<i64, WorkflowError> {
    song.work_id.ok_or_else(|| {
        WorkflowError::ValidationFailed(format!("Song {} has no linked work", song.id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkflowSettings;
    use crate::db::Database;
    use crate::models::{Department, NewSong, Stage};

    fn workflow() -> (SongWorkflow, Actor, i64) {
        let db = Database::open_in_memory().unwrap();
        let publisher = Actor::new("pub-1", "Pia", 100, Some(Department::Publishing));
        db.upsert_user(&publisher).unwrap();
        let workflow = SongWorkflow::new(db, WorkflowSettings::default());
        let song = workflow
            .create_song(
                &publisher,
                NewSong {
                    title: "Harbor Lights".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        workflow
            .transition(&publisher, song.id, Stage::Publishing, None)
            .unwrap();
        (workflow, publisher, song.id)
    }

    #[test]
    fn work_links_once_and_feeds_the_checklist() {
        let (wf, publisher, song_id) = workflow();
        let before = wf.get_song(&publisher, song_id).unwrap().checklist_progress;

        wf.create_work(&publisher, song_id, "Harbor Lights", None).unwrap();
        let after = wf.get_song(&publisher, song_id).unwrap().checklist_progress;
        assert!(after > before);

        let err = wf
            .create_work(&publisher, song_id, "Again", None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationFailed(_)));

        let work = wf.assign_iswc(&publisher, song_id, "T-034.524.680-1").unwrap();
        assert_eq!(work.iswc.as_deref(), Some("T-034.524.680-1"));
    }

    #[test]
    fn malformed_identifiers_are_rejected() {
        let (wf, publisher, song_id) = workflow();
        let err = wf
            .create_work(&publisher, song_id, "Harbor Lights", Some("12345".to_string()))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationFailed(_)));

        let err = wf
            .add_recording(
                &publisher,
                song_id,
                NewRecording {
                    title: "Demo".to_string(),
                    isrc: Some("not-an-isrc".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationFailed(_)));
    }

    #[test]
    fn split_scope_follows_right_type() {
        let (wf, publisher, song_id) = workflow();

        // No work yet
        let err = wf
            .add_split(&publisher, song_id, RightType::Writer, "Jo", Decimal::from(50), None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationFailed(_)));

        wf.create_work(&publisher, song_id, "Harbor Lights", None).unwrap();
        let split = wf
            .add_split(&publisher, song_id, RightType::Writer, "Jo", Decimal::from(50), None)
            .unwrap();
        assert_eq!(split.scope, SplitScope::Work);

        let err = wf
            .add_split(&publisher, song_id, RightType::Writer, "Jo", Decimal::from(50), Some(1))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationFailed(_)));

        // Master shares need a recording
        let err = wf
            .add_split(&publisher, song_id, RightType::Master, "Label", Decimal::from(100), None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationFailed(_)));

        let err = wf
            .add_split(&publisher, song_id, RightType::Writer, "Jo", Decimal::from(101), None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationFailed(_)));
    }

    #[test]
    fn catalog_writes_need_edit_rights() {
        let (wf, _publisher, song_id) = workflow();
        let sales = Actor::new("sal-1", "Sam", 100, Some(Department::Sales));
        let err = wf
            .create_work(&sales, song_id, "Harbor Lights", None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::PermissionDenied(_)));

        let err = wf
            .add_publication(&sales, 42, "Spotify", None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { .. }));
    }
}
