//! Applies workflow decisions to the database
//!
//! Every write runs inside one `BEGIN IMMEDIATE` transaction on the
//! service's connection. An early return drops the transaction, which
//! rolls back everything written so far.

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::{WorkflowEngine, WorkflowError};
use crate::alerts::{AlertEvent, AlertService, NewAlert, SongAlert};
use crate::assets::{AssetReviewManager, NewAsset, ReviewDecision, SongAsset};
use crate::checklist::{
    calculate_progress, instantiate_for_stage, revalidate_items, ChecklistItem,
    RevalidationSummary,
};
use crate::config::{Config, SongflowPaths, WorkflowSettings};
use crate::db::{now_ts, Database};
use crate::models::{
    Actor, NewSong, RecordingBundle, ReleaseBundle, Song, SongNote, SongUpdate, Split, Stage,
    StageTransitionRecord, Work,
};
use crate::permissions::fields::{redact, FieldGrants};
use crate::permissions::{
    allowed_transitions, get_department_for_stage, user_can_create_song, user_can_edit_song,
    user_can_review_assets, user_can_view_overdue, user_can_view_song,
};
use crate::validation;

/// What an operation needs from the actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Access {
    View,
    Edit,
}

/// Result of a committed stage transition
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub song: Song,
    pub record: StageTransitionRecord,
    pub alerts_created: usize,
}

/// A stage's checklist with its progress
#[derive(Debug, Clone, Serialize)]
pub struct ChecklistView {
    pub song_id: i64,
    pub stage: Stage,
    pub is_current_stage: bool,
    pub progress: f64,
    pub items: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToggleOutcome {
    pub item: ChecklistItem,
    pub progress: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevalidationOutcome {
    pub summary: RevalidationSummary,
    pub progress: f64,
}

/// Full song view, serialized and redacted before it leaves the service
#[derive(Debug, Clone, Serialize)]
struct SongDetail {
    song: Song,
    work: Option<Work>,
    work_splits: Vec<Split>,
    recordings: Vec<RecordingBundle>,
    releases: Vec<ReleaseBundle>,
    assets: Vec<SongAsset>,
    notes: Vec<SongNote>,
    allowed_transitions: Vec<Stage>,
    warnings: Vec<String>,
}

/// Song counts over the songs an actor can see
#[derive(Debug, Clone, Default, Serialize)]
pub struct SongStats {
    pub total_songs: usize,
    pub by_stage: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub blocked: usize,
    pub overdue: usize,
}

/// The song workflow service
pub struct SongWorkflow {
    db: Database,
    settings: WorkflowSettings,
}

impl SongWorkflow {
    pub fn new(db: Database, settings: WorkflowSettings) -> Self {
        Self { db, settings }
    }

    /// Open the database under `paths` with settings from `config`
    pub fn open(paths: &SongflowPaths, config: &Config) -> Result<Self, WorkflowError> {
        let db = Database::open(paths)?;
        Ok(Self::new(db, config.workflow.clone()))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Look up the acting user by handle
    pub fn resolve_actor(&self, user_id: &str) -> Result<Actor, WorkflowError> {
        self.db
            .get_user(user_id)?
            .ok_or_else(|| WorkflowError::not_found("User", user_id))
    }

    // ---- internals ----

    /// Run `f` inside an immediate transaction, committing on success
    pub(super) fn write<T>(
        &self,
        f: impl FnOnce() -> Result<T, WorkflowError>,
    ) -> Result<T, WorkflowError> {
        let tx = self.db.immediate_transaction()?;
        let value = f()?;
        tx.commit().context("Failed to commit transaction")?;
        Ok(value)
    }

    pub(super) fn load_song(&self, song_id: i64) -> Result<Song, WorkflowError> {
        self.db
            .get_song(song_id)?
            .ok_or_else(|| WorkflowError::not_found("Song", song_id))
    }

    pub(super) fn authorize(
        &self,
        actor: &Actor,
        song: &Song,
        access: Access,
    ) -> Result<(), WorkflowError> {
        let allowed = match access {
            Access::View => user_can_view_song(actor, song),
            Access::Edit => user_can_edit_song(actor, song),
        };
        if allowed {
            return Ok(());
        }

        // A viewer denial must not reveal where the song is
        let message = match access {
            Access::View => format!("{} cannot view song {}", actor.id, song.id),
            Access::Edit => format!(
                "{} cannot edit song {} in {}",
                actor.id, song.id, song.stage
            ),
        };
        Err(WorkflowError::PermissionDenied(message))
    }

    /// Load a song and check the actor's access to it
    pub(super) fn song_for(
        &self,
        actor: &Actor,
        song_id: i64,
        access: Access,
    ) -> Result<Song, WorkflowError> {
        let song = self.load_song(song_id)?;
        self.authorize(actor, &song, access)?;
        Ok(song)
    }

    fn stage_items(&self, song_id: i64, stage: Stage) -> Result<Vec<ChecklistItem>, WorkflowError> {
        let mut items = Vec::new();
        for row in self.db.list_checklist_rows(song_id, Some(stage))? {
            items.push(row.into_item()?);
        }
        Ok(items)
    }

    /// Revalidate the current stage's automatic items and cache progress
    pub(super) fn refresh_checklist(
        &self,
        song: &Song,
    ) -> Result<(RevalidationSummary, f64), WorkflowError> {
        let mut items = self.stage_items(song.id, song.stage)?;
        let ctx = self.db.load_song_context(song.clone())?;
        let summary = revalidate_items(&mut items, &ctx)?;

        for change in &summary.updated {
            if let Some(item) = items.iter().find(|i| i.id == change.item_id) {
                self.db.update_checklist_completion(item)?;
            }
        }

        let progress = calculate_progress(&items);
        self.db.set_checklist_progress(song.id, progress)?;

        if !summary.updated.is_empty() {
            debug!(
                song_id = song.id,
                updated = summary.updated.len(),
                progress,
                "checklist revalidated"
            );
        }
        Ok((summary, progress))
    }

    pub(super) fn insert_alerts(&self, alerts: &[NewAlert]) -> Result<usize, WorkflowError> {
        for alert in alerts {
            self.db.insert_alert(alert)?;
            debug!(
                song_id = alert.song_id,
                alert_type = %alert.alert_type,
                "alert created"
            );
        }
        Ok(alerts.len())
    }

    // ---- songs ----

    /// Create a song in draft, owned by publishing
    pub fn create_song(&self, actor: &Actor, new: NewSong) -> Result<Song, WorkflowError> {
        if !user_can_create_song(actor) {
            return Err(WorkflowError::PermissionDenied(format!(
                "{} has no department and cannot create songs",
                actor.id
            )));
        }
        validation::validate_new_song(&new)
            .map_err(|e| WorkflowError::ValidationFailed(e.to_string()))?;

        let now = now_ts();
        let mut song = Song {
            id: 0,
            title: new.title.trim().to_string(),
            artist: new.artist,
            genre: new.genre,
            language: new.language,
            priority: new.priority,
            target_release_date: new.target_release_date,
            stage: Stage::Draft,
            stage_entered_at: now,
            stage_deadline: None,
            assigned_department: get_department_for_stage(Stage::Draft),
            assigned_user: None,
            is_blocked: false,
            blocked_reason: None,
            internal_notes: new.internal_notes,
            created_by: actor.id.clone(),
            work_id: None,
            checklist_progress: 100.0,
            created_at: now,
            updated_at: now,
        };

        self.write(|| {
            song.id = self.db.insert_song(&song)?;
            for item in instantiate_for_stage(song.id, song.stage) {
                self.db.insert_checklist_item(&item)?;
            }
            let (_, progress) = self.refresh_checklist(&song)?;
            song.checklist_progress = progress;
            Ok(())
        })?;

        info!(song_id = song.id, actor = %actor.id, title = %song.title, "song created");
        Ok(song)
    }

    pub fn get_song(&self, actor: &Actor, song_id: i64) -> Result<Song, WorkflowError> {
        self.song_for(actor, song_id, Access::View)
    }

    /// The song with its catalog, assets and notes, with guarded fields removed
    pub fn song_view(&self, actor: &Actor, song_id: i64) -> Result<serde_json::Value, WorkflowError> {
        let song = self.get_song(actor, song_id)?;
        let ctx = self.db.load_song_context(song.clone())?;

        let detail = SongDetail {
            allowed_transitions: allowed_transitions(song.stage).to_vec(),
            warnings: validation::lint_song(&song),
            notes: self.db.list_notes(song.id)?,
            song: ctx.song,
            work: ctx.work,
            work_splits: ctx.work_splits,
            recordings: ctx.recordings,
            releases: ctx.releases,
            assets: ctx.assets,
        };

        let mut value = serde_json::to_value(&detail).context("Failed to serialize song")?;
        redact(&mut value, actor, &song);
        Ok(value)
    }

    /// Songs visible to the actor, most recently updated first
    pub fn list_songs(&self, actor: &Actor, stage: Option<Stage>) -> Result<Vec<Song>, WorkflowError> {
        Ok(self
            .db
            .list_songs()?
            .into_iter()
            .filter(|s| stage.map_or(true, |st| s.stage == st))
            .filter(|s| user_can_view_song(actor, s))
            .collect())
    }

    pub fn update_song(
        &self,
        actor: &Actor,
        song_id: i64,
        update: SongUpdate,
    ) -> Result<Song, WorkflowError> {
        validation::validate_song_update(&update)
            .map_err(|e| WorkflowError::ValidationFailed(e.to_string()))?;

        let song = self.write(|| {
            let mut song = self.song_for(actor, song_id, Access::Edit)?;
            update.apply(&mut song);
            song.updated_at = now_ts();
            self.db.update_song(&song)?;
            let (_, progress) = self.refresh_checklist(&song)?;
            song.checklist_progress = progress;
            Ok(song)
        })?;

        info!(song_id, actor = %actor.id, "song updated");
        Ok(song)
    }

    /// Flag or clear a blocking issue; flagging notifies the owning department
    pub fn set_blocked(
        &self,
        actor: &Actor,
        song_id: i64,
        blocked: bool,
        reason: Option<String>,
    ) -> Result<Song, WorkflowError> {
        let song = self.write(|| {
            let mut song = self.song_for(actor, song_id, Access::Edit)?;
            let newly_blocked = blocked && !song.is_blocked;

            song.is_blocked = blocked;
            song.blocked_reason = if blocked { reason } else { None };
            song.updated_at = now_ts();
            self.db.update_song(&song)?;

            if newly_blocked {
                let reason = song.blocked_reason.as_deref().unwrap_or("not given");
                let alerts =
                    AlertService::alerts_for(&AlertEvent::Blocked { reason }, &song, actor);
                self.insert_alerts(&alerts)?;
            }
            Ok(song)
        })?;

        if blocked {
            warn!(song_id, actor = %actor.id, reason = ?song.blocked_reason, "song blocked");
        } else {
            info!(song_id, actor = %actor.id, "song unblocked");
        }
        Ok(song)
    }

    // ---- transitions ----

    /// Move a song to `target` from whatever stage it is in now
    pub fn transition(
        &self,
        actor: &Actor,
        song_id: i64,
        target: Stage,
        notes: Option<String>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let current = self.song_for(actor, song_id, Access::View)?.stage;
        self.transition_from(actor, song_id, current, target, notes)
    }

    /// Move a song from `expected` to `target`
    ///
    /// Fails with [`WorkflowError::PermissionDenied`] when the actor cannot
    /// see the song, and with [`WorkflowError::Conflict`] when the song is no
    /// longer in `expected` once the write lock is held. All side effects (stage
    /// change, new checklist, audit row, alerts) commit together or not at all.
    pub fn transition_from(
        &self,
        actor: &Actor,
        song_id: i64,
        expected: Stage,
        target: Stage,
        notes: Option<String>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let tx = self.db.immediate_transaction()?;

        let mut song = self.song_for(actor, song_id, Access::View)?;
        if song.stage != expected {
            warn!(
                song_id,
                expected = %expected,
                actual = %song.stage,
                actor = %actor.id,
                "transition conflict"
            );
            return Err(WorkflowError::Conflict {
                song_id,
                expected,
                actual: song.stage,
            });
        }

        let (_, progress) = self.refresh_checklist(&song)?;
        let plan = WorkflowEngine::plan_transition(
            actor,
            &song,
            target,
            progress,
            Utc::now().date_naive(),
            self.settings.stage_deadline_days,
        )?;

        let now = now_ts();
        song.stage = plan.to;
        song.stage_entered_at = now;
        song.assigned_department = plan.department;
        song.stage_deadline = plan.deadline;
        song.updated_at = now;
        self.db.update_song(&song)?;

        // A stage keeps its checklist across re-entry (the rework loop)
        if self.db.list_checklist_rows(song_id, Some(plan.to))?.is_empty() {
            let items = instantiate_for_stage(song.id, plan.to);
            for item in &items {
                self.db.insert_checklist_item(item)?;
            }
            debug!(song_id, stage = %plan.to, items = items.len(), "checklist generated");
        } else {
            debug!(song_id, stage = %plan.to, "checklist kept from earlier visit");
        }

        let mut record = StageTransitionRecord {
            id: 0,
            song_id,
            from_stage: plan.from,
            to_stage: plan.to,
            actor: actor.id.clone(),
            timestamp: now,
            notes,
            admin_override: plan.admin_override,
        };
        record.id = self.db.insert_transition(&record)?;

        let mut alerts = AlertService::alerts_for(
            &AlertEvent::StageTransition {
                from: plan.from,
                to: plan.to,
            },
            &song,
            actor,
        );
        if plan.to == Stage::DigitalDistribution {
            alerts.extend(AlertService::alerts_for(
                &AlertEvent::SentToDigital,
                &song,
                actor,
            ));
        }
        let alerts_created = self.insert_alerts(&alerts)?;

        let (_, progress) = self.refresh_checklist(&song)?;
        song.checklist_progress = progress;

        tx.commit().context("Failed to commit stage transition")?;

        if plan.admin_override {
            warn!(
                song_id,
                actor = %actor.id,
                event = %plan.event.as_string(),
                "admin override of incomplete checklist"
            );
        } else {
            info!(
                song_id,
                actor = %actor.id,
                event = %plan.event.as_string(),
                "stage transition"
            );
        }

        Ok(TransitionOutcome {
            song,
            record,
            alerts_created,
        })
    }

    /// Hand a song from ready_for_digital to the digital team
    pub fn send_to_digital(
        &self,
        actor: &Actor,
        song_id: i64,
        notes: Option<String>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let current = self.song_for(actor, song_id, Access::View)?.stage;
        if current != Stage::ReadyForDigital {
            return Err(WorkflowError::InvalidTransition {
                from: current,
                to: Stage::DigitalDistribution,
            });
        }
        self.transition_from(
            actor,
            song_id,
            Stage::ReadyForDigital,
            Stage::DigitalDistribution,
            notes,
        )
    }

    pub fn archive(
        &self,
        actor: &Actor,
        song_id: i64,
        notes: Option<String>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        self.transition(actor, song_id, Stage::Archived, notes)
    }

    pub fn history(
        &self,
        actor: &Actor,
        song_id: i64,
    ) -> Result<Vec<StageTransitionRecord>, WorkflowError> {
        let song = self.get_song(actor, song_id)?;
        Ok(self.db.list_transitions(song.id)?)
    }

    // ---- checklist ----

    /// Checklist for one stage (current stage when `stage` is `None`)
    pub fn checklist(
        &self,
        actor: &Actor,
        song_id: i64,
        stage: Option<Stage>,
    ) -> Result<ChecklistView, WorkflowError> {
        let song = self.get_song(actor, song_id)?;
        let stage = stage.unwrap_or(song.stage);
        let items = self.stage_items(song.id, stage)?;

        Ok(ChecklistView {
            song_id: song.id,
            stage,
            is_current_stage: stage == song.stage,
            progress: calculate_progress(&items),
            items,
        })
    }

    /// Flip a manual item on the song's current stage
    pub fn toggle_checklist_item(
        &self,
        actor: &Actor,
        item_id: i64,
    ) -> Result<ToggleOutcome, WorkflowError> {
        let outcome = self.write(|| {
            let mut item = self
                .db
                .get_checklist_row(item_id)?
                .ok_or_else(|| WorkflowError::not_found("Checklist item", item_id))?
                .into_item()?;
            let song = self.song_for(actor, item.song_id, Access::Edit)?;

            if item.stage != song.stage {
                return Err(WorkflowError::ValidationFailed(format!(
                    "Item '{}' belongs to {} but the song is in {}",
                    item.item_name, item.stage, song.stage
                )));
            }
            if !item.is_manual() {
                return Err(WorkflowError::NotToggleable(item.item_name));
            }

            let complete = !item.is_complete;
            item.set_complete(complete, Some(&actor.id));
            self.db.update_checklist_completion(&item)?;
            let (_, progress) = self.refresh_checklist(&song)?;
            Ok(ToggleOutcome { item, progress })
        })?;

        info!(
            item_id,
            song_id = outcome.item.song_id,
            complete = outcome.item.is_complete,
            actor = %actor.id,
            "checklist item toggled"
        );
        Ok(outcome)
    }

    /// Re-run automatic validators for the song's current stage
    pub fn revalidate_checklist(
        &self,
        actor: &Actor,
        song_id: i64,
    ) -> Result<RevalidationOutcome, WorkflowError> {
        self.write(|| {
            let song = self.song_for(actor, song_id, Access::View)?;
            let (summary, progress) = self.refresh_checklist(&song)?;
            Ok(RevalidationOutcome { summary, progress })
        })
    }

    // ---- alerts ----

    pub fn list_alerts(&self, actor: &Actor, unread_only: bool) -> Result<Vec<SongAlert>, WorkflowError> {
        Ok(self.db.list_alerts_for(actor, unread_only)?)
    }

    pub fn mark_alert_read(&self, actor: &Actor, alert_id: i64) -> Result<(), WorkflowError> {
        let alert = self
            .db
            .get_alert(alert_id)?
            .ok_or_else(|| WorkflowError::not_found("Alert", alert_id))?;
        if !alert.is_addressed_to(actor) && !actor.is_admin() {
            return Err(WorkflowError::PermissionDenied(format!(
                "Alert {} is not addressed to {}",
                alert_id, actor.id
            )));
        }
        self.db.mark_alert_read(alert_id)?;
        Ok(())
    }

    pub fn mark_all_alerts_read(&self, actor: &Actor) -> Result<usize, WorkflowError> {
        Ok(self.db.mark_all_alerts_read(actor)?)
    }

    pub fn unread_alert_count(&self, actor: &Actor) -> Result<i64, WorkflowError> {
        Ok(self.db.unread_alert_count(actor)?)
    }

    // ---- queues & stats ----

    /// Songs currently owned by the actor's department, most pressing first
    pub fn my_queue(&self, actor: &Actor) -> Result<Vec<Song>, WorkflowError> {
        let Some(dept) = actor.department else {
            return Ok(Vec::new());
        };

        let mut songs: Vec<Song> = self
            .list_songs(actor, None)?
            .into_iter()
            .filter(|s| {
                (s.stage == Stage::Draft || s.stage.is_in_flight())
                    && s.assigned_department == Some(dept)
            })
            .collect();
        songs.sort_by(|a, b| {
            b.priority
                .rank()
                .cmp(&a.priority.rank())
                .then(a.stage_entered_at.cmp(&b.stage_entered_at))
        });
        Ok(songs)
    }

    /// Visible songs past their stage deadline, earliest deadline first
    pub fn overdue(&self, actor: &Actor) -> Result<Vec<Song>, WorkflowError> {
        if !user_can_view_overdue(actor) {
            return Err(WorkflowError::PermissionDenied(format!(
                "{} is not a manager",
                actor.id
            )));
        }

        let today = Utc::now().date_naive();
        let mut songs: Vec<Song> = self
            .list_songs(actor, None)?
            .into_iter()
            .filter(|s| s.is_overdue(today))
            .collect();
        songs.sort_by_key(|s| s.stage_deadline);
        Ok(songs)
    }

    pub fn stats(&self, actor: &Actor) -> Result<SongStats, WorkflowError> {
        let today = Utc::now().date_naive();
        let mut stats = SongStats::default();

        for song in self.list_songs(actor, None)? {
            stats.total_songs += 1;
            *stats.by_stage.entry(song.stage.to_string()).or_default() += 1;
            *stats.by_priority.entry(song.priority.to_string()).or_default() += 1;
            if song.is_blocked {
                stats.blocked += 1;
            }
            if song.is_overdue(today) {
                stats.overdue += 1;
            }
        }
        Ok(stats)
    }

    // ---- assets ----

    /// Submit an asset for review on the song's current stage
    pub fn upload_asset(
        &self,
        actor: &Actor,
        song_id: i64,
        new: NewAsset,
    ) -> Result<SongAsset, WorkflowError> {
        if new.location.trim().is_empty() {
            return Err(WorkflowError::ValidationFailed(
                "asset location is required".to_string(),
            ));
        }

        let asset = self.write(|| {
            let song = self.song_for(actor, song_id, Access::Edit)?;
            let asset = AssetReviewManager::create_asset(song.id, song.stage, actor, new);
            self.db.insert_asset(&asset)?;

            let alerts =
                AlertService::alerts_for(&AlertEvent::AssetSubmitted(&asset), &song, actor);
            self.insert_alerts(&alerts)?;
            self.refresh_checklist(&song)?;
            Ok(asset)
        })?;

        info!(song_id, asset_id = %asset.id, asset_type = %asset.asset_type, "asset submitted");
        Ok(asset)
    }

    pub fn review_asset(
        &self,
        actor: &Actor,
        asset_id: &str,
        decision: ReviewDecision,
        notes: Option<String>,
    ) -> Result<SongAsset, WorkflowError> {
        if !user_can_review_assets(actor) {
            return Err(WorkflowError::PermissionDenied(format!(
                "{} cannot review assets",
                actor.id
            )));
        }

        let asset = self.write(|| {
            let mut asset = self
                .db
                .get_asset(asset_id)?
                .ok_or_else(|| WorkflowError::not_found("Asset", asset_id))?;
            let song = self.song_for(actor, asset.song_id, Access::View)?;

            AssetReviewManager::review(&mut asset, &actor.id, decision, notes)
                .map_err(WorkflowError::ValidationFailed)?;
            self.db.update_asset_review(&asset)?;

            let alerts =
                AlertService::alerts_for(&AlertEvent::AssetReviewed(&asset), &song, actor);
            self.insert_alerts(&alerts)?;
            self.refresh_checklist(&song)?;
            Ok(asset)
        })?;

        info!(asset_id, status = %asset.status, reviewer = %actor.id, "asset reviewed");
        Ok(asset)
    }

    pub fn list_assets(&self, actor: &Actor, song_id: i64) -> Result<Vec<SongAsset>, WorkflowError> {
        let song = self.get_song(actor, song_id)?;
        Ok(self.db.list_assets(song.id)?)
    }

    // ---- notes ----

    /// Annotate a song; a note with `pitched_to` records a sales pitch
    pub fn add_note(
        &self,
        actor: &Actor,
        song_id: i64,
        body: &str,
        pitched_to: Option<String>,
    ) -> Result<SongNote, WorkflowError> {
        if body.trim().is_empty() {
            return Err(WorkflowError::ValidationFailed(
                "note body is required".to_string(),
            ));
        }
        let pitched_to = pitched_to.filter(|p| !p.trim().is_empty());
        if pitched_to.is_some()
            && !actor.is_admin()
            && actor.department != Some(crate::models::Department::Sales)
        {
            return Err(WorkflowError::PermissionDenied(format!(
                "{} is not in sales and cannot record pitches",
                actor.id
            )));
        }

        self.write(|| {
            let song = self.song_for(actor, song_id, Access::View)?;
            let mut note = SongNote {
                id: 0,
                song_id: song.id,
                author: actor.id.clone(),
                body: body.trim().to_string(),
                is_sales_pitch: pitched_to.is_some(),
                pitched_to,
                created_at: now_ts(),
            };
            note.id = self.db.insert_note(&note)?;

            if let Some(target) = &note.pitched_to {
                let alerts = AlertService::alerts_for(
                    &AlertEvent::SalesPitch { pitched_to: target },
                    &song,
                    actor,
                );
                self.insert_alerts(&alerts)?;
                info!(song_id, actor = %actor.id, pitched_to = %target, "sales pitch recorded");
            }
            Ok(note)
        })
    }

    /// Notes on a song; pitch targets are hidden from non-editors
    pub fn notes(&self, actor: &Actor, song_id: i64) -> Result<Vec<SongNote>, WorkflowError> {
        let song = self.get_song(actor, song_id)?;
        let grants = FieldGrants::resolve(actor, &song);

        let mut notes = self.db.list_notes(song.id)?;
        if !grants.editors {
            for note in &mut notes {
                note.pitched_to = None;
            }
        }
        Ok(notes)
    }
}
