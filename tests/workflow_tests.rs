// Integration tests for the song workflow service
// Covers the full stage walk, checklist gating, admin overrides, the rework
// loop, department visibility and queues against an on-disk database.

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;

use songflow::alerts::AlertType;
use songflow::assets::{AssetType, NewAsset, ReviewDecision};
use songflow::config::WorkflowSettings;
use songflow::db::Database;
use songflow::models::{
    Actor, Department, NewRecording, NewRelease, NewSong, RightType, SongUpdate, Stage,
    ADMIN_LEVEL,
};
use songflow::workflow::{SongWorkflow, WorkflowError};

struct Team {
    _dir: TempDir,
    workflow: SongWorkflow,
    publishing: Actor,
    label: Actor,
    marketing: Actor,
    digital: Actor,
    sales: Actor,
    admin: Actor,
}

fn setup() -> Result<Team> {
    let dir = TempDir::new()?;
    let db = Database::init_at(dir.path().join("songflow.db"))?;

    let publishing = Actor::new("pia", "Pia", 100, Some(Department::Publishing));
    let label = Actor::new("lars", "Lars", 100, Some(Department::Label));
    let marketing = Actor::new("mara", "Mara", 100, Some(Department::Marketing));
    let digital = Actor::new("dev", "Dev", 100, Some(Department::Digital));
    let sales = Actor::new("sam", "Sam", 100, Some(Department::Sales));
    let admin = Actor::new("ada", "Ada", ADMIN_LEVEL, None);
    for user in [&publishing, &label, &marketing, &digital, &sales, &admin] {
        db.upsert_user(user)?;
    }

    Ok(Team {
        _dir: dir,
        workflow: SongWorkflow::new(db, WorkflowSettings::default()),
        publishing,
        label,
        marketing,
        digital,
        sales,
        admin,
    })
}

fn release_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 11, 20).unwrap()
}

fn new_song(title: &str) -> NewSong {
    NewSong {
        title: title.to_string(),
        artist: Some("The Midnight Signal".to_string()),
        target_release_date: Some(release_date()),
        ..Default::default()
    }
}

/// Tick every required manual item on the song's current stage
fn complete_manual_items(workflow: &SongWorkflow, actor: &Actor, song_id: i64) -> Result<f64> {
    let view = workflow.checklist(actor, song_id, None)?;
    let mut progress = view.progress;
    for item in view
        .items
        .iter()
        .filter(|i| i.required && i.is_manual() && !i.is_complete)
    {
        progress = workflow.toggle_checklist_item(actor, item.id)?.progress;
    }
    Ok(progress)
}

#[test]
fn test_song_walks_from_draft_to_released() -> Result<()> {
    let t = setup()?;
    let wf = &t.workflow;

    let song = wf.create_song(&t.publishing, new_song("Night Drive"))?;
    assert_eq!(song.stage, Stage::Draft);
    assert_eq!(song.checklist_progress, 100.0);

    // Draft has no checklist
    let moved = wf.transition(&t.publishing, song.id, Stage::Publishing, None)?;
    assert_eq!(moved.song.assigned_department, Some(Department::Publishing));
    assert!(moved.song.stage_deadline.is_some());

    // Publishing: work, ISWC, writer splits, agreements
    wf.create_work(&t.publishing, song.id, "Night Drive", Some("T-123.456.789-0".to_string()))?;
    wf.add_split(&t.publishing, song.id, RightType::Writer, "Jo Writer", Decimal::from(60), None)?;
    wf.add_split(&t.publishing, song.id, RightType::Writer, "Al Writer", Decimal::from(40), None)?;
    assert_eq!(complete_manual_items(wf, &t.publishing, song.id)?, 100.0);
    let moved = wf.transition(&t.publishing, song.id, Stage::LabelRecording, None)?;
    assert_eq!(moved.song.assigned_department, Some(Department::Label));
    assert!(!moved.record.admin_override);

    let queue = wf.my_queue(&t.label)?;
    assert!(queue.iter().any(|s| s.id == song.id));

    // Label recording: recording with ISRC and master audio, credit, master split
    let recording = wf.add_recording(
        &t.label,
        song.id,
        NewRecording {
            title: "Night Drive (Album Version)".to_string(),
            isrc: Some("USABC2400001".to_string()),
            master_audio: Some("masters/night-drive.wav".to_string()),
            ..Default::default()
        },
    )?;
    wf.add_credit(&t.label, recording.id, "Ari Keys", "Producer")?;
    wf.add_split(&t.label, song.id, RightType::Master, "Signal Records", Decimal::from(100), None)?;
    assert_eq!(complete_manual_items(wf, &t.label, song.id)?, 100.0);
    wf.transition(&t.label, song.id, Stage::MarketingAssets, None)?;

    // Marketing: cover art at full size and a press photo
    let cover = wf.upload_asset(
        &t.marketing,
        song.id,
        NewAsset {
            asset_type: AssetType::CoverArt,
            title: Some("Cover".to_string()),
            location: "art/night-drive-cover.jpg".to_string(),
            width: Some(3000),
            height: Some(3000),
        },
    )?;
    wf.upload_asset(
        &t.marketing,
        song.id,
        NewAsset {
            asset_type: AssetType::PressPhoto,
            title: None,
            location: "photos/band.png".to_string(),
            width: None,
            height: None,
        },
    )?;
    wf.review_asset(&t.label, &cover.id, ReviewDecision::Approve, None)?;
    assert_eq!(complete_manual_items(wf, &t.marketing, song.id)?, 100.0);
    wf.transition(&t.marketing, song.id, Stage::LabelReview, None)?;

    // Label review and ready for digital are signed off by hand
    complete_manual_items(wf, &t.label, song.id)?;
    wf.transition(&t.label, song.id, Stage::ReadyForDigital, None)?;
    assert_eq!(complete_manual_items(wf, &t.label, song.id)?, 100.0);
    let sent = wf.send_to_digital(&t.label, song.id, Some("Go".to_string()))?;
    assert_eq!(sent.song.stage, Stage::DigitalDistribution);
    assert!(sent.alerts_created >= 2);

    let digital_alerts = wf.list_alerts(&t.digital, true)?;
    assert!(digital_alerts
        .iter()
        .any(|a| a.song_id == song.id && a.alert_type == AlertType::SentToDigital));

    // Digital: release with metadata and UPC, one publication
    let release = wf.add_release(
        &t.digital,
        song.id,
        NewRelease {
            title: "Night Drive".to_string(),
            release_type: Some("single".to_string()),
            release_date: Some(release_date()),
            upc: Some("012345678905".to_string()),
        },
    )?;
    wf.add_publication(&t.digital, release.id, "Spotify", None)?;
    assert_eq!(complete_manual_items(wf, &t.digital, song.id)?, 100.0);
    let released = wf.transition(&t.digital, song.id, Stage::Released, None)?;
    assert_eq!(released.song.assigned_department, None);
    assert_eq!(released.song.stage_deadline, None);

    let history = wf.history(&t.admin, song.id)?;
    let hops: Vec<(Stage, Stage)> = history.iter().map(|r| (r.from_stage, r.to_stage)).collect();
    assert_eq!(
        hops,
        vec![
            (Stage::Draft, Stage::Publishing),
            (Stage::Publishing, Stage::LabelRecording),
            (Stage::LabelRecording, Stage::MarketingAssets),
            (Stage::MarketingAssets, Stage::LabelReview),
            (Stage::LabelReview, Stage::ReadyForDigital),
            (Stage::ReadyForDigital, Stage::DigitalDistribution),
            (Stage::DigitalDistribution, Stage::Released),
        ]
    );
    assert!(history.iter().all(|r| !r.admin_override));

    // Released songs are read-only for departments
    let err = wf
        .update_song(
            &t.digital,
            song.id,
            SongUpdate {
                genre: Some("synthwave".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PermissionDenied(_)));

    // Earlier checklists stay queryable
    let publishing = wf.checklist(&t.admin, song.id, Some(Stage::Publishing))?;
    assert!(!publishing.is_current_stage);
    assert_eq!(publishing.progress, 100.0);

    Ok(())
}

#[test]
fn test_incomplete_checklist_rejects_members_and_records_admin_override() -> Result<()> {
    let t = setup()?;
    let wf = &t.workflow;

    let song = wf.create_song(&t.publishing, new_song("Glass Harbor"))?;
    wf.transition(&t.publishing, song.id, Stage::Publishing, None)?;

    let err = wf
        .transition(&t.publishing, song.id, Stage::LabelRecording, None)
        .unwrap_err();
    match err {
        WorkflowError::ChecklistIncomplete { progress } => assert!(progress < 100.0),
        other => panic!("expected ChecklistIncomplete, got {other:?}"),
    }

    // Nothing changed
    assert_eq!(wf.get_song(&t.publishing, song.id)?.stage, Stage::Publishing);
    assert_eq!(wf.history(&t.publishing, song.id)?.len(), 1);
    assert!(wf.list_alerts(&t.label, false)?.is_empty());

    let outcome = wf.transition(
        &t.admin,
        song.id,
        Stage::LabelRecording,
        Some("Deadline pressure".to_string()),
    )?;
    assert!(outcome.record.admin_override);
    assert_eq!(outcome.record.actor, "ada");
    assert_eq!(outcome.song.stage, Stage::LabelRecording);

    let history = wf.history(&t.admin, song.id)?;
    assert_eq!(history.len(), 2);
    assert!(history[1].admin_override);
    assert_eq!(history[1].notes.as_deref(), Some("Deadline pressure"));

    assert!(wf
        .list_alerts(&t.label, true)?
        .iter()
        .any(|a| a.alert_type == AlertType::StageTransition));

    Ok(())
}

#[test]
fn test_transitions_outside_the_graph_are_rejected() -> Result<()> {
    let t = setup()?;
    let wf = &t.workflow;

    let song = wf.create_song(&t.publishing, new_song("Paper Moons"))?;

    let err = wf
        .transition(&t.admin, song.id, Stage::Released, None)
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

    let err = wf.send_to_digital(&t.admin, song.id, None).unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::InvalidTransition {
            from: Stage::Draft,
            to: Stage::DigitalDistribution
        }
    ));

    // Label cannot move a publishing song
    wf.transition(&t.publishing, song.id, Stage::Publishing, None)?;
    let err = wf
        .transition(&t.label, song.id, Stage::LabelRecording, None)
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PermissionDenied(_)));

    // Archiving skips the checklist gate
    let archived = wf.archive(&t.publishing, song.id, None)?;
    assert_eq!(archived.song.stage, Stage::Archived);
    assert!(!archived.record.admin_override);
    assert!(wf.get_song(&t.label, song.id).is_err());
    assert_eq!(wf.get_song(&t.publishing, song.id)?.stage, Stage::Archived);

    Ok(())
}

#[test]
fn test_rework_loop_keeps_marketing_checklist() -> Result<()> {
    let t = setup()?;
    let wf = &t.workflow;

    let song = wf.create_song(&t.publishing, new_song("Low Tide"))?;
    wf.transition(&t.publishing, song.id, Stage::Publishing, None)?;
    wf.transition(&t.admin, song.id, Stage::LabelRecording, None)?;
    wf.transition(&t.admin, song.id, Stage::MarketingAssets, None)?;

    // Undersized cover keeps the marketing artwork item open
    let cover = wf.upload_asset(
        &t.marketing,
        song.id,
        NewAsset {
            asset_type: AssetType::CoverArt,
            title: None,
            location: "art/low-tide-draft.jpg".to_string(),
            width: Some(1000),
            height: Some(1000),
        },
    )?;
    let first_visit = wf.checklist(&t.marketing, song.id, None)?;
    let manual_done = complete_manual_items(wf, &t.marketing, song.id)?;
    assert!(manual_done < 100.0, "artwork items are still open");

    wf.transition(&t.admin, song.id, Stage::LabelReview, None)?;

    // Sending back is gated like any other move
    let err = wf
        .transition(&t.label, song.id, Stage::MarketingAssets, None)
        .unwrap_err();
    assert!(matches!(err, WorkflowError::ChecklistIncomplete { .. }));

    // Manual sign-off alone does not finish label review
    let signed = complete_manual_items(wf, &t.label, song.id)?;
    assert!(signed < 100.0, "cover is not approved yet");
    wf.review_asset(&t.label, &cover.id, ReviewDecision::Approve, None)?;
    assert_eq!(wf.checklist(&t.label, song.id, None)?.progress, 100.0);

    let back = wf.transition(
        &t.label,
        song.id,
        Stage::MarketingAssets,
        Some("Cover needs a new crop".to_string()),
    )?;
    assert_eq!(back.song.assigned_department, Some(Department::Marketing));

    let second_visit = wf.checklist(&t.marketing, song.id, None)?;
    assert_eq!(second_visit.items.len(), first_visit.items.len());
    assert!(second_visit
        .items
        .iter()
        .filter(|i| i.required && i.is_manual())
        .all(|i| i.is_complete));

    // Automatic items cannot be flipped by hand
    let artwork = second_visit
        .items
        .iter()
        .find(|i| !i.is_manual())
        .expect("marketing has automatic items");
    let err = wf
        .toggle_checklist_item(&t.marketing, artwork.id)
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotToggleable(_)));

    Ok(())
}

#[test]
fn test_sales_and_marketing_visibility() -> Result<()> {
    let t = setup()?;
    let wf = &t.workflow;

    let mut draft = new_song("Silver Line");
    draft.internal_notes = Some("Budget is tight".to_string());
    let song = wf.create_song(&t.publishing, draft)?;
    wf.transition(&t.publishing, song.id, Stage::Publishing, None)?;
    wf.create_work(&t.publishing, song.id, "Silver Line", None)?;
    wf.add_split(&t.publishing, song.id, RightType::Writer, "Jo Writer", Decimal::from(100), None)?;
    wf.add_recording(
        &t.admin,
        song.id,
        NewRecording {
            title: "Silver Line (Demo)".to_string(),
            ..Default::default()
        },
    )?;
    wf.add_split(&t.admin, song.id, RightType::Master, "Signal Records", Decimal::from(100), None)?;

    let publisher_view = wf.song_view(&t.publishing, song.id)?;
    assert_eq!(publisher_view["work_splits"].as_array().map(Vec::len), Some(1));
    assert_eq!(publisher_view["song"]["internal_notes"], "Budget is tight");

    let sales_view = wf.song_view(&t.sales, song.id)?;
    assert!(sales_view.get("work_splits").is_none());
    assert!(sales_view["recordings"][0].get("splits").is_none());
    assert!(sales_view["recordings"][0].get("recording").is_some());
    assert!(sales_view["song"].get("internal_notes").is_none());
    assert_eq!(sales_view["song"]["title"], "Silver Line");

    // Sales may pitch but not edit
    let pitch = wf.add_note(&t.sales, song.id, "Pitched for a car ad", Some("Adverts Ltd".to_string()))?;
    assert!(pitch.is_sales_pitch);
    assert!(wf.notes(&t.sales, song.id)?[0].pitched_to.is_none());
    assert_eq!(
        wf.notes(&t.publishing, song.id)?[0].pitched_to.as_deref(),
        Some("Adverts Ltd")
    );
    let err = wf
        .set_blocked(&t.sales, song.id, true, Some("rights unclear".to_string()))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PermissionDenied(_)));

    // Marketing only ever sees marketing_assets songs
    assert!(wf.get_song(&t.marketing, song.id).is_err());
    let other = wf.create_song(&t.publishing, new_song("Neon Rain"))?;
    wf.transition(&t.publishing, other.id, Stage::Publishing, None)?;
    wf.transition(&t.admin, other.id, Stage::LabelRecording, None)?;
    wf.transition(&t.admin, other.id, Stage::MarketingAssets, None)?;

    let visible: Vec<i64> = wf
        .list_songs(&t.marketing, None)?
        .iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(visible, vec![other.id]);

    let sales_visible: Vec<i64> = wf.list_songs(&t.sales, None)?.iter().map(|s| s.id).collect();
    assert_eq!(sales_visible, vec![song.id]);

    Ok(())
}

#[test]
fn test_blocking_alerts_the_owning_department() -> Result<()> {
    let t = setup()?;
    let wf = &t.workflow;

    let song = wf.create_song(&t.publishing, new_song("Undertow"))?;
    wf.transition(&t.publishing, song.id, Stage::Publishing, None)?;
    let before = wf.unread_alert_count(&t.publishing)?;

    let blocked = wf.set_blocked(&t.publishing, song.id, true, Some("Missing co-writer".to_string()))?;
    assert!(blocked.is_blocked);
    assert_eq!(wf.unread_alert_count(&t.publishing)?, before + 1);

    let alert = wf
        .list_alerts(&t.publishing, true)?
        .into_iter()
        .find(|a| a.alert_type == AlertType::BlockingIssue)
        .expect("blocking alert");
    wf.mark_alert_read(&t.publishing, alert.id)?;
    assert_eq!(wf.unread_alert_count(&t.publishing)?, before);

    // Clearing does not alert again
    let cleared = wf.set_blocked(&t.publishing, song.id, false, None)?;
    assert!(!cleared.is_blocked);
    assert_eq!(cleared.blocked_reason, None);
    assert_eq!(wf.unread_alert_count(&t.publishing)?, before);

    let stats = wf.stats(&t.admin)?;
    assert_eq!(stats.total_songs, 1);
    assert_eq!(stats.blocked, 0);
    assert_eq!(stats.by_stage.get("publishing"), Some(&1));

    Ok(())
}

#[test]
fn test_hidden_songs_do_not_leak_their_stage() -> Result<()> {
    let t = setup()?;
    let wf = &t.workflow;

    let song = wf.create_song(&t.publishing, new_song("Quiet Hours"))?;
    wf.transition(&t.publishing, song.id, Stage::Publishing, None)?;

    // A stale expected stage still reports no access, not a conflict
    let err = wf
        .transition_from(&t.marketing, song.id, Stage::Draft, Stage::Publishing, None)
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PermissionDenied(_)));
    assert!(!err.to_string().contains("publishing"));

    let err = wf
        .transition(&t.marketing, song.id, Stage::LabelRecording, None)
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PermissionDenied(_)));

    let err = wf.send_to_digital(&t.marketing, song.id, None).unwrap_err();
    assert!(matches!(err, WorkflowError::PermissionDenied(_)));

    // Visible songs still get the precise error
    let err = wf
        .transition_from(&t.publishing, song.id, Stage::Draft, Stage::Publishing, None)
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Conflict {
            expected: Stage::Draft,
            actual: Stage::Publishing,
            ..
        }
    ));
    let err = wf.send_to_digital(&t.publishing, song.id, None).unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

    assert_eq!(wf.history(&t.admin, song.id)?.len(), 1);

    Ok(())
}

#[test]
fn test_publishing_queue_includes_drafts() -> Result<()> {
    let t = setup()?;
    let wf = &t.workflow;

    let draft = wf.create_song(&t.publishing, new_song("First Light"))?;
    let active = wf.create_song(&t.publishing, new_song("Second Wind"))?;
    wf.transition(&t.publishing, active.id, Stage::Publishing, None)?;
    let archived = wf.create_song(&t.publishing, new_song("Last Call"))?;
    wf.archive(&t.publishing, archived.id, None)?;

    let mut queued: Vec<i64> = wf.my_queue(&t.publishing)?.iter().map(|s| s.id).collect();
    queued.sort_unstable();
    assert_eq!(queued, vec![draft.id, active.id]);

    assert!(wf.my_queue(&t.label)?.is_empty());
    assert!(wf.my_queue(&t.admin)?.is_empty());

    // Title edits are stored trimmed
    let renamed = wf.update_song(
        &t.publishing,
        draft.id,
        SongUpdate {
            title: Some("  First Light (Reprise)  ".to_string()),
            ..Default::default()
        },
    )?;
    assert_eq!(renamed.title, "First Light (Reprise)");
    assert_eq!(wf.get_song(&t.publishing, draft.id)?.title, "First Light (Reprise)");

    Ok(())
}
