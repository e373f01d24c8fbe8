// Concurrent transitions against one database file
// Two connections race to move the same song out of the same stage;
// exactly one wins and the other sees a conflict.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

use songflow::config::WorkflowSettings;
use songflow::db::Database;
use songflow::models::{Actor, Department, NewSong, Stage, ADMIN_LEVEL};
use songflow::workflow::{SongWorkflow, TransitionOutcome, WorkflowError};

fn open(path: &PathBuf) -> Result<SongWorkflow> {
    Ok(SongWorkflow::new(Database::init_at(path)?, WorkflowSettings::default()))
}

fn race(
    path: PathBuf,
    actors: [Actor; 2],
    song_id: i64,
    expected: Stage,
    targets: [Stage; 2],
) -> Result<Vec<Result<TransitionOutcome, WorkflowError>>> {
    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();

    for (actor, target) in actors.into_iter().zip(targets) {
        let barrier = Arc::clone(&barrier);
        let workflow = open(&path)?;
        handles.push(thread::spawn(move || {
            barrier.wait();
            workflow.transition_from(&actor, song_id, expected, target, None)
        }));
    }

    Ok(handles
        .into_iter()
        .map(|h| h.join().expect("transition thread panicked"))
        .collect())
}

#[test]
fn test_same_transition_twice_commits_once() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("songflow.db");

    let setup = open(&path)?;
    let pia = Actor::new("pia", "Pia", 100, Some(Department::Publishing));
    let pat = Actor::new("pat", "Pat", 100, Some(Department::Publishing));
    setup.database().upsert_user(&pia)?;
    setup.database().upsert_user(&pat)?;
    let song = setup.create_song(
        &pia,
        NewSong {
            title: "Double Take".to_string(),
            ..Default::default()
        },
    )?;

    let results = race(
        path,
        [pia.clone(), pat],
        song.id,
        Stage::Draft,
        [Stage::Publishing, Stage::Publishing],
    )?;

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = results
        .into_iter()
        .find_map(|r| r.err())
        .expect("one transition must lose");
    match loser {
        WorkflowError::Conflict {
            song_id,
            expected,
            actual,
        } => {
            assert_eq!(song_id, song.id);
            assert_eq!(expected, Stage::Draft);
            assert_eq!(actual, Stage::Publishing);
        }
        other => panic!("expected Conflict, got {other:?}"),
    }

    // One audit row, one checklist for publishing
    assert_eq!(setup.history(&pia, song.id)?.len(), 1);
    let checklist = setup.checklist(&pia, song.id, Some(Stage::Publishing))?;
    let names: Vec<&str> = checklist.items.iter().map(|i| i.item_name.as_str()).collect();
    let mut unique = names.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(names.len(), unique.len());

    Ok(())
}

#[test]
fn test_archive_racing_a_forward_move() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("songflow.db");

    let setup = open(&path)?;
    let pia = Actor::new("pia", "Pia", 100, Some(Department::Publishing));
    let ada = Actor::new("ada", "Ada", ADMIN_LEVEL, None);
    setup.database().upsert_user(&pia)?;
    setup.database().upsert_user(&ada)?;
    let song = setup.create_song(
        &pia,
        NewSong {
            title: "Fork in the Road".to_string(),
            ..Default::default()
        },
    )?;
    setup.transition(&pia, song.id, Stage::Publishing, None)?;

    let results = race(
        path,
        [ada.clone(), pia],
        song.id,
        Stage::Publishing,
        [Stage::LabelRecording, Stage::Archived],
    )?;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(WorkflowError::Conflict { .. }))));

    let final_stage = setup.get_song(&ada, song.id)?.stage;
    let history = setup.history(&ada, song.id)?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].to_stage, final_stage);

    Ok(())
}
