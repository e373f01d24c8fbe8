//! CLI commands for songflow

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::assets::{AssetReviewManager, AssetType, NewAsset, ReviewDecision};
use crate::config::{load_config, save_config, Config, SongflowPaths};
use crate::db::Database;
use crate::models::{
    Actor, Department, NewRecording, NewRelease, NewSong, Priority, RightType, Song, SongUpdate,
    Stage,
};
use crate::workflow::{SongWorkflow, TransitionOutcome};

/// An opened workflow plus the user acting through it
pub struct Session {
    pub workflow: SongWorkflow,
    pub actor: Actor,
}

impl Session {
    /// Open the initialized database and resolve `--as`
    pub fn open(as_user: Option<&str>) -> Result<Self> {
        let workflow = open_workflow()?;
        let user = as_user.context("No acting user. Pass --as <user>")?;
        let actor = workflow.resolve_actor(user)?;
        Ok(Self { workflow, actor })
    }
}

fn open_workflow() -> Result<SongWorkflow> {
    let paths = SongflowPaths::new()?;
    ensure_initialized(&paths)?;
    let config = load_config(&paths)?;
    Ok(SongWorkflow::open(&paths, &config)?)
}

fn ensure_initialized(paths: &SongflowPaths) -> Result<()> {
    if !paths.is_initialized() {
        bail!("songflow not initialized. Run `songflow init` first.");
    }
    Ok(())
}

fn parse<T: FromStr<Err = String>>(value: &str) -> Result<T> {
    value.parse::<T>().map_err(|e| anyhow!(e))
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date: {}. Use YYYY-MM-DD", value))
}

fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Initialize songflow for first-time setup
pub fn init() -> Result<()> {
    let paths = SongflowPaths::new()?;

    if paths.is_initialized() {
        println!("songflow is already initialized at {}", paths.root.display());
        return Ok(());
    }

    println!("Initializing songflow at {}...", paths.root.display());

    paths.ensure_dirs()?;
    println!("  Created directory structure");

    save_config(&paths, &Config::default())?;
    println!("  Created config.toml");

    Database::init(&paths)?;
    println!("  Created database");

    println!();
    println!("songflow initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  songflow user add <id> <name> --department publishing   Register a user");
    println!("  songflow --as <id> song new \"<title>\"                    Start a song");

    Ok(())
}

// ---- users ----

pub fn user_add(id: &str, name: &str, role_level: u32, department: Option<&str>) -> Result<()> {
    let department = department.map(parse::<Department>).transpose()?;
    let workflow = open_workflow()?;
    let user = Actor::new(id, name, role_level, department);
    workflow.database().upsert_user(&user)?;

    println!("Saved user: {}", user.id);
    println!("  Name:       {}", user.name);
    println!("  Role level: {}", user.role_level);
    println!("  Department: {}", or_dash(user.department));
    Ok(())
}

pub fn user_list() -> Result<()> {
    let workflow = open_workflow()?;
    let users = workflow.database().list_users()?;

    if users.is_empty() {
        println!("No users found.");
        println!("Add one with: songflow user add <id> <name>");
        return Ok(());
    }

    println!("{:<16} {:<24} {:<8} {:<12}", "ID", "NAME", "LEVEL", "DEPARTMENT");
    println!("{}", "-".repeat(62));
    for user in users {
        println!(
            "{:<16} {:<24} {:<8} {:<12}",
            truncate(&user.id, 14),
            truncate(&user.name, 22),
            user.role_level,
            or_dash(user.department)
        );
    }
    Ok(())
}

// ---- songs ----

/// Song fields shared by `song new` and `song update`
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SongFieldArgs {
    #[arg(long)]
    pub artist: Option<String>,
    #[arg(long)]
    pub genre: Option<String>,
    #[arg(long)]
    pub language: Option<String>,
    /// low, normal, high or urgent
    #[arg(long)]
    pub priority: Option<String>,
    /// Target release date (YYYY-MM-DD)
    #[arg(long)]
    pub target_date: Option<String>,
    /// Internal notes (hidden from non-editors)
    #[arg(long)]
    pub internal_notes: Option<String>,
}

pub fn song_new(as_user: Option<&str>, title: &str, fields: SongFieldArgs) -> Result<i64> {
    let session = Session::open(as_user)?;
    let new = NewSong {
        title: title.to_string(),
        artist: fields.artist,
        genre: fields.genre,
        language: fields.language,
        priority: fields
            .priority
            .as_deref()
            .map(parse::<Priority>)
            .transpose()?
            .unwrap_or_default(),
        target_release_date: fields.target_date.as_deref().map(parse_date).transpose()?,
        internal_notes: fields.internal_notes,
    };

    let song = session.workflow.create_song(&session.actor, new)?;
    println!("Created song: {}", song.id);
    println!("  Title:      {}", song.title);
    println!("  Stage:      {}", song.stage);
    println!("  Department: {}", or_dash(song.assigned_department));
    Ok(song.id)
}

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Summary,
}

pub fn song_show(as_user: Option<&str>, song_id: i64, format: OutputFormat) -> Result<()> {
    let session = Session::open(as_user)?;
    let view = session.workflow.song_view(&session.actor, song_id)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Summary => {
            let song: Song = serde_json::from_value(view["song"].clone())
                .context("Failed to read song view")?;
            print_song_summary(&song, &view);
        }
    }
    Ok(())
}

fn print_song_summary(song: &Song, view: &serde_json::Value) {
    println!("Song {}: {}", song.id, song.title);
    println!("{}", "=".repeat(50));
    println!("Artist:     {}", or_dash(song.artist.as_deref()));
    println!("Stage:      {} ({})", song.stage.label(), song.stage);
    println!("Department: {}", or_dash(song.assigned_department));
    println!("Assigned:   {}", or_dash(song.assigned_user.as_deref()));
    println!("Priority:   {}", song.priority);
    println!("Deadline:   {}", or_dash(song.stage_deadline));
    println!("Checklist:  {:.2}%", song.checklist_progress);
    if song.is_blocked {
        println!("BLOCKED:    {}", or_dash(song.blocked_reason.as_deref()));
    }
    if let Some(notes) = &song.internal_notes {
        println!("Internal:   {}", notes);
    }

    if let Some(work) = view.get("work").filter(|w| !w.is_null()) {
        println!();
        println!(
            "Work: {} (ISWC {})",
            work["title"].as_str().unwrap_or("?"),
            work["iswc"].as_str().unwrap_or("-")
        );
        if let Some(splits) = view.get("work_splits").and_then(|v| v.as_array()) {
            for split in splits {
                println!(
                    "  {:<10} {:<24} {}%",
                    split["right_type"].as_str().unwrap_or("?"),
                    split["party"].as_str().unwrap_or("?"),
                    split["share"].as_str().unwrap_or("?")
                );
            }
        }
    }

    let count = |key: &str| view.get(key).and_then(|v| v.as_array()).map_or(0, Vec::len);
    println!();
    println!(
        "Recordings: {}  Releases: {}  Assets: {}  Notes: {}",
        count("recordings"),
        count("releases"),
        count("assets"),
        count("notes")
    );

    if let Some(next) = view.get("allowed_transitions").and_then(|v| v.as_array()) {
        let stages: Vec<&str> = next.iter().filter_map(|s| s.as_str()).collect();
        println!("Next:       {}", stages.join(", "));
    }
    if let Some(warnings) = view.get("warnings").and_then(|v| v.as_array()) {
        for warning in warnings.iter().filter_map(|w| w.as_str()) {
            println!("  ⚠ {}", warning);
        }
    }

    println!();
    println!("Created:  {}", format_timestamp(song.created_at));
    println!("Updated:  {}", format_timestamp(song.updated_at));
}

fn print_song_table(songs: &[Song]) {
    println!(
        "{:<6} {:<28} {:<22} {:<10} {:<8} {:<11}",
        "ID", "TITLE", "STAGE", "PRIORITY", "DONE", "DEADLINE"
    );
    println!("{}", "-".repeat(90));
    for song in songs {
        let title = if song.is_blocked {
            format!("[!] {}", song.title)
        } else {
            song.title.clone()
        };
        println!(
            "{:<6} {:<28} {:<22} {:<10} {:<8} {:<11}",
            song.id,
            truncate(&title, 26),
            song.stage,
            song.priority,
            format!("{:.0}%", song.checklist_progress),
            or_dash(song.stage_deadline)
        );
    }
}

pub fn song_list(as_user: Option<&str>, stage: Option<&str>) -> Result<()> {
    let stage = stage.map(parse::<Stage>).transpose()?;
    let session = Session::open(as_user)?;
    let songs = session.workflow.list_songs(&session.actor, stage)?;

    if songs.is_empty() {
        println!("No songs found.");
        return Ok(());
    }
    print_song_table(&songs);
    Ok(())
}

pub fn song_update(
    as_user: Option<&str>,
    song_id: i64,
    title: Option<String>,
    fields: SongFieldArgs,
    deadline: Option<&str>,
    assign: Option<String>,
) -> Result<()> {
    let update = SongUpdate {
        title,
        artist: fields.artist,
        genre: fields.genre,
        language: fields.language,
        priority: fields.priority.as_deref().map(parse::<Priority>).transpose()?,
        target_release_date: fields.target_date.as_deref().map(parse_date).transpose()?,
        stage_deadline: deadline.map(parse_date).transpose()?,
        internal_notes: fields.internal_notes,
        assigned_user: assign,
    };

    let session = Session::open(as_user)?;
    let song = session.workflow.update_song(&session.actor, song_id, update)?;
    println!("Updated song {}: {}", song.id, song.title);
    println!("  Checklist: {:.2}%", song.checklist_progress);
    Ok(())
}

pub fn song_block(
    as_user: Option<&str>,
    song_id: i64,
    clear: bool,
    reason: Option<String>,
) -> Result<()> {
    let session = Session::open(as_user)?;
    let song = session
        .workflow
        .set_blocked(&session.actor, song_id, !clear, reason)?;

    if song.is_blocked {
        println!(
            "Song {} blocked: {}",
            song.id,
            or_dash(song.blocked_reason.as_deref())
        );
    } else {
        println!("Song {} unblocked", song.id);
    }
    Ok(())
}

// ---- transitions ----

fn print_transition(outcome: &TransitionOutcome) {
    let record = &outcome.record;
    println!(
        "✓ Song {} moved {} → {}",
        outcome.song.id, record.from_stage, record.to_stage
    );
    if record.admin_override {
        println!("  ⚠ Admin override: checklist was incomplete");
    }
    println!("  Department: {}", or_dash(outcome.song.assigned_department));
    println!("  Deadline:   {}", or_dash(outcome.song.stage_deadline));
    println!("  Checklist:  {:.2}%", outcome.song.checklist_progress);
    println!("  Alerts:     {}", outcome.alerts_created);
}

pub fn transition(
    as_user: Option<&str>,
    song_id: i64,
    stage: &str,
    notes: Option<String>,
) -> Result<()> {
    let target = parse::<Stage>(stage)?;
    let session = Session::open(as_user)?;
    let outcome = session
        .workflow
        .transition(&session.actor, song_id, target, notes)?;
    print_transition(&outcome);
    Ok(())
}

pub fn send_to_digital(as_user: Option<&str>, song_id: i64, notes: Option<String>) -> Result<()> {
    let session = Session::open(as_user)?;
    let outcome = session
        .workflow
        .send_to_digital(&session.actor, song_id, notes)?;
    print_transition(&outcome);
    Ok(())
}

pub fn archive(as_user: Option<&str>, song_id: i64, notes: Option<String>) -> Result<()> {
    let session = Session::open(as_user)?;
    let outcome = session.workflow.archive(&session.actor, song_id, notes)?;
    print_transition(&outcome);
    Ok(())
}

pub fn history(as_user: Option<&str>, song_id: i64) -> Result<()> {
    let session = Session::open(as_user)?;
    let records = session.workflow.history(&session.actor, song_id)?;

    if records.is_empty() {
        println!("Song {} has not changed stage yet.", song_id);
        return Ok(());
    }

    println!("History for song {}:", song_id);
    for record in records {
        let marker = if record.admin_override { " (override)" } else { "" };
        println!(
            "  {}  {} → {} by {}{}",
            format_timestamp(record.timestamp),
            record.from_stage,
            record.to_stage,
            record.actor,
            marker
        );
        if let Some(notes) = record.notes {
            println!("      {}", notes);
        }
    }
    Ok(())
}

// ---- checklist ----

pub fn checklist(
    as_user: Option<&str>,
    song_id: i64,
    stage: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let stage = stage.map(parse::<Stage>).transpose()?;
    let session = Session::open(as_user)?;
    let view = session.workflow.checklist(&session.actor, song_id, stage)?;

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let suffix = if view.is_current_stage { "" } else { " (history)" };
    println!(
        "Checklist for song {} - {}{}: {:.2}%",
        view.song_id,
        view.stage.label(),
        suffix,
        view.progress
    );
    if view.items.is_empty() {
        println!("  No items for this stage.");
        return Ok(());
    }

    let mut category = "";
    for item in &view.items {
        if item.category != category {
            category = item.category.as_str();
            println!();
            println!("{}", category);
        }
        let mark = if item.is_complete { "x" } else { " " };
        let kind = if item.is_manual() { "manual" } else { "auto" };
        let optional = if item.required { "" } else { " (optional)" };
        println!(
            "  [{}] #{:<5} {}{} [{}]",
            mark, item.id, item.item_name, optional, kind
        );
    }
    Ok(())
}

pub fn toggle(as_user: Option<&str>, item_id: i64) -> Result<()> {
    let session = Session::open(as_user)?;
    let outcome = session
        .workflow
        .toggle_checklist_item(&session.actor, item_id)?;

    let state = if outcome.item.is_complete { "complete" } else { "incomplete" };
    println!("✓ '{}' marked {}", outcome.item.item_name, state);
    println!("  Checklist: {:.2}%", outcome.progress);
    Ok(())
}

pub fn revalidate(as_user: Option<&str>, song_id: i64) -> Result<()> {
    let session = Session::open(as_user)?;
    let outcome = session
        .workflow
        .revalidate_checklist(&session.actor, song_id)?;
    let summary = &outcome.summary;

    println!(
        "Revalidated {} automatic item(s): {} passed, {} failed",
        summary.total, summary.passed, summary.failed
    );
    for change in &summary.updated {
        println!(
            "  {} : {} → {}",
            change.item_name, change.old_status, change.new_status
        );
    }
    println!("Checklist: {:.2}%", outcome.progress);
    Ok(())
}

// ---- alerts ----

pub fn alerts(as_user: Option<&str>, unread_only: bool, mark_all: bool) -> Result<()> {
    let session = Session::open(as_user)?;

    if mark_all {
        let changed = session.workflow.mark_all_alerts_read(&session.actor)?;
        println!("Marked {} alert(s) read", changed);
        return Ok(());
    }

    let alerts = session.workflow.list_alerts(&session.actor, unread_only)?;
    if alerts.is_empty() {
        println!("No alerts.");
        return Ok(());
    }

    for alert in alerts {
        let dot = if alert.is_read { " " } else { "●" };
        println!(
            "{} #{:<5} [{}] {} ({})",
            dot, alert.id, alert.priority, alert.title, alert.alert_type
        );
        println!("         {}", alert.message);
    }
    let unread = session.workflow.unread_alert_count(&session.actor)?;
    println!();
    println!("{} unread", unread);
    Ok(())
}

pub fn read(as_user: Option<&str>, alert_id: i64) -> Result<()> {
    let session = Session::open(as_user)?;
    session.workflow.mark_alert_read(&session.actor, alert_id)?;
    println!("✓ Alert {} marked read", alert_id);
    Ok(())
}

// ---- queues & stats ----

pub fn queue(as_user: Option<&str>) -> Result<()> {
    let session = Session::open(as_user)?;
    let songs = session.workflow.my_queue(&session.actor)?;

    if songs.is_empty() {
        println!("Your queue is empty.");
        return Ok(());
    }
    print_song_table(&songs);
    Ok(())
}

pub fn overdue(as_user: Option<&str>) -> Result<()> {
    let session = Session::open(as_user)?;
    let songs = session.workflow.overdue(&session.actor)?;

    if songs.is_empty() {
        println!("Nothing is overdue.");
        return Ok(());
    }
    print_song_table(&songs);
    Ok(())
}

pub fn stats(as_user: Option<&str>, format: OutputFormat) -> Result<()> {
    let session = Session::open(as_user)?;
    let stats = session.workflow.stats(&session.actor)?;

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Songs: {}", stats.total_songs);
    println!("  Blocked: {}", stats.blocked);
    println!("  Overdue: {}", stats.overdue);
    println!();
    println!("By stage:");
    for stage in Stage::ALL {
        if let Some(count) = stats.by_stage.get(stage.as_str()) {
            println!("  {:<22} {}", stage.as_str(), count);
        }
    }
    println!();
    println!("By priority:");
    for (priority, count) in &stats.by_priority {
        println!("  {:<22} {}", priority, count);
    }
    Ok(())
}

// ---- assets ----

#[allow(clippy::too_many_arguments)]
pub fn asset_upload(
    as_user: Option<&str>,
    song_id: i64,
    asset_type: &str,
    location: &str,
    title: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
) -> Result<()> {
    let asset_type = parse::<AssetType>(asset_type)?;
    let session = Session::open(as_user)?;
    let asset = session.workflow.upload_asset(
        &session.actor,
        song_id,
        NewAsset {
            asset_type,
            title,
            location: location.to_string(),
            width,
            height,
        },
    )?;

    print!("{}", AssetReviewManager::format_asset(&asset));
    Ok(())
}

pub fn asset_review(
    as_user: Option<&str>,
    asset_id: &str,
    decision: &str,
    notes: Option<String>,
) -> Result<()> {
    let decision = parse::<ReviewDecision>(decision)?;
    let session = Session::open(as_user)?;
    let asset = session
        .workflow
        .review_asset(&session.actor, asset_id, decision, notes)?;

    print!("{}", AssetReviewManager::format_asset(&asset));
    Ok(())
}

pub fn asset_list(as_user: Option<&str>, song_id: i64) -> Result<()> {
    let session = Session::open(as_user)?;
    let assets = session.workflow.list_assets(&session.actor, song_id)?;

    if assets.is_empty() {
        println!("No assets for song {}.", song_id);
        return Ok(());
    }
    for asset in &assets {
        print!("{}", AssetReviewManager::format_asset(asset));
    }
    println!();
    println!("{}", AssetReviewManager::get_stats(&assets).format());
    Ok(())
}

// ---- notes ----

pub fn note(
    as_user: Option<&str>,
    song_id: i64,
    body: Option<&str>,
    pitched_to: Option<String>,
) -> Result<()> {
    let session = Session::open(as_user)?;

    let Some(body) = body else {
        let notes = session.workflow.notes(&session.actor, song_id)?;
        if notes.is_empty() {
            println!("No notes on song {}.", song_id);
        }
        for note in notes {
            let pitch = match (&note.pitched_to, note.is_sales_pitch) {
                (Some(to), _) => format!(" [pitched to {}]", to),
                (None, true) => " [pitch]".to_string(),
                (None, false) => String::new(),
            };
            println!(
                "{} {}{}: {}",
                format_timestamp(note.created_at),
                note.author,
                pitch,
                note.body
            );
        }
        return Ok(());
    };

    let note = session
        .workflow
        .add_note(&session.actor, song_id, body, pitched_to)?;
    println!("✓ Added note {} to song {}", note.id, note.song_id);
    Ok(())
}

// ---- catalog ----

pub fn catalog_work(
    as_user: Option<&str>,
    song_id: i64,
    title: &str,
    iswc: Option<String>,
) -> Result<()> {
    let session = Session::open(as_user)?;
    let work = session
        .workflow
        .create_work(&session.actor, song_id, title, iswc)?;
    println!("✓ Work {} linked to song {}: {}", work.id, song_id, work.title);
    Ok(())
}

pub fn catalog_iswc(as_user: Option<&str>, song_id: i64, iswc: &str) -> Result<()> {
    let session = Session::open(as_user)?;
    let work = session.workflow.assign_iswc(&session.actor, song_id, iswc)?;
    println!("✓ Work {} ISWC set to {}", work.id, or_dash(work.iswc));
    Ok(())
}

pub fn catalog_split(
    as_user: Option<&str>,
    song_id: i64,
    right_type: &str,
    party: &str,
    share: &str,
    recording_id: Option<i64>,
) -> Result<()> {
    let right_type = parse::<RightType>(right_type)?;
    let share = Decimal::from_str(share).with_context(|| format!("Invalid share: {}", share))?;
    let session = Session::open(as_user)?;
    let split = session.workflow.add_split(
        &session.actor,
        song_id,
        right_type,
        party,
        share,
        recording_id,
    )?;
    println!(
        "✓ {} split for {}: {}% on {} {}",
        split.right_type, split.party, split.share, split.scope, split.object_id
    );
    Ok(())
}

pub fn catalog_recording(as_user: Option<&str>, song_id: i64, new: NewRecording) -> Result<()> {
    let session = Session::open(as_user)?;
    let recording = session
        .workflow
        .add_recording(&session.actor, song_id, new)?;
    println!(
        "✓ Recording {} added to song {}: {} (ISRC {})",
        recording.id,
        song_id,
        recording.title,
        or_dash(recording.isrc)
    );
    Ok(())
}

pub fn catalog_credit(
    as_user: Option<&str>,
    recording_id: i64,
    party: &str,
    role: &str,
) -> Result<()> {
    let session = Session::open(as_user)?;
    let credit = session
        .workflow
        .add_credit(&session.actor, recording_id, party, role)?;
    println!(
        "✓ Credit {} on recording {}: {} ({})",
        credit.id, recording_id, credit.party, credit.role
    );
    Ok(())
}

pub fn catalog_release(
    as_user: Option<&str>,
    song_id: i64,
    title: &str,
    release_type: Option<String>,
    release_date: Option<&str>,
    upc: Option<String>,
) -> Result<()> {
    let new = NewRelease {
        title: title.to_string(),
        release_type,
        release_date: release_date.map(parse_date).transpose()?,
        upc,
    };
    let session = Session::open(as_user)?;
    let release = session.workflow.add_release(&session.actor, song_id, new)?;
    println!(
        "✓ Release {} added to song {}: {} ({})",
        release.id,
        song_id,
        release.title,
        or_dash(release.release_date)
    );
    Ok(())
}

pub fn catalog_publication(
    as_user: Option<&str>,
    release_id: i64,
    platform: &str,
    url: Option<String>,
) -> Result<()> {
    let session = Session::open(as_user)?;
    let publication = session
        .workflow
        .add_publication(&session.actor, release_id, platform, url)?;
    println!(
        "✓ Release {} published on {}",
        publication.release_id, publication.platform
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Schöne Grüße aus Köln", 10), "Schöne ...");
    }

    #[test]
    fn dates_parse_iso_only() {
        assert!(parse_date("2025-06-01").is_ok());
        assert!(parse_date("01/06/2025").is_err());
    }

    #[test]
    fn parse_surfaces_enum_messages() {
        let err = parse::<Stage>("mastering").unwrap_err();
        assert!(err.to_string().contains("Invalid stage"));
    }
}
