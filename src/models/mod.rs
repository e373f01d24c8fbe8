//! Data models for the song workflow
//!
//! Enums are stored in SQLite as their snake_case string form and
//! round-trip through `Display` / `FromStr`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod catalog;

pub use catalog::{
    Credit, NewRecording, NewRelease, Publication, Recording, RecordingBundle, Release,
    ReleaseBundle, RightType, SongContext, Split, SplitScope, Work,
};

/// Role level at or above which a user is an administrator
pub const ADMIN_LEVEL: u32 = 1000;

/// Role level at or above which a user is a department manager
pub const MANAGER_LEVEL: u32 = 300;

/// Workflow stages, in lifecycle order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Draft,
    Publishing,
    LabelRecording,
    MarketingAssets,
    LabelReview,
    ReadyForDigital,
    DigitalDistribution,
    Released,
    Archived,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::Draft,
        Stage::Publishing,
        Stage::LabelRecording,
        Stage::MarketingAssets,
        Stage::LabelReview,
        Stage::ReadyForDigital,
        Stage::DigitalDistribution,
        Stage::Released,
        Stage::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Draft => "draft",
            Stage::Publishing => "publishing",
            Stage::LabelRecording => "label_recording",
            Stage::MarketingAssets => "marketing_assets",
            Stage::LabelReview => "label_review",
            Stage::ReadyForDigital => "ready_for_digital",
            Stage::DigitalDistribution => "digital_distribution",
            Stage::Released => "released",
            Stage::Archived => "archived",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Draft => "Draft",
            Stage::Publishing => "Publishing",
            Stage::LabelRecording => "Label - Recording",
            Stage::MarketingAssets => "Marketing - Assets",
            Stage::LabelReview => "Label - Review",
            Stage::ReadyForDigital => "Ready for Digital",
            Stage::DigitalDistribution => "Digital Distribution",
            Stage::Released => "Released",
            Stage::Archived => "Archived",
        }
    }

    /// Stages a department actively works in (everything between draft and released)
    pub fn is_in_flight(&self) -> bool {
        !matches!(self, Stage::Draft | Stage::Released | Stage::Archived)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .iter()
            .find(|stage| stage.as_str() == s.to_lowercase())
            .copied()
            .ok_or_else(|| {
                format!(
                    "Invalid stage: {}. Use: {}",
                    s,
                    Stage::ALL.map(|st| st.as_str()).join(", ")
                )
            })
    }
}

/// Company departments
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    Publishing,
    Label,
    Marketing,
    Digital,
    Sales,
}

impl Department {
    pub const ALL: [Department; 5] = [
        Department::Publishing,
        Department::Label,
        Department::Marketing,
        Department::Digital,
        Department::Sales,
    ];
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Department::Publishing => write!(f, "publishing"),
            Department::Label => write!(f, "label"),
            Department::Marketing => write!(f, "marketing"),
            Department::Digital => write!(f, "digital"),
            Department::Sales => write!(f, "sales"),
        }
    }
}

impl std::str::FromStr for Department {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "publishing" => Ok(Department::Publishing),
            "label" => Ok(Department::Label),
            "marketing" => Ok(Department::Marketing),
            "digital" => Ok(Department::Digital),
            "sales" => Ok(Department::Sales),
            _ => Err(format!(
                "Invalid department: {}. Use: publishing, label, marketing, digital, sales",
                s
            )),
        }
    }
}

/// Song priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// Sort key; higher is more pressing
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Normal => 1,
            Priority::High => 2,
            Priority::Urgent => 3,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Normal => write!(f, "normal"),
            Priority::High => write!(f, "high"),
            Priority::Urgent => write!(f, "urgent"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            _ => Err(format!("Invalid priority: {}. Use: low, normal, high, urgent", s)),
        }
    }
}

/// The acting user, resolved from the users table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role_level: u32,
    pub department: Option<Department>,
}

impl Actor {
    pub fn new(id: &str, name: &str, role_level: u32, department: Option<Department>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            role_level,
            department,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role_level >= ADMIN_LEVEL
    }

    pub fn is_manager(&self) -> bool {
        self.role_level >= MANAGER_LEVEL
    }
}

/// The workflow subject
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub priority: Priority,
    pub target_release_date: Option<NaiveDate>,
    pub stage: Stage,
    pub stage_entered_at: i64,
    pub stage_deadline: Option<NaiveDate>,
    pub assigned_department: Option<Department>,
    pub assigned_user: Option<String>,
    pub is_blocked: bool,
    pub blocked_reason: Option<String>,
    pub internal_notes: Option<String>,
    pub created_by: String,
    pub work_id: Option<i64>,
    pub checklist_progress: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Song {
    pub fn is_archived(&self) -> bool {
        self.stage == Stage::Archived
    }

    /// A song is overdue when its stage deadline has passed while it is still in flight
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.stage.is_in_flight() && self.stage_deadline.is_some_and(|d| d < today)
    }

    pub fn days_in_current_stage(&self, now: i64) -> i64 {
        (now - self.stage_entered_at).max(0) / 86_400
    }
}

/// Fields supplied when creating a song
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSong {
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub target_release_date: Option<NaiveDate>,
    #[serde(default)]
    pub internal_notes: Option<String>,
}

/// Editable song fields; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SongUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub target_release_date: Option<NaiveDate>,
    #[serde(default)]
    pub stage_deadline: Option<NaiveDate>,
    #[serde(default)]
    pub internal_notes: Option<String>,
    #[serde(default)]
    pub assigned_user: Option<String>,
}

impl SongUpdate {
    pub fn apply(self, song: &mut Song) {
        if let Some(title) = self.title {
            song.title = title.trim().to_string();
        }
        if let Some(artist) = self.artist {
            song.artist = Some(artist);
        }
        if let Some(genre) = self.genre {
            song.genre = Some(genre);
        }
        if let Some(language) = self.language {
            song.language = Some(language);
        }
        if let Some(priority) = self.priority {
            song.priority = priority;
        }
        if let Some(date) = self.target_release_date {
            song.target_release_date = Some(date);
        }
        if let Some(deadline) = self.stage_deadline {
            song.stage_deadline = Some(deadline);
        }
        if let Some(notes) = self.internal_notes {
            song.internal_notes = Some(notes);
        }
        if let Some(user) = self.assigned_user {
            song.assigned_user = Some(user);
        }
    }
}

/// Immutable audit record of one successful transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageTransitionRecord {
    pub id: i64,
    pub song_id: i64,
    pub from_stage: Stage,
    pub to_stage: Stage,
    pub actor: String,
    pub timestamp: i64,
    pub notes: Option<String>,
    pub admin_override: bool,
}

/// Free-text annotation on a song
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SongNote {
    pub id: i64,
    pub song_id: i64,
    pub author: String,
    pub body: String,
    pub is_sales_pitch: bool,
    pub pitched_to: Option<String>,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_round_trips_through_strings() {
        for stage in Stage::ALL {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
        assert!("mastering".parse::<Stage>().is_err());
    }

    #[test]
    fn in_flight_excludes_terminal_and_draft() {
        assert!(!Stage::Draft.is_in_flight());
        assert!(Stage::LabelReview.is_in_flight());
        assert!(!Stage::Released.is_in_flight());
        assert!(!Stage::Archived.is_in_flight());
    }

    fn song() -> Song {
        Song {
            id: 1,
            title: "Night Drive".to_string(),
            artist: None,
            genre: None,
            language: None,
            priority: Priority::Normal,
            target_release_date: None,
            stage: Stage::Publishing,
            stage_entered_at: 0,
            stage_deadline: NaiveDate::from_ymd_opt(2025, 3, 9),
            assigned_department: Some(Department::Publishing),
            assigned_user: None,
            is_blocked: false,
            blocked_reason: None,
            internal_notes: None,
            created_by: "pub-1".to_string(),
            work_id: None,
            checklist_progress: 0.0,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn overdue_needs_past_deadline_and_active_stage() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let mut song = song();
        assert!(song.is_overdue(today));

        song.stage_deadline = NaiveDate::from_ymd_opt(2025, 3, 17);
        assert!(!song.is_overdue(today));

        song.stage_deadline = None;
        assert!(!song.is_overdue(today));

        song.stage_entered_at = 0;
        assert_eq!(song.days_in_current_stage(5 * 86_400 + 10), 5);
    }

    #[test]
    fn update_trims_title_and_keeps_unset_fields() {
        let mut song = song();
        song.artist = Some("Nia".to_string());
        SongUpdate {
            title: Some("  Night Drive (Remix)  ".to_string()),
            genre: Some("synthpop".to_string()),
            ..Default::default()
        }
        .apply(&mut song);

        assert_eq!(song.title, "Night Drive (Remix)");
        assert_eq!(song.genre.as_deref(), Some("synthpop"));
        assert_eq!(song.artist.as_deref(), Some("Nia"));
    }
}
