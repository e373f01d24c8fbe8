//! Song assets and their review workflow
//!
//! Assets are uploaded by the department working a stage (normally
//! Marketing) and reviewed by an asset-reviewing department (Label).

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::{Actor, Department, Stage};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    CoverArt,
    PressPhoto,
    PromoGraphic,
    Video,
    Other,
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetType::CoverArt => write!(f, "cover_art"),
            AssetType::PressPhoto => write!(f, "press_photo"),
            AssetType::PromoGraphic => write!(f, "promo_graphic"),
            AssetType::Video => write!(f, "video"),
            AssetType::Other => write!(f, "other"),
        }
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cover_art" => Ok(AssetType::CoverArt),
            "press_photo" => Ok(AssetType::PressPhoto),
            "promo_graphic" => Ok(AssetType::PromoGraphic),
            "video" => Ok(AssetType::Video),
            "other" => Ok(AssetType::Other),
            _ => Err(format!(
                "Invalid asset type: {}. Use: cover_art, press_photo, promo_graphic, video, other",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    ChangesRequested,
    Rejected,
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewStatus::Pending => write!(f, "pending"),
            ReviewStatus::Approved => write!(f, "approved"),
            ReviewStatus::ChangesRequested => write!(f, "changes_requested"),
            ReviewStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "changes_requested" => Ok(ReviewStatus::ChangesRequested),
            "rejected" => Ok(ReviewStatus::Rejected),
            _ => Err(format!("Invalid review status: {}", s)),
        }
    }
}

/// Outcome a reviewer may choose
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    RequestChanges,
    Reject,
}

impl ReviewDecision {
    pub fn resulting_status(&self) -> ReviewStatus {
        match self {
            ReviewDecision::Approve => ReviewStatus::Approved,
            ReviewDecision::RequestChanges => ReviewStatus::ChangesRequested,
            ReviewDecision::Reject => ReviewStatus::Rejected,
        }
    }
}

impl FromStr for ReviewDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "approve" | "approved" => Ok(ReviewDecision::Approve),
            "request_changes" | "changes_requested" => Ok(ReviewDecision::RequestChanges),
            "reject" | "rejected" => Ok(ReviewDecision::Reject),
            _ => Err(format!(
                "Invalid review decision: {}. Use: approve, request_changes, reject",
                s
            )),
        }
    }
}

/// A file placed on a song at a given stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SongAsset {
    pub id: String,
    pub song_id: i64,
    pub stage: Stage,
    pub asset_type: AssetType,
    pub title: Option<String>,
    /// Storage location reference (bucket key, path, URL)
    pub location: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub status: ReviewStatus,
    pub submitted_by: String,
    pub submitted_by_department: Option<Department>,
    pub reviewer: Option<String>,
    pub review_notes: Option<String>,
    pub submitted_at: i64,
    pub reviewed_at: Option<i64>,
}

impl SongAsset {
    /// File extension of the storage location, lowercased
    pub fn extension(&self) -> Option<String> {
        self.location
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .filter(|ext| !ext.contains('/'))
    }

    pub fn display_name(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| self.asset_type.to_string())
    }
}

/// Upload request for a new asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAsset {
    pub asset_type: AssetType,
    #[serde(default)]
    pub title: Option<String>,
    pub location: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Review state changes for song assets
pub struct AssetReviewManager;

impl AssetReviewManager {
    /// Create a pending asset on the song's current stage
    pub fn create_asset(song_id: i64, stage: Stage, submitter: &Actor, new: NewAsset) -> SongAsset {
        SongAsset {
            id: uuid::Uuid::new_v4().to_string(),
            song_id,
            stage,
            asset_type: new.asset_type,
            title: new.title,
            location: new.location,
            width: new.width,
            height: new.height,
            status: ReviewStatus::Pending,
            submitted_by: submitter.id.clone(),
            submitted_by_department: submitter.department,
            reviewer: None,
            review_notes: None,
            submitted_at: chrono::Utc::now().timestamp(),
            reviewed_at: None,
        }
    }

    /// Apply a review decision; only pending assets can be reviewed
    pub fn review(
        asset: &mut SongAsset,
        reviewer: &str,
        decision: ReviewDecision,
        notes: Option<String>,
    ) -> Result<(), String> {
        if asset.status != ReviewStatus::Pending {
            return Err(format!(
                "Asset {} is not pending review (status: {})",
                asset.id, asset.status
            ));
        }

        if decision != ReviewDecision::Approve && notes.as_deref().map_or(true, str::is_empty) {
            return Err("A comment is required when requesting changes or rejecting".to_string());
        }

        asset.status = decision.resulting_status();
        asset.reviewer = Some(reviewer.to_string());
        asset.review_notes = notes;
        asset.reviewed_at = Some(chrono::Utc::now().timestamp());
        Ok(())
    }

    /// Format asset for display
    pub fn format_asset(asset: &SongAsset) -> String {
        let status_emoji = match asset.status {
            ReviewStatus::Pending => "⏳",
            ReviewStatus::Approved => "✅",
            ReviewStatus::ChangesRequested => "✏️",
            ReviewStatus::Rejected => "❌",
        };

        let mut output = format!(
            "{} Asset {} - {} ({})\n",
            status_emoji,
            asset.id,
            asset.display_name(),
            asset.status
        );
        output.push_str(&format!("  Song: {}\n", asset.song_id));
        output.push_str(&format!("  Location: {}\n", asset.location));
        if let (Some(w), Some(h)) = (asset.width, asset.height) {
            output.push_str(&format!("  Dimensions: {}x{}\n", w, h));
        }
        output.push_str(&format!("  Submitted by: {}\n", asset.submitted_by));

        if let Some(reviewer) = &asset.reviewer {
            output.push_str(&format!("  Reviewer: {}\n", reviewer));
        }
        if let Some(notes) = &asset.review_notes {
            output.push_str(&format!("  Notes: {}\n", notes));
        }

        output
    }

    /// Get review statistics
    pub fn get_stats(assets: &[SongAsset]) -> AssetStats {
        let mut stats = AssetStats::default();

        for asset in assets {
            match asset.status {
                ReviewStatus::Pending => stats.pending += 1,
                ReviewStatus::Approved => stats.approved += 1,
                ReviewStatus::ChangesRequested => stats.changes_requested += 1,
                ReviewStatus::Rejected => stats.rejected += 1,
            }
        }

        stats.total = assets.len();
        stats
    }
}

/// Review statistics
#[derive(Debug, Default, Serialize)]
pub struct AssetStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub changes_requested: usize,
    pub rejected: usize,
}

impl AssetStats {
    pub fn format(&self) -> String {
        format!(
            "Total: {} | ⏳ Pending: {} | ✅ Approved: {} | ✏️ Changes: {} | ❌ Rejected: {}",
            self.total, self.pending, self.approved, self.changes_requested, self.rejected
        )
    }
}
