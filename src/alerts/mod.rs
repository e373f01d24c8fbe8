//! Alerts raised by workflow events
//!
//! [`AlertService`] only builds alert records; the caller persists them in
//! the same transaction as the change that caused them. Consumers poll the
//! `song_alerts` table and flip the read flag, nothing else is mutated.

use serde::{Deserialize, Serialize};

use crate::assets::{ReviewStatus, SongAsset};
use crate::models::{Actor, Department, Song, Stage};
use crate::permissions::{get_department_for_stage, ASSET_REVIEWERS};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    Info,
    Important,
    Urgent,
}

impl std::fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertPriority::Info => write!(f, "info"),
            AlertPriority::Important => write!(f, "important"),
            AlertPriority::Urgent => write!(f, "urgent"),
        }
    }
}

impl std::str::FromStr for AlertPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(AlertPriority::Info),
            "important" => Ok(AlertPriority::Important),
            "urgent" => Ok(AlertPriority::Urgent),
            _ => Err(format!("Invalid alert priority: {}. Use: info, important, urgent", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    StageTransition,
    Assignment,
    SentToDigital,
    AssetSubmitted,
    AssetApproved,
    AssetRejected,
    ChangesRequested,
    SalesPitch,
    BlockingIssue,
}

impl AlertType {
    /// Fixed priority for each alert type
    pub fn priority(&self) -> AlertPriority {
        match self {
            AlertType::StageTransition => AlertPriority::Important,
            AlertType::Assignment => AlertPriority::Important,
            AlertType::SentToDigital => AlertPriority::Urgent,
            AlertType::AssetSubmitted => AlertPriority::Important,
            AlertType::AssetApproved => AlertPriority::Info,
            AlertType::AssetRejected => AlertPriority::Important,
            AlertType::ChangesRequested => AlertPriority::Important,
            AlertType::SalesPitch => AlertPriority::Info,
            AlertType::BlockingIssue => AlertPriority::Urgent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::StageTransition => "stage_transition",
            AlertType::Assignment => "assignment",
            AlertType::SentToDigital => "sent_to_digital",
            AlertType::AssetSubmitted => "asset_submitted",
            AlertType::AssetApproved => "asset_approved",
            AlertType::AssetRejected => "asset_rejected",
            AlertType::ChangesRequested => "changes_requested",
            AlertType::SalesPitch => "sales_pitch",
            AlertType::BlockingIssue => "blocking_issue",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AlertType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stage_transition" => Ok(AlertType::StageTransition),
            "assignment" => Ok(AlertType::Assignment),
            "sent_to_digital" => Ok(AlertType::SentToDigital),
            "asset_submitted" => Ok(AlertType::AssetSubmitted),
            "asset_approved" => Ok(AlertType::AssetApproved),
            "asset_rejected" => Ok(AlertType::AssetRejected),
            "changes_requested" => Ok(AlertType::ChangesRequested),
            "sales_pitch" => Ok(AlertType::SalesPitch),
            "blocking_issue" => Ok(AlertType::BlockingIssue),
            _ => Err(format!("Invalid alert type: {}", s)),
        }
    }
}

/// A stored alert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SongAlert {
    pub id: i64,
    pub song_id: i64,
    pub alert_type: AlertType,
    pub target_department: Option<Department>,
    pub target_user: Option<String>,
    pub priority: AlertPriority,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: i64,
}

impl SongAlert {
    /// Whether `actor` is one of the alert's recipients
    pub fn is_addressed_to(&self, actor: &Actor) -> bool {
        self.target_user.as_deref() == Some(actor.id.as_str())
            || (self.target_department.is_some() && self.target_department == actor.department)
    }
}

/// An alert ready to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub song_id: i64,
    pub alert_type: AlertType,
    pub target_department: Option<Department>,
    pub target_user: Option<String>,
    pub priority: AlertPriority,
    pub title: String,
    pub message: String,
}

impl NewAlert {
    fn to_department(
        song: &Song,
        alert_type: AlertType,
        department: Department,
        title: String,
        message: String,
    ) -> Self {
        Self {
            song_id: song.id,
            alert_type,
            target_department: Some(department),
            target_user: None,
            priority: alert_type.priority(),
            title,
            message,
        }
    }

    fn to_user(song: &Song, alert_type: AlertType, user: &str, title: String, message: String) -> Self {
        Self {
            song_id: song.id,
            alert_type,
            target_department: None,
            target_user: Some(user.to_string()),
            priority: alert_type.priority(),
            title,
            message,
        }
    }
}

/// Something that happened to a song and may notify people
#[derive(Debug, Clone)]
pub enum AlertEvent<'a> {
    StageTransition { from: Stage, to: Stage },
    SentToDigital,
    AssetSubmitted(&'a SongAsset),
    AssetReviewed(&'a SongAsset),
    SalesPitch { pitched_to: &'a str },
    Blocked { reason: &'a str },
}

/// Builds alerts for workflow events
pub struct AlertService;

impl AlertService {
    /// Alerts for `event`; empty when there is nobody to notify
    ///
    /// `song` is the state after the change (e.g. already in the new stage).
    pub fn alerts_for(event: &AlertEvent<'_>, song: &Song, actor: &Actor) -> Vec<NewAlert> {
        let mut alerts = Vec::new();

        match event {
            AlertEvent::StageTransition { from, to } => {
                if let Some(dept) = get_department_for_stage(*to) {
                    alerts.push(NewAlert::to_department(
                        song,
                        AlertType::StageTransition,
                        dept,
                        format!("New Song: {}", song.title),
                        format!(
                            "{} moved \"{}\" from {} to {}. Please review and take action.",
                            actor.name, song.title, from, to
                        ),
                    ));
                }
                if let Some(user) = &song.assigned_user {
                    alerts.push(NewAlert::to_user(
                        song,
                        AlertType::Assignment,
                        user,
                        format!("Assigned: {}", song.title),
                        format!(
                            "You have been assigned to work on \"{}\" in {} stage.",
                            song.title, to
                        ),
                    ));
                }
            }
            AlertEvent::SentToDigital => {
                alerts.push(NewAlert::to_department(
                    song,
                    AlertType::SentToDigital,
                    Department::Digital,
                    format!("Ready for Distribution: {}", song.title),
                    format!(
                        "{} has sent \"{}\" to Digital. All assets and metadata are ready.",
                        actor.name, song.title
                    ),
                ));
            }
            AlertEvent::AssetSubmitted(asset) => {
                if let Some(reviewers) = ASSET_REVIEWERS.first() {
                    alerts.push(NewAlert::to_department(
                        song,
                        AlertType::AssetSubmitted,
                        *reviewers,
                        format!("Assets Ready for Review: {}", song.title),
                        format!(
                            "{} has submitted {} \"{}\" for \"{}\". Please review and approve or reject.",
                            actor.name,
                            asset.asset_type,
                            asset.display_name(),
                            song.title
                        ),
                    ));
                }
            }
            AlertEvent::AssetReviewed(asset) => {
                let reviewed = match asset.status {
                    ReviewStatus::Approved => Some((AlertType::AssetApproved, "approved")),
                    ReviewStatus::Rejected => Some((AlertType::AssetRejected, "rejected")),
                    ReviewStatus::ChangesRequested => {
                        Some((AlertType::ChangesRequested, "requested changes for"))
                    }
                    ReviewStatus::Pending => None,
                };
                if let (Some((alert_type, action)), Some(dept)) =
                    (reviewed, asset.submitted_by_department)
                {
                    alerts.push(NewAlert::to_department(
                        song,
                        alert_type,
                        dept,
                        format!("Asset {}: {}", asset.status, song.title),
                        format!(
                            "{} has {} your asset \"{}\" for \"{}\".",
                            actor.name,
                            action,
                            asset.display_name(),
                            song.title
                        ),
                    ));
                }
            }
            AlertEvent::SalesPitch { pitched_to } => {
                alerts.push(NewAlert::to_user(
                    song,
                    AlertType::SalesPitch,
                    &song.created_by,
                    format!("Work Pitched: {}", song.title),
                    format!("{} pitched \"{}\" to {}.", actor.name, song.title, pitched_to),
                ));
            }
            AlertEvent::Blocked { reason } => {
                if let Some(dept) = song.assigned_department {
                    alerts.push(NewAlert::to_department(
                        song,
                        AlertType::BlockingIssue,
                        dept,
                        format!("BLOCKED: {}", song.title),
                        format!(
                            "{} flagged \"{}\" as blocked. Reason: {}",
                            actor.name, song.title, reason
                        ),
                    ));
                }
            }
        }

        alerts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetReviewManager, AssetType, NewAsset, ReviewDecision};
    use crate::checklist::testing::song;

    fn label_user() -> Actor {
        Actor::new("lbl-1", "Lena", 100, Some(Department::Label))
    }

    #[test]
    fn transition_notifies_new_owner() {
        let s = song(Stage::LabelRecording);
        let alerts = AlertService::alerts_for(
            &AlertEvent::StageTransition {
                from: Stage::Publishing,
                to: Stage::LabelRecording,
            },
            &s,
            &label_user(),
        );
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].target_department, Some(Department::Label));
        assert_eq!(alerts[0].priority, AlertPriority::Important);
    }

    #[test]
    fn transition_to_unowned_stage_is_silent() {
        let s = song(Stage::Released);
        let alerts = AlertService::alerts_for(
            &AlertEvent::StageTransition {
                from: Stage::DigitalDistribution,
                to: Stage::Released,
            },
            &s,
            &label_user(),
        );
        assert!(alerts.is_empty());
    }

    #[test]
    fn assigned_user_gets_assignment_alert() {
        let mut s = song(Stage::Publishing);
        s.assigned_user = Some("pub-7".to_string());
        let alerts = AlertService::alerts_for(
            &AlertEvent::StageTransition {
                from: Stage::Draft,
                to: Stage::Publishing,
            },
            &s,
            &label_user(),
        );
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[1].alert_type, AlertType::Assignment);
        assert_eq!(alerts[1].target_user.as_deref(), Some("pub-7"));
    }

    #[test]
    fn send_to_digital_is_urgent() {
        let s = song(Stage::DigitalDistribution);
        let alerts = AlertService::alerts_for(&AlertEvent::SentToDigital, &s, &label_user());
        assert_eq!(alerts[0].priority, AlertPriority::Urgent);
        assert_eq!(alerts[0].target_department, Some(Department::Digital));
    }

    #[test]
    fn review_decision_notifies_submitter_department() {
        let s = song(Stage::MarketingAssets);
        let marketing = Actor::new("mkt-1", "Mara", 100, Some(Department::Marketing));
        let mut asset = AssetReviewManager::create_asset(
            s.id,
            s.stage,
            &marketing,
            NewAsset {
                asset_type: AssetType::PressPhoto,
                title: None,
                location: "photos/band.jpg".to_string(),
                width: None,
                height: None,
            },
        );

        let submitted =
            AlertService::alerts_for(&AlertEvent::AssetSubmitted(&asset), &s, &marketing);
        assert_eq!(submitted[0].target_department, Some(Department::Label));

        AssetReviewManager::review(&mut asset, "lbl-1", ReviewDecision::Approve, None).unwrap();
        let reviewed =
            AlertService::alerts_for(&AlertEvent::AssetReviewed(&asset), &s, &label_user());
        assert_eq!(reviewed[0].alert_type, AlertType::AssetApproved);
        assert_eq!(reviewed[0].priority, AlertPriority::Info);
        assert_eq!(reviewed[0].target_department, Some(Department::Marketing));
    }

    #[test]
    fn review_of_departmentless_submitter_is_silent() {
        let s = song(Stage::MarketingAssets);
        let admin = Actor::new("root", "Admin", 1000, None);
        let mut asset = AssetReviewManager::create_asset(
            s.id,
            s.stage,
            &admin,
            NewAsset {
                asset_type: AssetType::Other,
                title: None,
                location: "misc/file.pdf".to_string(),
                width: None,
                height: None,
            },
        );
        AssetReviewManager::review(&mut asset, "lbl-1", ReviewDecision::Reject, Some("no".into()))
            .unwrap();
        let alerts = AlertService::alerts_for(&AlertEvent::AssetReviewed(&asset), &s, &label_user());
        assert!(alerts.is_empty());
    }

    #[test]
    fn recipients() {
        let alert = SongAlert {
            id: 1,
            song_id: 1,
            alert_type: AlertType::StageTransition,
            target_department: Some(Department::Label),
            target_user: None,
            priority: AlertPriority::Important,
            title: String::new(),
            message: String::new(),
            is_read: false,
            created_at: 0,
        };
        assert!(alert.is_addressed_to(&label_user()));
        assert!(!alert.is_addressed_to(&Actor::new("root", "Admin", 1000, None)));
    }
}
