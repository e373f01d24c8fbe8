//! Workflow engine for moving songs through department stages
//!
//! Stage graph (see `permissions::VALID_TRANSITIONS`):
//! - draft -> publishing -> label_recording -> marketing_assets
//!   -> label_review -> ready_for_digital -> digital_distribution -> released
//! - label_review -> marketing_assets sends assets back for rework
//! - any stage except archived -> archived
//!
//! [`WorkflowEngine`] decides; [`SongWorkflow`] applies decisions atomically.

mod catalog;
pub mod service;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::models::{Actor, Department, Song, Stage};
use crate::permissions::{check_transition, get_department_for_stage};

pub use service::{
    ChecklistView, RevalidationOutcome, SongStats, SongWorkflow, ToggleOutcome, TransitionOutcome,
};

/// Workflow event types, used for audit notes and logging
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// Stage transition (from, to)
    Transition(Stage, Stage),
    /// Admin moved past an incomplete checklist
    Override { from: Stage, to: Stage, progress: f64 },
    /// Song archived from the given stage
    Archived(Stage),
}

impl WorkflowEvent {
    pub fn as_string(&self) -> String {
        match self {
            WorkflowEvent::Transition(from, to) => format!("transition:{}:{}", from, to),
            WorkflowEvent::Override { from, to, progress } => {
                format!("override:{}:{}:{:.2}", from, to, progress)
            }
            WorkflowEvent::Archived(from) => format!("archived:{}", from),
        }
    }
}

/// Broad error classes, exposed to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Permission,
    Validation,
    Conflict,
    NotFound,
    Storage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Permission => write!(f, "permission"),
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Storage => write!(f, "storage"),
        }
    }
}

/// Workflow error
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: Stage, to: Stage },

    #[error("Checklist must be 100% complete before transitioning (currently {progress}%)")]
    ChecklistIncomplete { progress: f64 },

    #[error("Checklist item '{0}' is validated automatically and cannot be toggled")]
    NotToggleable(String),

    #[error("Checklist configuration error: {0}")]
    Configuration(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Song {song_id} moved from {expected} to {actual} before this request was applied")]
    Conflict {
        song_id: i64,
        expected: Stage,
        actual: Stage,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::PermissionDenied(_) => ErrorKind::Permission,
            WorkflowError::InvalidTransition { .. }
            | WorkflowError::ChecklistIncomplete { .. }
            | WorkflowError::NotToggleable(_)
            | WorkflowError::Configuration(_)
            | WorkflowError::ValidationFailed(_) => ErrorKind::Validation,
            WorkflowError::Conflict { .. } => ErrorKind::Conflict,
            WorkflowError::NotFound { .. } => ErrorKind::NotFound,
            WorkflowError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        WorkflowError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Workflow engine for song transitions
pub struct WorkflowEngine;

impl WorkflowEngine {
    /// Validate a transition and work out everything that changes with it
    pub fn plan_transition(
        actor: &Actor,
        song: &Song,
        target: Stage,
        progress: f64,
        today: NaiveDate,
        deadline_days: u32,
    ) -> Result<WorkflowTransition, WorkflowError> {
        let gate = check_transition(actor, song, target, progress)?;

        let event = if target == Stage::Archived {
            WorkflowEvent::Archived(song.stage)
        } else if gate.admin_override {
            WorkflowEvent::Override {
                from: song.stage,
                to: target,
                progress,
            }
        } else {
            WorkflowEvent::Transition(song.stage, target)
        };

        Ok(WorkflowTransition {
            from: song.stage,
            to: target,
            admin_override: gate.admin_override,
            department: get_department_for_stage(target),
            deadline: Self::stage_deadline(target, today, deadline_days),
            event,
        })
    }

    /// Deadline for a song entering `stage` today; only active stages get one
    pub fn stage_deadline(stage: Stage, today: NaiveDate, days: u32) -> Option<NaiveDate> {
        if !stage.is_in_flight() {
            return None;
        }
        today.checked_add_days(Days::new(u64::from(days)))
    }

    /// Get the next stage on the forward path
    pub fn next_stage(current: Stage) -> Option<Stage> {
        match current {
            Stage::Draft => Some(Stage::Publishing),
            Stage::Publishing => Some(Stage::LabelRecording),
            Stage::LabelRecording => Some(Stage::MarketingAssets),
            Stage::MarketingAssets => Some(Stage::LabelReview),
            Stage::LabelReview => Some(Stage::ReadyForDigital),
            Stage::ReadyForDigital => Some(Stage::DigitalDistribution),
            Stage::DigitalDistribution => Some(Stage::Released),
            Stage::Released | Stage::Archived => None,
        }
    }
}

/// Result of a successful transition check
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowTransition {
    pub from: Stage,
    pub to: Stage,
    pub admin_override: bool,
    pub department: Option<Department>,
    pub deadline: Option<NaiveDate>,
    pub event: WorkflowEvent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::testing::song;
    use crate::permissions::is_valid_transition;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    fn publisher() -> Actor {
        Actor::new("pub-1", "Pia", 100, Some(Department::Publishing))
    }

    #[test]
    fn plan_sets_owner_and_deadline() {
        let s = song(Stage::Draft);
        let plan =
            WorkflowEngine::plan_transition(&publisher(), &s, Stage::Publishing, 100.0, today(), 14)
                .unwrap();
        assert_eq!(plan.department, Some(Department::Publishing));
        assert_eq!(plan.deadline, NaiveDate::from_ymd_opt(2025, 3, 15));
        assert!(!plan.admin_override);
        assert_eq!(plan.event.as_string(), "transition:draft:publishing");
    }

    #[test]
    fn archive_clears_owner_and_deadline() {
        let s = song(Stage::Publishing);
        let plan =
            WorkflowEngine::plan_transition(&publisher(), &s, Stage::Archived, 0.0, today(), 14)
                .unwrap();
        assert_eq!(plan.department, None);
        assert_eq!(plan.deadline, None);
        assert_eq!(plan.event, WorkflowEvent::Archived(Stage::Publishing));
    }

    #[test]
    fn admin_override_is_recorded_in_event() {
        let admin = Actor::new("root", "Admin", 1000, None);
        let s = song(Stage::Publishing);
        let plan =
            WorkflowEngine::plan_transition(&admin, &s, Stage::LabelRecording, 50.0, today(), 14)
                .unwrap();
        assert!(plan.admin_override);
        assert!(plan.event.as_string().starts_with("override:publishing:label_recording"));
    }

    #[test]
    fn forward_path_follows_transition_table() {
        let mut stage = Stage::Draft;
        let mut hops = 0;
        while let Some(next) = WorkflowEngine::next_stage(stage) {
            assert!(is_valid_transition(stage, next));
            stage = next;
            hops += 1;
        }
        assert_eq!(stage, Stage::Released);
        assert_eq!(hops, 7);
    }

    #[test]
    fn error_kinds() {
        assert_eq!(
            WorkflowError::PermissionDenied("x".into()).kind(),
            ErrorKind::Permission
        );
        assert_eq!(
            WorkflowError::ChecklistIncomplete { progress: 10.0 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            WorkflowError::Conflict {
                song_id: 1,
                expected: Stage::LabelReview,
                actual: Stage::ReadyForDigital
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            WorkflowError::from(anyhow::anyhow!("disk full")).kind(),
            ErrorKind::Storage
        );
    }
}
