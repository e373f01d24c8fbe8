//! Department-scoped permissions for songs
//!
//! All decisions are pure functions over the const tables below. Nothing
//! here reads the database; callers pass the actor, song and, for
//! transitions, the current checklist progress.

pub mod fields;

use crate::models::{Actor, Department, Song, Stage};
use crate::workflow::WorkflowError;

use Department::{Digital, Label, Marketing, Publishing, Sales};

type StageTable<T> = &'static [(Stage, &'static [T])];

/// Departments that may view a song in each stage
///
/// Archived is absent: only admins and the creator see archived songs.
pub const VISIBILITY_MATRIX: StageTable<Department> = &[
    (Stage::Draft, &[Publishing, Label, Sales]),
    (Stage::Publishing, &[Publishing, Sales]),
    (Stage::LabelRecording, &[Label]),
    (Stage::MarketingAssets, &[Label, Marketing]),
    (Stage::LabelReview, &[Label]),
    (Stage::ReadyForDigital, &[Label, Digital]),
    (Stage::DigitalDistribution, &[Digital, Label]),
    (Stage::Released, &[Publishing, Label, Digital, Sales]),
];

/// Departments that may edit a song in each stage; the first entry owns the stage
pub const EDIT_MATRIX: StageTable<Department> = &[
    (Stage::Draft, &[Publishing]),
    (Stage::Publishing, &[Publishing]),
    (Stage::LabelRecording, &[Label]),
    (Stage::MarketingAssets, &[Marketing]),
    (Stage::LabelReview, &[Label]),
    (Stage::ReadyForDigital, &[Label]),
    (Stage::DigitalDistribution, &[Digital]),
    (Stage::Released, &[]),
];

/// Allowed `from -> to` stage moves
pub const VALID_TRANSITIONS: StageTable<Stage> = &[
    (Stage::Draft, &[Stage::Publishing, Stage::Archived]),
    (Stage::Publishing, &[Stage::LabelRecording, Stage::Archived]),
    (Stage::LabelRecording, &[Stage::MarketingAssets, Stage::Archived]),
    (Stage::MarketingAssets, &[Stage::LabelReview, Stage::Archived]),
    (
        Stage::LabelReview,
        &[Stage::ReadyForDigital, Stage::MarketingAssets, Stage::Archived],
    ),
    (Stage::ReadyForDigital, &[Stage::DigitalDistribution, Stage::Archived]),
    (Stage::DigitalDistribution, &[Stage::Released, Stage::Archived]),
    (Stage::Released, &[Stage::Archived]),
];

/// Departments that may see split data in each stage
pub const SPLITS_MATRIX: StageTable<Department> = &[
    (Stage::Draft, &[Publishing]),
    (Stage::Publishing, &[Publishing]),
    (Stage::LabelRecording, &[Label]),
    (Stage::MarketingAssets, &[Label]),
    (Stage::LabelReview, &[Label]),
    (Stage::ReadyForDigital, &[Label]),
    (Stage::DigitalDistribution, &[Label]),
];

/// Departments never shown split data, whatever the stage
pub const SPLITS_EXCLUDED: &[Department] = &[Sales, Marketing, Digital];

/// Departments allowed to review uploaded assets
pub const ASSET_REVIEWERS: &[Department] = &[Label];

fn lookup<T>(table: StageTable<T>, stage: Stage) -> &'static [T] {
    table
        .iter()
        .find(|(s, _)| *s == stage)
        .map(|(_, entries)| *entries)
        .unwrap_or(&[])
}

fn in_table(table: StageTable<Department>, stage: Stage, actor: &Actor) -> bool {
    actor
        .department
        .is_some_and(|dept| lookup(table, stage).contains(&dept))
}

fn is_creator(actor: &Actor, song: &Song) -> bool {
    song.created_by == actor.id
}

/// Department owning a stage; `None` for released and archived
pub fn get_department_for_stage(stage: Stage) -> Option<Department> {
    lookup(EDIT_MATRIX, stage).first().copied()
}

pub fn is_valid_transition(from: Stage, to: Stage) -> bool {
    lookup(VALID_TRANSITIONS, from).contains(&to)
}

pub fn allowed_transitions(from: Stage) -> &'static [Stage] {
    lookup(VALID_TRANSITIONS, from)
}

pub fn user_can_view_song(actor: &Actor, song: &Song) -> bool {
    if actor.is_admin() || is_creator(actor, song) {
        return true;
    }
    if song.is_archived() {
        return false;
    }
    in_table(VISIBILITY_MATRIX, song.stage, actor)
}

pub fn user_can_edit_song(actor: &Actor, song: &Song) -> bool {
    if !user_can_view_song(actor, song) {
        return false;
    }
    if actor.is_admin() {
        return true;
    }
    if is_creator(actor, song) && song.stage == Stage::Draft {
        return true;
    }
    in_table(EDIT_MATRIX, song.stage, actor)
}

pub fn user_can_view_splits(actor: &Actor, song: &Song) -> bool {
    if actor.is_admin() {
        return true;
    }
    match actor.department {
        Some(dept) if SPLITS_EXCLUDED.contains(&dept) => false,
        Some(_) => in_table(SPLITS_MATRIX, song.stage, actor),
        None => false,
    }
}

pub fn user_can_review_assets(actor: &Actor) -> bool {
    actor.is_admin()
        || actor
            .department
            .is_some_and(|dept| ASSET_REVIEWERS.contains(&dept))
}

pub fn user_can_view_overdue(actor: &Actor) -> bool {
    actor.is_manager()
}

/// Admins and anyone assigned to a department may start a song
pub fn user_can_create_song(actor: &Actor) -> bool {
    actor.is_admin() || actor.department.is_some()
}

/// Outcome of an authorized transition check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionGate {
    /// An admin moved the song with an incomplete checklist
    pub admin_override: bool,
}

/// Decide whether `actor` may move `song` to `target`
///
/// The transition table applies to everyone, admins included. Only the
/// checklist gate is bypassable, and only by an admin; archiving never
/// requires a complete checklist.
pub fn check_transition(
    actor: &Actor,
    song: &Song,
    target: Stage,
    progress: f64,
) -> Result<TransitionGate, WorkflowError> {
    if !is_valid_transition(song.stage, target) {
        return Err(WorkflowError::InvalidTransition {
            from: song.stage,
            to: target,
        });
    }

    if !user_can_edit_song(actor, song) {
        return Err(WorkflowError::PermissionDenied(format!(
            "{} cannot move songs out of {}",
            actor.id, song.stage
        )));
    }

    let checklist_done = progress >= 100.0;
    if checklist_done || target == Stage::Archived {
        return Ok(TransitionGate {
            admin_override: false,
        });
    }

    if actor.is_admin() {
        return Ok(TransitionGate {
            admin_override: true,
        });
    }

    Err(WorkflowError::ChecklistIncomplete { progress })
}

pub fn user_can_transition_stage(actor: &Actor, song: &Song, target: Stage, progress: f64) -> bool {
    check_transition(actor, song, target, progress).is_ok()
}

/// Stages whose songs the actor can see by department
pub fn get_visible_stages_for_user(actor: &Actor) -> Vec<Stage> {
    if actor.is_admin() {
        return Stage::ALL.to_vec();
    }
    Stage::ALL
        .into_iter()
        .filter(|stage| in_table(VISIBILITY_MATRIX, *stage, actor))
        .collect()
}

/// Stages whose songs the actor can edit by department
pub fn get_editable_stages_for_user(actor: &Actor) -> Vec<Stage> {
    if actor.is_admin() {
        return Stage::ALL
            .into_iter()
            .filter(|stage| *stage != Stage::Released)
            .collect();
    }
    Stage::ALL
        .into_iter()
        .filter(|stage| in_table(EDIT_MATRIX, *stage, actor))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::testing::song;
    use crate::models::ADMIN_LEVEL;

    fn member(dept: Department) -> Actor {
        Actor::new(&format!("{}-1", dept), "Member", 100, Some(dept))
    }

    fn admin() -> Actor {
        Actor::new("root", "Admin", ADMIN_LEVEL, None)
    }

    #[test]
    fn tables_cover_every_stage_but_archived() {
        for stage in Stage::ALL {
            let expected = stage != Stage::Archived;
            assert_eq!(VISIBILITY_MATRIX.iter().any(|(s, _)| *s == stage), expected);
            assert_eq!(EDIT_MATRIX.iter().any(|(s, _)| *s == stage), expected);
            assert_eq!(VALID_TRANSITIONS.iter().any(|(s, _)| *s == stage), expected);
        }
    }

    #[test]
    fn tables_have_no_duplicate_stages() {
        for table in [VISIBILITY_MATRIX, EDIT_MATRIX, SPLITS_MATRIX] {
            for (i, (stage, _)) in table.iter().enumerate() {
                assert!(!table[i + 1..].iter().any(|(s, _)| s == stage));
            }
        }
    }

    #[test]
    fn editors_can_always_view() {
        for (stage, depts) in EDIT_MATRIX {
            let visible = lookup(VISIBILITY_MATRIX, *stage);
            assert!(depts.iter().all(|d| visible.contains(d)), "{}", stage);
        }
    }

    #[test]
    fn every_non_terminal_stage_can_be_archived() {
        for stage in Stage::ALL.into_iter().filter(|s| *s != Stage::Archived) {
            assert!(is_valid_transition(stage, Stage::Archived), "{}", stage);
        }
        assert!(allowed_transitions(Stage::Archived).is_empty());
    }

    #[test]
    fn department_for_stage() {
        assert_eq!(get_department_for_stage(Stage::Draft), Some(Publishing));
        assert_eq!(get_department_for_stage(Stage::MarketingAssets), Some(Marketing));
        assert_eq!(get_department_for_stage(Stage::ReadyForDigital), Some(Label));
        assert_eq!(get_department_for_stage(Stage::DigitalDistribution), Some(Digital));
        assert_eq!(get_department_for_stage(Stage::Released), None);
        assert_eq!(get_department_for_stage(Stage::Archived), None);
    }

    #[test]
    fn marketing_only_sees_marketing_assets() {
        assert_eq!(
            get_visible_stages_for_user(&member(Marketing)),
            vec![Stage::MarketingAssets]
        );
    }

    #[test]
    fn sales_sees_publishing_but_not_splits() {
        let sales = member(Sales);
        let s = song(Stage::Publishing);
        assert!(user_can_view_song(&sales, &s));
        assert!(!user_can_edit_song(&sales, &s));
        assert!(!user_can_view_splits(&sales, &s));

        assert!(user_can_view_splits(&member(Publishing), &s));
        assert!(!user_can_view_splits(&member(Label), &s));
    }

    #[test]
    fn archived_visible_only_to_admin_and_creator() {
        let mut s = song(Stage::Archived);
        s.created_by = "label-1".to_string();
        assert!(user_can_view_song(&admin(), &s));
        assert!(user_can_view_song(&member(Label), &s));
        assert!(!user_can_view_song(&member(Publishing), &s));
    }

    #[test]
    fn creator_edits_only_in_draft() {
        let creator = member(Sales);
        let mut s = song(Stage::Draft);
        s.created_by = creator.id.clone();
        assert!(user_can_edit_song(&creator, &s));

        s.stage = Stage::Publishing;
        assert!(user_can_view_song(&creator, &s));
        assert!(!user_can_edit_song(&creator, &s));
    }

    #[test]
    fn released_has_no_editors() {
        let s = song(Stage::Released);
        for dept in Department::ALL {
            assert!(!user_can_edit_song(&member(dept), &s));
        }
        assert!(user_can_edit_song(&admin(), &s));
    }

    #[test]
    fn transition_table_binds_admins_too() {
        let s = song(Stage::Draft);
        let err = check_transition(&admin(), &s, Stage::Released, 100.0).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

        let err = check_transition(&member(Publishing), &s, Stage::Released, 100.0).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[test]
    fn incomplete_checklist_blocks_members_but_not_admins() {
        let s = song(Stage::Publishing);
        let err =
            check_transition(&member(Publishing), &s, Stage::LabelRecording, 80.0).unwrap_err();
        assert!(matches!(err, WorkflowError::ChecklistIncomplete { progress } if progress == 80.0));

        let gate = check_transition(&admin(), &s, Stage::LabelRecording, 80.0).unwrap();
        assert!(gate.admin_override);

        let gate = check_transition(&admin(), &s, Stage::LabelRecording, 100.0).unwrap();
        assert!(!gate.admin_override);
    }

    #[test]
    fn archiving_skips_checklist_gate() {
        let s = song(Stage::Publishing);
        let gate = check_transition(&member(Publishing), &s, Stage::Archived, 0.0).unwrap();
        assert!(!gate.admin_override);
        let gate = check_transition(&admin(), &s, Stage::Archived, 0.0).unwrap();
        assert!(!gate.admin_override);
    }

    #[test]
    fn only_the_owning_department_originates() {
        let s = song(Stage::LabelReview);
        assert!(user_can_transition_stage(&member(Label), &s, Stage::MarketingAssets, 100.0));
        let err = check_transition(&member(Marketing), &s, Stage::MarketingAssets, 100.0)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::PermissionDenied(_)));
    }

    #[test]
    fn asset_review_and_overdue_rights() {
        assert!(user_can_review_assets(&member(Label)));
        assert!(!user_can_review_assets(&member(Marketing)));
        assert!(user_can_review_assets(&admin()));

        assert!(!user_can_view_overdue(&member(Label)));
        assert!(user_can_view_overdue(&Actor::new("mgr", "Manager", 300, Some(Label))));
    }

    #[test]
    fn admin_editable_stages_exclude_released() {
        let stages = get_editable_stages_for_user(&admin());
        assert!(!stages.contains(&Stage::Released));
        assert_eq!(stages.len(), Stage::ALL.len() - 1);
    }
}
