//! Per-stage song checklists
//!
//! Items are instantiated from [`templates`] when a song enters a stage.
//! Items from earlier stages stay on the song as history; only items for
//! the current stage count towards progress.

pub mod templates;
pub mod validators;

use serde::{Deserialize, Serialize};

use crate::models::{SongContext, Stage};
use crate::workflow::WorkflowError;

pub use templates::{generate_checklist_for_stage, ItemTemplate};
pub use validators::{run_validation, ValidationRule};

/// A checklist item attached to a song
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChecklistItem {
    pub id: i64,
    pub song_id: i64,
    pub stage: Stage,
    pub category: String,
    pub item_name: String,
    pub description: String,
    pub order: u32,
    pub required: bool,
    pub rule: ValidationRule,
    pub is_complete: bool,
    pub completed_at: Option<i64>,
    pub completed_by: Option<String>,
    pub help_text: Option<String>,
}

impl ChecklistItem {
    /// Fresh, incomplete item built from a template (not yet persisted)
    pub fn from_template(song_id: i64, stage: Stage, template: &ItemTemplate) -> Self {
        Self {
            id: 0,
            song_id,
            stage,
            category: template.category.to_string(),
            item_name: template.item_name.to_string(),
            description: template.description.to_string(),
            order: template.order,
            required: template.required,
            rule: template.rule,
            is_complete: false,
            completed_at: None,
            completed_by: None,
            help_text: template.help_text.map(str::to_string),
        }
    }

    pub fn is_manual(&self) -> bool {
        self.rule.is_manual()
    }

    /// Set the completion flag, stamping or clearing who/when
    pub fn set_complete(&mut self, complete: bool, by: Option<&str>) {
        self.is_complete = complete;
        if complete {
            self.completed_at = Some(chrono::Utc::now().timestamp());
            self.completed_by = by.map(str::to_string);
        } else {
            self.completed_at = None;
            self.completed_by = None;
        }
    }
}

/// Items to create when a song enters `stage`
pub fn instantiate_for_stage(song_id: i64, stage: Stage) -> Vec<ChecklistItem> {
    generate_checklist_for_stage(stage)
        .iter()
        .map(|template| ChecklistItem::from_template(song_id, stage, template))
        .collect()
}

/// Recompute an automatic item's flag; returns whether it changed
///
/// Manual items are never touched. Running this twice on the same context
/// is a no-op the second time.
pub fn revalidate_checklist_item(
    item: &mut ChecklistItem,
    ctx: &SongContext,
) -> Result<bool, WorkflowError> {
    if item.is_manual() {
        return Ok(false);
    }

    let valid = run_validation(item, ctx)?;
    if valid == item.is_complete {
        return Ok(false);
    }

    item.set_complete(valid, None);
    Ok(true)
}

/// Percentage of required items complete, rounded to two decimals
///
/// A stage without required items counts as fully complete.
pub fn calculate_progress(items: &[ChecklistItem]) -> f64 {
    let required: Vec<&ChecklistItem> = items.iter().filter(|i| i.required).collect();
    if required.is_empty() {
        return 100.0;
    }

    let complete = required.iter().filter(|i| i.is_complete).count();
    let pct = complete as f64 / required.len() as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

/// One item whose flag flipped during revalidation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemChange {
    pub item_id: i64,
    pub item_name: String,
    pub old_status: bool,
    pub new_status: bool,
}

/// Outcome of revalidating a song's automatic items
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RevalidationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub updated: Vec<ItemChange>,
}

/// Revalidate every automatic item in `items` against one context snapshot
pub fn revalidate_items(
    items: &mut [ChecklistItem],
    ctx: &SongContext,
) -> Result<RevalidationSummary, WorkflowError> {
    let mut summary = RevalidationSummary::default();

    for item in items.iter_mut().filter(|i| !i.is_manual()) {
        let old_status = item.is_complete;
        let changed = revalidate_checklist_item(item, ctx)?;

        summary.total += 1;
        if item.is_complete {
            summary.passed += 1;
        } else {
            summary.failed += 1;
        }
        if changed {
            summary.updated.push(ItemChange {
                item_id: item.id,
                item_name: item.item_name.clone(),
                old_status,
                new_status: item.is_complete,
            });
        }
    }

    Ok(summary)
}
