//! Checklist item storage

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_column, Database};
use crate::checklist::{ChecklistItem, ValidationRule};
use crate::models::Stage;
use crate::workflow::WorkflowError;

const ITEM_COLUMNS: &str = "id, song_id, stage, category, item_name, description, item_order, \
     required, validation_type, validation_rule, is_complete, completed_at, completed_by, help_text";

/// A checklist row as stored; the rule is decoded by [`ChecklistItemRow::into_item`]
#[derive(Debug, Clone)]
pub struct ChecklistItemRow {
    pub id: i64,
    pub song_id: i64,
    pub stage: Stage,
    pub category: String,
    pub item_name: String,
    pub description: String,
    pub order: u32,
    pub required: bool,
    pub validation_type: String,
    pub validation_rule: String,
    pub is_complete: bool,
    pub completed_at: Option<i64>,
    pub completed_by: Option<String>,
    pub help_text: Option<String>,
}

impl ChecklistItemRow {
    /// Decode the stored rule; unknown types or parameters are configuration errors
    pub fn into_item(self) -> Result<ChecklistItem, WorkflowError> {
        let params: serde_json::Value = serde_json::from_str(&self.validation_rule)
            .map_err(|e| {
                WorkflowError::Configuration(format!(
                    "Checklist item {} has unreadable validation rule: {}",
                    self.id, e
                ))
            })?;
        let rule = ValidationRule::from_parts(&self.validation_type, &params)?;

        Ok(ChecklistItem {
            id: self.id,
            song_id: self.song_id,
            stage: self.stage,
            category: self.category,
            item_name: self.item_name,
            description: self.description,
            order: self.order,
            required: self.required,
            rule,
            is_complete: self.is_complete,
            completed_at: self.completed_at,
            completed_by: self.completed_by,
            help_text: self.help_text,
        })
    }
}

fn item_row(row: &Row<'_>) -> rusqlite::Result<ChecklistItemRow> {
    Ok(ChecklistItemRow {
        id: row.get(0)?,
        song_id: row.get(1)?,
        stage: parse_column(row, 2)?,
        category: row.get(3)?,
        item_name: row.get(4)?,
        description: row.get(5)?,
        order: row.get(6)?,
        required: row.get(7)?,
        validation_type: row.get(8)?,
        validation_rule: row.get(9)?,
        is_complete: row.get(10)?,
        completed_at: row.get(11)?,
        completed_by: row.get(12)?,
        help_text: row.get(13)?,
    })
}

impl Database {
    /// Insert a checklist item and return its id
    pub fn insert_checklist_item(&self, item: &ChecklistItem) -> Result<i64> {
        let (validation_type, params_json) = item.rule.to_parts()?;
        self.conn
            .execute(
                r#"
                INSERT INTO song_checklist_items (
                    song_id, stage, category, item_name, description, item_order, required,
                    validation_type, validation_rule, is_complete, completed_at, completed_by, help_text
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
                params![
                    item.song_id,
                    item.stage.to_string(),
                    item.category,
                    item.item_name,
                    item.description,
                    item.order,
                    item.required,
                    validation_type,
                    params_json.to_string(),
                    item.is_complete,
                    item.completed_at,
                    item.completed_by,
                    item.help_text,
                ],
            )
            .context("Failed to insert checklist item")?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Checklist rows for a song, optionally limited to one stage
    pub fn list_checklist_rows(
        &self,
        song_id: i64,
        stage: Option<Stage>,
    ) -> Result<Vec<ChecklistItemRow>> {
        let mut query = format!(
            "SELECT {} FROM song_checklist_items WHERE song_id = ?1",
            ITEM_COLUMNS
        );
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(song_id)];

        if let Some(s) = stage {
            query.push_str(" AND stage = ?2");
            params_vec.push(Box::new(s.to_string()));
        }
        query.push_str(" ORDER BY id");

        let mut stmt = self.conn.prepare(&query)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(params_refs.as_slice(), item_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    pub fn get_checklist_row(&self, item_id: i64) -> Result<Option<ChecklistItemRow>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM song_checklist_items WHERE id = ?1", ITEM_COLUMNS),
                params![item_id],
                item_row,
            )
            .optional()
            .context("Failed to load checklist item")
    }

    /// Persist an item's completion state
    pub fn update_checklist_completion(&self, item: &ChecklistItem) -> Result<()> {
        self.conn
            .execute(
                r#"
                UPDATE song_checklist_items
                SET is_complete = ?1, completed_at = ?2, completed_by = ?3
                WHERE id = ?4
                "#,
                params![item.is_complete, item.completed_at, item.completed_by, item.id],
            )
            .context("Failed to update checklist item")?;
        Ok(())
    }
}
