//! Song asset storage

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_column, parse_optional_column, Database};
use crate::assets::SongAsset;

const ASSET_COLUMNS: &str = "id, song_id, stage, asset_type, title, location, width, height, \
     status, submitted_by, submitted_by_department, reviewer, review_notes, submitted_at, reviewed_at";

fn asset_row(row: &Row<'_>) -> rusqlite::Result<SongAsset> {
    Ok(SongAsset {
        id: row.get(0)?,
        song_id: row.get(1)?,
        stage: parse_column(row, 2)?,
        asset_type: parse_column(row, 3)?,
        title: row.get(4)?,
        location: row.get(5)?,
        width: row.get(6)?,
        height: row.get(7)?,
        status: parse_column(row, 8)?,
        submitted_by: row.get(9)?,
        submitted_by_department: parse_optional_column(row, 10)?,
        reviewer: row.get(11)?,
        review_notes: row.get(12)?,
        submitted_at: row.get(13)?,
        reviewed_at: row.get(14)?,
    })
}

impl Database {
    pub fn insert_asset(&self, asset: &SongAsset) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO song_assets ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                    ASSET_COLUMNS
                ),
                params![
                    asset.id,
                    asset.song_id,
                    asset.stage.to_string(),
                    asset.asset_type.to_string(),
                    asset.title,
                    asset.location,
                    asset.width,
                    asset.height,
                    asset.status.to_string(),
                    asset.submitted_by,
                    asset.submitted_by_department.map(|d| d.to_string()),
                    asset.reviewer,
                    asset.review_notes,
                    asset.submitted_at,
                    asset.reviewed_at,
                ],
            )
            .context("Failed to save asset")?;
        Ok(())
    }

    pub fn get_asset(&self, id: &str) -> Result<Option<SongAsset>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM song_assets WHERE id = ?1", ASSET_COLUMNS),
                params![id],
                asset_row,
            )
            .optional()
            .context("Failed to load asset")
    }

    /// Assets for a song in upload order
    pub fn list_assets(&self, song_id: i64) -> Result<Vec<SongAsset>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM song_assets WHERE song_id = ?1 ORDER BY submitted_at, rowid",
            ASSET_COLUMNS
        ))?;
        let rows = stmt.query_map(params![song_id], asset_row)?;

        let mut assets = Vec::new();
        for row in rows {
            assets.push(row?);
        }
        Ok(assets)
    }

    /// Persist review outcome fields
    pub fn update_asset_review(&self, asset: &SongAsset) -> Result<()> {
        self.conn
            .execute(
                r#"
                UPDATE song_assets
                SET status = ?1, reviewer = ?2, review_notes = ?3, reviewed_at = ?4
                WHERE id = ?5
                "#,
                params![
                    asset.status.to_string(),
                    asset.reviewer,
                    asset.review_notes,
                    asset.reviewed_at,
                    asset.id,
                ],
            )
            .context("Failed to update asset review")?;
        Ok(())
    }
}
