//! Alert storage
//!
//! An alert reaches an actor when it targets them directly or targets
//! their department.

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use super::{now_ts, parse_column, parse_optional_column, Database};
use crate::alerts::{NewAlert, SongAlert};
use crate::models::Actor;

const ALERT_COLUMNS: &str = "id, song_id, alert_type, target_department, target_user, priority, \
     title, message, is_read, created_at";

const RECIPIENT_FILTER: &str = "(target_user = ?1 OR (target_department IS NOT NULL AND target_department = ?2))";

fn alert_row(row: &Row<'_>) -> rusqlite::Result<SongAlert> {
    Ok(SongAlert {
        id: row.get(0)?,
        song_id: row.get(1)?,
        alert_type: parse_column(row, 2)?,
        target_department: parse_optional_column(row, 3)?,
        target_user: row.get(4)?,
        priority: parse_column(row, 5)?,
        title: row.get(6)?,
        message: row.get(7)?,
        is_read: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn department_param(actor: &Actor) -> Option<String> {
    actor.department.map(|d| d.to_string())
}

impl Database {
    pub fn insert_alert(&self, alert: &NewAlert) -> Result<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO song_alerts
                    (song_id, alert_type, target_department, target_user, priority, title, message, is_read, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)
                "#,
                params![
                    alert.song_id,
                    alert.alert_type.to_string(),
                    alert.target_department.map(|d| d.to_string()),
                    alert.target_user,
                    alert.priority.to_string(),
                    alert.title,
                    alert.message,
                    now_ts(),
                ],
            )
            .context("Failed to insert alert")?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Alerts addressed to `actor`, newest first
    pub fn list_alerts_for(&self, actor: &Actor, unread_only: bool) -> Result<Vec<SongAlert>> {
        let mut query = format!(
            "SELECT {} FROM song_alerts WHERE {}",
            ALERT_COLUMNS, RECIPIENT_FILTER
        );
        if unread_only {
            query.push_str(" AND is_read = 0");
        }
        query.push_str(" ORDER BY created_at DESC, id DESC");

        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(params![actor.id, department_param(actor)], alert_row)?;

        let mut alerts = Vec::new();
        for row in rows {
            alerts.push(row?);
        }
        Ok(alerts)
    }

    pub fn get_alert(&self, id: i64) -> Result<Option<SongAlert>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM song_alerts WHERE id = ?1", ALERT_COLUMNS),
                params![id],
                alert_row,
            )
            .optional()
            .context("Failed to load alert")
    }

    pub fn mark_alert_read(&self, id: i64) -> Result<()> {
        self.conn
            .execute("UPDATE song_alerts SET is_read = 1 WHERE id = ?1", params![id])
            .context("Failed to mark alert read")?;
        Ok(())
    }

    /// Mark every alert addressed to `actor` read; returns how many changed
    pub fn mark_all_alerts_read(&self, actor: &Actor) -> Result<usize> {
        let changed = self
            .conn
            .execute(
                &format!(
                    "UPDATE song_alerts SET is_read = 1 WHERE is_read = 0 AND {}",
                    RECIPIENT_FILTER
                ),
                params![actor.id, department_param(actor)],
            )
            .context("Failed to mark alerts read")?;
        Ok(changed)
    }

    pub fn unread_alert_count(&self, actor: &Actor) -> Result<i64> {
        self.conn
            .query_row(
                &format!(
                    "SELECT COUNT(*) FROM song_alerts WHERE is_read = 0 AND {}",
                    RECIPIENT_FILTER
                ),
                params![actor.id, department_param(actor)],
                |row| row.get(0),
            )
            .context("Failed to count unread alerts")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertPriority, AlertType};
    use crate::checklist::testing::song;
    use crate::models::{Department, Stage};

    fn alert(song_id: i64, dept: Option<Department>, user: Option<&str>) -> NewAlert {
        NewAlert {
            song_id,
            alert_type: AlertType::StageTransition,
            target_department: dept,
            target_user: user.map(str::to_string),
            priority: AlertPriority::Important,
            title: "New Song".to_string(),
            message: "moved".to_string(),
        }
    }

    #[test]
    fn recipients_by_department_or_user() {
        let db = Database::open_in_memory().unwrap();
        let song_id = db.insert_song(&song(Stage::LabelRecording)).unwrap();
        db.insert_alert(&alert(song_id, Some(Department::Label), None)).unwrap();
        db.insert_alert(&alert(song_id, None, Some("mkt-1"))).unwrap();
        db.insert_alert(&alert(song_id, Some(Department::Digital), None)).unwrap();

        let label = Actor::new("lbl-1", "Lena", 100, Some(Department::Label));
        let marketing = Actor::new("mkt-1", "Mara", 100, Some(Department::Marketing));
        let nobody = Actor::new("ghost", "Ghost", 100, None);

        assert_eq!(db.list_alerts_for(&label, false).unwrap().len(), 1);
        assert_eq!(db.list_alerts_for(&marketing, false).unwrap().len(), 1);
        assert!(db.list_alerts_for(&nobody, false).unwrap().is_empty());

        assert_eq!(db.unread_alert_count(&label).unwrap(), 1);
        assert_eq!(db.mark_all_alerts_read(&label).unwrap(), 1);
        assert_eq!(db.unread_alert_count(&label).unwrap(), 0);
        assert!(db.list_alerts_for(&label, true).unwrap().is_empty());
        assert_eq!(db.unread_alert_count(&marketing).unwrap(), 1);
    }
}
