//! Field-level redaction of song responses
//!
//! Responses are serialized to JSON first and then pruned according to
//! [`FIELD_POLICY`]. Access is decided once per response, not per field.

use serde_json::Value;

use super::{user_can_edit_song, user_can_view_splits};
use crate::models::{Actor, Song};

/// Who may see a guarded field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccess {
    /// Rights split data
    Splits,
    /// Internal notes, visible to those who can edit the song
    Editors,
}

/// Guarded field paths; `*` matches every element of an array
pub const FIELD_POLICY: &[(&str, FieldAccess)] = &[
    ("work_splits", FieldAccess::Splits),
    ("recordings.*.splits", FieldAccess::Splits),
    ("song.internal_notes", FieldAccess::Editors),
    ("notes.*.pitched_to", FieldAccess::Editors),
];

/// Access classes resolved for one actor and song
#[derive(Debug, Clone, Copy)]
pub struct FieldGrants {
    pub splits: bool,
    pub editors: bool,
}

impl FieldGrants {
    pub fn resolve(actor: &Actor, song: &Song) -> Self {
        Self {
            splits: user_can_view_splits(actor, song),
            editors: user_can_edit_song(actor, song),
        }
    }

    fn allows(&self, access: FieldAccess) -> bool {
        match access {
            FieldAccess::Splits => self.splits,
            FieldAccess::Editors => self.editors,
        }
    }
}

/// Remove every field the actor may not see
pub fn redact(value: &mut Value, actor: &Actor, song: &Song) {
    apply_policy(value, FieldGrants::resolve(actor, song));
}

pub fn apply_policy(value: &mut Value, grants: FieldGrants) {
    for (path, access) in FIELD_POLICY {
        if !grants.allows(*access) {
            let segments: Vec<&str> = path.split('.').collect();
            remove_path(value, &segments);
        }
    }
}

fn remove_path(value: &mut Value, segments: &[&str]) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };

    if *head == "*" {
        if let Value::Array(items) = value {
            for item in items {
                remove_path(item, rest);
            }
        }
        return;
    }

    if let Value::Object(map) = value {
        if rest.is_empty() {
            map.remove(*head);
        } else if let Some(child) = map.get_mut(*head) {
            remove_path(child, rest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detail() -> Value {
        json!({
            "song": {"title": "Night Drive", "internal_notes": "advance pending"},
            "work_splits": [{"party": "A", "share": "100"}],
            "recordings": [
                {"recording": {"title": "Master"}, "splits": [{"party": "L", "share": "100"}]},
                {"recording": {"title": "Radio edit"}, "splits": []}
            ],
            "notes": [{"body": "pitched", "pitched_to": "Sync agency"}]
        })
    }

    #[test]
    fn removes_split_fields_without_split_access() {
        let mut value = detail();
        apply_policy(
            &mut value,
            FieldGrants {
                splits: false,
                editors: true,
            },
        );
        assert!(value.get("work_splits").is_none());
        for rec in value["recordings"].as_array().unwrap() {
            assert!(rec.get("splits").is_none());
            assert!(rec.get("recording").is_some());
        }
        assert_eq!(value["song"]["internal_notes"], "advance pending");
    }

    #[test]
    fn removes_internal_notes_for_non_editors() {
        let mut value = detail();
        apply_policy(
            &mut value,
            FieldGrants {
                splits: true,
                editors: false,
            },
        );
        assert!(value["song"].get("internal_notes").is_none());
        assert!(value["notes"][0].get("pitched_to").is_none());
        assert!(value.get("work_splits").is_some());
    }

    #[test]
    fn missing_paths_are_ignored() {
        let mut value = json!({"song": {"title": "x"}});
        apply_policy(
            &mut value,
            FieldGrants {
                splits: false,
                editors: false,
            },
        );
        assert_eq!(value, json!({"song": {"title": "x"}}));
    }
}
