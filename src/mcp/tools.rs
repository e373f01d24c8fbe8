//! Tool implementations for the JSON-RPC server

use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::str::FromStr;

use crate::assets::{NewAsset, ReviewDecision};
use crate::models::{Actor, NewRecording, NewRelease, NewSong, RightType, SongUpdate, Stage};
use crate::workflow::SongWorkflow;

/// Parameter type in a tool's input schema
#[derive(Debug, Clone, Copy)]
pub(super) enum Param {
    Str,
    Int,
    Bool,
}

impl Param {
    fn schema_type(&self) -> &'static str {
        match self {
            Param::Str => "string",
            Param::Int => "integer",
            Param::Bool => "boolean",
        }
    }
}

pub(super) struct ToolDef {
    name: &'static str,
    description: &'static str,
    /// (name, type, required); `actor` is added to every tool
    params: &'static [(&'static str, Param, bool)],
}

pub(super) const TOOLS: &[ToolDef] = &[
    ToolDef {
        name: "create_song",
        description: "Create a song in draft",
        params: &[
            ("title", Param::Str, true),
            ("artist", Param::Str, false),
            ("genre", Param::Str, false),
            ("language", Param::Str, false),
            ("priority", Param::Str, false),
            ("target_release_date", Param::Str, false),
            ("internal_notes", Param::Str, false),
        ],
    },
    ToolDef {
        name: "get_song",
        description: "Song detail with catalog, assets and notes; fields the actor may not see are omitted",
        params: &[("song_id", Param::Int, true)],
    },
    ToolDef {
        name: "list_songs",
        description: "Songs visible to the actor, optionally in one stage",
        params: &[("stage", Param::Str, false)],
    },
    ToolDef {
        name: "update_song",
        description: "Edit song metadata",
        params: &[
            ("song_id", Param::Int, true),
            ("title", Param::Str, false),
            ("artist", Param::Str, false),
            ("genre", Param::Str, false),
            ("language", Param::Str, false),
            ("priority", Param::Str, false),
            ("target_release_date", Param::Str, false),
            ("stage_deadline", Param::Str, false),
            ("internal_notes", Param::Str, false),
            ("assigned_user", Param::Str, false),
        ],
    },
    ToolDef {
        name: "set_blocked",
        description: "Flag or clear a blocking issue",
        params: &[
            ("song_id", Param::Int, true),
            ("blocked", Param::Bool, true),
            ("reason", Param::Str, false),
        ],
    },
    ToolDef {
        name: "transition",
        description: "Move a song to another stage",
        params: &[
            ("song_id", Param::Int, true),
            ("target_stage", Param::Str, true),
            ("expected_stage", Param::Str, false),
            ("notes", Param::Str, false),
        ],
    },
    ToolDef {
        name: "send_to_digital",
        description: "Hand a ready_for_digital song to the digital team",
        params: &[("song_id", Param::Int, true), ("notes", Param::Str, false)],
    },
    ToolDef {
        name: "archive",
        description: "Archive a song",
        params: &[("song_id", Param::Int, true), ("notes", Param::Str, false)],
    },
    ToolDef {
        name: "history",
        description: "Stage transition history of a song",
        params: &[("song_id", Param::Int, true)],
    },
    ToolDef {
        name: "get_checklist",
        description: "Checklist for the current stage or an earlier one",
        params: &[("song_id", Param::Int, true), ("stage", Param::Str, false)],
    },
    ToolDef {
        name: "toggle_checklist_item",
        description: "Flip a manual checklist item",
        params: &[("item_id", Param::Int, true)],
    },
    ToolDef {
        name: "revalidate_checklist",
        description: "Re-run automatic checklist validators",
        params: &[("song_id", Param::Int, true)],
    },
    ToolDef {
        name: "list_alerts",
        description: "Alerts addressed to the actor",
        params: &[("unread_only", Param::Bool, false)],
    },
    ToolDef {
        name: "mark_alert_read",
        description: "Mark one alert read",
        params: &[("alert_id", Param::Int, true)],
    },
    ToolDef {
        name: "mark_all_alerts_read",
        description: "Mark every alert addressed to the actor read",
        params: &[],
    },
    ToolDef {
        name: "my_queue",
        description: "Songs owned by the actor's department",
        params: &[],
    },
    ToolDef {
        name: "overdue",
        description: "Songs past their stage deadline (managers)",
        params: &[],
    },
    ToolDef {
        name: "stats",
        description: "Song counts by stage and priority",
        params: &[],
    },
    ToolDef {
        name: "upload_asset",
        description: "Submit an asset for review",
        params: &[
            ("song_id", Param::Int, true),
            ("asset_type", Param::Str, true),
            ("location", Param::Str, true),
            ("title", Param::Str, false),
            ("width", Param::Int, false),
            ("height", Param::Int, false),
        ],
    },
    ToolDef {
        name: "review_asset",
        description: "Approve, request changes on, or reject an asset",
        params: &[
            ("asset_id", Param::Str, true),
            ("decision", Param::Str, true),
            ("notes", Param::Str, false),
        ],
    },
    ToolDef {
        name: "add_note",
        description: "Annotate a song; pitched_to records a sales pitch",
        params: &[
            ("song_id", Param::Int, true),
            ("body", Param::Str, true),
            ("pitched_to", Param::Str, false),
        ],
    },
    ToolDef {
        name: "list_notes",
        description: "Notes on a song",
        params: &[("song_id", Param::Int, true)],
    },
    ToolDef {
        name: "create_work",
        description: "Create and link the song's musical work",
        params: &[
            ("song_id", Param::Int, true),
            ("title", Param::Str, true),
            ("iswc", Param::Str, false),
        ],
    },
    ToolDef {
        name: "add_split",
        description: "Record a writer, publisher or master share",
        params: &[
            ("song_id", Param::Int, true),
            ("right_type", Param::Str, true),
            ("party", Param::Str, true),
            ("share", Param::Str, true),
            ("recording_id", Param::Int, false),
        ],
    },
    ToolDef {
        name: "add_recording",
        description: "Add a recording to a song",
        params: &[
            ("song_id", Param::Int, true),
            ("title", Param::Str, true),
            ("isrc", Param::Str, false),
            ("master_audio", Param::Str, false),
            ("instrumental_audio", Param::Str, false),
        ],
    },
    ToolDef {
        name: "add_release",
        description: "Add a release to a song",
        params: &[
            ("song_id", Param::Int, true),
            ("title", Param::Str, true),
            ("release_type", Param::Str, false),
            ("release_date", Param::Str, false),
            ("upc", Param::Str, false),
        ],
    },
];

/// The `tools/list` result
pub(super) fn tool_list() -> Value {
    let tools: Vec<Value> = TOOLS
        .iter()
        .map(|tool| {
            let mut properties = Map::new();
            let mut required = vec![json!("actor")];
            properties.insert(
                "actor".to_string(),
                json!({"type": "string", "description": "Acting user id"}),
            );
            for (name, param, is_required) in tool.params {
                properties.insert(name.to_string(), json!({"type": param.schema_type()}));
                if *is_required {
                    required.push(json!(name));
                }
            }
            json!({
                "name": tool.name,
                "description": tool.description,
                "inputSchema": {
                    "type": "object",
                    "properties": properties,
                    "required": required
                }
            })
        })
        .collect();

    json!({ "tools": tools })
}

fn int_arg(args: &Value, key: &str) -> Result<i64> {
    args[key]
        .as_i64()
        .ok_or_else(|| anyhow!("Missing or invalid '{}' parameter", key))
}

fn str_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args[key]
        .as_str()
        .ok_or_else(|| anyhow!("Missing '{}' parameter", key))
}

fn opt_str(args: &Value, key: &str) -> Option<String> {
    args[key].as_str().map(str::to_string)
}

fn parsed<T: FromStr<Err = String>>(args: &Value, key: &str) -> Result<T> {
    str_arg(args, key)?.parse::<T>().map_err(|e| anyhow!(e))
}

fn opt_parsed<T: FromStr<Err = String>>(args: &Value, key: &str) -> Result<Option<T>> {
    args[key]
        .as_str()
        .map(|s| s.parse::<T>().map_err(|e| anyhow!(e)))
        .transpose()
}

/// Deserialize the tool arguments into a request struct
fn body<T: DeserializeOwned>(args: &Value) -> Result<T> {
    serde_json::from_value(args.clone()).context("Invalid arguments")
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("Failed to serialize result")
}

/// Dispatch a tool call; `Ok(None)` when no tool has that name
pub(super) fn call(
    workflow: &SongWorkflow,
    actor: &Actor,
    name: &str,
    args: &Value,
) -> Result<Option<Value>> {
    let result = match name {
        "create_song" => to_json(&workflow.create_song(actor, body::<NewSong>(args)?)?)?,
        "get_song" => workflow.song_view(actor, int_arg(args, "song_id")?)?,
        "list_songs" => {
            let stage = opt_parsed::<Stage>(args, "stage")?;
            to_json(&workflow.list_songs(actor, stage)?)?
        }
        "update_song" => {
            let update = body::<SongUpdate>(args)?;
            to_json(&workflow.update_song(actor, int_arg(args, "song_id")?, update)?)?
        }
        "set_blocked" => {
            let blocked = args["blocked"]
                .as_bool()
                .ok_or_else(|| anyhow!("Missing or invalid 'blocked' parameter"))?;
            to_json(&workflow.set_blocked(
                actor,
                int_arg(args, "song_id")?,
                blocked,
                opt_str(args, "reason"),
            )?)?
        }
        "transition" => {
            let song_id = int_arg(args, "song_id")?;
            let target = parsed::<Stage>(args, "target_stage")?;
            let notes = opt_str(args, "notes");
            let outcome = match opt_parsed::<Stage>(args, "expected_stage")? {
                Some(expected) => workflow.transition_from(actor, song_id, expected, target, notes)?,
                None => workflow.transition(actor, song_id, target, notes)?,
            };
            to_json(&outcome)?
        }
        "send_to_digital" => to_json(&workflow.send_to_digital(
            actor,
            int_arg(args, "song_id")?,
            opt_str(args, "notes"),
        )?)?,
        "archive" => to_json(&workflow.archive(
            actor,
            int_arg(args, "song_id")?,
            opt_str(args, "notes"),
        )?)?,
        "history" => to_json(&workflow.history(actor, int_arg(args, "song_id")?)?)?,
        "get_checklist" => {
            let stage = opt_parsed::<Stage>(args, "stage")?;
            to_json(&workflow.checklist(actor, int_arg(args, "song_id")?, stage)?)?
        }
        "toggle_checklist_item" => {
            to_json(&workflow.toggle_checklist_item(actor, int_arg(args, "item_id")?)?)?
        }
        "revalidate_checklist" => {
            to_json(&workflow.revalidate_checklist(actor, int_arg(args, "song_id")?)?)?
        }
        "list_alerts" => {
            let unread_only = args["unread_only"].as_bool().unwrap_or(false);
            json!({
                "alerts": workflow.list_alerts(actor, unread_only)?,
                "unread": workflow.unread_alert_count(actor)?,
            })
        }
        "mark_alert_read" => {
            let alert_id = int_arg(args, "alert_id")?;
            workflow.mark_alert_read(actor, alert_id)?;
            json!({ "success": true, "alert_id": alert_id })
        }
        "mark_all_alerts_read" => {
            json!({ "success": true, "marked": workflow.mark_all_alerts_read(actor)? })
        }
        "my_queue" => to_json(&workflow.my_queue(actor)?)?,
        "overdue" => to_json(&workflow.overdue(actor)?)?,
        "stats" => to_json(&workflow.stats(actor)?)?,
        "upload_asset" => {
            let asset = body::<NewAsset>(args)?;
            to_json(&workflow.upload_asset(actor, int_arg(args, "song_id")?, asset)?)?
        }
        "review_asset" => to_json(&workflow.review_asset(
            actor,
            str_arg(args, "asset_id")?,
            parsed::<ReviewDecision>(args, "decision")?,
            opt_str(args, "notes"),
        )?)?,
        "add_note" => to_json(&workflow.add_note(
            actor,
            int_arg(args, "song_id")?,
            str_arg(args, "body")?,
            opt_str(args, "pitched_to"),
        )?)?,
        "list_notes" => to_json(&workflow.notes(actor, int_arg(args, "song_id")?)?)?,
        "create_work" => to_json(&workflow.create_work(
            actor,
            int_arg(args, "song_id")?,
            str_arg(args, "title")?,
            opt_str(args, "iswc"),
        )?)?,
        "add_split" => {
            let share = str_arg(args, "share")?;
            let share = Decimal::from_str(share)
                .with_context(|| format!("Invalid share: {}", share))?;
            to_json(&workflow.add_split(
                actor,
                int_arg(args, "song_id")?,
                parsed::<RightType>(args, "right_type")?,
                str_arg(args, "party")?,
                share,
                args["recording_id"].as_i64(),
            )?)?
        }
        "add_recording" => {
            let new = body::<NewRecording>(args)?;
            to_json(&workflow.add_recording(actor, int_arg(args, "song_id")?, new)?)?
        }
        "add_release" => {
            let new = body::<NewRelease>(args)?;
            to_json(&workflow.add_release(actor, int_arg(args, "song_id")?, new)?)?
        }
        _ => return Ok(None),
    };

    Ok(Some(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_defined_tool_is_dispatched() {
        // An unknown tool name returns Ok(None); a known one never does.
        let db = crate::db::Database::open_in_memory().unwrap();
        let workflow = SongWorkflow::new(db, Default::default());
        let actor = Actor::new("admin", "Admin", crate::models::ADMIN_LEVEL, None);

        for tool in TOOLS {
            let outcome = call(&workflow, &actor, tool.name, &json!({}));
            assert!(
                !matches!(outcome, Ok(None)),
                "{} is listed but not dispatched",
                tool.name
            );
        }
        assert!(matches!(
            call(&workflow, &actor, "drop_tables", &json!({})),
            Ok(None)
        ));
    }

    #[test]
    fn tool_names_are_unique() {
        let mut names: Vec<&str> = TOOLS.iter().map(|t| t.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), TOOLS.len());
    }
}
