//! Validation rules for checklist items
//!
//! Every rule is evaluated against a [`SongContext`] snapshot, so validators
//! never touch the database themselves.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ChecklistItem;
use crate::assets::{AssetType, ReviewStatus};
use crate::models::{RightType, SongContext, Split};
use crate::workflow::WorkflowError;

/// Entity a rule inspects
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Song,
    Work,
    Recording,
    Release,
}

/// Fields that `auto_field_exists` can check
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Artist,
    Genre,
    Language,
    TargetReleaseDate,
    Iswc,
    Isrc,
    MasterAudio,
    InstrumentalAudio,
    ReleaseType,
    ReleaseDate,
    Upc,
}

/// Related collections that `auto_count_minimum` can count
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    WorkWriters,
    RecordingCredits,
    ReleasePublications,
}

/// Named checks for `auto_custom` items
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CustomCheck {
    ValidateCoverArtwork,
    CoverArtworkApproved,
    ValidateReleaseMetadata,
}

const DEFAULT_ARTWORK_SIZE: u32 = 3000;
const ARTWORK_FORMATS: [&str; 3] = ["jpg", "jpeg", "png"];

fn default_min_count() -> u32 {
    1
}

/// How an item's completion is determined
///
/// Stored as a `validation_type` column plus a JSON object holding the
/// remaining parameters (see [`ValidationRule::to_parts`]).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationRule {
    Manual,
    AutoEntityExists {
        entity: Entity,
    },
    AutoFieldExists {
        entity: Entity,
        field: Field,
    },
    AutoSplitValidated {
        entity: Entity,
        split_type: RightType,
        #[serde(default)]
        skip_if_empty: bool,
    },
    AutoCountMinimum {
        collection: Collection,
        #[serde(default = "default_min_count")]
        min_count: u32,
    },
    AutoFileExists {
        asset_type: AssetType,
    },
    AutoCustom {
        function: CustomCheck,
        #[serde(default)]
        min_width: Option<u32>,
        #[serde(default)]
        min_height: Option<u32>,
    },
}

impl ValidationRule {
    pub fn is_manual(&self) -> bool {
        matches!(self, ValidationRule::Manual)
    }

    pub fn validation_type(&self) -> &'static str {
        match self {
            ValidationRule::Manual => "manual",
            ValidationRule::AutoEntityExists { .. } => "auto_entity_exists",
            ValidationRule::AutoFieldExists { .. } => "auto_field_exists",
            ValidationRule::AutoSplitValidated { .. } => "auto_split_validated",
            ValidationRule::AutoCountMinimum { .. } => "auto_count_minimum",
            ValidationRule::AutoFileExists { .. } => "auto_file_exists",
            ValidationRule::AutoCustom { .. } => "auto_custom",
        }
    }

    /// Split into the stored `(validation_type, params)` pair
    pub fn to_parts(&self) -> Result<(&'static str, Value), WorkflowError> {
        let mut value = serde_json::to_value(self)
            .map_err(|e| WorkflowError::Configuration(format!("Cannot encode rule: {}", e)))?;
        if let Some(obj) = value.as_object_mut() {
            obj.remove("type");
        }
        Ok((self.validation_type(), value))
    }

    /// Rebuild a rule from its stored form
    pub fn from_parts(validation_type: &str, params: &Value) -> Result<Self, WorkflowError> {
        let mut obj = match params {
            Value::Object(map) => map.clone(),
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(WorkflowError::Configuration(format!(
                    "Validation parameters for {} must be an object, got {}",
                    validation_type, other
                )))
            }
        };
        obj.insert("type".to_string(), Value::String(validation_type.to_string()));

        serde_json::from_value(Value::Object(obj)).map_err(|e| {
            WorkflowError::Configuration(format!(
                "Unknown or malformed validation rule '{}': {}",
                validation_type, e
            ))
        })
    }
}

fn filled(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

fn unsupported(what: &str, entity: Entity, detail: impl std::fmt::Debug) -> WorkflowError {
    WorkflowError::Configuration(format!(
        "{} cannot be applied to {:?} ({:?})",
        what, entity, detail
    ))
}

/// Whether the named field holds a value; `false` when the entity is missing
fn field_exists(ctx: &SongContext, entity: Entity, field: Field) -> Result<bool, WorkflowError> {
    let song = &ctx.song;
    let work = ctx.work.as_ref();
    let recording = ctx.primary_recording().map(|b| &b.recording);
    let release = ctx.primary_release().map(|b| &b.release);

    let present = match (entity, field) {
        (Entity::Song, Field::Title) => Some(filled(Some(&song.title))),
        (Entity::Song, Field::Artist) => Some(filled(song.artist.as_deref())),
        (Entity::Song, Field::Genre) => Some(filled(song.genre.as_deref())),
        (Entity::Song, Field::Language) => Some(filled(song.language.as_deref())),
        (Entity::Song, Field::TargetReleaseDate) => Some(song.target_release_date.is_some()),
        (Entity::Work, Field::Title) => work.map(|w| filled(Some(&w.title))),
        (Entity::Work, Field::Iswc) => work.map(|w| filled(w.iswc.as_deref())),
        (Entity::Recording, Field::Title) => recording.map(|r| filled(Some(&r.title))),
        (Entity::Recording, Field::Isrc) => recording.map(|r| filled(r.isrc.as_deref())),
        (Entity::Recording, Field::MasterAudio) => {
            recording.map(|r| filled(r.master_audio.as_deref()))
        }
        (Entity::Recording, Field::InstrumentalAudio) => {
            recording.map(|r| filled(r.instrumental_audio.as_deref()))
        }
        (Entity::Release, Field::Title) => release.map(|r| filled(Some(&r.title))),
        (Entity::Release, Field::ReleaseType) => release.map(|r| filled(r.release_type.as_deref())),
        (Entity::Release, Field::ReleaseDate) => release.map(|r| r.release_date.is_some()),
        (Entity::Release, Field::Upc) => release.map(|r| filled(r.upc.as_deref())),
        (entity, field) => return Err(unsupported("auto_field_exists", entity, field)),
    };

    Ok(present.unwrap_or(false))
}

fn entity_exists(ctx: &SongContext, entity: Entity) -> Result<bool, WorkflowError> {
    match entity {
        Entity::Work => Ok(ctx.work.is_some()),
        Entity::Recording => Ok(ctx.primary_recording().is_some()),
        Entity::Release => Ok(ctx.primary_release().is_some()),
        Entity::Song => Err(unsupported("auto_entity_exists", entity, "song is always present")),
    }
}

/// Sum of shares for `split_type` on the entity is 100 within 0.01
fn splits_validated(
    ctx: &SongContext,
    entity: Entity,
    split_type: RightType,
    skip_if_empty: bool,
) -> Result<bool, WorkflowError> {
    let splits: Vec<&Split> = match (entity, split_type) {
        (Entity::Work, RightType::Writer | RightType::Publisher) => {
            if ctx.work.is_none() {
                return Ok(false);
            }
            ctx.work_splits_of(split_type)
        }
        (Entity::Recording, RightType::Master) => match ctx.primary_recording() {
            Some(bundle) => bundle
                .splits
                .iter()
                .filter(|s| s.right_type == split_type)
                .collect(),
            None => return Ok(false),
        },
        (entity, split_type) => {
            return Err(unsupported("auto_split_validated", entity, split_type))
        }
    };

    let total: Decimal = splits.iter().map(|s| s.share).sum();
    if skip_if_empty && total.is_zero() {
        return Ok(true);
    }

    Ok((total - Decimal::ONE_HUNDRED).abs() < Decimal::new(1, 2))
}

fn count_minimum(ctx: &SongContext, collection: Collection, min_count: u32) -> bool {
    let count = match collection {
        Collection::WorkWriters => match ctx.work {
            Some(_) => ctx.work_splits_of(RightType::Writer).len(),
            None => return false,
        },
        Collection::RecordingCredits => match ctx.primary_recording() {
            Some(bundle) => bundle.credits.len(),
            None => return false,
        },
        Collection::ReleasePublications => match ctx.primary_release() {
            Some(bundle) => bundle.publications.len(),
            None => return false,
        },
    };
    count >= min_count as usize
}

fn file_exists(ctx: &SongContext, asset_type: AssetType) -> bool {
    ctx.assets
        .iter()
        .any(|a| a.asset_type == asset_type && a.status != ReviewStatus::Rejected)
}

fn cover_artwork_valid(ctx: &SongContext, min_width: u32, min_height: u32) -> bool {
    ctx.assets.iter().any(|a| {
        a.asset_type == AssetType::CoverArt
            && a.status != ReviewStatus::Rejected
            && a
                .extension()
                .is_some_and(|ext| ARTWORK_FORMATS.contains(&ext.as_str()))
            && a.width.unwrap_or(0) >= min_width
            && a.height.unwrap_or(0) >= min_height
    })
}

fn cover_artwork_approved(ctx: &SongContext) -> bool {
    ctx.assets
        .iter()
        .any(|a| a.asset_type == AssetType::CoverArt && a.status == ReviewStatus::Approved)
}

fn release_metadata_complete(ctx: &SongContext) -> bool {
    ctx.primary_release().is_some_and(|bundle| {
        let release = &bundle.release;
        filled(Some(&release.title))
            && filled(release.release_type.as_deref())
            && release.release_date.is_some()
    })
}

/// Evaluate an item's rule; manual items report their stored flag
pub fn run_validation(item: &ChecklistItem, ctx: &SongContext) -> Result<bool, WorkflowError> {
    match item.rule {
        ValidationRule::Manual => Ok(item.is_complete),
        ValidationRule::AutoEntityExists { entity } => entity_exists(ctx, entity),
        ValidationRule::AutoFieldExists { entity, field } => field_exists(ctx, entity, field),
        ValidationRule::AutoSplitValidated {
            entity,
            split_type,
            skip_if_empty,
        } => splits_validated(ctx, entity, split_type, skip_if_empty),
        ValidationRule::AutoCountMinimum {
            collection,
            min_count,
        } => Ok(count_minimum(ctx, collection, min_count)),
        ValidationRule::AutoFileExists { asset_type } => Ok(file_exists(ctx, asset_type)),
        ValidationRule::AutoCustom {
            function,
            min_width,
            min_height,
        } => Ok(match function {
            CustomCheck::ValidateCoverArtwork => cover_artwork_valid(
                ctx,
                min_width.unwrap_or(DEFAULT_ARTWORK_SIZE),
                min_height.unwrap_or(DEFAULT_ARTWORK_SIZE),
            ),
            CustomCheck::CoverArtworkApproved => cover_artwork_approved(ctx),
            CustomCheck::ValidateReleaseMetadata => release_metadata_complete(ctx),
        }),
    }
}
