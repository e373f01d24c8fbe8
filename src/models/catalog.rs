//! Catalog entities that hang off a song (works, recordings, releases)
//!
//! The workflow only reads these; validators inspect them through
//! [`SongContext`], a snapshot loaded once per checklist evaluation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Song;
use crate::assets::SongAsset;

/// Which kind of object a split belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SplitScope {
    Work,
    Recording,
}

impl std::fmt::Display for SplitScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SplitScope::Work => write!(f, "work"),
            SplitScope::Recording => write!(f, "recording"),
        }
    }
}

impl std::str::FromStr for SplitScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "work" => Ok(SplitScope::Work),
            "recording" => Ok(SplitScope::Recording),
            _ => Err(format!("Invalid split scope: {}. Use: work, recording", s)),
        }
    }
}

/// Right type a split share is expressed for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RightType {
    Writer,
    Publisher,
    Master,
}

impl std::fmt::Display for RightType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RightType::Writer => write!(f, "writer"),
            RightType::Publisher => write!(f, "publisher"),
            RightType::Master => write!(f, "master"),
        }
    }
}

impl std::str::FromStr for RightType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "writer" => Ok(RightType::Writer),
            "publisher" => Ok(RightType::Publisher),
            "master" => Ok(RightType::Master),
            _ => Err(format!("Invalid right type: {}. Use: writer, publisher, master", s)),
        }
    }
}

impl RightType {
    /// The kind of object this right is split on
    pub fn scope(&self) -> SplitScope {
        match self {
            RightType::Writer | RightType::Publisher => SplitScope::Work,
            RightType::Master => SplitScope::Recording,
        }
    }
}

/// A musical work (composition)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Work {
    pub id: i64,
    pub title: String,
    pub iswc: Option<String>,
}

/// A share of rights held by one party
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Split {
    pub id: i64,
    pub scope: SplitScope,
    pub object_id: i64,
    pub right_type: RightType,
    pub party: String,
    pub share: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recording {
    pub id: i64,
    pub song_id: i64,
    pub title: String,
    pub isrc: Option<String>,
    pub master_audio: Option<String>,
    pub instrumental_audio: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credit {
    pub id: i64,
    pub recording_id: i64,
    pub party: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Release {
    pub id: i64,
    pub song_id: i64,
    pub title: String,
    pub release_type: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub upc: Option<String>,
}

/// A release's listing on one distribution platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Publication {
    pub id: i64,
    pub release_id: i64,
    pub platform: String,
    pub url: Option<String>,
}

/// Fields supplied when adding a recording to a song
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewRecording {
    pub title: String,
    #[serde(default)]
    pub isrc: Option<String>,
    #[serde(default)]
    pub master_audio: Option<String>,
    #[serde(default)]
    pub instrumental_audio: Option<String>,
}

/// Fields supplied when adding a release to a song
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewRelease {
    pub title: String,
    #[serde(default)]
    pub release_type: Option<String>,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub upc: Option<String>,
}

/// A recording together with its credits and master splits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordingBundle {
    pub recording: Recording,
    pub credits: Vec<Credit>,
    pub splits: Vec<Split>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleaseBundle {
    pub release: Release,
    pub publications: Vec<Publication>,
}

/// Everything the validators may look at for one song
#[derive(Debug, Clone)]
pub struct SongContext {
    pub song: Song,
    pub work: Option<Work>,
    pub work_splits: Vec<Split>,
    /// Ordered by creation; the first entry is the primary recording
    pub recordings: Vec<RecordingBundle>,
    /// Ordered by creation; the first entry is the primary release
    pub releases: Vec<ReleaseBundle>,
    pub assets: Vec<SongAsset>,
}

impl SongContext {
    pub fn primary_recording(&self) -> Option<&RecordingBundle> {
        self.recordings.first()
    }

    pub fn primary_release(&self) -> Option<&ReleaseBundle> {
        self.releases.first()
    }

    /// Splits of the given right type on the song's work
    pub fn work_splits_of(&self, right_type: RightType) -> Vec<&Split> {
        self.work_splits
            .iter()
            .filter(|s| s.right_type == right_type)
            .collect()
    }
}
