//! Input validation for songs and catalog identifiers

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::models::{NewSong, Song, SongUpdate};

const MAX_TITLE_LEN: usize = 200;

static ISWC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^T-?\d{3}\.?\d{3}\.?\d{3}-?\d$").expect("valid ISWC pattern"));
static ISRC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}-?[A-Z0-9]{3}-?\d{2}-?\d{5}$").expect("valid ISRC pattern"));
static UPC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{12,13}$").expect("valid UPC pattern"));

/// ISWC, e.g. `T-123.456.789-0` (separators optional)
pub fn validate_iswc(iswc: &str) -> Result<()> {
    if !ISWC_RE.is_match(iswc.trim()) {
        bail!("ISWC '{}' doesn't match the format T-123.456.789-0", iswc);
    }
    Ok(())
}

/// ISRC, e.g. `USABC2400001` (dashes optional)
pub fn validate_isrc(isrc: &str) -> Result<()> {
    if !ISRC_RE.is_match(isrc.trim()) {
        bail!("ISRC '{}' doesn't match the format CC-XXX-YY-NNNNN", isrc);
    }
    Ok(())
}

/// UPC-A (12 digits) or EAN-13 (13 digits)
pub fn validate_upc(upc: &str) -> Result<()> {
    if !UPC_RE.is_match(upc.trim()) {
        bail!("UPC/EAN '{}' must be 12 or 13 digits", upc);
    }
    Ok(())
}

/// A split share is a percentage in (0, 100]
pub fn validate_share(share: Decimal) -> Result<()> {
    if share <= Decimal::ZERO || share > Decimal::ONE_HUNDRED {
        bail!("Split share {} must be greater than 0 and at most 100", share);
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        bail!("title is required");
    }
    if title.chars().count() > MAX_TITLE_LEN {
        bail!("title is longer than {} characters", MAX_TITLE_LEN);
    }
    Ok(())
}

pub fn validate_new_song(song: &NewSong) -> Result<()> {
    validate_title(&song.title)
}

pub fn validate_song_update(update: &SongUpdate) -> Result<()> {
    if let Some(title) = &update.title {
        validate_title(title)?;
    }
    Ok(())
}

/// Non-blocking warnings about a song's metadata
pub fn lint_song(song: &Song) -> Vec<String> {
    let mut warnings = Vec::new();

    if song.artist.as_deref().map_or(true, |a| a.trim().is_empty()) {
        warnings.push("No artist set".to_string());
    }
    if song.genre.is_none() {
        warnings.push("No genre set".to_string());
    }
    if song.language.is_none() {
        warnings.push("No language set".to_string());
    }
    if song.target_release_date.is_none() && song.stage.is_in_flight() {
        warnings.push("No target release date".to_string());
    }
    if song.is_blocked && song.blocked_reason.as_deref().map_or(true, str::is_empty) {
        warnings.push("Song is blocked without a reason".to_string());
    }
    if song.work_id.is_none() && song.stage > crate::models::Stage::Publishing {
        warnings.push("Song has moved past publishing without a linked work".to_string());
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::testing::song;
    use crate::models::Stage;
    use std::str::FromStr;

    #[test]
    fn identifier_formats() {
        assert!(validate_iswc("T-123.456.789-0").is_ok());
        assert!(validate_iswc("T1234567890").is_ok());
        assert!(validate_iswc("123.456.789").is_err());

        assert!(validate_isrc("USABC2400001").is_ok());
        assert!(validate_isrc("US-ABC-24-00001").is_ok());
        assert!(validate_isrc("usabc2400001").is_err());

        assert!(validate_upc("012345678905").is_ok());
        assert!(validate_upc("4006381333931").is_ok());
        assert!(validate_upc("12345").is_err());
    }

    #[test]
    fn share_bounds() {
        assert!(validate_share(Decimal::from_str("0.01").unwrap()).is_ok());
        assert!(validate_share(Decimal::ONE_HUNDRED).is_ok());
        assert!(validate_share(Decimal::ZERO).is_err());
        assert!(validate_share(Decimal::from_str("100.5").unwrap()).is_err());
    }

    #[test]
    fn titles_must_be_present() {
        let mut new = NewSong {
            title: "  ".to_string(),
            ..Default::default()
        };
        assert!(validate_new_song(&new).is_err());
        new.title = "Night Drive".to_string();
        assert!(validate_new_song(&new).is_ok());
    }

    #[test]
    fn lint_flags_blocked_without_reason() {
        let mut s = song(Stage::LabelRecording);
        s.is_blocked = true;
        let warnings = lint_song(&s);
        assert!(warnings.iter().any(|w| w.contains("blocked")));
        assert!(warnings.iter().any(|w| w.contains("linked work")));
        assert!(warnings.iter().any(|w| w.contains("target release date")));
    }
}
