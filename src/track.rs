//! Canonical track shape and defensive normalization.
//!
//! Backend song records are loosely shaped: numeric fields go missing,
//! album titles appear under three different keys depending on server
//! version, and `starred` is a presence marker rather than a boolean.
//! Everything downstream of the gateway works on [`Track`], built here
//! through explicit field-mapping tables so the fallback keys live in one
//! place instead of being sprinkled through every harvesting loop.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel for tracks the backend has never seen played.
pub const NEVER_PLAYED: &str = "Never";

/// Genre assigned when the backend reports none.
pub const UNKNOWN_GENRE: &str = "Unknown";

/// Album title assigned when no title key resolves.
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

// Fallback key tables, first match wins. Album titles drift the most
// across backend versions.
const TITLE_KEYS: &[&str] = &["title", "name"];
const ALBUM_KEYS: &[&str] = &["album", "albumName"];
const ALBUM_TITLE_KEYS: &[&str] = &["title", "name", "album"];
const GENRE_KEYS: &[&str] = &["genre"];
const PLAY_COUNT_KEYS: &[&str] = &["playCount", "play_count"];
const RATING_KEYS: &[&str] = &["userRating", "rating"];
const LAST_PLAYED_KEYS: &[&str] = &["played", "lastPlayed"];

/// Normalized track record. `id` is the sole identity key: two tracks with
/// equal `id` are the same track regardless of every other field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: Option<i32>,
    pub genre: String,
    /// Seconds.
    pub duration: u32,
    /// 0 means unknown.
    pub bpm: u32,
    pub play_count: u64,
    /// ISO-8601 timestamp or [`NEVER_PLAYED`].
    pub last_played: String,
    pub starred: bool,
    /// 0-5 user rating, 0 meaning unrated.
    pub rating: u8,
    pub comment: String,
    pub path: String,
}

impl Track {
    /// Normalizes a raw backend song record.
    ///
    /// Returns `None` when the record has no `id`; such records cannot
    /// participate in dedup or mutation and are dropped upstream. Every
    /// other field tolerates absence.
    #[must_use]
    pub fn from_raw(raw: &Value) -> Option<Self> {
        let id = str_field(raw, &["id"])?;

        Some(Self {
            id,
            title: str_field(raw, TITLE_KEYS).unwrap_or_default(),
            artist: str_field(raw, &["artist"]).unwrap_or_default(),
            album: str_field(raw, ALBUM_KEYS).unwrap_or_default(),
            year: int_field(raw, &["year"]).map(|y| y as i32),
            genre: str_field(raw, GENRE_KEYS).unwrap_or_else(|| UNKNOWN_GENRE.to_string()),
            duration: int_field(raw, &["duration"]).map_or(0, clamp_u32),
            bpm: int_field(raw, &["bpm"]).map_or(0, clamp_u32),
            play_count: int_field(raw, PLAY_COUNT_KEYS).map_or(0, |n| n.max(0) as u64),
            last_played: str_field(raw, LAST_PLAYED_KEYS)
                .unwrap_or_else(|| NEVER_PLAYED.to_string()),
            // Presence of the key is the signal; Navidrome fills it with a
            // timestamp, other servers with `true`.
            starred: raw.get("starred").is_some(),
            rating: int_field(raw, RATING_KEYS).map_or(0, |n| n.clamp(0, 5) as u8),
            comment: str_field(raw, &["comment"]).unwrap_or_default(),
            path: str_field(raw, &["path"]).unwrap_or_default(),
        })
    }

    /// Whether the backend has ever recorded a play.
    #[must_use]
    pub fn never_played(&self) -> bool {
        self.last_played == NEVER_PLAYED
    }

    /// Days since the last recorded play, `None` when never played or the
    /// timestamp does not parse.
    #[must_use]
    pub fn days_since_played(&self, now: DateTime<Utc>) -> Option<i64> {
        days_since(&self.last_played, now)
    }
}

/// Directory listings mix tracks with sub-directory entries; only the
/// former are candidates.
#[must_use]
pub fn is_directory(raw: &Value) -> bool {
    raw.get("isDir").and_then(Value::as_bool).unwrap_or(false)
}

/// Album display title with fallback keys (`title`, `name`, `album`).
#[must_use]
pub fn album_title(raw: &Value) -> String {
    str_field(raw, ALBUM_TITLE_KEYS).unwrap_or_else(|| UNKNOWN_ALBUM.to_string())
}

/// Genre record name; backends disagree on `value` vs `name`.
#[must_use]
pub fn genre_name(raw: &Value) -> Option<String> {
    str_field(raw, &["value", "name"])
}

/// Days between an ISO-8601 timestamp (trailing `Z` tolerated) and `now`.
#[must_use]
pub fn days_since(timestamp: &str, now: DateTime<Utc>) -> Option<i64> {
    if timestamp == NEVER_PLAYED || timestamp.is_empty() {
        return None;
    }
    let trimmed = timestamp.trim_end_matches('Z');
    let parsed = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()?;
    Some(
        now.signed_duration_since(Utc.from_utc_datetime(&parsed))
            .num_days(),
    )
}

/// First string value found under any of `keys`. Numbers are accepted and
/// stringified because some servers emit numeric years/ids as strings and
/// vice versa.
pub(crate) fn str_field(raw: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match raw.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// First integer value found under any of `keys`; numeric strings count.
pub(crate) fn int_field(raw: &Value, keys: &[&str]) -> Option<i64> {
    for key in keys {
        match raw.get(key) {
            Some(Value::Number(n)) => {
                if let Some(v) = n.as_i64() {
                    return Some(v);
                }
                if let Some(v) = n.as_f64() {
                    return Some(v as i64);
                }
            }
            Some(Value::String(s)) => {
                if let Ok(v) = s.parse::<i64>() {
                    return Some(v);
                }
            }
            _ => {}
        }
    }
    None
}

fn clamp_u32(n: i64) -> u32 {
    n.clamp(0, i64::from(u32::MAX)) as u32
}
