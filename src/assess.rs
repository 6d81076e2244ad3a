//! Playlist quality metrics.
//!
//! The assessor never fails on a partially invalid list: IDs are cleaned
//! up leniently (agent callers wrap them in quotes, backticks or prose),
//! unresolvable ones become warnings, and the report is computed over
//! whatever remains.

use crate::error::{Error, Result};
use crate::gateway::MusicBackend;
use crate::track::Track;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::Serialize;

/// Length of the backend's hexadecimal track identifiers.
pub const TRACK_ID_HEX_LEN: usize = 32;

/// An artist claiming more than this share of a list trips the
/// repetition warning.
pub const REPETITION_WARNING_SHARE: f64 = 0.3;

lazy_static! {
    static ref HEX_ID: Regex =
        Regex::new(&format!("[0-9a-fA-F]{{{TRACK_ID_HEX_LEN}}}")).unwrap();
}

/// The artist appearing most often in the assessed list.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RepetitionStat {
    pub name: String,
    pub count: usize,
    /// True when `count` exceeds [`REPETITION_WARNING_SHARE`] of the list.
    pub warning: bool,
}

/// Diversity/repetition metrics over a candidate or finalized list.
/// Computed on demand, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub total_tracks: usize,
    pub unique_artists: usize,
    pub most_repetitive_artist: RepetitionStat,
    /// `unique_artists / total_tracks`, rounded to 2 decimals.
    pub diversity_score: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Strips noise from a caller-supplied track ID: surrounding whitespace,
/// quotes and backticks, and - when the ID is embedded in other text - the
/// first [`TRACK_ID_HEX_LEN`]-character hex run found inside it.
#[must_use]
pub fn sanitize_track_id(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches(|c| matches!(c, '`' | '\'' | '"'));
    if let Some(found) = HEX_ID.find(trimmed) {
        return found.as_str().to_string();
    }
    trimmed.to_string()
}

/// Quality assessment over a borrowed backend session.
pub struct QualityAssessor<'a> {
    backend: &'a dyn MusicBackend,
}

impl<'a> QualityAssessor<'a> {
    #[must_use]
    pub fn new(backend: &'a dyn MusicBackend) -> Self {
        Self { backend }
    }

    /// Resolves each ID and computes the report over the valid tracks.
    ///
    /// # Errors
    ///
    /// [`Error::NoValidTracks`] when nothing resolves; any partially
    /// valid input produces a report.
    pub fn assess(&self, track_ids: &[String]) -> Result<QualityReport> {
        let mut tracks: Vec<Track> = Vec::with_capacity(track_ids.len());
        let mut warnings = Vec::new();

        for raw_id in track_ids {
            let id = sanitize_track_id(raw_id);
            match self.backend.song(&id) {
                Ok(Some(record)) => match Track::from_raw(&record) {
                    Some(track) => tracks.push(track),
                    None => warnings.push(id.clone()),
                },
                Ok(None) => {
                    debug!("id {id} did not resolve");
                    warnings.push(id.clone());
                }
                Err(err) => {
                    debug!("lookup for {id} failed: {err}");
                    warnings.push(id.clone());
                }
            }
        }

        if tracks.is_empty() {
            return Err(Error::NoValidTracks);
        }
        Ok(report_over(&tracks, warnings))
    }
}

/// Builds the report for an already-resolved track list.
#[must_use]
pub fn report_over(tracks: &[Track], warnings: Vec<String>) -> QualityReport {
    // First-appearance order so ties resolve deterministically.
    let mut counts: Vec<(String, usize)> = Vec::new();
    for track in tracks {
        match counts.iter_mut().find(|(name, _)| *name == track.artist) {
            Some((_, count)) => *count += 1,
            None => counts.push((track.artist.clone(), 1)),
        }
    }

    let total = tracks.len();
    let unique = counts.len();
    let (top_name, top_count) = counts
        .iter()
        .max_by_key(|(_, count)| *count)
        .cloned()
        .unwrap_or_else(|| ("None".to_string(), 0));

    QualityReport {
        total_tracks: total,
        unique_artists: unique,
        most_repetitive_artist: RepetitionStat {
            name: top_name,
            count: top_count,
            warning: top_count as f64 > total as f64 * REPETITION_WARNING_SHARE,
        },
        diversity_score: round2(unique as f64 / total as f64),
        warnings,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{song, StaticBackend};

    fn hex_id(digit: char) -> String {
        std::iter::repeat(digit).take(TRACK_ID_HEX_LEN).collect()
    }

    #[test]
    fn test_sanitize_strips_quotes_and_whitespace() {
        let id = hex_id('1');
        assert_eq!(sanitize_track_id(&format!(" `{id}` ")), id);
        assert_eq!(sanitize_track_id(&format!("'{id}'")), id);
        assert_eq!(sanitize_track_id(&format!("\"{id}\"")), id);
    }

    #[test]
    fn test_sanitize_extracts_embedded_hex_id() {
        let id = hex_id('a');
        assert_eq!(sanitize_track_id(&format!("track id: {id} (from above)")), id);
    }

    #[test]
    fn test_sanitize_passes_short_ids_through() {
        assert_eq!(sanitize_track_id(" plain-id "), "plain-id");
    }

    #[test]
    fn test_metrics_for_a_a_b() {
        let mut backend = StaticBackend::new();
        backend.catalog = vec![
            song("s1", "One", "Artist A"),
            song("s2", "Two", "Artist A"),
            song("s3", "Three", "Artist B"),
        ];

        let report = QualityAssessor::new(&backend)
            .assess(&["s1".to_string(), "s2".to_string(), "s3".to_string()])
            .unwrap();

        assert_eq!(report.total_tracks, 3);
        assert_eq!(report.unique_artists, 2);
        assert_eq!(report.most_repetitive_artist.name, "Artist A");
        assert_eq!(report.most_repetitive_artist.count, 2);
        assert_eq!(report.diversity_score, 0.67);
        // 2 of 3 is above the 30% share.
        assert!(report.most_repetitive_artist.warning);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_ghost_ids_become_warnings_not_failures() {
        let mut backend = StaticBackend::new();
        backend.catalog = vec![song("s1", "One", "Valid Artist"), song("s2", "Two", "Valid Artist")];

        let report = QualityAssessor::new(&backend)
            .assess(&["s1".to_string(), "ghost".to_string(), "s2".to_string()])
            .unwrap();

        assert_eq!(report.total_tracks, 2);
        assert_eq!(report.diversity_score, 0.5);
        assert_eq!(report.warnings, vec!["ghost".to_string()]);
    }

    #[test]
    fn test_dirty_ids_resolve_after_sanitization() {
        let id1 = hex_id('1');
        let id2 = hex_id('2');
        let mut backend = StaticBackend::new();
        backend.catalog = vec![song(&id1, "One", "A"), song(&id2, "Two", "B")];

        let report = QualityAssessor::new(&backend)
            .assess(&[format!(" `{id1}` "), format!("'{id2}'")])
            .unwrap();
        assert_eq!(report.total_tracks, 2);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_all_invalid_is_an_error() {
        let backend = StaticBackend::new();
        let err = QualityAssessor::new(&backend)
            .assess(&["ghost1".to_string(), "ghost2".to_string()])
            .unwrap_err();
        assert!(matches!(err, Error::NoValidTracks));
    }

    #[test]
    fn test_no_warning_below_share() {
        let mut backend = StaticBackend::new();
        backend.catalog = vec![
            song("s1", "One", "A"),
            song("s2", "Two", "B"),
            song("s3", "Three", "C"),
            song("s4", "Four", "D"),
        ];
        let report = QualityAssessor::new(&backend)
            .assess(&["s1", "s2", "s3", "s4"].map(String::from))
            .unwrap();
        assert_eq!(report.diversity_score, 1.0);
        assert!(!report.most_repetitive_artist.warning);
    }
}
