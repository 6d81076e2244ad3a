//! Filtering constraints and mood resolution.
//!
//! Moods are a small caller-facing vocabulary that expands into concrete
//! BPM bounds and genre exclusions before filtering. Mood-derived values
//! only fill fields the caller left unset; explicit values always win.
//! Genre exclusion lists are appended rather than replaced, so a caller
//! excluding "Jazz" under `relax` still gets the high-intensity set too.

use log::warn;
use serde::{Deserialize, Serialize};

/// BPM ceiling applied by `relax` when the caller set none.
pub const RELAX_MAX_BPM: u32 = 115;

/// BPM floor applied by `energy`/`workout` when the caller set none.
pub const ENERGY_MIN_BPM: u32 = 120;

/// High-intensity genres excluded under `relax`.
pub const RELAX_EXCLUDED_GENRES: &[&str] = &[
    "Metal",
    "Hard Rock",
    "Punk",
    "Industrial",
    "Techno",
    "Drum and Bass",
];

/// Vocal-heavy genres excluded under `focus`.
pub const FOCUS_EXCLUDED_GENRES: &[&str] = &["Pop", "Hip-Hop", "Rap", "Vocal"];

/// Recognized mood labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Relax,
    Energy,
    Focus,
}

impl Mood {
    /// Parses a caller-supplied label. `workout` aliases `energy`.
    /// Unknown labels resolve to `None` and are a no-op upstream.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.to_lowercase().as_str() {
            "relax" => Some(Mood::Relax),
            "energy" | "workout" => Some(Mood::Energy),
            "focus" => Some(Mood::Focus),
            _ => None,
        }
    }
}

/// Candidate filtering constraints, as supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintSet {
    /// Keep only tracks whose genre contains one of these
    /// (case-insensitive substring). Empty means keep all.
    #[serde(default)]
    pub include_genres: Vec<String>,
    /// Drop tracks whose genre contains any of these.
    #[serde(default)]
    pub exclude_genres: Vec<String>,
    /// Inclusive BPM bounds. Tracks with unknown BPM are governed by
    /// [`crate::filter::UNKNOWN_BPM_PASSES`].
    pub min_bpm: Option<u32>,
    pub max_bpm: Option<u32>,
    /// Diversity cap enforced by round-robin selection.
    pub max_tracks_per_artist: Option<usize>,
    /// Mood label, resolved by [`ConstraintSet::resolve_mood`].
    pub mood: Option<String>,
}

impl ConstraintSet {
    /// Expands the mood label (if any) into concrete constraints.
    ///
    /// Returns the effective constraint set; the input survives unchanged
    /// wherever it was explicit. Unknown moods are logged and ignored.
    #[must_use]
    pub fn resolve_mood(mut self) -> Self {
        let Some(label) = self.mood.clone() else {
            return self;
        };
        let Some(mood) = Mood::parse(&label) else {
            warn!("ignoring unknown mood '{label}'");
            return self;
        };

        match mood {
            Mood::Relax => {
                if self.max_bpm.is_none() {
                    self.max_bpm = Some(RELAX_MAX_BPM);
                }
                self.exclude_genres
                    .extend(RELAX_EXCLUDED_GENRES.iter().map(ToString::to_string));
            }
            Mood::Energy => {
                if self.min_bpm.is_none() {
                    self.min_bpm = Some(ENERGY_MIN_BPM);
                }
            }
            Mood::Focus => {
                self.exclude_genres
                    .extend(FOCUS_EXCLUDED_GENRES.iter().map(ToString::to_string));
            }
        }
        self
    }

    /// Whether the set carries any filter that thins the pool, used to
    /// size the harvest over-fetch.
    #[must_use]
    pub fn any_filter(&self) -> bool {
        !self.include_genres.is_empty()
            || !self.exclude_genres.is_empty()
            || self.min_bpm.is_some()
            || self.max_bpm.is_some()
    }

    /// Whether filtering counts as *strict*: a recognized mood or a BPM
    /// bound is active. Strict filtering that yields nothing is reported
    /// as a distinguishable condition instead of an empty list.
    #[must_use]
    pub fn strict(&self) -> bool {
        self.min_bpm.is_some()
            || self.max_bpm.is_some()
            || self
                .mood
                .as_deref()
                .is_some_and(|label| Mood::parse(label).is_some())
    }
}
