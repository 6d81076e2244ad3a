//! Candidate filtering and artist diversity.
//!
//! The pipeline order is fixed for reproducibility: dedup, genre include,
//! genre exclude, BPM bounds, shuffle (unless the pool carries a
//! deliberate ranking), round-robin artist selection, truncate. Changing
//! the order changes results, so every stage lives here in one function.

use crate::constraints::ConstraintSet;
use crate::error::{Error, Result};
use crate::track::Track;
use log::debug;
use rand::seq::SliceRandom;
use rand::thread_rng;
use std::collections::HashMap;

/// Policy for tracks with `bpm == 0` under an active BPM bound.
///
/// `true` passes them through: an unknown BPM is a known-unknown, and a
/// bound only rejects tracks it can actually measure. Flipping this
/// constant excludes them instead.
pub const UNKNOWN_BPM_PASSES: bool = true;

/// Applies the full filter pipeline to a harvested pool.
///
/// `preserve_order` marks pools that arrive deliberately ranked (play
/// count, smart score); those skip the shuffle and keep artist iteration
/// in first-appearance order during diversity selection.
///
/// # Errors
///
/// Returns [`Error::NoMatches`] when the constraints are strict (mood or
/// BPM bound active) and nothing survives - the caller is expected to
/// relax and retry rather than treat this as an empty success.
pub fn apply(
    pool: Vec<Track>,
    constraints: &ConstraintSet,
    limit: usize,
    preserve_order: bool,
    modes_label: &str,
) -> Result<Vec<Track>> {
    let before = pool.len();
    let mut kept: Vec<Track> = dedupe_last_wins(pool)
        .into_iter()
        .filter(|t| passes_genres(t, constraints) && passes_bpm(t, constraints))
        .collect();
    debug!(
        "filter pipeline kept {} of {} candidates (strict={})",
        kept.len(),
        before,
        constraints.strict()
    );

    if !preserve_order {
        kept.shuffle(&mut thread_rng());
    }

    let mut selected = match constraints.max_tracks_per_artist {
        Some(cap) => round_robin_select(kept, Some(cap), limit, !preserve_order),
        None => kept,
    };
    selected.truncate(limit);

    if selected.is_empty() && constraints.strict() {
        return Err(Error::NoMatches {
            modes: modes_label.to_string(),
            limit,
        });
    }
    Ok(selected)
}

/// Collapses duplicate IDs. Order follows each ID's first appearance,
/// field values follow its last (last-write-wins).
#[must_use]
pub fn dedupe_last_wins(pool: Vec<Track>) -> Vec<Track> {
    let mut order: Vec<Track> = Vec::with_capacity(pool.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(pool.len());
    for track in pool {
        match index.get(&track.id) {
            Some(&at) => order[at] = track,
            None => {
                index.insert(track.id.clone(), order.len());
                order.push(track);
            }
        }
    }
    order
}

/// Fair round-robin selection across artists.
///
/// Tracks are grouped by artist keeping their pool order; artists are then
/// visited one track per round until `limit` tracks are selected, each
/// artist capped at `per_artist` when set. With `shuffle_artists` the
/// visiting order is random, otherwise it follows each artist's first
/// appearance so ranked pools stay roughly ranked.
#[must_use]
pub fn round_robin_select(
    pool: Vec<Track>,
    per_artist: Option<usize>,
    limit: usize,
    shuffle_artists: bool,
) -> Vec<Track> {
    let mut artists: Vec<String> = Vec::new();
    let mut queues: HashMap<String, Vec<Track>> = HashMap::new();
    for track in pool {
        if !queues.contains_key(&track.artist) {
            artists.push(track.artist.clone());
        }
        queues.entry(track.artist.clone()).or_default().push(track);
    }
    // Pop from the front of each artist queue.
    for queue in queues.values_mut() {
        queue.reverse();
    }

    if shuffle_artists {
        artists.shuffle(&mut thread_rng());
    }

    let mut selected = Vec::with_capacity(limit.min(64));
    let mut taken: HashMap<String, usize> = HashMap::new();
    while selected.len() < limit {
        let mut progressed = false;
        for artist in &artists {
            if selected.len() >= limit {
                break;
            }
            let count = taken.get(artist).copied().unwrap_or(0);
            if per_artist.is_some_and(|cap| count >= cap) {
                continue;
            }
            if let Some(track) = queues.get_mut(artist).and_then(Vec::pop) {
                selected.push(track);
                taken.insert(artist.clone(), count + 1);
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    selected
}

fn passes_genres(track: &Track, constraints: &ConstraintSet) -> bool {
    let genre = track.genre.to_lowercase();
    if !constraints.include_genres.is_empty()
        && !constraints
            .include_genres
            .iter()
            .any(|incl| genre.contains(&incl.to_lowercase()))
    {
        return false;
    }
    !constraints
        .exclude_genres
        .iter()
        .any(|excl| genre.contains(&excl.to_lowercase()))
}

fn passes_bpm(track: &Track, constraints: &ConstraintSet) -> bool {
    if constraints.min_bpm.is_none() && constraints.max_bpm.is_none() {
        return true;
    }
    if track.bpm == 0 {
        return UNKNOWN_BPM_PASSES;
    }
    constraints.min_bpm.map_or(true, |min| track.bpm >= min)
        && constraints.max_bpm.map_or(true, |max| track.bpm <= max)
}
