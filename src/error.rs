//! Crate-wide error type.
//!
//! Component boundaries return typed variants instead of strings; the
//! tool-adapter layer sitting on top of this crate is expected to flatten
//! them into its "always return something parseable" text contract.

use thiserror::Error;

/// Errors surfaced by the curation engine.
///
/// Per-item failures inside harvesting loops never show up here; those are
/// swallowed into the `issues` list carried next to partial results. This
/// enum is for whole-operation outcomes the caller must react to.
#[derive(Debug, Error)]
pub enum Error {
    /// A backend request failed outright (connection refused, HTTP error,
    /// malformed envelope). Carries the gateway's own description.
    #[error("backend request failed: {0}")]
    Backend(String),

    /// An unrecognized harvesting mode name was requested.
    #[error("unknown harvest mode '{0}'")]
    UnknownMode(String),

    /// Strict filtering (mood or BPM bound active) eliminated every
    /// candidate. Distinguishable from a legitimately empty pool so an
    /// agent caller can relax constraints and retry.
    #[error("0 matches found under strict constraints (modes: {modes}, limit {limit}); relax mood, BPM or genre filters and retry")]
    NoMatches { modes: String, limit: usize },

    /// A mutation was requested without any track IDs to submit.
    #[error("track_ids required for {0}")]
    MissingTrackIds(&'static str),

    /// Every supplied track ID turned out to be a ghost.
    #[error("none of the supplied track ids resolve against the backend")]
    NoValidTracks,

    /// Configuration could not be assembled (missing credentials etc.).
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_matches_message_names_the_condition() {
        let err = Error::NoMatches {
            modes: "top_rated".to_string(),
            limit: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("0 matches found"));
        assert!(msg.contains("top_rated"));
    }

    #[test]
    fn test_backend_error_carries_detail() {
        let err = Error::Backend("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }
}
