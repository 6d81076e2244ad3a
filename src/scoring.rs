//! Listening-quality score.
//!
//! Maps a track's explicit feedback signals (0-5 star rating, heart flag)
//! to one integer used for ranking. The two signals are independent and
//! additive: rating contributes its face value, a heart contributes a flat
//! bonus. A track with no opinion at all gets a neutral prior sitting
//! *above* a low explicit rating - a user who rated something 1-2 stars
//! has said more than a user who said nothing.

use crate::track::Track;

/// Score for a track with no rating and no heart.
pub const NEUTRAL_SCORE: u32 = 3;

/// Flat bonus a heart/star flag adds on top of the rating.
pub const STARRED_BONUS: u32 = 5;

/// Computes the smart score for a track. Pure and total; the result is
/// always in `0..=10`.
#[must_use]
pub fn smart_score(track: &Track) -> u32 {
    if track.rating == 0 && !track.starred {
        return NEUTRAL_SCORE;
    }
    u32::from(track.rating) + if track.starred { STARRED_BONUS } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(rating: u8, starred: bool) -> Track {
        Track {
            rating,
            starred,
            ..Track::from_raw(&serde_json::json!({"id": "t"})).unwrap()
        }
    }

    #[test]
    fn test_neutral_prior() {
        assert_eq!(smart_score(&track(0, false)), 3);
    }

    #[test]
    fn test_rating_is_face_value() {
        assert_eq!(smart_score(&track(1, false)), 1);
        assert_eq!(smart_score(&track(2, false)), 2);
        assert_eq!(smart_score(&track(3, false)), 3);
        assert_eq!(smart_score(&track(4, false)), 4);
    }

    #[test]
    fn test_heart_only() {
        assert_eq!(smart_score(&track(0, true)), 5);
    }

    #[test]
    fn test_combined_signals_are_additive() {
        assert_eq!(smart_score(&track(4, true)), 9);
        assert_eq!(smart_score(&track(1, true)), 6);
    }

    #[test]
    fn test_maximum() {
        assert_eq!(smart_score(&track(5, true)), 10);
    }

    #[test]
    fn test_low_rating_scores_below_neutral() {
        assert!(smart_score(&track(1, false)) < NEUTRAL_SCORE);
        assert!(smart_score(&track(2, false)) < NEUTRAL_SCORE);
    }

    #[test]
    fn test_range_and_monotonicity() {
        for rating in 0..=5u8 {
            for starred in [false, true] {
                assert!(smart_score(&track(rating, starred)) <= 10);
            }
        }
        // Non-decreasing in rating once an opinion is expressed.
        for starred in [false, true] {
            for rating in 2..=5u8 {
                assert!(smart_score(&track(rating, starred)) >= smart_score(&track(rating - 1, starred)));
            }
        }
        // Heart is worth exactly the flat bonus at equal expressed rating.
        for rating in 1..=5u8 {
            assert_eq!(
                smart_score(&track(rating, true)) - smart_score(&track(rating, false)),
                STARRED_BONUS
            );
        }
    }
}
