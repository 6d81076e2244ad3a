//! Library analysis and lookup helpers.
//!
//! Read-only views over the catalog that the curation workflow leans on:
//! genre composition, pillar artists (also the seed list for the
//! `fallen_pillars` harvest), taste profiling, genre deep dives, batch
//! presence checks and enriched search. None of this mutates anything.

use crate::error::Result;
use crate::gateway::{AlbumCriteria, MusicBackend, SearchLimits};
use crate::track::{album_title, genre_name, int_field, str_field, Track};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Genres listed in a composition report.
pub const COMPOSITION_TOP: usize = 30;

/// Albums sampled per listing when building a taste profile.
pub const TASTE_ALBUM_SAMPLE: usize = 100;

/// Artists / genres / eras kept in a taste profile.
pub const TASTE_TOP_ARTISTS: usize = 50;
pub const TASTE_TOP_GENRES: usize = 20;
pub const TASTE_TOP_ERAS: usize = 3;

/// Albums sampled when exploring one genre.
pub const GENRE_ALBUM_SAMPLE: usize = 500;

/// One genre's share of the library.
#[derive(Debug, Clone, Serialize)]
pub struct GenreStat {
    pub name: String,
    pub song_count: u64,
    pub album_count: u64,
    pub percentage: f64,
}

/// Genre distribution plus library totals.
#[derive(Debug, Clone, Serialize)]
pub struct CompositionReport {
    pub total_songs: u64,
    pub total_albums: u64,
    pub total_genres: usize,
    pub composition: Vec<GenreStat>,
}

/// An artist with a large album footprint; a proxy for canonical
/// presence in the library.
#[derive(Debug, Clone, Serialize)]
pub struct PillarArtist {
    pub name: String,
    pub album_count: u64,
    pub id: String,
}

/// Warm analysis of what the user actually reaches for.
#[derive(Debug, Clone, Serialize)]
pub struct TasteProfile {
    pub top_artists: Vec<String>,
    pub top_genres: Vec<String>,
    /// Decade labels such as `"1970s"`, most common first.
    pub favorite_eras: Vec<String>,
    pub total_albums_analyzed: usize,
}

/// Per-artist album listing inside a genre report.
#[derive(Debug, Clone, Serialize)]
pub struct GenreArtist {
    pub name: String,
    pub album_count: usize,
    pub albums: Vec<String>,
}

/// Deep dive into one genre.
#[derive(Debug, Clone, Serialize)]
pub struct GenreReport {
    pub genre: String,
    pub total_albums_found: usize,
    pub unique_artists: usize,
    pub top_artists: Vec<GenreArtist>,
}

/// One artist/album existence question.
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceQuery {
    pub artist: String,
    pub album: Option<String>,
}

/// Answer to a [`PresenceQuery`]. Per-item backend trouble is captured in
/// `error` instead of failing the batch.
#[derive(Debug, Clone, Serialize)]
pub struct PresenceStatus {
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    pub present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A similar-artist hit. `source` is set when the result came from the
/// genre-peer fallback rather than the backend's similarity data.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarArtist {
    pub id: String,
    pub name: String,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Read-only analysis over a borrowed backend session.
pub struct LibraryAnalyzer<'a> {
    backend: &'a dyn MusicBackend,
}

impl<'a> LibraryAnalyzer<'a> {
    #[must_use]
    pub fn new(backend: &'a dyn MusicBackend) -> Self {
        Self { backend }
    }

    /// Cold analysis: genre distribution sorted by song count.
    pub fn composition(&self) -> Result<CompositionReport> {
        let raws = self.backend.genres()?;
        let mut genres: Vec<(String, u64, u64)> = raws
            .iter()
            .filter_map(|raw| {
                let name = genre_name(raw)?;
                let songs = int_field(raw, &["songCount"]).unwrap_or(0).max(0) as u64;
                let albums = int_field(raw, &["albumCount"]).unwrap_or(0).max(0) as u64;
                Some((name, songs, albums))
            })
            .collect();
        genres.sort_by(|a, b| b.1.cmp(&a.1));

        let total_songs: u64 = genres.iter().map(|g| g.1).sum();
        let total_albums: u64 = genres.iter().map(|g| g.2).sum();
        let composition = genres
            .iter()
            .take(COMPOSITION_TOP)
            .map(|(name, songs, albums)| GenreStat {
                name: name.clone(),
                song_count: *songs,
                album_count: *albums,
                percentage: if total_songs > 0 {
                    round2(*songs as f64 / total_songs as f64 * 100.0)
                } else {
                    0.0
                },
            })
            .collect();

        Ok(CompositionReport {
            total_songs,
            total_albums,
            total_genres: genres.len(),
            composition,
        })
    }

    /// Canonical analysis: artists ranked by album count.
    pub fn pillars(&self, limit: usize) -> Result<Vec<PillarArtist>> {
        pillar_artists(self.backend, limit)
    }

    /// Warm analysis across frequent, newest and starred albums.
    pub fn taste_profile(&self) -> Result<TasteProfile> {
        let mut combined = Vec::new();
        for criteria in [
            AlbumCriteria::Frequent,
            AlbumCriteria::Newest,
            AlbumCriteria::Starred,
        ] {
            combined.extend(self.backend.albums(criteria, TASTE_ALBUM_SAMPLE)?);
        }
        info!("taste profile over {} albums", combined.len());

        let artists: Vec<String> = combined
            .iter()
            .filter_map(|alb| str_field(alb, &["artist"]))
            .collect();
        let genres: Vec<String> = combined
            .iter()
            .filter_map(|alb| str_field(alb, &["genre"]))
            .collect();
        let eras: Vec<String> = combined
            .iter()
            .filter_map(|alb| int_field(alb, &["year"]))
            .filter(|year| *year > 0)
            .map(|year| format!("{}s", year / 10 * 10))
            .collect();

        Ok(TasteProfile {
            top_artists: ranked_names(artists, TASTE_TOP_ARTISTS),
            top_genres: ranked_names(genres, TASTE_TOP_GENRES),
            favorite_eras: ranked_names(eras, TASTE_TOP_ERAS),
            total_albums_analyzed: combined.len(),
        })
    }

    /// Detailed metrics for one genre: artists ranked by album count,
    /// album titles resolved through the fallback key chain.
    pub fn explore_genre(&self, genre: &str, limit: usize) -> Result<GenreReport> {
        let albums = self.backend.albums_by_genre(genre, GENRE_ALBUM_SAMPLE)?;

        let mut artists: Vec<GenreArtist> = Vec::new();
        for raw in &albums {
            let artist = str_field(raw, &["artist"]).unwrap_or_default();
            let title = album_title(raw);
            match artists.iter_mut().find(|a| a.name == artist) {
                Some(entry) => {
                    entry.album_count += 1;
                    entry.albums.push(title);
                }
                None => artists.push(GenreArtist {
                    name: artist,
                    album_count: 1,
                    albums: vec![title],
                }),
            }
        }
        artists.sort_by(|a, b| b.album_count.cmp(&a.album_count));
        let unique_artists = artists.len();
        artists.truncate(limit);

        Ok(GenreReport {
            genre: genre.to_string(),
            total_albums_found: albums.len(),
            unique_artists,
            top_artists: artists,
        })
    }

    /// Checks whether each artist (or artist+album) exists in the
    /// library. Loose case-insensitive matching tolerates "The Wall" vs
    /// "Wall"; per-item failures land in the status instead of aborting
    /// the batch.
    pub fn check_presence(&self, queries: &[PresenceQuery]) -> Vec<PresenceStatus> {
        queries
            .iter()
            .map(|query| {
                let mut status = PresenceStatus {
                    artist: query.artist.clone(),
                    album: query.album.clone(),
                    present: false,
                    error: None,
                };
                match self.probe_presence(query) {
                    Ok(present) => status.present = present,
                    Err(err) => status.error = Some(err.to_string()),
                }
                status
            })
            .collect()
    }

    fn probe_presence(&self, query: &PresenceQuery) -> Result<bool> {
        let artist_lc = query.artist.to_lowercase();
        match &query.album {
            Some(album) => {
                let results = self.backend.search(
                    &format!("\"{}\" \"{album}\"", query.artist),
                    SearchLimits {
                        albums: 5,
                        ..SearchLimits::default()
                    },
                )?;
                let album_lc = album.to_lowercase();
                Ok(results.albums.iter().any(|record| {
                    let rec_artist = str_field(record, &["artist"]).unwrap_or_default();
                    rec_artist.to_lowercase().contains(&artist_lc)
                        && album_title(record).to_lowercase().contains(&album_lc)
                }))
            }
            None => {
                let results = self.backend.search(
                    &format!("\"{}\"", query.artist),
                    SearchLimits {
                        artists: 5,
                        ..SearchLimits::default()
                    },
                )?;
                Ok(results.artists.iter().any(|record| {
                    str_field(record, &["name"])
                        .unwrap_or_default()
                        .to_lowercase()
                        == artist_lc
                }))
            }
        }
    }

    /// Full-metadata song search. When the literal query finds nothing
    /// and contains an ampersand, retries with the ampersand dropped -
    /// backends tokenize "Simon & Garfunkel" unpredictably.
    pub fn search_enriched(&self, query: &str, limit: usize) -> Result<Vec<Track>> {
        let limits = SearchLimits {
            songs: limit,
            ..SearchLimits::default()
        };
        let mut results = self.backend.search(query, limits)?;
        if results.songs.is_empty() && query.contains('&') {
            let fallback: String = query
                .split_whitespace()
                .filter(|word| *word != "&")
                .collect::<Vec<_>>()
                .join(" ");
            debug!("search for '{query}' empty, retrying as '{fallback}'");
            results = self.backend.search(&fallback, limits)?;
        }
        Ok(results.songs.iter().filter_map(Track::from_raw).collect())
    }

    /// Similar artists for a name. Resolution order: search for the
    /// artist, ask the backend for similarity data, and when that is
    /// unsupported or empty fall back to genre peers (ranked by album
    /// count, tagged `source: "genre_fallback"`).
    pub fn similar_artists(&self, artist_name: &str, count: usize) -> Result<Vec<SimilarArtist>> {
        let results = self.backend.search(
            artist_name,
            SearchLimits {
                artists: 5,
                ..SearchLimits::default()
            },
        )?;
        let Some(artist) = results.artists.first() else {
            return Ok(Vec::new());
        };
        let artist_id = str_field(artist, &["id"]).unwrap_or_default();
        let resolved_name = str_field(artist, &["name"]).unwrap_or_default();

        match self.backend.similar_artists(&artist_id, count) {
            Ok(raws) if !raws.is_empty() => Ok(raws
                .iter()
                .filter_map(|raw| {
                    Some(SimilarArtist {
                        id: str_field(raw, &["id"])?,
                        name: str_field(raw, &["name"]).unwrap_or_default(),
                        match_score: raw.get("match").and_then(Value::as_f64),
                        source: None,
                    })
                })
                .collect()),
            Ok(_) | Err(_) => self.genre_peers(artist, &resolved_name, count),
        }
    }

    /// Tracks similar to a seed track, normalized.
    pub fn similar_songs(&self, song_id: &str, count: usize) -> Result<Vec<Track>> {
        let raws = self.backend.similar_songs(song_id, count)?;
        Ok(raws.iter().filter_map(Track::from_raw).collect())
    }

    /// Genre-peer fallback for similarity: other artists working the
    /// same genre, heaviest album footprint first.
    fn genre_peers(
        &self,
        artist: &Value,
        exclude_name: &str,
        count: usize,
    ) -> Result<Vec<SimilarArtist>> {
        let Some(genre) = str_field(artist, &["genre"]) else {
            return Ok(Vec::new());
        };
        debug!("similarity unavailable, falling back to '{genre}' peers");
        let report = self.explore_genre(&genre, count + 1)?;
        Ok(report
            .top_artists
            .into_iter()
            .filter(|peer| peer.name != exclude_name)
            .take(count)
            .map(|peer| SimilarArtist {
                id: String::new(),
                name: peer.name,
                match_score: None,
                source: Some("genre_fallback".to_string()),
            })
            .collect())
    }
}

/// Artists ranked by album count, highest first. Shared with the
/// `fallen_pillars` harvesting strategy.
pub fn pillar_artists(backend: &dyn MusicBackend, limit: usize) -> Result<Vec<PillarArtist>> {
    let mut pillars: Vec<PillarArtist> = backend
        .artists()?
        .iter()
        .filter_map(|raw| {
            Some(PillarArtist {
                name: str_field(raw, &["name"])?,
                album_count: int_field(raw, &["albumCount"]).unwrap_or(0).max(0) as u64,
                id: str_field(raw, &["id"]).unwrap_or_default(),
            })
        })
        .collect();
    pillars.sort_by(|a, b| b.album_count.cmp(&a.album_count));
    pillars.truncate(limit);
    Ok(pillars)
}

/// Names ranked by frequency (stable on ties), truncated to `limit`.
fn ranked_names(names: Vec<String>, limit: usize) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for name in names {
        match counts.iter_mut().find(|(n, _)| *n == name) {
            Some((_, count)) => *count += 1,
            None => counts.push((name, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(limit).map(|(name, _)| name).collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{song, StaticBackend};
    use serde_json::json;

    #[test]
    fn test_composition_sorts_and_totals() {
        let mut backend = StaticBackend::new();
        backend.genres = vec![
            json!({"value": "Rock", "songCount": 10, "albumCount": 2}),
            json!({"value": "Jazz", "songCount": 50, "albumCount": 5}),
        ];

        let report = LibraryAnalyzer::new(&backend).composition().unwrap();
        assert_eq!(report.total_songs, 60);
        assert_eq!(report.total_albums, 7);
        assert_eq!(report.composition[0].name, "Jazz");
        assert_eq!(report.composition[0].percentage, 83.33);
        assert_eq!(report.composition[1].name, "Rock");
    }

    #[test]
    fn test_pillars_rank_by_album_count() {
        let mut backend = StaticBackend::new();
        backend.artists = vec![
            json!({"id": "a", "name": "Minor", "albumCount": 2}),
            json!({"id": "b", "name": "Major", "albumCount": "17"}),
        ];

        let pillars = LibraryAnalyzer::new(&backend).pillars(10).unwrap();
        assert_eq!(pillars[0].name, "Major");
        assert_eq!(pillars[0].album_count, 17);
    }

    #[test]
    fn test_taste_profile_counts_eras() {
        let mut backend = StaticBackend::new();
        let alb = |artist: &str, genre: &str, year: i32| {
            json!({"id": "x", "artist": artist, "genre": genre, "year": year})
        };
        backend.frequent_albums = vec![alb("Camel", "Prog", 1975), alb("Camel", "Prog", 1976)];
        backend.newest_albums = vec![alb("Yes", "Prog", 1972)];
        backend.starred_albums = vec![alb("Eno", "Ambient", 1983)];

        let profile = LibraryAnalyzer::new(&backend).taste_profile().unwrap();
        assert_eq!(profile.total_albums_analyzed, 4);
        assert_eq!(profile.top_artists[0], "Camel");
        assert_eq!(profile.top_genres[0], "Prog");
        assert_eq!(profile.favorite_eras[0], "1970s");
    }

    #[test]
    fn test_explore_genre_album_key_fallbacks() {
        let mut backend = StaticBackend::new();
        backend.genre_albums.insert(
            "Jazz".to_string(),
            vec![
                json!({"artist": "Artist A", "title": "Album Title"}),
                json!({"artist": "Artist A", "name": "Album Name"}),
                json!({"artist": "Artist B", "album": "Album Label"}),
                json!({"artist": "Artist C"}),
            ],
        );

        let report = LibraryAnalyzer::new(&backend).explore_genre("Jazz", 10).unwrap();
        assert_eq!(report.unique_artists, 3);

        let artist_a = report.top_artists.iter().find(|a| a.name == "Artist A").unwrap();
        assert_eq!(artist_a.albums, vec!["Album Title", "Album Name"]);
        let artist_b = report.top_artists.iter().find(|a| a.name == "Artist B").unwrap();
        assert_eq!(artist_b.albums, vec!["Album Label"]);
        let artist_c = report.top_artists.iter().find(|a| a.name == "Artist C").unwrap();
        assert_eq!(artist_c.albums, vec!["Unknown Album"]);
    }

    #[test]
    fn test_presence_artist_exact_case_insensitive() {
        let mut backend = StaticBackend::new();
        backend.search_results.insert(
            "\"Pink Floyd\"".to_string(),
            (vec![], vec![], vec![json!({"id": "pf", "name": "pink floyd"})]),
        );

        let statuses = LibraryAnalyzer::new(&backend).check_presence(&[PresenceQuery {
            artist: "Pink Floyd".to_string(),
            album: None,
        }]);
        assert!(statuses[0].present);
        assert!(statuses[0].error.is_none());
    }

    #[test]
    fn test_presence_album_loose_match() {
        let mut backend = StaticBackend::new();
        backend.search_results.insert(
            "\"Pink Floyd\" \"Wall\"".to_string(),
            (
                vec![],
                vec![json!({"artist": "Pink Floyd", "title": "The Wall"})],
                vec![],
            ),
        );

        let statuses = LibraryAnalyzer::new(&backend).check_presence(&[PresenceQuery {
            artist: "Pink Floyd".to_string(),
            album: Some("Wall".to_string()),
        }]);
        assert!(statuses[0].present);
    }

    #[test]
    fn test_presence_captures_per_item_errors() {
        let mut backend = StaticBackend::new();
        backend.offline = true;
        let statuses = LibraryAnalyzer::new(&backend).check_presence(&[PresenceQuery {
            artist: "Anyone".to_string(),
            album: None,
        }]);
        assert!(!statuses[0].present);
        assert!(statuses[0].error.is_some());
    }

    #[test]
    fn test_search_enriched_ampersand_fallback() {
        let mut backend = StaticBackend::new();
        backend.search_results.insert(
            "Simon Garfunkel".to_string(),
            (
                vec![song("s1", "Mrs. Robinson", "Simon & Garfunkel")],
                vec![],
                vec![],
            ),
        );

        let hits = LibraryAnalyzer::new(&backend)
            .search_enriched("Simon & Garfunkel", 20)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Mrs. Robinson");
    }

    #[test]
    fn test_similar_artists_passthrough() {
        let mut backend = StaticBackend::new();
        backend.search_results.insert(
            "Camel".to_string(),
            (vec![], vec![], vec![json!({"id": "camel_id", "name": "Camel"})]),
        );
        backend.similar_artists.insert(
            "camel_id".to_string(),
            vec![
                json!({"id": "caravan_id", "name": "Caravan", "match": 0.9}),
                json!({"id": "genesis_id", "name": "Genesis", "match": 0.8}),
            ],
        );

        let similar = LibraryAnalyzer::new(&backend).similar_artists("Camel", 5).unwrap();
        assert_eq!(similar.len(), 2);
        assert_eq!(similar[0].name, "Caravan");
        assert_eq!(similar[0].match_score, Some(0.9));
        assert!(similar[0].source.is_none());
    }

    #[test]
    fn test_similar_artists_genre_fallback() {
        let mut backend = StaticBackend::new();
        backend.search_results.insert(
            "Target".to_string(),
            (
                vec![],
                vec![],
                vec![json!({"id": "target_id", "name": "Target", "genre": "Rock"})],
            ),
        );
        backend.fail_similarity = true;
        backend.genre_albums.insert(
            "Rock".to_string(),
            vec![json!({"id": "a1", "artist": "Genre Peer", "title": "Alb"})],
        );

        let similar = LibraryAnalyzer::new(&backend).similar_artists("Target", 5).unwrap();
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].name, "Genre Peer");
        assert_eq!(similar[0].source.as_deref(), Some("genre_fallback"));
    }

    #[test]
    fn test_similar_songs_normalized() {
        let mut backend = StaticBackend::new();
        backend.similar_songs.insert(
            "seed".to_string(),
            vec![song("s10", "Time", "Pink Floyd"), song("s11", "Money", "Pink Floyd")],
        );

        let similar = LibraryAnalyzer::new(&backend).similar_songs("seed", 10).unwrap();
        assert_eq!(similar.len(), 2);
        assert_eq!(similar[0].title, "Time");
    }
}
