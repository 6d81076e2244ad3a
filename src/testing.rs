//! In-memory backend for tests and downstream adapter development.
//!
//! [`StaticBackend`] serves canned records and records every playlist
//! mutation it receives, including exact batch sizes, so tests can assert
//! on the calls the engine issued rather than only on its return values.
//! Sampling endpoints are deterministic (they return the head of the
//! configured list) - randomness belongs to the engine under test, not to
//! the fixture.

use crate::error::{Error, Result};
use crate::gateway::{AlbumCriteria, MusicBackend, PlaylistSummary, SearchLimits, SearchResults};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

/// One playlist mutation as received by the fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistCall {
    Create { name: String, ids: Vec<String> },
    Append { playlist_id: String, ids: Vec<String> },
    Delete { playlist_id: String },
}

/// A playlist held by the fixture.
#[derive(Debug, Clone)]
pub struct StoredPlaylist {
    pub id: String,
    pub name: String,
    pub entries: Vec<String>,
}

/// Canned-response [`MusicBackend`].
///
/// Fill the public fields with raw records, then hand a reference to the
/// engine. Not `Sync`; the engine is single-threaded by design.
#[derive(Default)]
pub struct StaticBackend {
    pub newest_albums: Vec<Value>,
    pub frequent_albums: Vec<Value>,
    pub starred_albums: Vec<Value>,
    pub random_albums: Vec<Value>,
    /// album id -> directory children (tracks and sub-directories).
    pub album_children: HashMap<String, Vec<Value>>,
    /// Album ids whose directory lookup fails, for best-effort-loop tests.
    pub failing_albums: HashSet<String>,
    /// artist id -> albums, best first.
    pub artist_albums: HashMap<String, Vec<Value>>,
    /// genre name -> albums.
    pub genre_albums: HashMap<String, Vec<Value>>,
    /// Source for `random_songs`: the first `size` records are returned.
    pub catalog: Vec<Value>,
    /// genre name -> songs for `random_songs_by_genre`.
    pub genre_catalog: HashMap<String, Vec<Value>>,
    pub starred: Vec<Value>,
    pub genres: Vec<Value>,
    pub artists: Vec<Value>,
    /// seed song id -> similar songs.
    pub similar_songs: HashMap<String, Vec<Value>>,
    /// artist id -> similar artists.
    pub similar_artists: HashMap<String, Vec<Value>>,
    /// Exact query -> (songs, albums, artists).
    pub search_results: HashMap<String, (Vec<Value>, Vec<Value>, Vec<Value>)>,
    /// Make similarity endpoints fail, emulating servers without them.
    pub fail_similarity: bool,
    /// Make every call fail, emulating an unreachable server.
    pub offline: bool,

    playlists: RefCell<Vec<StoredPlaylist>>,
    calls: RefCell<Vec<PlaylistCall>>,
    next_playlist_id: Cell<usize>,
}

impl StaticBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an existing playlist and returns its fixture id.
    pub fn seed_playlist(&self, name: &str, entries: &[&str]) -> String {
        let id = self.fresh_playlist_id();
        self.playlists.borrow_mut().push(StoredPlaylist {
            id: id.clone(),
            name: name.to_string(),
            entries: entries.iter().map(ToString::to_string).collect(),
        });
        id
    }

    /// Every playlist mutation received so far, in order.
    #[must_use]
    pub fn recorded_calls(&self) -> Vec<PlaylistCall> {
        self.calls.borrow().clone()
    }

    /// Current playlists, for end-state assertions.
    #[must_use]
    pub fn stored_playlists(&self) -> Vec<StoredPlaylist> {
        self.playlists.borrow().clone()
    }

    fn fresh_playlist_id(&self) -> String {
        let n = self.next_playlist_id.get();
        self.next_playlist_id.set(n + 1);
        format!("pl-{n}")
    }

    fn check_online(&self) -> Result<()> {
        if self.offline {
            return Err(Error::Backend("connection refused".to_string()));
        }
        Ok(())
    }

    fn find_song(&self, id: &str) -> Option<Value> {
        let matches_id =
            |v: &&Value| v.get("id").and_then(Value::as_str) == Some(id);
        self.catalog
            .iter()
            .find(matches_id)
            .or_else(|| self.starred.iter().find(matches_id))
            .or_else(|| {
                self.album_children
                    .values()
                    .flatten()
                    .find(matches_id)
            })
            .or_else(|| {
                self.genre_catalog
                    .values()
                    .flatten()
                    .find(matches_id)
            })
            .or_else(|| self.similar_songs.values().flatten().find(matches_id))
            .cloned()
    }
}

impl MusicBackend for StaticBackend {
    fn ping(&self) -> Result<()> {
        self.check_online()
    }

    fn genres(&self) -> Result<Vec<Value>> {
        self.check_online()?;
        Ok(self.genres.clone())
    }

    fn albums(&self, criteria: AlbumCriteria, size: usize) -> Result<Vec<Value>> {
        self.check_online()?;
        let source = match criteria {
            AlbumCriteria::Newest => &self.newest_albums,
            AlbumCriteria::Frequent => &self.frequent_albums,
            AlbumCriteria::Starred => &self.starred_albums,
            AlbumCriteria::Random => &self.random_albums,
        };
        Ok(source.iter().take(size).cloned().collect())
    }

    fn albums_by_genre(&self, genre: &str, size: usize) -> Result<Vec<Value>> {
        self.check_online()?;
        Ok(self
            .genre_albums
            .get(genre)
            .map(|albums| albums.iter().take(size).cloned().collect())
            .unwrap_or_default())
    }

    fn album_tracks(&self, album_id: &str) -> Result<Vec<Value>> {
        self.check_online()?;
        if self.failing_albums.contains(album_id) {
            return Err(Error::Backend(format!("directory {album_id} unavailable")));
        }
        Ok(self.album_children.get(album_id).cloned().unwrap_or_default())
    }

    fn artist_albums(&self, artist_id: &str) -> Result<Vec<Value>> {
        self.check_online()?;
        Ok(self.artist_albums.get(artist_id).cloned().unwrap_or_default())
    }

    fn random_songs(&self, size: usize) -> Result<Vec<Value>> {
        self.check_online()?;
        Ok(self.catalog.iter().take(size).cloned().collect())
    }

    fn random_songs_by_genre(&self, genre: &str, size: usize) -> Result<Vec<Value>> {
        self.check_online()?;
        Ok(self
            .genre_catalog
            .get(genre)
            .map(|songs| songs.iter().take(size).cloned().collect())
            .unwrap_or_default())
    }

    fn starred_songs(&self) -> Result<Vec<Value>> {
        self.check_online()?;
        Ok(self.starred.clone())
    }

    fn song(&self, id: &str) -> Result<Option<Value>> {
        self.check_online()?;
        Ok(self.find_song(id))
    }

    fn artists(&self) -> Result<Vec<Value>> {
        self.check_online()?;
        Ok(self.artists.clone())
    }

    fn search(&self, query: &str, limits: SearchLimits) -> Result<SearchResults> {
        self.check_online()?;
        let (songs, albums, artists) = self
            .search_results
            .get(query)
            .cloned()
            .unwrap_or_default();
        Ok(SearchResults {
            songs: songs.into_iter().take(limits.songs).collect(),
            albums: albums.into_iter().take(limits.albums).collect(),
            artists: artists.into_iter().take(limits.artists).collect(),
        })
    }

    fn similar_songs(&self, song_id: &str, count: usize) -> Result<Vec<Value>> {
        self.check_online()?;
        if self.fail_similarity {
            return Err(Error::Backend("similarity not supported".to_string()));
        }
        Ok(self
            .similar_songs
            .get(song_id)
            .map(|songs| songs.iter().take(count).cloned().collect())
            .unwrap_or_default())
    }

    fn similar_artists(&self, artist_id: &str, count: usize) -> Result<Vec<Value>> {
        self.check_online()?;
        if self.fail_similarity {
            return Err(Error::Backend("similarity not supported".to_string()));
        }
        Ok(self
            .similar_artists
            .get(artist_id)
            .map(|artists| artists.iter().take(count).cloned().collect())
            .unwrap_or_default())
    }

    fn playlists(&self) -> Result<Vec<PlaylistSummary>> {
        self.check_online()?;
        Ok(self
            .playlists
            .borrow()
            .iter()
            .map(|p| PlaylistSummary {
                id: p.id.clone(),
                name: p.name.clone(),
                song_count: p.entries.len(),
            })
            .collect())
    }

    fn playlist_entries(&self, playlist_id: &str) -> Result<Vec<Value>> {
        self.check_online()?;
        let playlists = self.playlists.borrow();
        let Some(playlist) = playlists.iter().find(|p| p.id == playlist_id) else {
            return Ok(Vec::new());
        };
        Ok(playlist
            .entries
            .iter()
            .filter_map(|id| self.find_song(id))
            .collect())
    }

    fn create_playlist(&self, name: &str, track_ids: &[String]) -> Result<()> {
        self.check_online()?;
        self.calls.borrow_mut().push(PlaylistCall::Create {
            name: name.to_string(),
            ids: track_ids.to_vec(),
        });
        let id = self.fresh_playlist_id();
        self.playlists.borrow_mut().push(StoredPlaylist {
            id,
            name: name.to_string(),
            entries: track_ids.to_vec(),
        });
        Ok(())
    }

    fn append_playlist(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        self.check_online()?;
        self.calls.borrow_mut().push(PlaylistCall::Append {
            playlist_id: playlist_id.to_string(),
            ids: track_ids.to_vec(),
        });
        let mut playlists = self.playlists.borrow_mut();
        match playlists.iter_mut().find(|p| p.id == playlist_id) {
            Some(playlist) => {
                playlist.entries.extend(track_ids.iter().cloned());
                Ok(())
            }
            None => Err(Error::Backend(format!("no playlist {playlist_id}"))),
        }
    }

    fn delete_playlist(&self, playlist_id: &str) -> Result<()> {
        self.check_online()?;
        self.calls.borrow_mut().push(PlaylistCall::Delete {
            playlist_id: playlist_id.to_string(),
        });
        self.playlists.borrow_mut().retain(|p| p.id != playlist_id);
        Ok(())
    }
}

/// Minimal raw song record, enough for normalization and identity.
#[must_use]
pub fn song(id: &str, title: &str, artist: &str) -> Value {
    json!({"id": id, "title": title, "artist": artist})
}

/// Raw song record with the fields the harvesting strategies look at.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn song_with_stats(
    id: &str,
    title: &str,
    artist: &str,
    genre: &str,
    bpm: u32,
    play_count: u64,
    rating: u8,
    starred: bool,
) -> Value {
    let mut record = json!({
        "id": id,
        "title": title,
        "artist": artist,
        "genre": genre,
        "bpm": bpm,
        "playCount": play_count,
        "userRating": rating,
    });
    if starred {
        record["starred"] = json!("2024-01-01T00:00:00Z");
    }
    record
}

/// Minimal raw album record.
#[must_use]
pub fn album(id: &str, title: &str, artist: &str) -> Value {
    json!({"id": id, "title": title, "artist": artist})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_songs_returns_head_of_catalog() {
        let mut backend = StaticBackend::new();
        backend.catalog = vec![song("a", "A", "X"), song("b", "B", "Y"), song("c", "C", "Z")];
        let sample = backend.random_songs(2).unwrap();
        assert_eq!(sample.len(), 2);
        assert_eq!(sample[0]["id"], "a");
    }

    #[test]
    fn test_playlist_lifecycle_and_recording() {
        let backend = StaticBackend::new();
        backend
            .create_playlist("Test", &["t1".to_string(), "t2".to_string()])
            .unwrap();
        let listed = backend.playlists().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Test");

        backend
            .append_playlist(&listed[0].id, &["t3".to_string()])
            .unwrap();
        assert_eq!(backend.stored_playlists()[0].entries.len(), 3);

        backend.delete_playlist(&listed[0].id).unwrap();
        assert!(backend.playlists().unwrap().is_empty());
        assert_eq!(backend.recorded_calls().len(), 3);
    }

    #[test]
    fn test_offline_fails_every_call() {
        let backend = StaticBackend {
            offline: true,
            ..StaticBackend::new()
        };
        assert!(backend.ping().is_err());
        assert!(backend.random_songs(5).is_err());
    }
}
