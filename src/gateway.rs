//! Backend gateway trait.
//!
//! Everything the engine needs from a Subsonic-compatible music server,
//! expressed as one blocking trait. The wire protocol (REST, auth tokens,
//! response envelopes) is the implementer's concern; this crate only sees
//! the decoded records. Song and album records cross the boundary as raw
//! [`serde_json::Value`] maps because field names drift between backend
//! versions - the normalizer in [`crate::track`] owns the fallback logic.
//!
//! Calls are issued sequentially within an operation; each top-level
//! operation bounds its own request count (pool caps, batch sizes, retry
//! budgets), so implementations need no internal concurrency and no
//! locking. Timeouts and cancellation are the caller's job.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Album listing criteria supported by the backend (`getAlbumList2` family).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlbumCriteria {
    Newest,
    Frequent,
    Starred,
    Random,
}

impl AlbumCriteria {
    /// Wire name of the listing type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AlbumCriteria::Newest => "newest",
            AlbumCriteria::Frequent => "frequent",
            AlbumCriteria::Starred => "starred",
            AlbumCriteria::Random => "random",
        }
    }
}

/// Per-category result caps for a structured search.
#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    pub songs: usize,
    pub albums: usize,
    pub artists: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            songs: 20,
            albums: 5,
            artists: 5,
        }
    }
}

/// Decoded `search3` response, one list per entity kind.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub songs: Vec<Value>,
    pub albums: Vec<Value>,
    pub artists: Vec<Value>,
}

/// A playlist as listed by the backend. Names are not unique server-side;
/// the mutation manager treats the first match as authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub song_count: usize,
}

/// Minimum backend surface the curation engine depends on.
///
/// All methods are blocking and take `&self`; the session is treated as
/// cheap to (re)establish per call. Similarity queries may be unsupported
/// by a given server - implementations should return an error (or an empty
/// list) rather than panic, and harvesting degrades gracefully either way.
pub trait MusicBackend {
    /// Connectivity probe.
    fn ping(&self) -> Result<()>;

    /// All genres with song/album counts. Records keep their raw shape
    /// (`value` vs `name` key drift).
    fn genres(&self) -> Result<Vec<Value>>;

    /// Albums under a listing criterion, bounded by `size`.
    fn albums(&self, criteria: AlbumCriteria, size: usize) -> Result<Vec<Value>>;

    /// Albums for one genre, bounded by `size`.
    fn albums_by_genre(&self, genre: &str, size: usize) -> Result<Vec<Value>>;

    /// Directory children of an album: track records, possibly mixed with
    /// sub-directory entries (`isDir` markers).
    fn album_tracks(&self, album_id: &str) -> Result<Vec<Value>>;

    /// Albums belonging to one artist, best (most relevant) first.
    fn artist_albums(&self, artist_id: &str) -> Result<Vec<Value>>;

    /// Random song sample of at most `size` tracks.
    fn random_songs(&self, size: usize) -> Result<Vec<Value>>;

    /// Random song sample restricted to a genre.
    fn random_songs_by_genre(&self, genre: &str, size: usize) -> Result<Vec<Value>>;

    /// All starred songs.
    fn starred_songs(&self) -> Result<Vec<Value>>;

    /// Resolve one track by ID. `Ok(None)` means the ID does not exist
    /// (ghost); errors are reserved for transport failures.
    fn song(&self, id: &str) -> Result<Option<Value>>;

    /// Flattened artist index (name, id, album count).
    fn artists(&self) -> Result<Vec<Value>>;

    /// Full-text search across songs, albums and artists.
    fn search(&self, query: &str, limits: SearchLimits) -> Result<SearchResults>;

    /// Tracks similar to the given seed track.
    fn similar_songs(&self, song_id: &str, count: usize) -> Result<Vec<Value>>;

    /// Artists similar to the given artist.
    fn similar_artists(&self, artist_id: &str, count: usize) -> Result<Vec<Value>>;

    /// All playlists visible to the current user.
    fn playlists(&self) -> Result<Vec<PlaylistSummary>>;

    /// Ordered entries of one playlist.
    fn playlist_entries(&self, playlist_id: &str) -> Result<Vec<Value>>;

    /// Create a playlist with an initial ordered ID list.
    fn create_playlist(&self, name: &str, track_ids: &[String]) -> Result<()>;

    /// Append IDs to an existing playlist.
    fn append_playlist(&self, playlist_id: &str, track_ids: &[String]) -> Result<()>;

    /// Delete a playlist by backend ID.
    fn delete_playlist(&self, playlist_id: &str) -> Result<()>;
}
