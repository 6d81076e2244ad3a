//! Safe playlist mutation.
//!
//! The backend does not enforce unique playlist names, so resolution
//! treats the first name match as authoritative and `create` clears every
//! duplicate before writing. Large ID sets are split into fixed-size
//! batches to bound request payloads, and every ID is verified against
//! the backend first: the server silently drops unknown IDs, which is
//! exactly the failure mode the ghost filter exists to surface.

use crate::error::{Error, Result};
use crate::gateway::{MusicBackend, PlaylistSummary};
use crate::track::Track;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::thread_rng;
use serde::Serialize;

/// IDs submitted per create/update call.
pub const PLAYLIST_BATCH_SIZE: usize = 10;

/// Entries returned by [`PlaylistManager::get`], shuffled for variety.
pub const PLAYLIST_SAMPLE_SIZE: usize = 50;

/// What a mutation did, for the caller's receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationAction {
    Created,
    Replaced,
    Appended,
    Deleted,
    AlreadyAbsent,
}

/// Outcome of one mutation, including the IDs that were dropped as
/// ghosts instead of being submitted.
#[derive(Debug, Clone, Serialize)]
pub struct MutationReceipt {
    pub action: MutationAction,
    pub playlist: String,
    pub tracks_submitted: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ghost_ids: Vec<String>,
}

/// Name-addressed playlist operations over a borrowed backend session.
pub struct PlaylistManager<'a> {
    backend: &'a dyn MusicBackend,
}

impl<'a> PlaylistManager<'a> {
    #[must_use]
    pub fn new(backend: &'a dyn MusicBackend) -> Self {
        Self { backend }
    }

    /// Returns a shuffled sample of the playlist's tracks, or an empty
    /// list when no playlist bears the name. Absence is not an error.
    pub fn get(&self, name: &str) -> Result<Vec<Track>> {
        let Some(playlist) = self.resolve_first(name)? else {
            return Ok(Vec::new());
        };
        let mut tracks: Vec<Track> = self
            .backend
            .playlist_entries(&playlist.id)?
            .iter()
            .filter_map(Track::from_raw)
            .collect();
        tracks.shuffle(&mut thread_rng());
        tracks.truncate(PLAYLIST_SAMPLE_SIZE);
        Ok(tracks)
    }

    /// Creates the playlist with the given IDs, replacing any existing
    /// playlist(s) of the same name. The first batch rides on the create
    /// call; the rest go through append calls.
    pub fn create(&self, name: &str, track_ids: &[String]) -> Result<MutationReceipt> {
        if track_ids.is_empty() {
            return Err(Error::MissingTrackIds("create"));
        }
        let (valid, ghosts) = self.verify_ids(track_ids)?;
        if valid.is_empty() {
            return Err(Error::NoValidTracks);
        }

        let stale = self.resolve_all(name)?;
        let replaced = !stale.is_empty();
        for playlist in &stale {
            info!("replacing existing playlist '{name}' (id {})", playlist.id);
            self.backend.delete_playlist(&playlist.id)?;
        }

        let mut batches = valid.chunks(PLAYLIST_BATCH_SIZE);
        let first = batches.next().unwrap_or(&[]);
        self.backend.create_playlist(name, first)?;

        let remaining: Vec<&[String]> = batches.collect();
        if !remaining.is_empty() {
            // The create call does not return the new ID; re-resolve.
            let created = self.resolve_first(name)?.ok_or_else(|| {
                Error::Backend(format!("playlist '{name}' missing right after creation"))
            })?;
            for batch in remaining {
                debug!("appending batch of {} to '{name}'", batch.len());
                self.backend.append_playlist(&created.id, batch)?;
            }
        }

        Ok(MutationReceipt {
            action: if replaced {
                MutationAction::Replaced
            } else {
                MutationAction::Created
            },
            playlist: name.to_string(),
            tracks_submitted: valid.len(),
            ghost_ids: ghosts,
        })
    }

    /// Appends IDs to the named playlist, creating it when absent.
    /// Repeated appends duplicate entries; the backend does not enforce
    /// uniqueness and neither does this call.
    pub fn append(&self, name: &str, track_ids: &[String]) -> Result<MutationReceipt> {
        if track_ids.is_empty() {
            return Err(Error::MissingTrackIds("append"));
        }
        let Some(playlist) = self.resolve_first(name)? else {
            return self.create(name, track_ids);
        };

        let (valid, ghosts) = self.verify_ids(track_ids)?;
        if valid.is_empty() {
            return Err(Error::NoValidTracks);
        }
        for batch in valid.chunks(PLAYLIST_BATCH_SIZE) {
            debug!("appending batch of {} to '{name}'", batch.len());
            self.backend.append_playlist(&playlist.id, batch)?;
        }

        Ok(MutationReceipt {
            action: MutationAction::Appended,
            playlist: name.to_string(),
            tracks_submitted: valid.len(),
            ghost_ids: ghosts,
        })
    }

    /// Deletes every playlist bearing the name. A missing playlist is a
    /// reported no-op, not an error.
    pub fn delete(&self, name: &str) -> Result<MutationReceipt> {
        let stale = self.resolve_all(name)?;
        if stale.is_empty() {
            return Ok(MutationReceipt {
                action: MutationAction::AlreadyAbsent,
                playlist: name.to_string(),
                tracks_submitted: 0,
                ghost_ids: Vec::new(),
            });
        }
        for playlist in &stale {
            info!("deleting playlist '{name}' (id {})", playlist.id);
            self.backend.delete_playlist(&playlist.id)?;
        }
        Ok(MutationReceipt {
            action: MutationAction::Deleted,
            playlist: name.to_string(),
            tracks_submitted: 0,
            ghost_ids: Vec::new(),
        })
    }

    /// First playlist with the exact name, if any.
    fn resolve_first(&self, name: &str) -> Result<Option<PlaylistSummary>> {
        Ok(self
            .backend
            .playlists()?
            .into_iter()
            .find(|p| p.name == name))
    }

    /// Every playlist with the exact name, in listing order.
    fn resolve_all(&self, name: &str) -> Result<Vec<PlaylistSummary>> {
        Ok(self
            .backend
            .playlists()?
            .into_iter()
            .filter(|p| p.name == name)
            .collect())
    }

    /// Splits IDs into those the backend resolves and ghosts. Lookup
    /// failures count as ghosts; a transport error here must not sneak an
    /// unverified ID into the submission.
    fn verify_ids(&self, track_ids: &[String]) -> Result<(Vec<String>, Vec<String>)> {
        let mut valid = Vec::with_capacity(track_ids.len());
        let mut ghosts = Vec::new();
        for id in track_ids {
            match self.backend.song(id) {
                Ok(Some(_)) => valid.push(id.clone()),
                Ok(None) => {
                    debug!("dropping ghost id {id}");
                    ghosts.push(id.clone());
                }
                Err(err) => {
                    debug!("lookup for {id} failed ({err}); treating as ghost");
                    ghosts.push(id.clone());
                }
            }
        }
        Ok((valid, ghosts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{song, PlaylistCall, StaticBackend};

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    fn backend_with_catalog(prefix: &str, n: usize) -> StaticBackend {
        let mut backend = StaticBackend::new();
        backend.catalog = (0..n)
            .map(|i| song(&format!("{prefix}{i}"), "T", "A"))
            .collect();
        backend
    }

    #[test]
    fn test_create_batches_into_create_plus_updates() {
        let backend = backend_with_catalog("id-", 35);
        let receipt = PlaylistManager::new(&backend)
            .create("BatchTest", &ids("id-", 35))
            .unwrap();

        assert_eq!(receipt.action, MutationAction::Created);
        assert_eq!(receipt.tracks_submitted, 35);

        let calls = backend.recorded_calls();
        assert_eq!(calls.len(), 4);
        assert!(
            matches!(&calls[0], PlaylistCall::Create { name, ids } if name == "BatchTest" && ids.len() == 10)
        );
        let batch_sizes: Vec<usize> = calls[1..]
            .iter()
            .map(|call| match call {
                PlaylistCall::Append { ids, .. } => ids.len(),
                other => panic!("unexpected call {other:?}"),
            })
            .collect();
        assert_eq!(batch_sizes, vec![10, 10, 5]);
    }

    #[test]
    fn test_append_batches_updates_only() {
        let backend = backend_with_catalog("id-", 25);
        backend.seed_playlist("ExistingList", &[]);

        let receipt = PlaylistManager::new(&backend)
            .append("ExistingList", &ids("id-", 25))
            .unwrap();
        assert_eq!(receipt.action, MutationAction::Appended);
        assert_eq!(receipt.tracks_submitted, 25);

        let calls = backend.recorded_calls();
        assert_eq!(calls.len(), 3);
        let batch_sizes: Vec<usize> = calls
            .iter()
            .map(|call| match call {
                PlaylistCall::Append { ids, .. } => ids.len(),
                other => panic!("unexpected call {other:?}"),
            })
            .collect();
        assert_eq!(batch_sizes, vec![10, 10, 5]);

        // Last batch is the tail of the input, in order.
        if let PlaylistCall::Append { ids: last, .. } = &calls[2] {
            assert_eq!(last, &ids("id-", 25)[20..25].to_vec());
        }
    }

    #[test]
    fn test_ghost_ids_filtered_and_reported() {
        let mut backend = StaticBackend::new();
        backend.catalog = vec![song("valid_12345", "Valid Song", "Test")];
        backend.seed_playlist("GhostBusters", &[]);

        let receipt = PlaylistManager::new(&backend)
            .append(
                "GhostBusters",
                &["valid_12345".to_string(), "ghost_67890".to_string()],
            )
            .unwrap();

        assert_eq!(receipt.tracks_submitted, 1);
        assert_eq!(receipt.ghost_ids, vec!["ghost_67890".to_string()]);

        let calls = backend.recorded_calls();
        assert_eq!(calls.len(), 1);
        if let PlaylistCall::Append { ids, .. } = &calls[0] {
            assert!(ids.contains(&"valid_12345".to_string()));
            assert!(!ids.contains(&"ghost_67890".to_string()));
        }
    }

    #[test]
    fn test_all_ghosts_is_an_error_not_a_submission() {
        let backend = StaticBackend::new();
        backend.seed_playlist("Empty", &[]);
        let err = PlaylistManager::new(&backend)
            .append("Empty", &["ghost".to_string()])
            .unwrap_err();
        assert!(matches!(err, Error::NoValidTracks));
        // Nothing was submitted.
        assert!(backend.recorded_calls().is_empty());
    }

    #[test]
    fn test_create_replaces_every_stale_duplicate() {
        let backend = backend_with_catalog("id-", 5);
        backend.seed_playlist("Weekly", &[]);
        backend.seed_playlist("Weekly", &[]);

        let receipt = PlaylistManager::new(&backend)
            .create("Weekly", &ids("id-", 5))
            .unwrap();
        assert_eq!(receipt.action, MutationAction::Replaced);

        let remaining: Vec<_> = backend
            .stored_playlists()
            .into_iter()
            .filter(|p| p.name == "Weekly")
            .collect();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].entries, ids("id-", 5));
    }

    #[test]
    fn test_create_twice_is_idempotent() {
        let backend = backend_with_catalog("id-", 12);
        let manager = PlaylistManager::new(&backend);

        manager.create("Daily", &ids("id-", 12)).unwrap();
        manager.create("Daily", &ids("id-", 12)).unwrap();

        let remaining: Vec<_> = backend
            .stored_playlists()
            .into_iter()
            .filter(|p| p.name == "Daily")
            .collect();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].entries, ids("id-", 12));
    }

    #[test]
    fn test_append_to_absent_creates() {
        let backend = backend_with_catalog("id-", 3);
        let receipt = PlaylistManager::new(&backend)
            .append("Fresh", &ids("id-", 3))
            .unwrap();
        assert_eq!(receipt.action, MutationAction::Created);
        assert_eq!(backend.stored_playlists().len(), 1);
    }

    #[test]
    fn test_delete_absent_is_reported_noop() {
        let backend = StaticBackend::new();
        let receipt = PlaylistManager::new(&backend).delete("Nothing").unwrap();
        assert_eq!(receipt.action, MutationAction::AlreadyAbsent);
        assert!(backend.recorded_calls().is_empty());
    }

    #[test]
    fn test_delete_removes_all_matches() {
        let backend = StaticBackend::new();
        backend.seed_playlist("Dup", &[]);
        backend.seed_playlist("Dup", &[]);
        backend.seed_playlist("Other", &[]);

        let receipt = PlaylistManager::new(&backend).delete("Dup").unwrap();
        assert_eq!(receipt.action, MutationAction::Deleted);
        let names: Vec<_> = backend
            .stored_playlists()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Other".to_string()]);
    }

    #[test]
    fn test_get_absent_returns_empty() {
        let backend = StaticBackend::new();
        let tracks = PlaylistManager::new(&backend).get("Nope").unwrap();
        assert!(tracks.is_empty());
    }

    #[test]
    fn test_get_returns_resolvable_entries() {
        let mut backend = StaticBackend::new();
        backend.catalog = vec![song("t1", "One", "A"), song("t2", "Two", "B")];
        backend.seed_playlist("Mix", &["t1", "t2", "gone"]);

        let tracks = PlaylistManager::new(&backend).get("Mix").unwrap();
        assert_eq!(tracks.len(), 2);
    }

    #[test]
    fn test_mutation_without_ids_is_rejected() {
        let backend = StaticBackend::new();
        let manager = PlaylistManager::new(&backend);
        assert!(matches!(
            manager.create("X", &[]).unwrap_err(),
            Error::MissingTrackIds("create")
        ));
        assert!(matches!(
            manager.append("X", &[]).unwrap_err(),
            Error::MissingTrackIds("append")
        ));
    }
}
