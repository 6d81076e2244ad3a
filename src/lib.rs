//! Crate-digging for Subsonic-compatible music servers.
//!
//! `cratedigger` turns a personal music library's raw catalog (tracks,
//! albums, genres, play counts, ratings, playlists) into curated,
//! constraint-satisfying track lists. It is built to sit under an
//! agent-facing tool adapter: every operation takes JSON-friendly inputs,
//! returns `Serialize`-able reports, and degrades to partial results
//! instead of falling over when the backend misbehaves.
//!
//! Core modules:
//! - [`gateway`] - the `MusicBackend` trait the engine consumes
//! - [`track`] - canonical track shape + defensive normalization
//! - [`harvest`] - named candidate-harvesting strategies
//! - [`constraints`] - mood resolution and filter constraints
//! - [`filter`] - dedup, genre/BPM filtering, artist diversity
//! - [`scoring`] - rating/heart quality score
//! - [`playlist`] - batched, ghost-filtered playlist mutation
//! - [`assess`] - diversity/repetition quality reports
//!
//! ### Supporting Modules
//!
//! - [`analysis`] - library composition, pillar artists, taste profiling,
//!   genre exploration, presence checks, enriched search
//! - [`config`] - backend connection settings
//! - [`error`] - typed error variants, including the over-constrained signal
//! - [`testing`] - in-memory backend fixture with call recording
//!
//! ## Workflow
//!
//! Curation runs in three stages: **harvest** a wide raw pool (2x-5x the
//! requested size) under one or more named modes, **filter** it down
//! (genre/BPM constraints, dedup, per-artist diversity capping), then
//! **execute** against the backend (batched playlist writes with ghost-ID
//! filtering), optionally checking the result with a quality report.
//!
//! ## Quick Start Example
//!
//! ```
//! use chrono::Utc;
//! use cratedigger::harvest::{smart_candidates, CandidateRequest};
//! use cratedigger::playlist::PlaylistManager;
//! use cratedigger::testing::{song_with_stats, StaticBackend};
//!
//! // Any `MusicBackend` works; the bundled fixture keeps the example
//! // self-contained.
//! let mut backend = StaticBackend::new();
//! backend.catalog = vec![
//!     song_with_stats("a1", "Opener", "Camel", "Prog", 0, 0, 0, false),
//!     song_with_stats("b1", "Deep Cut", "Eno", "Ambient", 0, 0, 0, false),
//! ];
//!
//! // Harvest unplayed tracks.
//! let request = CandidateRequest {
//!     modes: "hidden_gems".to_string(),
//!     limit: 10,
//!     ..CandidateRequest::default()
//! };
//! let set = smart_candidates(&backend, &request, Utc::now())?;
//! assert_eq!(set.tracks.len(), 2);
//!
//! // Persist them, batched and ghost-checked.
//! let ids: Vec<String> = set.tracks.iter().map(|t| t.id.clone()).collect();
//! let receipt = PlaylistManager::new(&backend).create("Fresh Finds", &ids)?;
//! assert_eq!(receipt.tracks_submitted, 2);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Whole-operation failures come back as typed [`error::Error`] variants;
//! notably [`error::Error::NoMatches`] marks a strict filter that matched
//! nothing, so an agent caller can relax constraints instead of mistaking
//! it for an empty library. Per-item trouble inside harvesting loops is
//! collected as `issues` strings next to the data.
//!
//! ## Execution Model
//!
//! Single-threaded, blocking, request-per-call. The engine keeps no state
//! across invocations; the only durable state lives in the backend.
//! Callers wanting timeouts or cancellation apply them around the call.
//!
//! ## Logging
//!
//! All modules log through the `log` facade: operations at `info`,
//! swallowed per-item failures at `warn`/`debug`. Wire up `env_logger`
//! (or any other implementation) in the host process:
//!
//! ```bash
//! RUST_LOG=cratedigger=debug my-adapter
//! ```

pub mod analysis;
pub mod assess;
pub mod config;
pub mod constraints;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod harvest;
pub mod playlist;
pub mod scoring;
pub mod testing;
pub mod track;

pub use config::BackendConfig;
pub use constraints::ConstraintSet;
pub use error::{Error, Result};
pub use gateway::MusicBackend;
pub use harvest::{smart_candidates, CandidateRequest, CandidateSet, HarvestMode};
pub use track::Track;
