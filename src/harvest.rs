//! Candidate harvesting strategies.
//!
//! Each mode turns backend listings into a raw candidate pool, over-
//! fetching so the filter stage has attrition room. Harvesting is
//! best-effort throughout: a failed album or seed lookup is noted and the
//! loop moves on, and a mode that finds nothing contributes an empty pool.
//! The only hard failures are an unknown mode name and the strict
//! no-matches signal raised after filtering.

use crate::analysis::pillar_artists;
use crate::constraints::ConstraintSet;
use crate::error::{Error, Result};
use crate::filter::{self, dedupe_last_wins};
use crate::gateway::{AlbumCriteria, MusicBackend};
use crate::scoring::smart_score;
use crate::track::{is_directory, Track};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::thread_rng;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// Hard cap on any single raw pool, bounding backend load.
pub const MAX_POOL_SIZE: usize = 500;

/// Over-fetch multiplier when constraints will thin the pool.
pub const FILTERED_FETCH_RATIO: usize = 5;

/// Over-fetch multiplier when no filters are active.
pub const PLAIN_FETCH_RATIO: usize = 2;

/// Sampling retries while hunting for low-rated tracks.
pub const LOWEST_RATED_RETRIES: usize = 3;

/// Sampling passes for deep rediscovery.
pub const REDISCOVER_PASSES: usize = 4;

/// Age (days since last play) past which a track counts as forgotten.
pub const REDISCOVER_AGE_DAYS: i64 = 365;

/// Rating floor for the sampled half of `top_rated`.
pub const TOP_RATED_MIN_RATING: u8 = 3;

/// Starred albums inspected by `unheard_favorites`.
pub const STARRED_ALBUM_SAMPLE: usize = 200;

/// Pillar artists mined by `fallen_pillars`.
pub const PILLAR_COUNT: usize = 10;

/// Top albums inspected per pillar artist.
pub const PILLAR_ALBUM_SAMPLE: usize = 5;

/// Starred seeds sampled by `similar_to_starred`.
pub const SIMILARITY_SEEDS: usize = 5;

/// Similar tracks requested per seed.
pub const SIMILAR_PER_SEED: usize = 20;

/// Frequent albums sampled to establish the familiar-genre set.
pub const DIVERGENT_FREQUENT_SAMPLE: usize = 20;

/// Unfamiliar genres sampled by `divergent`.
pub const DIVERGENT_GENRE_SAMPLE: usize = 3;

/// Tracks sampled per unfamiliar genre.
pub const DIVERGENT_TRACKS_PER_GENRE: usize = 5;

/// Named harvesting strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HarvestMode {
    RecentlyAdded,
    MostPlayed,
    TopRated,
    LowestRated,
    Rediscover,
    RediscoverDeep,
    HiddenGems,
    UnheardFavorites,
    FallenPillars,
    SimilarToStarred,
    Divergent,
}

impl HarvestMode {
    pub const ALL: &'static [HarvestMode] = &[
        HarvestMode::RecentlyAdded,
        HarvestMode::MostPlayed,
        HarvestMode::TopRated,
        HarvestMode::LowestRated,
        HarvestMode::Rediscover,
        HarvestMode::RediscoverDeep,
        HarvestMode::HiddenGems,
        HarvestMode::UnheardFavorites,
        HarvestMode::FallenPillars,
        HarvestMode::SimilarToStarred,
        HarvestMode::Divergent,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HarvestMode::RecentlyAdded => "recently_added",
            HarvestMode::MostPlayed => "most_played",
            HarvestMode::TopRated => "top_rated",
            HarvestMode::LowestRated => "lowest_rated",
            HarvestMode::Rediscover => "rediscover",
            HarvestMode::RediscoverDeep => "rediscover_deep",
            HarvestMode::HiddenGems => "hidden_gems",
            HarvestMode::UnheardFavorites => "unheard_favorites",
            HarvestMode::FallenPillars => "fallen_pillars",
            HarvestMode::SimilarToStarred => "similar_to_starred",
            HarvestMode::Divergent => "divergent",
        }
    }

    /// Modes whose pool order is itself the ranking; the filter stage
    /// must not shuffle these away.
    #[must_use]
    pub fn is_ranked(self) -> bool {
        matches!(self, HarvestMode::MostPlayed | HarvestMode::TopRated)
    }
}

impl std::str::FromStr for HarvestMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        HarvestMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str() == s.trim())
            .ok_or_else(|| Error::UnknownMode(s.trim().to_string()))
    }
}

/// Parses a comma-separated mode list, e.g. `"top_rated,hidden_gems"`.
pub fn parse_modes(spec: &str) -> Result<Vec<HarvestMode>> {
    let modes: Vec<HarvestMode> = spec
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect::<Result<_>>()?;
    if modes.is_empty() {
        return Err(Error::UnknownMode(spec.to_string()));
    }
    Ok(modes)
}

/// A raw pool plus the non-fatal problems met while building it.
#[derive(Debug, Default)]
pub struct HarvestReport {
    pub tracks: Vec<Track>,
    pub issues: Vec<String>,
}

impl HarvestReport {
    fn issue(&mut self, message: String) {
        warn!("{message}");
        self.issues.push(message);
    }
}

/// Caller-facing request for `smart_candidates`.
#[derive(Debug, Clone)]
pub struct CandidateRequest {
    /// Comma-separated mode names.
    pub modes: String,
    pub limit: usize,
    pub constraints: ConstraintSet,
}

impl Default for CandidateRequest {
    fn default() -> Self {
        Self {
            modes: HarvestMode::MostPlayed.as_str().to_string(),
            limit: 50,
            constraints: ConstraintSet::default(),
        }
    }
}

/// Curated candidates plus harvesting issues worth reporting upstream.
#[derive(Debug, Serialize)]
pub struct CandidateSet {
    pub tracks: Vec<Track>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

/// Top-level candidate generation: resolve mood, harvest every requested
/// mode, then filter, diversify and truncate.
///
/// # Errors
///
/// [`Error::UnknownMode`] for unrecognized mode names and
/// [`Error::NoMatches`] when strict filtering leaves nothing.
pub fn smart_candidates(
    backend: &dyn MusicBackend,
    request: &CandidateRequest,
    now: DateTime<Utc>,
) -> Result<CandidateSet> {
    let modes = parse_modes(&request.modes)?;
    let constraints = request.constraints.clone().resolve_mood();
    let budget = fetch_budget(request.limit, constraints.any_filter());
    info!(
        "harvesting {} candidate(s) via [{}], pool budget {budget}",
        request.limit, request.modes
    );

    let harvester = Harvester::new(backend);
    let mut pool = Vec::new();
    let mut issues = Vec::new();
    for mode in &modes {
        let report = harvester.harvest(*mode, budget, request.limit, now);
        debug!("{} yielded {} raw candidates", mode.as_str(), report.tracks.len());
        pool.extend(report.tracks);
        issues.extend(report.issues);
    }

    let preserve_order = modes.iter().all(|mode| mode.is_ranked());
    let tracks = filter::apply(
        pool,
        &constraints,
        request.limit,
        preserve_order,
        &request.modes,
    )?;
    Ok(CandidateSet { tracks, issues })
}

/// Raw pool size for a requested limit: wider when filters will thin the
/// pool, always bounded by [`MAX_POOL_SIZE`].
#[must_use]
pub fn fetch_budget(limit: usize, filtered: bool) -> usize {
    let ratio = if filtered {
        FILTERED_FETCH_RATIO
    } else {
        PLAIN_FETCH_RATIO
    };
    (limit * ratio).min(MAX_POOL_SIZE)
}

/// Strategy dispatcher over a borrowed backend session.
pub struct Harvester<'a> {
    backend: &'a dyn MusicBackend,
}

impl<'a> Harvester<'a> {
    #[must_use]
    pub fn new(backend: &'a dyn MusicBackend) -> Self {
        Self { backend }
    }

    /// Builds the raw pool for one mode. Never fails: backend trouble
    /// lands in the report's issue list and yields a partial (possibly
    /// empty) pool.
    #[must_use]
    pub fn harvest(
        &self,
        mode: HarvestMode,
        budget: usize,
        limit: usize,
        now: DateTime<Utc>,
    ) -> HarvestReport {
        match mode {
            HarvestMode::RecentlyAdded => self.recently_added(budget),
            HarvestMode::MostPlayed => self.most_played(budget),
            HarvestMode::TopRated => self.top_rated(),
            HarvestMode::LowestRated => self.lowest_rated(budget, limit),
            HarvestMode::Rediscover => self.rediscover(budget),
            HarvestMode::RediscoverDeep => self.rediscover_deep(budget, limit, now),
            HarvestMode::HiddenGems => self.hidden_gems(budget),
            HarvestMode::UnheardFavorites => self.unheard_favorites(budget, limit),
            HarvestMode::FallenPillars => self.fallen_pillars(now),
            HarvestMode::SimilarToStarred => self.similar_to_starred(),
            HarvestMode::Divergent => self.divergent(),
        }
    }

    /// One representative (first non-directory) track per newest album.
    fn recently_added(&self, budget: usize) -> HarvestReport {
        let mut report = HarvestReport::default();
        for album in self.albums_or_issue(AlbumCriteria::Newest, budget, &mut report) {
            let Some(tracks) = self.album_tracks_or_issue(&album, &mut report) else {
                continue;
            };
            if let Some(first) = tracks.first() {
                report.tracks.push(first.clone());
            }
        }
        report
    }

    /// Every track of the frequent albums, globally ordered by play count.
    fn most_played(&self, budget: usize) -> HarvestReport {
        let mut report = HarvestReport::default();
        let mut gathered = Vec::new();
        for album in self.albums_or_issue(AlbumCriteria::Frequent, budget, &mut report) {
            if let Some(tracks) = self.album_tracks_or_issue(&album, &mut report) {
                gathered.extend(tracks);
            }
        }
        gathered.sort_by(|a, b| b.play_count.cmp(&a.play_count));
        report.tracks = dedupe_last_wins(gathered);
        report
    }

    /// Starred tracks plus a heavy random sample of well-rated ones,
    /// ranked by smart score with play count breaking ties (active
    /// favorites first).
    fn top_rated(&self) -> HarvestReport {
        let mut report = HarvestReport::default();
        let mut gathered = Vec::new();

        match self.backend.starred_songs() {
            Ok(raws) => gathered.extend(normalize(&raws)),
            Err(err) => report.issue(format!("starred lookup failed: {err}")),
        }
        match self.backend.random_songs(MAX_POOL_SIZE) {
            Ok(raws) => gathered.extend(
                normalize(&raws)
                    .into_iter()
                    .filter(|t| t.rating >= TOP_RATED_MIN_RATING),
            ),
            Err(err) => report.issue(format!("rating sample failed: {err}")),
        }

        let mut pool = dedupe_last_wins(gathered);
        pool.sort_by(|a, b| {
            smart_score(b)
                .cmp(&smart_score(a))
                .then(b.play_count.cmp(&a.play_count))
        });
        report.tracks = pool;
        report
    }

    /// Hunts rating-1/2 tracks through repeated random sampling, bounded
    /// by [`LOWEST_RATED_RETRIES`].
    fn lowest_rated(&self, budget: usize, limit: usize) -> HarvestReport {
        let mut report = HarvestReport::default();
        let sample_size = (budget * 2).min(MAX_POOL_SIZE);
        let mut seen = HashSet::new();

        for attempt in 0..LOWEST_RATED_RETRIES {
            if report.tracks.len() >= limit {
                break;
            }
            let raws = match self.backend.random_songs(sample_size) {
                Ok(raws) => raws,
                Err(err) => {
                    report.issue(format!("sampling attempt {} failed: {err}", attempt + 1));
                    continue;
                }
            };
            for track in normalize(&raws) {
                if (1..=2).contains(&track.rating) && seen.insert(track.id.clone()) {
                    report.tracks.push(track);
                }
            }
        }
        // Play count still orders the hate-listened ones first.
        report.tracks.sort_by(|a, b| b.play_count.cmp(&a.play_count));
        report
    }

    /// One random track from each of a random album sample.
    fn rediscover(&self, budget: usize) -> HarvestReport {
        let mut report = HarvestReport::default();
        let mut rng = thread_rng();
        for album in self.albums_or_issue(AlbumCriteria::Random, budget, &mut report) {
            let Some(tracks) = self.album_tracks_or_issue(&album, &mut report) else {
                continue;
            };
            if let Some(pick) = tracks.choose(&mut rng) {
                report.tracks.push(pick.clone());
            }
        }
        report
    }

    /// Iterative random sampling for tracks unplayed for over a year.
    fn rediscover_deep(&self, budget: usize, limit: usize, now: DateTime<Utc>) -> HarvestReport {
        let mut report = HarvestReport::default();
        let mut seen = HashSet::new();

        for pass in 0..REDISCOVER_PASSES {
            if report.tracks.len() >= limit {
                break;
            }
            let raws = match self.backend.random_songs(budget) {
                Ok(raws) => raws,
                Err(err) => {
                    report.issue(format!("deep pass {} failed: {err}", pass + 1));
                    continue;
                }
            };
            for track in normalize(&raws) {
                let forgotten = track
                    .days_since_played(now)
                    .is_some_and(|days| days > REDISCOVER_AGE_DAYS);
                if forgotten && seen.insert(track.id.clone()) {
                    report.tracks.push(track);
                }
            }
        }
        report
    }

    /// Completely unplayed tracks from a large random sample.
    fn hidden_gems(&self, budget: usize) -> HarvestReport {
        let mut report = HarvestReport::default();
        match self.backend.random_songs((budget * 2).min(MAX_POOL_SIZE)) {
            Ok(raws) => {
                report.tracks = normalize(&raws)
                    .into_iter()
                    .filter(|t| t.play_count == 0)
                    .collect();
            }
            Err(err) => report.issue(format!("random sample failed: {err}")),
        }
        report
    }

    /// Unplayed tracks from starred albums, diversified round-robin
    /// across artists so one box set cannot swamp the pool.
    fn unheard_favorites(&self, budget: usize, limit: usize) -> HarvestReport {
        let mut report = HarvestReport::default();
        let mut albums =
            self.albums_or_issue(AlbumCriteria::Starred, STARRED_ALBUM_SAMPLE, &mut report);
        let mut rng = thread_rng();
        albums.shuffle(&mut rng);

        let target_raw = budget * 2;
        let mut raw_pool = Vec::new();
        for album in albums {
            if raw_pool.len() >= target_raw {
                break;
            }
            let Some(mut tracks) = self.album_tracks_or_issue(&album, &mut report) else {
                continue;
            };
            tracks.shuffle(&mut rng);
            raw_pool.extend(tracks.into_iter().filter(|t| t.play_count == 0));
        }
        report.tracks = filter::round_robin_select(raw_pool, None, limit, true);
        report
    }

    /// Unplayed or long-unplayed tracks from the top albums of pillar
    /// artists (highest album counts in the library).
    fn fallen_pillars(&self, now: DateTime<Utc>) -> HarvestReport {
        let mut report = HarvestReport::default();
        let pillars = match pillar_artists(self.backend, PILLAR_COUNT) {
            Ok(pillars) => pillars,
            Err(err) => {
                report.issue(format!("pillar artist lookup failed: {err}"));
                return report;
            }
        };

        for pillar in pillars {
            let albums = match self.backend.artist_albums(&pillar.id) {
                Ok(albums) => albums,
                Err(err) => {
                    report.issue(format!("albums for '{}' failed: {err}", pillar.name));
                    continue;
                }
            };
            for album in albums.into_iter().take(PILLAR_ALBUM_SAMPLE) {
                let Some(tracks) = self.album_tracks_or_issue(&album, &mut report) else {
                    continue;
                };
                report.tracks.extend(tracks.into_iter().filter(|t| {
                    t.play_count == 0
                        || t.days_since_played(now)
                            .is_some_and(|days| days > REDISCOVER_AGE_DAYS)
                }));
            }
        }
        report
    }

    /// Union of similarity results seeded from a random starred sample.
    /// Servers without similarity support degrade to issues.
    fn similar_to_starred(&self) -> HarvestReport {
        let mut report = HarvestReport::default();
        let seeds = match self.backend.starred_songs() {
            Ok(raws) => normalize(&raws),
            Err(err) => {
                report.issue(format!("starred lookup failed: {err}"));
                return report;
            }
        };

        let mut rng = thread_rng();
        let mut gathered = Vec::new();
        for seed in seeds.choose_multiple(&mut rng, SIMILARITY_SEEDS) {
            match self.backend.similar_songs(&seed.id, SIMILAR_PER_SEED) {
                Ok(raws) => gathered.extend(normalize(&raws)),
                Err(err) => {
                    report.issue(format!("similarity for '{}' unavailable: {err}", seed.title));
                }
            }
        }
        report.tracks = dedupe_last_wins(gathered);
        report
    }

    /// Random tracks from genres absent from the frequently played set.
    fn divergent(&self) -> HarvestReport {
        let mut report = HarvestReport::default();
        let frequent =
            self.albums_or_issue(AlbumCriteria::Frequent, DIVERGENT_FREQUENT_SAMPLE, &mut report);
        let familiar: HashSet<String> = frequent
            .iter()
            .filter_map(|alb| alb.get("genre").and_then(Value::as_str))
            .map(ToString::to_string)
            .collect();

        let all_genres = match self.backend.genres() {
            Ok(raws) => raws,
            Err(err) => {
                report.issue(format!("genre listing failed: {err}"));
                return report;
            }
        };
        let mut unfamiliar: Vec<String> = all_genres
            .iter()
            .filter_map(crate::track::genre_name)
            .filter(|name| !familiar.contains(name))
            .collect();
        if unfamiliar.is_empty() {
            report.issue("no divergence found: every genre is already familiar".to_string());
            return report;
        }

        unfamiliar.shuffle(&mut thread_rng());
        for genre in unfamiliar.iter().take(DIVERGENT_GENRE_SAMPLE) {
            match self
                .backend
                .random_songs_by_genre(genre, DIVERGENT_TRACKS_PER_GENRE)
            {
                Ok(raws) => report.tracks.extend(normalize(&raws)),
                Err(err) => report.issue(format!("sampling genre '{genre}' failed: {err}")),
            }
        }
        report
    }

    /// Lists albums, degrading to an empty list plus an issue on failure.
    fn albums_or_issue(
        &self,
        criteria: AlbumCriteria,
        size: usize,
        report: &mut HarvestReport,
    ) -> Vec<Value> {
        match self.backend.albums(criteria, size) {
            Ok(albums) => albums,
            Err(err) => {
                report.issue(format!("{} album listing failed: {err}", criteria.as_str()));
                Vec::new()
            }
        }
    }

    /// Normalized, non-directory children of an album record, or `None`
    /// with an issue noted when the lookup fails.
    fn album_tracks_or_issue(
        &self,
        album: &Value,
        report: &mut HarvestReport,
    ) -> Option<Vec<Track>> {
        let album_id = album.get("id").and_then(Value::as_str)?;
        match self.backend.album_tracks(album_id) {
            Ok(children) => Some(
                children
                    .iter()
                    .filter(|child| !is_directory(child))
                    .filter_map(Track::from_raw)
                    .collect(),
            ),
            Err(err) => {
                report.issue(format!("album {album_id} lookup failed: {err}"));
                None
            }
        }
    }
}

/// Normalizes raw song records, silently dropping any without an `id`.
fn normalize(raws: &[Value]) -> Vec<Track> {
    raws.iter().filter_map(Track::from_raw).collect()
}
