//! Read-side query engine over published snapshots
//!
//! Every operation grabs one snapshot handle at entry, so a single logical
//! request sees one consistent snapshot even if a refresh publishes while it
//! runs. All operations are pure reads; filtered lookups go through the
//! snapshot indices, and only the unfiltered listings walk a full collection.

use std::sync::Arc;

use crate::data::{Game, Player, Projection, Sport};
use crate::snapshot::{Snapshot, SnapshotStore};

/// Filters for listing projections; absent filters are no-ops, filters are
/// ANDed, and an unknown value yields an empty result rather than an error
#[derive(Debug, Clone, Default)]
pub struct ProjectionFilter {
    /// Restrict to one sport by ID
    pub sport_id: Option<u32>,
    /// Restrict to one player by case-insensitive exact name
    pub player_name: Option<String>,
    /// Restrict to one stat type, case-insensitive
    pub stat_type: Option<String>,
    /// Restrict to projections attached to one game
    pub game_id: Option<String>,
}

/// Answers filtered read requests against the current snapshot
#[derive(Debug, Clone)]
pub struct QueryEngine {
    store: Arc<SnapshotStore>,
}

impl QueryEngine {
    /// Creates a query engine reading from the given store
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }

    /// Lists all sports in the current snapshot, ordered by ID
    pub fn list_sports(&self) -> Vec<Sport> {
        self.store.current().sports.values().cloned().collect()
    }

    /// Looks up a sport by ID
    pub fn get_sport(&self, id: u32) -> Option<Sport> {
        self.store.current().sports.get(&id).cloned()
    }

    /// Lists players, optionally restricted to one sport
    ///
    /// An unknown sport ID yields an empty list.
    pub fn list_players(&self, sport_id: Option<u32>) -> Vec<Player> {
        let snapshot = self.store.current();
        match sport_id {
            Some(id) => snapshot
                .by_sport
                .get(&id)
                .map(|index| {
                    index
                        .player_ids
                        .iter()
                        .filter_map(|pid| snapshot.players.get(pid))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            None => snapshot.players.values().cloned().collect(),
        }
    }

    /// Looks up a player by case-insensitive exact name
    ///
    /// When multiple players share a name, the one with the smallest ID is
    /// returned (the index is built that way).
    pub fn get_player(&self, name: &str) -> Option<Player> {
        let snapshot = self.store.current();
        snapshot
            .by_player_name
            .get(&name.to_lowercase())
            .and_then(|id| snapshot.players.get(id))
            .cloned()
    }

    /// Lists projections matching all given filters
    pub fn list_projections(&self, filter: &ProjectionFilter) -> Vec<Projection> {
        let snapshot = self.store.current();

        // Resolve the player filter through the name index first; an unknown
        // name can never match anything.
        let player_id = match filter.player_name {
            Some(ref name) => match snapshot.by_player_name.get(&name.to_lowercase()) {
                Some(id) => Some(id.clone()),
                None => return Vec::new(),
            },
            None => None,
        };
        // A resolved player pins a sport, which bounds the candidate scan
        // even when no sport filter was given.
        let player_sport = player_id
            .as_ref()
            .and_then(|id| snapshot.players.get(id))
            .map(|player| player.sport_id);

        let candidates = match candidate_ids(&snapshot, filter, player_sport) {
            Some(ids) => ids,
            None => return Vec::new(),
        };

        let stat_lower = filter.stat_type.as_ref().map(|s| s.to_lowercase());

        let matches = |projection: &Projection| -> bool {
            if let Some(sport_id) = filter.sport_id {
                if projection.sport_id != sport_id {
                    return false;
                }
            }
            if let Some(ref pid) = player_id {
                if projection.player_id != *pid {
                    return false;
                }
            }
            if let Some(ref stat) = stat_lower {
                if projection.stat_type.to_lowercase() != *stat {
                    return false;
                }
            }
            if let Some(ref gid) = filter.game_id {
                if projection.game_id.as_deref() != Some(gid.as_str()) {
                    return false;
                }
            }
            true
        };

        match candidates {
            Candidates::Ids(ids) => ids
                .iter()
                .filter_map(|id| snapshot.projections.get(id))
                .filter(|p| matches(p))
                .cloned()
                .collect(),
            Candidates::All => snapshot
                .projections
                .values()
                .filter(|p| matches(p))
                .cloned()
                .collect(),
        }
    }

    /// Lists games, optionally restricted to one sport
    pub fn list_games(&self, sport_id: Option<u32>) -> Vec<Game> {
        let snapshot = self.store.current();
        match sport_id {
            Some(id) => snapshot
                .by_sport
                .get(&id)
                .map(|index| {
                    index
                        .game_ids
                        .iter()
                        .filter_map(|gid| snapshot.games.get(gid))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            None => snapshot.games.values().cloned().collect(),
        }
    }

    /// Looks up a game by ID
    pub fn get_game(&self, id: &str) -> Option<Game> {
        self.store.current().games.get(id).cloned()
    }
}

/// Candidate projection set selected from the narrowest applicable index
enum Candidates {
    /// IDs from one index bucket
    Ids(Vec<String>),
    /// No indexed filter applies; scan everything
    All,
}

/// Picks the smallest index bucket matching the filter, or `None` when a
/// filter value is unknown to the snapshot (empty result)
///
/// `player_sport` is the sport of an already-resolved player filter; its
/// bucket competes with the explicit filters so a name-only query never
/// scans the whole projection collection.
fn candidate_ids(
    snapshot: &Snapshot,
    filter: &ProjectionFilter,
    player_sport: Option<u32>,
) -> Option<Candidates> {
    let mut best: Option<&Vec<String>> = None;

    for sport_id in filter.sport_id.into_iter().chain(player_sport) {
        let bucket = &snapshot.by_sport.get(&sport_id)?.projection_ids;
        if best.map_or(true, |b| bucket.len() < b.len()) {
            best = Some(bucket);
        }
    }
    if let Some(ref stat) = filter.stat_type {
        let bucket = snapshot.by_stat_type.get(&stat.to_lowercase())?;
        if best.map_or(true, |b| bucket.len() < b.len()) {
            best = Some(bucket);
        }
    }
    if let Some(ref game_id) = filter.game_id {
        let bucket = snapshot.by_game.get(game_id)?;
        if best.map_or(true, |b| bucket.len() < b.len()) {
            best = Some(bucket);
        }
    }

    Some(match best {
        Some(ids) => Candidates::Ids(ids.clone()),
        None => Candidates::All,
    })
}
