//! Normalizer: turns a raw upstream payload into a publishable snapshot
//!
//! Parses the JSON:API documents fetched by the upstream client, materializes
//! typed entities, resolves cross-references, and builds the lookup indices.
//! Per-record failures never abort a build: malformed records and dangling
//! references are dropped and counted, so a partially-broken upstream payload
//! still yields a usable snapshot.
//!
//! Field rules, per entity:
//! - Sport: numeric ID and `name` required; `active` defaults to true.
//! - Player: `name` required; team and position optional. A player's sport is
//!   taken from the first projection that references them.
//! - Projection: player reference, league reference, `stat_type`, and
//!   `line_score` required; the game reference is optional.
//! - Game: materialized from the projection's game reference; all attributes
//!   optional (the reference itself can never dangle).

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::warn;

use crate::data::raw::{RawDocument, RawPayload, RawResource};
use crate::data::{Game, Player, Projection, Sport};
use crate::snapshot::{SkipCounts, Snapshot, SportIndex};

/// Errors that can abort a snapshot build
#[derive(Debug, Error)]
pub enum BuildError {
    /// The payload contained no parseable records at all
    #[error("upstream payload was empty or unparseable")]
    EmptyPayload,
}

/// Builds snapshots from raw upstream payloads
///
/// Stateless; one normalizer is shared by all refresh cycles.
#[derive(Debug, Clone, Default)]
pub struct Normalizer;

impl Normalizer {
    /// Creates a new Normalizer
    pub fn new() -> Self {
        Self
    }

    /// Builds a snapshot from the raw payload of one fetch
    ///
    /// # Returns
    /// * `Ok(Snapshot)` - A fully-indexed snapshot; `skipped` records how many
    ///   records were dropped
    /// * `Err(BuildError::EmptyPayload)` - If no entity could be materialized
    pub fn build(&self, payload: &RawPayload) -> Result<Snapshot, BuildError> {
        let leagues_doc = parse_document(&payload.leagues);
        let projections_doc = parse_document(&payload.projections);

        if leagues_doc.resource_count() + projections_doc.resource_count() == 0 {
            return Err(BuildError::EmptyPayload);
        }

        let mut skipped = SkipCounts::default();

        // Sports come from /leagues; leagues included in the projections
        // document fill in any the dedicated endpoint missed.
        let mut sports: BTreeMap<u32, Sport> = BTreeMap::new();
        for resource in leagues_doc
            .data
            .iter()
            .chain(projections_doc.included.iter())
        {
            if resource.kind != "league" {
                continue;
            }
            match parse_sport(resource) {
                Some(sport) => {
                    sports.entry(sport.id).or_insert(sport);
                }
                None => skipped.sports += 1,
            }
        }

        // Lookup tables for the resources included alongside projections.
        let mut raw_players: HashMap<&str, &RawResource> = HashMap::new();
        let mut raw_games: HashMap<&str, &RawResource> = HashMap::new();
        for resource in &projections_doc.included {
            match resource.kind.as_str() {
                "new_player" => {
                    raw_players.entry(resource.id.as_str()).or_insert(resource);
                }
                "game" => {
                    raw_games.entry(resource.id.as_str()).or_insert(resource);
                }
                _ => {}
            }
        }

        // Process projections in ID order so duplicate IDs resolve
        // deterministically (first by ID wins).
        let mut projection_resources: Vec<&RawResource> = projections_doc
            .data
            .iter()
            .filter(|r| r.kind == "projection")
            .collect();
        projection_resources.sort_by(|a, b| a.id.cmp(&b.id));

        let mut players: BTreeMap<String, Player> = BTreeMap::new();
        let mut games: BTreeMap<String, Game> = BTreeMap::new();
        let mut projections: BTreeMap<String, Projection> = BTreeMap::new();
        let mut unresolved_players: HashSet<String> = HashSet::new();

        for resource in projection_resources {
            if projections.contains_key(&resource.id) {
                continue;
            }

            // Required references and attributes; anything missing drops
            // the record.
            let Some(player_id) = resource
                .relationships
                .new_player
                .as_ref()
                .and_then(|r| r.id())
            else {
                skipped.projections += 1;
                continue;
            };
            let Some(sport_id) = resource
                .relationships
                .league
                .as_ref()
                .and_then(|r| r.id())
                .and_then(|id| id.parse::<u32>().ok())
            else {
                skipped.projections += 1;
                continue;
            };
            if !sports.contains_key(&sport_id) {
                // Dangling league reference.
                skipped.projections += 1;
                continue;
            }
            let Some(stat_type) = resource.attributes.stat_type.clone() else {
                skipped.projections += 1;
                continue;
            };
            let Some(line_score) = resource.attributes.line_score else {
                skipped.projections += 1;
                continue;
            };

            // Materialize the player on first use; an unresolvable player
            // makes the projection reference dangling.
            if !players.contains_key(player_id) {
                match raw_players
                    .get(player_id)
                    .and_then(|raw| parse_player(raw, sport_id))
                {
                    Some(player) => {
                        players.insert(player.id.clone(), player);
                    }
                    None => {
                        if unresolved_players.insert(player_id.to_string()) {
                            skipped.players += 1;
                        }
                        skipped.projections += 1;
                        continue;
                    }
                }
            }

            // The game reference is repaired rather than dropped: a game
            // entity is materialized from the reference itself, with
            // attributes filled in when the provider included the record.
            let game_id = resource
                .relationships
                .game
                .as_ref()
                .and_then(|r| r.id())
                .map(str::to_string);
            if let Some(ref gid) = game_id {
                games
                    .entry(gid.clone())
                    .or_insert_with(|| materialize_game(gid, sport_id, raw_games.get(gid.as_str()).copied()));
            }

            let projection = Projection {
                id: resource.id.clone(),
                player_id: player_id.to_string(),
                sport_id,
                game_id,
                stat_type,
                line_score,
                description: resource.attributes.description.clone(),
                start_time: resource
                    .attributes
                    .start_time
                    .as_deref()
                    .and_then(parse_timestamp),
                is_active: resource.attributes.is_active.unwrap_or(true),
            };
            projections.insert(projection.id.clone(), projection);
        }

        if sports.is_empty() && players.is_empty() && games.is_empty() && projections.is_empty() {
            // Every record was malformed; publishing this would clobber the
            // previous good snapshot with nothing.
            return Err(BuildError::EmptyPayload);
        }

        if skipped.total() > 0 {
            warn!(
                sports = skipped.sports,
                players = skipped.players,
                games = skipped.games,
                projections = skipped.projections,
                "dropped malformed upstream records"
            );
        }

        Ok(build_indexed_snapshot(
            sports,
            players,
            games,
            projections,
            skipped,
        ))
    }
}

/// Assembles the snapshot and derives all lookup indices
fn build_indexed_snapshot(
    sports: BTreeMap<u32, Sport>,
    players: BTreeMap<String, Player>,
    games: BTreeMap<String, Game>,
    projections: BTreeMap<String, Projection>,
    skipped: SkipCounts,
) -> Snapshot {
    let mut by_sport: HashMap<u32, SportIndex> = sports
        .keys()
        .map(|id| (*id, SportIndex::default()))
        .collect();

    for player in players.values() {
        if let Some(index) = by_sport.get_mut(&player.sport_id) {
            index.player_ids.push(player.id.clone());
        }
    }
    for game in games.values() {
        if let Some(index) = by_sport.get_mut(&game.sport_id) {
            index.game_ids.push(game.id.clone());
        }
    }

    // Duplicate names resolve to the smallest player ID; BTreeMap iteration
    // is ascending so the first insert wins.
    let mut by_player_name: HashMap<String, String> = HashMap::new();
    for player in players.values() {
        by_player_name
            .entry(player.name.to_lowercase())
            .or_insert_with(|| player.id.clone());
    }

    let mut by_stat_type: HashMap<String, Vec<String>> = HashMap::new();
    let mut by_game: HashMap<String, Vec<String>> =
        games.keys().map(|id| (id.clone(), Vec::new())).collect();

    for projection in projections.values() {
        if let Some(index) = by_sport.get_mut(&projection.sport_id) {
            index.projection_ids.push(projection.id.clone());
        }
        by_stat_type
            .entry(projection.stat_type.to_lowercase())
            .or_default()
            .push(projection.id.clone());
        if let Some(ref game_id) = projection.game_id {
            if let Some(bucket) = by_game.get_mut(game_id) {
                bucket.push(projection.id.clone());
            }
        }
    }

    Snapshot {
        version: 0, // assigned by the store on publish
        built_at: Utc::now(),
        sports,
        players,
        games,
        projections,
        by_sport,
        by_player_name,
        by_stat_type,
        by_game,
        skipped,
    }
}

/// Parses a document body, treating unparseable JSON as an empty document
fn parse_document(body: &str) -> RawDocument {
    serde_json::from_str(body).unwrap_or_default()
}

/// Parses a league resource into a Sport; None drops the record
fn parse_sport(resource: &RawResource) -> Option<Sport> {
    let id = resource.id.parse().ok()?;
    let name = resource.attributes.name.clone()?;
    Some(Sport {
        id,
        name,
        category: resource.attributes.category.clone(),
        active: resource.attributes.active.unwrap_or(true),
    })
}

/// Parses an included player resource into a Player; None drops the record
fn parse_player(resource: &RawResource, sport_id: u32) -> Option<Player> {
    let name = resource.attributes.name.clone()?;
    Some(Player {
        id: resource.id.clone(),
        name,
        team: resource.attributes.team.clone(),
        position: resource.attributes.position.clone(),
        sport_id,
    })
}

/// Materializes a game from a projection's game reference
fn materialize_game(id: &str, sport_id: u32, raw: Option<&RawResource>) -> Game {
    let attributes = raw.map(|r| &r.attributes);
    Game {
        id: id.to_string(),
        sport_id,
        home_team: attributes.and_then(|a| a.home_team.clone()),
        away_team: attributes.and_then(|a| a.away_team.clone()),
        start_time: attributes
            .and_then(|a| a.start_time.as_deref())
            .and_then(parse_timestamp),
        status: attributes.and_then(|a| a.status.clone()),
    }
}

/// Parses an ISO 8601 timestamp, tolerating the provider's `Z` suffix
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
