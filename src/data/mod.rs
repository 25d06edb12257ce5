//! Core data models for the propfeed cache
//!
//! This module contains the entity types that make up a published snapshot:
//! sports, players, games, and projections. Entities are immutable once they
//! are placed into a snapshot and reference each other by ID only.

pub mod raw;

pub use raw::{RawDocument, RawPayload, RawResource};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sport (league) offered by the upstream provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sport {
    /// Upstream league ID (e.g. 7 for NBA)
    pub id: u32,
    /// Display name of the sport
    pub name: String,
    /// Optional category grouping from the provider
    pub category: Option<String>,
    /// Whether the sport is currently active upstream
    pub active: bool,
}

/// A player referenced by at least one projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Upstream player ID
    pub id: String,
    /// Display name of the player
    pub name: String,
    /// Team abbreviation, if provided upstream
    pub team: Option<String>,
    /// Playing position, if provided upstream
    pub position: Option<String>,
    /// ID of the sport this player belongs to
    pub sport_id: u32,
}

/// A scheduled or in-progress game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    /// Upstream game ID
    pub id: String,
    /// ID of the sport this game belongs to
    pub sport_id: u32,
    /// Home team name, if known
    pub home_team: Option<String>,
    /// Away team name, if known
    pub away_team: Option<String>,
    /// Scheduled start time, if known
    pub start_time: Option<DateTime<Utc>>,
    /// Game status string from the provider, if known
    pub status: Option<String>,
}

/// A single player projection (prop line) from the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Upstream projection ID
    pub id: String,
    /// ID of the player this projection is for
    pub player_id: String,
    /// ID of the sport this projection belongs to
    pub sport_id: u32,
    /// ID of the game this projection is attached to, if any
    pub game_id: Option<String>,
    /// Stat type string (e.g. "Points", "Rebounds")
    pub stat_type: String,
    /// The projected line value
    pub line_score: f64,
    /// Free-form description from the provider
    pub description: Option<String>,
    /// Start time of the underlying game, if known
    pub start_time: Option<DateTime<Utc>>,
    /// Whether the projection is currently active
    pub is_active: bool,
}
