//! Immutable snapshots and the store that publishes them
//!
//! A [`Snapshot`] is the unit of consistency: all four entity collections
//! plus the derived lookup indices, built once by the normalizer and never
//! mutated afterwards. The [`SnapshotStore`] holds the currently-served
//! snapshot behind a single pointer and swaps it atomically on publish;
//! readers hold an `Arc` so superseded snapshots stay alive until the last
//! reader drops its handle.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::data::{Game, Player, Projection, Sport};

/// Per-sport subsets of the snapshot, ordered by entity ID
#[derive(Debug, Clone, Default, Serialize)]
pub struct SportIndex {
    /// IDs of players in this sport
    pub player_ids: Vec<String>,
    /// IDs of games in this sport
    pub game_ids: Vec<String>,
    /// IDs of projections in this sport
    pub projection_ids: Vec<String>,
}

/// Counters for records dropped during normalization
///
/// A partially-malformed upstream payload still yields a usable snapshot;
/// these counts make the degradation observable.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SkipCounts {
    /// Sports dropped (malformed ID or missing name)
    pub sports: u32,
    /// Players dropped (missing name or unresolvable)
    pub players: u32,
    /// Games dropped (malformed record)
    pub games: u32,
    /// Projections dropped (missing required field or dangling reference)
    pub projections: u32,
}

impl SkipCounts {
    /// Total number of dropped records across all entity types
    pub fn total(&self) -> u32 {
        self.sports + self.players + self.games + self.projections
    }
}

/// Immutable, versioned aggregate of all cached entities plus indices
///
/// Entity maps are keyed by ID; `BTreeMap` keeps iteration deterministic
/// (ascending ID order), which the duplicate-resolution policy relies on.
#[derive(Debug, Default, Serialize)]
pub struct Snapshot {
    /// Monotonically increasing version, assigned by the store on publish
    pub version: u64,
    /// When the normalizer finished building this snapshot
    pub built_at: DateTime<Utc>,
    /// All sports, keyed by sport ID
    pub sports: BTreeMap<u32, Sport>,
    /// All players, keyed by player ID
    pub players: BTreeMap<String, Player>,
    /// All games, keyed by game ID
    pub games: BTreeMap<String, Game>,
    /// All projections, keyed by projection ID
    pub projections: BTreeMap<String, Projection>,
    /// Sport ID -> per-sport entity subsets
    pub by_sport: HashMap<u32, SportIndex>,
    /// Lowercased player name -> player ID (smallest ID wins on duplicates)
    pub by_player_name: HashMap<String, String>,
    /// Lowercased stat type -> projection IDs
    pub by_stat_type: HashMap<String, Vec<String>>,
    /// Game ID -> projection IDs attached to that game
    pub by_game: HashMap<String, Vec<String>>,
    /// Records dropped while building this snapshot
    pub skipped: SkipCounts,
}

impl Snapshot {
    /// Creates the empty bootstrap snapshot served before any refresh succeeds
    pub fn empty() -> Self {
        Self {
            built_at: Utc::now(),
            ..Self::default()
        }
    }

    /// Whether the snapshot contains no entities at all
    pub fn is_empty(&self) -> bool {
        self.sports.is_empty()
            && self.players.is_empty()
            && self.games.is_empty()
            && self.projections.is_empty()
    }
}

/// Holds the currently-served snapshot and swaps it atomically
///
/// The current-snapshot pointer is the only shared mutable state in the
/// system. The write lock is held only for the pointer assignment, so
/// `current()` never blocks on an in-progress refresh and readers never
/// observe a partially-built snapshot.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
    next_version: AtomicU64,
}

impl SnapshotStore {
    /// Creates a store serving the empty bootstrap snapshot (version 0)
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
            next_version: AtomicU64::new(1),
        }
    }

    /// Returns a handle to the latest published snapshot
    ///
    /// Non-blocking apart from the momentary read lock on the pointer.
    /// Before the first publish this is the empty snapshot, not an error.
    pub fn current(&self) -> Arc<Snapshot> {
        // Snapshots are immutable, so a poisoned lock still guards a valid
        // pointer; recover the guard instead of propagating the panic.
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Atomically replaces the current snapshot and assigns its version
    ///
    /// The previous snapshot is retired once the last outstanding reader
    /// drops its handle. Returns the version assigned to the new snapshot.
    pub fn publish(&self, mut snapshot: Snapshot) -> u64 {
        let version = self.next_version.fetch_add(1, Ordering::Relaxed);
        snapshot.version = version;
        let next = Arc::new(snapshot);

        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = next;

        version
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Sport;

    fn snapshot_with_sport(id: u32, name: &str) -> Snapshot {
        let mut snapshot = Snapshot::empty();
        snapshot.sports.insert(
            id,
            Sport {
                id,
                name: name.to_string(),
                category: None,
                active: true,
            },
        );
        snapshot
    }

    #[test]
    fn test_bootstrap_snapshot_is_empty_version_zero() {
        let store = SnapshotStore::new();
        let current = store.current();

        assert_eq!(current.version, 0);
        assert!(current.is_empty());
    }

    #[test]
    fn test_publish_assigns_increasing_versions() {
        let store = SnapshotStore::new();

        let v1 = store.publish(snapshot_with_sport(7, "NBA"));
        let v2 = store.publish(snapshot_with_sport(2, "NFL"));

        assert_eq!(v1, 1);
        assert_eq!(v2, 2);
        assert_eq!(store.current().version, 2);
    }

    #[test]
    fn test_old_handle_survives_publish() {
        let store = SnapshotStore::new();
        store.publish(snapshot_with_sport(7, "NBA"));

        let old = store.current();
        store.publish(snapshot_with_sport(2, "NFL"));

        // The superseded snapshot stays fully intact for its holder.
        assert_eq!(old.version, 1);
        assert_eq!(old.sports.get(&7).map(|s| s.name.as_str()), Some("NBA"));
        assert_eq!(store.current().version, 2);
    }

    #[test]
    fn test_concurrent_reads_during_publishes_see_whole_snapshots() {
        let store = Arc::new(SnapshotStore::new());
        let writer_store = Arc::clone(&store);

        let writer = std::thread::spawn(move || {
            for i in 0..200u32 {
                // Each published snapshot carries exactly one sport, so a
                // torn read would show up as an inconsistent entity count.
                writer_store.publish(snapshot_with_sport(i, "Sport"));
            }
        });

        let reader_store = Arc::clone(&store);
        let reader = std::thread::spawn(move || {
            for _ in 0..500 {
                let snap = reader_store.current();
                assert!(snap.sports.len() <= 1);
                if snap.version > 0 {
                    assert_eq!(snap.sports.len(), 1);
                }
            }
        });

        writer.join().expect("writer thread panicked");
        reader.join().expect("reader thread panicked");

        assert_eq!(store.current().version, 200);
    }

    #[test]
    fn test_skip_counts_total() {
        let skipped = SkipCounts {
            sports: 1,
            players: 2,
            games: 3,
            projections: 4,
        };
        assert_eq!(skipped.total(), 10);
    }
}
