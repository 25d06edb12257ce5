//! Propfeed library
//!
//! Fronts a PrizePicks-style sports projections provider with a periodically
//! refreshed in-memory cache and filtered read views over immutable
//! snapshots. The binary in `main.rs` wires the components together and
//! serves the thin HTTP layer in [`api`].

pub mod api;
pub mod cli;
pub mod config;
pub mod data;
pub mod normalize;
pub mod query;
pub mod scheduler;
pub mod snapshot;
pub mod upstream;
