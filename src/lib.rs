//! # incremental_pathfinding
//!
//! An incremental grid pathfinding system. Runs
//! [weighted A*](https://en.wikipedia.org/wiki/A*_search_algorithm) over a
//! uniform-cost grid with 8-directional movement one expansion step at a
//! time, so a long search never blocks the caller's control loop. Built on
//! an indexed binary heap with O(log n) key updates, and pre-computes
//! [connected components](https://en.wikipedia.org/wiki/Component_(graph_theory))
//! so callers can reject queries between disconnected regions without
//! flood-filling.

pub mod error;
pub mod heap;
pub mod pathfinder;
pub mod terrain;

pub use error::{HeapError, QueryError, TerrainError};
pub use heap::{IndexedHeap, Keyed};
pub use pathfinder::{
    octile_distance, GridPathfinder, SearchObserver, SearchState, DEFAULT_HEURISTIC_WEIGHT,
};
pub use terrain::{positions_between, Terrain, TerrainOracle};
