use grid_util::point::Point;
use thiserror::Error;

/// Errors surfaced by [IndexedHeap](crate::heap::IndexedHeap) operations.
///
/// All of these indicate misuse by the caller; the heap never reaches an
/// inconsistent state after returning one.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
    /// An entry with the same identity key is already stored.
    #[error("heap does not allow duplicate keys")]
    DuplicateKey,
    /// The heap holds no entries.
    #[error("heap is empty")]
    Empty,
    /// No stored entry has the requested identity key.
    #[error("no entry with the given key")]
    NotFound,
    /// The replacement entry does not strictly move in the declared
    /// direction; unchanged entries are rejected rather than ignored.
    #[error("key change must strictly move in the declared direction")]
    InvalidKeyChange,
}

/// Errors surfaced by [GridPathfinder](crate::pathfinder::GridPathfinder)
/// queries. A search that merely finds no route is not an error; it finishes
/// with an empty result instead.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum QueryError {
    /// A query endpoint lies outside the terrain bounds.
    #[error("position {position} is outside the {cols}x{rows} grid")]
    OutOfBounds {
        position: Point,
        cols: usize,
        rows: usize,
    },
}

/// Errors surfaced when parsing a terrain map from text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TerrainError {
    #[error("map has no tiles")]
    EmptyMap,
    #[error("map row {row} is {found} tiles wide, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("unknown map tile {0:?}")]
    UnknownTile(char),
}
