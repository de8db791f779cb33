//! Incremental best-first search over a wall grid.
//!
//! [GridPathfinder] runs one expansion step per
//! [continue_query](GridPathfinder::continue_query) call so a caller can
//! interleave rendering, input handling or cancellation between steps. Search
//! state per
//! cell is kept in a generation-tagged record arena that is reset lazily: a
//! record whose generation differs from the current query counter is treated
//! as untouched, which avoids clearing the whole grid on every query.

use std::cmp::Ordering;

use grid_util::point::Point;
use log::{debug, info};

use crate::error::QueryError;
use crate::heap::{IndexedHeap, Keyed};
use crate::terrain::TerrainOracle;

/// Default multiplier applied to the heuristic. Deliberately above 1.0: the
/// search converges faster at the price of returning near-shortest rather
/// than shortest paths.
pub const DEFAULT_HEURISTIC_WEIGHT: f32 = 1.05;

const SQRT_2: f32 = std::f32::consts::SQRT_2;

/// King-move offsets in circular order. Diagonals sit at odd indices, so the
/// two orthogonal directions flanking diagonal `i` are `(i + 7) % 8` and
/// `(i + 1) % 8`.
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

fn neighbor_of(cell: Point, direction: usize) -> Point {
    let (dx, dy) = DIRECTIONS[direction];
    Point::new(cell.x + dx, cell.y + dy)
}

/// Octile distance: the cost of the cheapest king-move path between two
/// cells on an open grid, with straight steps costing 1 and diagonal steps
/// √2.
pub fn octile_distance(from: Point, to: Point) -> f32 {
    let dx = (from.x - to.x).abs();
    let dy = (from.y - to.y).abs();
    let min = dx.min(dy);
    let max = dx.max(dy);
    min as f32 * SQRT_2 + (max - min) as f32
}

/// Progress of the current query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchState {
    /// No query started yet.
    Ready,
    /// A query is in flight; call
    /// [continue_query](GridPathfinder::continue_query) to advance it.
    Working,
    /// The query finished, either with a path or with the frontier
    /// exhausted.
    Done,
}

/// Sink for per-step search events. Purely for external visualization; the
/// search never depends on it.
pub trait SearchObserver {
    /// `cell` entered the frontier for the first time this query.
    fn cell_opened(&mut self, cell: Point);

    /// `cell` was finalized; it will not be expanded again this query.
    fn cell_closed(&mut self, cell: Point);
}

/// The null observer.
impl SearchObserver for () {
    fn cell_opened(&mut self, _cell: Point) {}

    fn cell_closed(&mut self, _cell: Point) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
enum Membership {
    #[default]
    Unvisited,
    Open,
    Closed,
}

/// Per-cell search state, valid only while `generation` matches the
/// pathfinder's current query counter.
#[derive(Clone, Copy, Debug)]
struct NodeRecord {
    given_cost: f32,
    total_cost: f32,
    parent: Option<Point>,
    membership: Membership,
    generation: u64,
}

impl Default for NodeRecord {
    fn default() -> NodeRecord {
        NodeRecord {
            given_cost: f32::INFINITY,
            total_cost: f32::INFINITY,
            parent: None,
            membership: Membership::Unvisited,
            generation: 0,
        }
    }
}

/// Frontier entry: ordered by total cost, identified by cell so a cheaper
/// route can reposition the cell's existing entry.
#[derive(Clone, Copy, Debug)]
struct FrontierEntry {
    total_cost: f32,
    cell: Point,
}

impl Keyed for FrontierEntry {
    type Key = Point;

    fn key(&self) -> Point {
        self.cell
    }
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &FrontierEntry) -> bool {
        self.total_cost.total_cmp(&other.total_cost).is_eq()
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &FrontierEntry) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &FrontierEntry) -> Ordering {
        self.total_cost.total_cmp(&other.total_cost)
    }
}

/// Incremental 8-directional pathfinder over a [TerrainOracle].
///
/// The terrain is borrowed per call and may change freely between queries;
/// changes are picked up at the next
/// [start_query](GridPathfinder::start_query). It must not change while a
/// query is working.
pub struct GridPathfinder {
    records: Vec<NodeRecord>,
    record_cols: usize,
    record_rows: usize,
    frontier: IndexedHeap<FrontierEntry>,
    generation: u64,
    state: SearchState,
    start: Point,
    goal: Point,
    result: Option<Vec<Point>>,
    seen_revision: u64,
    /// Multiplier applied to the heuristic. Values above 1.0 bias the search
    /// toward the goal; paths are then near-shortest under the configured
    /// weight, not shortest.
    pub heuristic_weight: f32,
}

impl Default for GridPathfinder {
    fn default() -> GridPathfinder {
        GridPathfinder::new()
    }
}

impl GridPathfinder {
    pub fn new() -> GridPathfinder {
        GridPathfinder {
            records: Vec::new(),
            record_cols: 0,
            record_rows: 0,
            frontier: IndexedHeap::new(),
            generation: 0,
            state: SearchState::Ready,
            start: Point::new(0, 0),
            goal: Point::new(0, 0),
            result: None,
            seen_revision: 0,
            heuristic_weight: DEFAULT_HEURISTIC_WEIGHT,
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    /// The path of the last finished query, start to goal inclusive, or
    /// [None] while the query is unfinished or when no route exists.
    pub fn result(&self) -> Option<&[Point]> {
        self.result.as_deref()
    }

    /// Begins a new query, invalidating any previous one. Fails fast when an
    /// endpoint is out of bounds; a walled-in or walled-on goal is not an
    /// error and simply exhausts into an empty result.
    pub fn start_query<T: TerrainOracle>(
        &mut self,
        terrain: &T,
        start: Point,
        goal: Point,
    ) -> Result<(), QueryError> {
        for position in [start, goal] {
            if !terrain.is_valid_position(position) {
                return Err(QueryError::OutOfBounds {
                    position,
                    cols: terrain.cols(),
                    rows: terrain.rows(),
                });
            }
        }
        self.sync_records(terrain);
        self.generation += 1;
        self.frontier.clear();
        self.result = None;
        self.start = start;
        self.goal = goal;
        debug!("query {}: {} -> {}", self.generation, start, goal);

        let total_cost = octile_distance(start, goal) * self.heuristic_weight;
        let start_ix = self.record_ix(start);
        self.records[start_ix] = NodeRecord {
            given_cost: 0.0,
            total_cost,
            parent: None,
            membership: Membership::Open,
            generation: self.generation,
        };
        // The frontier was just cleared, so the push cannot collide.
        self.frontier
            .push(FrontierEntry {
                total_cost,
                cell: start,
            })
            .unwrap();
        self.state = SearchState::Working;
        Ok(())
    }

    /// Performs exactly one expansion step. See
    /// [continue_query_observed](GridPathfinder::continue_query_observed).
    pub fn continue_query<T: TerrainOracle>(&mut self, terrain: &T) -> SearchState {
        self.continue_query_observed(terrain, &mut ())
    }

    /// Performs exactly one expansion step: pops the cheapest frontier cell
    /// and either finishes the query (goal popped, or frontier exhausted
    /// meaning no route exists) or relaxes up to eight neighbors. Does
    /// nothing unless a query is [working](SearchState::Working).
    pub fn continue_query_observed<T, O>(&mut self, terrain: &T, observer: &mut O) -> SearchState
    where
        T: TerrainOracle,
        O: SearchObserver,
    {
        if self.state != SearchState::Working {
            return self.state;
        }
        let current = match self.frontier.pop() {
            Ok(entry) => entry.cell,
            Err(_) => {
                info!("query {}: frontier exhausted, no route exists", self.generation);
                self.state = SearchState::Done;
                return self.state;
            }
        };
        if current == self.goal {
            let current_ix = self.record_ix(current);
            self.records[current_ix].membership = Membership::Closed;
            observer.cell_closed(current);
            let path = self.reconstruct_path();
            info!("query {}: found path with {} cells", self.generation, path.len());
            self.result = Some(path);
            self.state = SearchState::Done;
            return self.state;
        }

        let current_given = self.records[self.record_ix(current)].given_cost;
        for direction in 0..DIRECTIONS.len() {
            let neighbor = neighbor_of(current, direction);
            if !terrain.is_valid_position(neighbor) || terrain.is_wall(neighbor) {
                continue;
            }
            let diagonal = direction % 2 == 1;
            if diagonal && !corner_is_open(terrain, current, direction) {
                continue;
            }
            let step_cost = if diagonal { SQRT_2 } else { 1.0 };
            let given_cost = current_given + step_cost;
            let total_cost =
                given_cost + octile_distance(neighbor, self.goal) * self.heuristic_weight;

            let neighbor_ix = self.record_ix(neighbor);
            let record = &mut self.records[neighbor_ix];
            if record.generation != self.generation {
                *record = NodeRecord {
                    generation: self.generation,
                    ..NodeRecord::default()
                };
            }
            if total_cost >= record.total_cost {
                continue;
            }
            record.given_cost = given_cost;
            record.total_cost = total_cost;
            record.parent = Some(current);
            match record.membership {
                Membership::Open => {
                    // The frontier entry mirrors the record's total, so this
                    // is a strict decrease.
                    self.frontier
                        .decrease_key(FrontierEntry {
                            total_cost,
                            cell: neighbor,
                        })
                        .unwrap();
                }
                Membership::Unvisited => {
                    record.membership = Membership::Open;
                    self.frontier
                        .push(FrontierEntry {
                            total_cost,
                            cell: neighbor,
                        })
                        .unwrap();
                    observer.cell_opened(neighbor);
                }
                // A cheaper route into an already finalized cell updates its
                // record but does not reopen it.
                Membership::Closed => {}
            }
        }
        let current_ix = self.record_ix(current);
        self.records[current_ix].membership = Membership::Closed;
        observer.cell_closed(current);
        self.state
    }

    /// Drives [continue_query](GridPathfinder::continue_query) until the
    /// query finishes, for callers with nothing to interleave.
    pub fn run_to_completion<T: TerrainOracle>(&mut self, terrain: &T) -> Option<&[Point]> {
        while self.state == SearchState::Working {
            self.continue_query(terrain);
        }
        self.result()
    }

    /// Consumes the oracle's change notification: notes the latest revision
    /// and grows the record arena when the grid outgrew it. A fresh arena
    /// carries generation 0, which every live generation treats as stale.
    fn sync_records<T: TerrainOracle>(&mut self, terrain: &T) {
        let revision = terrain.revision();
        if revision != self.seen_revision {
            debug!("terrain changed (revision {revision}), syncing node storage");
            self.seen_revision = revision;
        }
        let cols = terrain.cols();
        let rows = terrain.rows();
        if cols > self.record_cols || rows > self.record_rows {
            self.record_cols = self.record_cols.max(cols);
            self.record_rows = self.record_rows.max(rows);
            self.records =
                vec![NodeRecord::default(); self.record_cols * self.record_rows];
        }
    }

    fn record_ix(&self, cell: Point) -> usize {
        cell.y as usize * self.record_cols + cell.x as usize
    }

    /// Walks the parent links back from the goal and reverses the chain into
    /// start-to-goal order.
    fn reconstruct_path(&self) -> Vec<Point> {
        let mut path: Vec<Point> = itertools::unfold(Some(self.goal), |cursor| {
            let cell = (*cursor)?;
            *cursor = self.records[self.record_ix(cell)].parent;
            Some(cell)
        })
        .collect();
        path.reverse();
        path
    }
}

/// A diagonal move may not cut a corner: both orthogonal cells flanking the
/// diagonal must be inside the grid and free of walls.
fn corner_is_open<T: TerrainOracle>(terrain: &T, cell: Point, direction: usize) -> bool {
    let flank_a = neighbor_of(cell, (direction + 7) % 8);
    let flank_b = neighbor_of(cell, (direction + 1) % 8);
    terrain.is_valid_position(flank_a)
        && !terrain.is_wall(flank_a)
        && terrain.is_valid_position(flank_b)
        && !terrain.is_wall(flank_b)
}
