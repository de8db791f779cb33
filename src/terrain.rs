//! Wall/bounds terrain layer.
//!
//! [Terrain] owns the wall grid the pathfinder reads through the
//! [TerrainOracle] interface. It tracks a revision counter as its change
//! notification, and maintains connected components in a
//! [UnionFind] so callers can cheaply reject queries between disconnected
//! regions before spending any search effort on them.

use core::fmt;

use grid_util::grid::{BoolGrid, Grid};
use grid_util::point::Point;
use log::{debug, info};
use petgraph::unionfind::UnionFind;

use crate::error::TerrainError;

/// Read-only view of a wall/bounds grid, as consumed by the pathfinder.
///
/// [revision](TerrainOracle::revision) is the change notification: it must
/// increase whenever the dimensions or the wall layout change, and is polled
/// by the pathfinder at query boundaries to keep its node storage sized to
/// the grid.
pub trait TerrainOracle {
    fn cols(&self) -> usize;

    fn rows(&self) -> usize;

    fn revision(&self) -> u64;

    /// Whether `position` is a wall. Only called for valid positions.
    fn is_wall(&self, position: Point) -> bool;

    fn is_valid_position(&self, position: Point) -> bool {
        position.x >= 0
            && position.y >= 0
            && (position.x as usize) < self.cols()
            && (position.y as usize) < self.rows()
    }
}

/// Grid of walls with amortized component tracking.
///
/// Components are kept exact under the movement rule through orthogonal
/// adjacency alone: a legal diagonal move always has an open flanking cell,
/// so it never connects two regions on its own.
#[derive(Clone, Debug)]
pub struct Terrain {
    walls: BoolGrid,
    revision: u64,
    components: UnionFind<usize>,
    components_dirty: bool,
}

impl PartialEq for Terrain {
    fn eq(&self, other: &Terrain) -> bool {
        self.walls.width == other.walls.width
            && self.walls.height == other.walls.height
            && self.walls.values == other.walls.values
    }
}

impl Terrain {
    /// A wall-free grid of the given dimensions.
    pub fn new(cols: usize, rows: usize) -> Terrain {
        let mut terrain = Terrain {
            walls: BoolGrid::new(cols, rows, false),
            revision: 0,
            components: UnionFind::new(cols * rows),
            components_dirty: false,
        };
        terrain.generate_components();
        terrain
    }

    /// Parses the text format produced by the [Display](fmt::Display) impl:
    /// `#` for walls, `.` for open cells, one line per row with the last
    /// line as row 0. Leading/trailing blank lines are ignored; all rows
    /// must have the same width.
    pub fn from_map_str(map: &str) -> Result<Terrain, TerrainError> {
        let lines: Vec<&str> = map
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if lines.is_empty() {
            return Err(TerrainError::EmptyMap);
        }
        let rows = lines.len();
        let cols = lines[0].chars().count();
        if cols == 0 {
            return Err(TerrainError::EmptyMap);
        }
        let mut walls = BoolGrid::new(cols, rows, false);
        for (line_ix, line) in lines.iter().enumerate() {
            let row = rows - 1 - line_ix;
            let found = line.chars().count();
            if found != cols {
                return Err(TerrainError::RaggedRow {
                    row,
                    found,
                    expected: cols,
                });
            }
            for (col, tile) in line.chars().enumerate() {
                match tile {
                    '#' => walls.set(col, row, true),
                    '.' => {}
                    other => return Err(TerrainError::UnknownTile(other)),
                }
            }
        }
        let mut terrain = Terrain {
            walls,
            revision: 0,
            components: UnionFind::new(cols * rows),
            components_dirty: false,
        };
        terrain.generate_components();
        Ok(terrain)
    }

    pub fn cols(&self) -> usize {
        self.walls.width
    }

    pub fn rows(&self) -> usize {
        self.walls.height
    }

    /// Monotonic counter, bumped on every effective mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_valid_position(&self, position: Point) -> bool {
        position.x >= 0
            && position.y >= 0
            && self
                .walls
                .index_in_bounds(position.x as usize, position.y as usize)
    }

    pub fn is_wall(&self, position: Point) -> bool {
        debug_assert!(self.is_valid_position(position), "position out of bounds");
        self.walls.get_point(position)
    }

    /// Replaces the grid with a fresh wall-free one of the given dimensions.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.walls = BoolGrid::new(cols, rows, false);
        self.revision += 1;
        debug!("terrain resized to {cols}x{rows} (revision {})", self.revision);
        self.generate_components();
    }

    /// Removes every wall, keeping the dimensions.
    pub fn reset_walls(&mut self) {
        self.walls = BoolGrid::new(self.cols(), self.rows(), false);
        self.revision += 1;
        self.generate_components();
    }

    pub fn set_wall(&mut self, position: Point) {
        assert!(self.is_valid_position(position), "position out of bounds");
        if self.walls.get_point(position) {
            return;
        }
        self.walls.set_point(position, true);
        self.revision += 1;
        // A new wall may split a component; that cannot be resolved
        // incrementally, so regeneration is deferred until needed.
        self.components_dirty = true;
    }

    pub fn remove_wall(&mut self, position: Point) {
        assert!(self.is_valid_position(position), "position out of bounds");
        if !self.walls.get_point(position) {
            return;
        }
        self.walls.set_point(position, false);
        self.revision += 1;
        if self.components_dirty {
            return;
        }
        // Opening a cell only merges components, which union-find absorbs
        // incrementally.
        for (dx, dy) in [(1, 0), (0, 1), (-1, 0), (0, -1)] {
            let neighbor = Point::new(position.x + dx, position.y + dy);
            if self.is_valid_position(neighbor) && !self.walls.get_point(neighbor) {
                self.union(position, neighbor);
            }
        }
    }

    /// The editor's click behavior: flip a single cell between wall and open.
    pub fn toggle_wall(&mut self, position: Point) {
        if self.is_wall(position) {
            self.remove_wall(position);
        } else {
            self.set_wall(position);
        }
    }

    /// Paints walls over every cell the segment between `from` and `to`
    /// passes through, both endpoints included.
    pub fn set_wall_line(&mut self, from: Point, to: Point) {
        self.set_wall(from);
        for position in positions_between(from, to) {
            self.set_wall(position);
        }
    }

    /// Regenerates the components if a wall change invalidated them.
    pub fn update(&mut self) {
        if self.components_dirty {
            info!("components are dirty: regenerating");
            self.generate_components();
        }
    }

    /// Rebuilds the component structure from the wall layout.
    pub fn generate_components(&mut self) {
        let cols = self.cols();
        let rows = self.rows();
        self.components = UnionFind::new(cols * rows);
        self.components_dirty = false;
        for x in 0..cols as i32 {
            for y in 0..rows as i32 {
                let cell = Point::new(x, y);
                if self.walls.get_point(cell) {
                    continue;
                }
                for neighbor in [Point::new(x + 1, y), Point::new(x, y + 1)] {
                    if self.is_valid_position(neighbor) && !self.walls.get_point(neighbor) {
                        self.union(cell, neighbor);
                    }
                }
            }
        }
    }

    /// Whether a route between two open cells exists, answered from the
    /// component structure without searching. Exact as long as the
    /// components are current (see [update](Terrain::update)); walled or
    /// out-of-bounds endpoints are never reachable.
    pub fn reachable(&self, start: Point, goal: Point) -> bool {
        if !self.is_valid_position(start) || !self.is_valid_position(goal) {
            return false;
        }
        if self.walls.get_point(start) || self.walls.get_point(goal) {
            return false;
        }
        self.components.equiv(self.cell_ix(start), self.cell_ix(goal))
    }

    fn union(&mut self, a: Point, b: Point) {
        let a_ix = self.cell_ix(a);
        let b_ix = self.cell_ix(b);
        self.components.union(a_ix, b_ix);
    }

    fn cell_ix(&self, cell: Point) -> usize {
        self.walls.get_ix(cell.x as usize, cell.y as usize)
    }
}

impl TerrainOracle for Terrain {
    fn cols(&self) -> usize {
        Terrain::cols(self)
    }

    fn rows(&self) -> usize {
        Terrain::rows(self)
    }

    fn revision(&self) -> u64 {
        Terrain::revision(self)
    }

    fn is_wall(&self, position: Point) -> bool {
        Terrain::is_wall(self, position)
    }

    fn is_valid_position(&self, position: Point) -> bool {
        Terrain::is_valid_position(self, position)
    }
}

impl fmt::Display for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for y in (0..self.rows()).rev() {
            for x in 0..self.cols() {
                let tile = if self.walls.get(x, y) { '#' } else { '.' };
                write!(f, "{tile}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Every grid position the segment between `from` and `to` passes through,
/// in traversal order, `from` excluded and `to` included. When the segment
/// crosses a cell corner exactly, both cells around the crossing are emitted
/// before the diagonal step, matching the movement rule's requirement that
/// both be open for the diagonal to be passable.
pub fn positions_between(from: Point, to: Point) -> Vec<Point> {
    let mut positions = Vec::new();
    let step_x = if to.x > from.x { 1 } else { -1 };
    let step_y = if to.y > from.y { 1 } else { -1 };
    let run = (to.x - from.x).abs();
    let rise = (to.y - from.y).abs();
    let mut error = run - rise;
    let run = run * 2;
    let rise = rise * 2;
    let mut point = from;
    while point != to {
        if error > 0 {
            point = Point::new(point.x + step_x, point.y);
            error -= rise;
        } else if error < 0 {
            point = Point::new(point.x, point.y + step_y);
            error += run;
        } else {
            // Exact corner crossing: emit both flanking cells.
            if run < rise {
                positions.push(Point::new(point.x + step_x, point.y));
                positions.push(Point::new(point.x, point.y + step_y));
            } else {
                positions.push(Point::new(point.x, point.y + step_y));
                positions.push(Point::new(point.x + step_x, point.y));
            }
            point = Point::new(point.x + step_x, point.y + step_y);
            error += run - rise;
        }
        positions.push(point);
    }
    positions
}
