//! End-to-end tests driving the pathfinder through its public stepping API.

use grid_util::point::Point;
use incremental_pathfinding::{
    GridPathfinder, QueryError, SearchObserver, SearchState, Terrain,
};

/// Asserts every step of `path` is a legal king-move on `terrain`: adjacent,
/// onto an open cell, and never cutting a wall corner diagonally.
fn assert_path_legal(terrain: &Terrain, path: &[Point]) {
    assert!(!path.is_empty());
    for window in path.windows(2) {
        let (from, to) = (window[0], window[1]);
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        assert!(
            dx.abs() <= 1 && dy.abs() <= 1 && (dx, dy) != (0, 0),
            "{from} -> {to} is not a king move"
        );
        assert!(terrain.is_valid_position(to) && !terrain.is_wall(to));
        if dx != 0 && dy != 0 {
            let flank_a = Point::new(from.x + dx, from.y);
            let flank_b = Point::new(from.x, from.y + dy);
            assert!(
                !terrain.is_wall(flank_a) && !terrain.is_wall(flank_b),
                "{from} -> {to} cuts a corner"
            );
        }
    }
}

fn run(pathfinder: &mut GridPathfinder, terrain: &Terrain) -> Option<Vec<Point>> {
    pathfinder.run_to_completion(terrain).map(|path| path.to_vec())
}

#[test]
fn straight_path_on_open_grid() {
    let terrain = Terrain::new(8, 3);
    let mut pathfinder = GridPathfinder::new();
    pathfinder
        .start_query(&terrain, Point::new(0, 0), Point::new(5, 0))
        .unwrap();
    let path = run(&mut pathfinder, &terrain).unwrap();
    assert_eq!(path.len(), 6);
    assert!(path.iter().all(|cell| cell.y == 0));
    assert_path_legal(&terrain, &path);
}

#[test]
fn path_goes_through_the_single_opening() {
    let mut terrain = Terrain::new(5, 5);
    for y in 0..5 {
        if y != 2 {
            terrain.set_wall(Point::new(2, y));
        }
    }
    let mut pathfinder = GridPathfinder::new();
    pathfinder
        .start_query(&terrain, Point::new(0, 2), Point::new(4, 2))
        .unwrap();
    let path = run(&mut pathfinder, &terrain).unwrap();
    assert!(path.contains(&Point::new(2, 2)));
    assert_path_legal(&terrain, &path);
    // The opening sits on the straight line, so the straight line wins.
    assert_eq!(
        path,
        vec![
            Point::new(0, 2),
            Point::new(1, 2),
            Point::new(2, 2),
            Point::new(3, 2),
            Point::new(4, 2),
        ]
    );
}

#[test]
fn corners_cannot_be_cut() {
    // 2x2 grid with a diagonal wall pair: the only conceivable move is the
    // corner-cutting diagonal, so there is no path at all.
    let terrain = Terrain::from_map_str(
        "#.
         .#",
    )
    .unwrap();
    let mut pathfinder = GridPathfinder::new();
    pathfinder
        .start_query(&terrain, Point::new(0, 0), Point::new(1, 1))
        .unwrap();
    assert!(run(&mut pathfinder, &terrain).is_none());
    assert_eq!(pathfinder.state(), SearchState::Done);
}

#[test]
fn blocked_corner_forces_a_detour() {
    // A diagonal wall pair in the middle: the route around it must never
    // slip between the two walls.
    let mut terrain = Terrain::new(4, 4);
    terrain.set_wall(Point::new(1, 2));
    terrain.set_wall(Point::new(2, 1));
    let mut pathfinder = GridPathfinder::new();
    pathfinder
        .start_query(&terrain, Point::new(0, 0), Point::new(3, 3))
        .unwrap();
    let path = run(&mut pathfinder, &terrain).unwrap();
    assert_path_legal(&terrain, &path);
    for window in path.windows(2) {
        let pair = [window[0], window[1]];
        assert!(
            !(pair.contains(&Point::new(1, 1)) && pair.contains(&Point::new(2, 2))),
            "path cut the corner between the walls"
        );
    }
}

#[test]
fn walled_in_goal_exhausts_within_grid_bound() {
    let mut terrain = Terrain::new(7, 7);
    let goal = Point::new(3, 3);
    for dx in -1..=1 {
        for dy in -1..=1 {
            if (dx, dy) != (0, 0) {
                terrain.set_wall(Point::new(goal.x + dx, goal.y + dy));
            }
        }
    }
    let mut pathfinder = GridPathfinder::new();
    pathfinder
        .start_query(&terrain, Point::new(0, 0), goal)
        .unwrap();
    let mut steps = 0;
    while pathfinder.continue_query(&terrain) == SearchState::Working {
        steps += 1;
        assert!(steps <= 7 * 7 + 1, "search did not terminate in time");
    }
    assert_eq!(pathfinder.state(), SearchState::Done);
    assert!(pathfinder.result().is_none());
}

#[test]
fn requery_respects_wall_changes() {
    let mut terrain = Terrain::new(6, 4);
    let mut pathfinder = GridPathfinder::new();
    let start = Point::new(0, 1);
    let goal = Point::new(5, 1);

    pathfinder.start_query(&terrain, start, goal).unwrap();
    let first = run(&mut pathfinder, &terrain).unwrap();
    assert!(first.contains(&Point::new(3, 1)));

    // Wall off the whole column the first path crossed.
    for y in 0..4 {
        terrain.set_wall(Point::new(3, y));
    }
    pathfinder.start_query(&terrain, start, goal).unwrap();
    assert!(run(&mut pathfinder, &terrain).is_none());

    // Open one cell; the next query must thread through it, untouched by
    // anything the earlier generations recorded.
    terrain.remove_wall(Point::new(3, 3));
    pathfinder.start_query(&terrain, start, goal).unwrap();
    let third = run(&mut pathfinder, &terrain).unwrap();
    assert!(third.contains(&Point::new(3, 3)));
    assert_path_legal(&terrain, &third);
}

#[test]
fn out_of_bounds_query_is_an_error() {
    let terrain = Terrain::new(4, 4);
    let mut pathfinder = GridPathfinder::new();
    let error = pathfinder
        .start_query(&terrain, Point::new(0, 0), Point::new(9, 0))
        .unwrap_err();
    assert_eq!(
        error,
        QueryError::OutOfBounds {
            position: Point::new(9, 0),
            cols: 4,
            rows: 4,
        }
    );
    assert_eq!(pathfinder.state(), SearchState::Ready);
}

#[test]
fn start_equals_goal() {
    let terrain = Terrain::new(3, 3);
    let mut pathfinder = GridPathfinder::new();
    let cell = Point::new(1, 1);
    pathfinder.start_query(&terrain, cell, cell).unwrap();
    assert_eq!(pathfinder.continue_query(&terrain), SearchState::Done);
    assert_eq!(pathfinder.result(), Some(&[cell][..]));
}

#[test]
fn stepping_is_incremental() {
    let terrain = Terrain::new(10, 10);
    let mut pathfinder = GridPathfinder::new();
    pathfinder
        .start_query(&terrain, Point::new(0, 0), Point::new(9, 9))
        .unwrap();
    assert_eq!(pathfinder.state(), SearchState::Working);
    assert_eq!(pathfinder.continue_query(&terrain), SearchState::Working);
    assert!(pathfinder.result().is_none());
    let mut steps = 1;
    while pathfinder.continue_query(&terrain) == SearchState::Working {
        steps += 1;
        assert!(steps <= 101);
    }
    assert!(pathfinder.result().is_some());
}

#[test]
fn result_is_cleared_by_the_next_query() {
    let terrain = Terrain::new(5, 5);
    let mut pathfinder = GridPathfinder::new();
    pathfinder
        .start_query(&terrain, Point::new(0, 0), Point::new(4, 4))
        .unwrap();
    assert!(run(&mut pathfinder, &terrain).is_some());

    pathfinder
        .start_query(&terrain, Point::new(4, 0), Point::new(0, 4))
        .unwrap();
    assert_eq!(pathfinder.state(), SearchState::Working);
    assert!(pathfinder.result().is_none());
    let path = run(&mut pathfinder, &terrain).unwrap();
    assert_eq!(path.first(), Some(&Point::new(4, 0)));
    assert_eq!(path.last(), Some(&Point::new(0, 4)));
}

#[derive(Default)]
struct RecordingObserver {
    opened: Vec<Point>,
    closed: Vec<Point>,
}

impl SearchObserver for RecordingObserver {
    fn cell_opened(&mut self, cell: Point) {
        self.opened.push(cell);
    }

    fn cell_closed(&mut self, cell: Point) {
        self.closed.push(cell);
    }
}

#[test]
fn observer_sees_frontier_and_finalized_cells() {
    let mut terrain = Terrain::new(5, 5);
    terrain.set_wall(Point::new(2, 2));
    let start = Point::new(0, 2);
    let goal = Point::new(4, 2);
    let mut pathfinder = GridPathfinder::new();
    let mut observer = RecordingObserver::default();
    pathfinder.start_query(&terrain, start, goal).unwrap();
    while pathfinder.continue_query_observed(&terrain, &mut observer) == SearchState::Working {}

    assert!(pathfinder.result().is_some());
    assert_eq!(observer.closed.first(), Some(&start));
    assert_eq!(observer.closed.last(), Some(&goal));
    assert!(observer.opened.contains(&goal));
    // A cell enters the frontier at most once per query.
    let mut seen = observer.opened.clone();
    seen.sort_by_key(|cell| (cell.x, cell.y));
    seen.dedup();
    assert_eq!(seen.len(), observer.opened.len());
    // Walls never show up in either event stream.
    assert!(!observer.opened.contains(&Point::new(2, 2)));
    assert!(!observer.closed.contains(&Point::new(2, 2)));
}

#[test]
fn admissible_weight_finds_the_shortest_path() {
    // With the weight at 1.0 the heuristic is admissible and the detour
    // length around the block is exactly optimal.
    let terrain = Terrain::from_map_str(
        ".....
         .###.
         .....",
    )
    .unwrap();
    let mut pathfinder = GridPathfinder::new();
    pathfinder.heuristic_weight = 1.0;
    pathfinder
        .start_query(&terrain, Point::new(0, 1), Point::new(4, 1))
        .unwrap();
    let path = run(&mut pathfinder, &terrain).unwrap();
    assert_path_legal(&terrain, &path);
    // Every diagonal next to the block is flanked by a wall, so the optimal
    // detour is fully orthogonal: e.g. (0,1) (0,0) (1,0) .. (4,0) (4,1).
    assert_eq!(path.len(), 7);
}

#[test]
fn map_parsed_terrain_is_searchable() {
    let terrain = Terrain::from_map_str(
        ".....
         ####.
         .....
         .####
         .....",
    )
    .unwrap();
    let mut pathfinder = GridPathfinder::new();
    pathfinder
        .start_query(&terrain, Point::new(0, 0), Point::new(0, 4))
        .unwrap();
    let path = run(&mut pathfinder, &terrain).unwrap();
    assert_path_legal(&terrain, &path);
    // The serpentine forces the path through both gaps.
    assert!(path.contains(&Point::new(0, 1)));
    assert!(path.contains(&Point::new(4, 3)));
}
