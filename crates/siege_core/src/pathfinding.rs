//! Tile-grid A* with a wall-breach fallback.
//!
//! Searches are 8-connected with an octile heuristic and a √2 diagonal cost.
//! The goal is any tile from which the unit can already reach its target,
//! not the target itself. When no such tile is reachable, the cheapest
//! standing wall seen on the search frontier becomes a breach point.
//!
//! All costs are fixed-point and the open set breaks f-score ties on tile
//! coordinates, so identical inputs always produce identical routes.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::components::{Footprint, StructureId, TilePos};
use crate::grid::GridWorld;
use crate::math::{fixed_sqrt, octile_distance, Fixed, SQRT_2};
use crate::targeting::within_reach;

/// Outcome of a route search.
///
/// Paths exclude the start tile and are stored next-tile-last, so a walker
/// pops from the tail as it arrives on each tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteResult {
    /// A tile within reach of the target is reachable.
    Reached(Vec<TilePos>),
    /// The target is walled off; the path leads next to `wall`.
    Partial {
        /// Wall to breach.
        wall: StructureId,
        /// Route to the tile adjacent to the wall.
        path: Vec<TilePos>,
    },
    /// Nothing reachable and no wall to breach.
    Blocked,
}

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    index: usize,
    f_score: Fixed,
    /// Tie-breaker for determinism: lower coordinates first.
    tie_breaker: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so we reverse the comparison for min-heap behavior.
        match other.f_score.cmp(&self.f_score) {
            Ordering::Equal => other.tie_breaker.cmp(&self.tie_breaker),
            ord => ord,
        }
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Direction offsets for 8-directional movement.
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),   // East
    (1, 1),   // Southeast
    (0, 1),   // South
    (-1, 1),  // Southwest
    (-1, 0),  // West
    (-1, -1), // Northwest
    (0, -1),  // North
    (1, -1),  // Northeast
];

/// Best impassable neighbour seen so far.
#[derive(Debug, Clone, Copy)]
struct BreachCandidate {
    f_score: Fixed,
    tie_breaker: u64,
    wall: StructureId,
    parent: usize,
}

/// Convert coordinates to a tie-breaker value for deterministic ordering.
#[inline]
fn coords_to_tie_breaker(tile: TilePos) -> u64 {
    ((tile.y as u64) << 32) | (tile.x as u32 as u64)
}

/// Lower bound on the cost left from a tile to any tile within reach.
///
/// Both terms are admissible on their own. The octile term subtracts the
/// longest octile offset inside the reach disk; the Euclidean term subtracts
/// the reach itself. Their maximum stays consistent.
#[derive(Debug, Clone, Copy)]
struct Heuristic {
    reach: Fixed,
    octile_reach: Fixed,
}

impl Heuristic {
    fn new(reach_sq: Fixed) -> Self {
        let reach = fixed_sqrt(reach_sq);
        let bound = reach.to_num::<u32>() + 1;
        let mut octile_reach = Fixed::ZERO;
        for long in 0..=bound {
            for short in 0..=long {
                let d2 = u64::from(long * long) + u64::from(short * short);
                if Fixed::from_num(d2) <= reach_sq {
                    octile_reach = octile_reach.max(octile_distance(long, short));
                }
            }
        }
        Self {
            reach,
            octile_reach,
        }
    }

    fn estimate(&self, tile: TilePos, goal: &Footprint) -> Fixed {
        let nearest = goal.nearest_tile(tile);
        let octile = octile_distance(tile.x.abs_diff(nearest.x), tile.y.abs_diff(nearest.y));
        let euclid = fixed_sqrt(Fixed::from_num(goal.distance_sq_to(tile)));
        let by_octile = (octile - self.octile_reach).max(Fixed::ZERO);
        let by_euclid = (euclid - self.reach).max(Fixed::ZERO);
        by_octile.max(by_euclid)
    }
}

/// Whether a diagonal step clips a blocked corner.
#[inline]
fn is_diagonal_valid(grid: &GridWorld, from: TilePos, dx: i32, dy: i32, is_flying: bool) -> bool {
    if dx == 0 || dy == 0 || is_flying {
        return true;
    }
    grid.passable(from.offset(dx, 0), false) && grid.passable(from.offset(0, dy), false)
}

/// Route a unit standing on `start` toward `goal`.
///
/// `reach_sq` is the squared distance from the closest footprint tile at
/// which the unit may stop. Flying units treat every tile as passable.
#[must_use]
pub fn route_to_target(
    grid: &GridWorld,
    start: TilePos,
    goal: &Footprint,
    reach_sq: Fixed,
    is_flying: bool,
) -> RouteResult {
    if !grid.in_bounds(start) {
        return RouteResult::Blocked;
    }
    if within_reach(start, goal, reach_sq) {
        return RouteResult::Reached(Vec::new());
    }

    let size = grid.size();
    let cells = (size * size) as usize;
    let to_index = |t: TilePos| (t.y * size + t.x) as usize;
    let to_tile = |i: usize| TilePos::new(i as i32 % size, i as i32 / size);
    let heuristic = Heuristic::new(reach_sq);

    let mut g_score = vec![Fixed::MAX; cells];
    let mut came_from: Vec<Option<usize>> = vec![None; cells];
    let mut closed = vec![false; cells];
    let mut open_set = BinaryHeap::new();
    let mut breach: Option<BreachCandidate> = None;

    let start_index = to_index(start);
    g_score[start_index] = Fixed::ZERO;
    open_set.push(AStarNode {
        index: start_index,
        f_score: heuristic.estimate(start, goal),
        tie_breaker: coords_to_tie_breaker(start),
    });

    while let Some(current) = open_set.pop() {
        if closed[current.index] {
            continue;
        }
        closed[current.index] = true;

        let tile = to_tile(current.index);
        if within_reach(tile, goal, reach_sq) {
            return RouteResult::Reached(reconstruct_path(&came_from, current.index, to_tile));
        }

        let current_g = g_score[current.index];
        for &(dx, dy) in &DIRECTIONS {
            let next = tile.offset(dx, dy);
            if !grid.in_bounds(next) {
                continue;
            }
            let next_index = to_index(next);
            if closed[next_index] {
                continue;
            }

            let step_cost = if dx != 0 && dy != 0 { SQRT_2 } else { Fixed::ONE };
            let tentative_g = current_g + step_cost;

            if !grid.passable(next, is_flying) {
                // Only standing walls block, so the tile always holds one.
                if let Some(wall) = grid.structure_at(next) {
                    let candidate = BreachCandidate {
                        f_score: tentative_g + heuristic.estimate(next, goal),
                        tie_breaker: coords_to_tie_breaker(next),
                        wall,
                        parent: current.index,
                    };
                    let better = breach.map_or(true, |best| {
                        (candidate.f_score, candidate.tie_breaker)
                            < (best.f_score, best.tie_breaker)
                    });
                    if better {
                        breach = Some(candidate);
                    }
                }
                continue;
            }

            if !is_diagonal_valid(grid, tile, dx, dy, is_flying) {
                continue;
            }

            if tentative_g < g_score[next_index] {
                came_from[next_index] = Some(current.index);
                g_score[next_index] = tentative_g;
                open_set.push(AStarNode {
                    index: next_index,
                    f_score: tentative_g + heuristic.estimate(next, goal),
                    tie_breaker: coords_to_tie_breaker(next),
                });
            }
        }
    }

    match breach {
        Some(candidate) => RouteResult::Partial {
            wall: candidate.wall,
            path: reconstruct_path(&came_from, candidate.parent, to_tile),
        },
        None => RouteResult::Blocked,
    }
}

/// Walk parents back to the start, producing a next-tile-last path that
/// excludes the start tile.
fn reconstruct_path(
    came_from: &[Option<usize>],
    end: usize,
    to_tile: impl Fn(usize) -> TilePos,
) -> Vec<TilePos> {
    let mut path = Vec::new();
    let mut current = end;
    while let Some(prev) = came_from[current] {
        path.push(to_tile(current));
        current = prev;
    }
    path
}
