/// Movement, push and interaction rules: truth-table driven.
///
/// Pure functions over the grid. They encode "what is legal" without
/// performing the action; callers mutate state only after a rule says yes.
///
/// ## Facing (who may touch whom)
///
/// The player touches a neighbour by pressing toward it. The direction is
/// computed from the player's side of the pair:
///
/// ┌──────────────────────────────┬──────────────┐
/// │ Condition                     │ Must press   │
/// ├──────────────────────────────┼──────────────┤
/// │ manhattan distance != 1       │ (none)       │
/// │ player above entity           │ Down         │
/// │ player below entity           │ Up           │
/// │ player left of entity         │ Right        │
/// │ player right of entity        │ Left         │
/// └──────────────────────────────┴──────────────┘
///
/// ## Push (crate-like objects)
///
/// ┌──────────────────────────────┬───────────────┐
/// │ Condition                     │ Allow?        │
/// ├──────────────────────────────┼───────────────┤
/// │ not facing (table above)      │ DENY          │
/// │ dest out of bounds            │ DENY          │
/// │ dest fails free-tile rule     │ DENY          │
/// │ Otherwise                     │ ALLOW         │
/// └──────────────────────────────┴───────────────┘
///
/// ### Free-tile rules
/// ┌──────────────────────┬──────────────────────────────────┐
/// │ Rule                  │ Free when                        │
/// ├──────────────────────┼──────────────────────────────────┤
/// │ Open (default)        │ !is_solid_excluding_lava(dest)   │
/// │ Interior (black hole) │ dest strictly inside the border  │
/// │ LavaOnly (lava eater) │ is_lava(dest)                    │
/// └──────────────────────┴──────────────────────────────────┘
///
/// ## Player move
///
/// ┌──────────────────────────────┬───────────────┐
/// │ Condition                     │ Allow?        │
/// ├──────────────────────────────┼───────────────┤
/// │ direction = None              │ DENY          │
/// │ dest out of bounds            │ DENY          │
/// │ dest is_solid                 │ DENY          │
/// │ Otherwise                     │ ALLOW         │
/// └──────────────────────────────┴───────────────┘
///
/// Timing gates (clock waiting, player mid-move) live with the callers.

use super::entity::{Direction, Point};
use super::grid::TileGrid;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FreeTileRule {
    Open,
    Interior,
    LavaOnly,
}

impl FreeTileRule {
    pub fn allows(self, grid: &TileGrid, p: Point) -> bool {
        match self {
            FreeTileRule::Open => !grid.is_solid_excluding_lava(p.x, p.y),
            FreeTileRule::Interior => grid.is_interior(p.x, p.y),
            FreeTileRule::LavaOnly => grid.is_lava(p.x, p.y),
        }
    }
}

// ── Facing ──

/// The direction the player must press to act on the entity at `entity`,
/// or `None` when the two are not orthogonal neighbours.
pub fn facing_direction(player: Point, entity: Point) -> Option<Direction> {
    if player.manhattan(entity) != 1 {
        return None;
    }
    let dir = if player.y < entity.y {
        Direction::Down
    } else if player.y > entity.y {
        Direction::Up
    } else if player.x < entity.x {
        Direction::Right
    } else {
        Direction::Left
    };
    Some(dir)
}

/// Adjacent and pressing toward the entity.
pub fn is_facing(player: Point, entity: Point, input: Direction) -> bool {
    input != Direction::None && facing_direction(player, entity) == Some(input)
}

// ── Push ──

/// Destination cell of a push, if the push is legal.
pub fn push_destination(
    grid: &TileGrid, player: Point, entity: Point,
    input: Direction, rule: FreeTileRule,
) -> Option<Point> {
    if !is_facing(player, entity, input) { return None; }
    let dest = entity.step(input);
    if !grid.in_bounds(dest.x, dest.y) { return None; }
    if !rule.allows(grid, dest) { return None; }
    Some(dest)
}

// ── Player ──

pub fn player_move_target(grid: &TileGrid, from: Point, input: Direction) -> Option<Point> {
    if input == Direction::None { return None; }
    let dest = from.step(input);
    if !grid.in_bounds(dest.x, dest.y) { return None; }
    if grid.is_solid(dest.x, dest.y) { return None; }
    Some(dest)
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
