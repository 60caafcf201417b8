/// Tile ids and their properties.
///
/// Stage data stores plain integers, so tiles stay integers here too.
/// Properties are queried via functions, not stored as flags,
/// so tile semantics are centralized here.
///
/// Two "unknown tile" policies coexist and both are load-bearing:
///   - out-of-range coordinate → `WALL` sentinel (solid)
///   - in-range id outside the solidity table → non-solid

pub type TileId = i32;

// ── Static tiles (copied from layer 0 into the grid) ──

pub const FLOOR: TileId = 0;
pub const WALL: TileId = 1;
pub const LAVA: TileId = 3;
pub const LOCK: TileId = 4;
pub const PURPLE_OFF: TileId = 6;
pub const PURPLE_ON: TileId = 7;

// ── Runtime-only tiles ──

/// Written to the solid layer under a crate-like object.
pub const OCCUPIED: TileId = 2;
/// Lava released by a purple lava container.
pub const PURPLE_LAVA: TileId = 9;
/// Solid-layer mark under a black hole. Outside the solidity table on
/// purpose: the player may step on it, crates resting on it die.
pub const VOID: TileId = 16;

// ── Spawn tiles (scanned from layer 0 to create objects) ──

pub const SPAWN_CRATE: TileId = 2;
pub const SPAWN_LOCK: TileId = 4;
pub const SPAWN_KEY: TileId = 5;
pub const SPAWN_GEM: TileId = 8;
pub const SPAWN_PURPLE_CRATE: TileId = 11;
pub const SPAWN_HAMMER: TileId = 12;
pub const SPAWN_LAVA_CONTAINER: TileId = 13;
pub const SPAWN_PURPLE_LAVA_CONTAINER: TileId = 14;
pub const SPAWN_PLAYER: TileId = 17;
pub const SPAWN_STAR: TileId = 18;
pub const SPAWN_BLACK_HOLE: TileId = 19;
pub const SPAWN_LAVA_EATER: TileId = 20;
pub const SPAWN_EMERALD: TileId = 21;
pub const SPAWN_STAR_CONTAINER: TileId = 22;

/// Collision table, indexed by `id - 1`.
const SOLID_TILES: [bool; 9] = [
    true,  // 1 wall
    true,  // 2 occupied
    true,  // 3 lava
    true,  // 4 lock
    false, // 5
    false, // 6 purple, inactive
    true,  // 7 purple, active
    false, // 8
    true,  // 9 purple lava
];

/// Is this id solid for the player?
pub fn is_solid(id: TileId) -> bool {
    if id <= 0 {
        return false;
    }
    SOLID_TILES.get((id - 1) as usize).copied().unwrap_or(false)
}

/// Same as `is_solid`, but lava of either kind lets objects through.
pub fn is_solid_excluding_lava(id: TileId) -> bool {
    if is_lava(id) {
        return false;
    }
    is_solid(id)
}

pub fn is_lava(id: TileId) -> bool {
    id == LAVA || id == PURPLE_LAVA
}

/// Does layer 0 keep this id in the grid? Everything else becomes floor.
pub fn is_static(id: TileId) -> bool {
    matches!(id, WALL | LAVA | LOCK | PURPLE_OFF | PURPLE_ON)
}

/// Purple wall swap. Other ids pass through.
pub fn toggled_purple(id: TileId) -> Option<TileId> {
    match id {
        PURPLE_OFF => Some(PURPLE_ON),
        PURPLE_ON => Some(PURPLE_OFF),
        _ => None,
    }
}
