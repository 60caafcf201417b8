/// TileGrid: the stage's two parallel tile layers plus grid-wide effects.
///
/// ## Layers
///
///   - `display` — what the renderer draws. Mutated by gameplay events.
///   - `solid`   — what collision reads. Mutated independently, so a cell
///                 can look like floor while a crate stands on it.
///   - `authored` — layer 0's static ids as loaded. **Never mutated**;
///                 `reset()` rebuilds both live layers from it.
///
/// Both live layers always hold `width * height` ids. Reads outside the
/// grid return the `WALL` sentinel, writes outside it are ignored.
///
/// ## Purple walls
///
/// `start_purple_fade` flips solidity immediately; the fade timer is
/// presentation only and nothing in gameplay reads it.

use super::tile::{self, TileId};

const LAVA_SPEED: f32 = 0.005;

#[derive(Clone, Debug)]
pub struct TileGrid {
    width: usize,
    height: usize,
    authored: Vec<TileId>,
    display: Vec<TileId>,
    solid: Vec<TileId>,

    name: String,
    turn_limit: u32,

    lava_phase: f32,
    purple_fading: bool,
    purple_timer: f32,
    purple_initial_time: f32,

    stage_ended: bool,
}

// ── Construction / reset ──

impl TileGrid {
    /// Build from layer 0 of a stage. Only static ids survive; dynamic
    /// spawn ids become floor here and are handled by the object spawner.
    pub fn new(width: usize, height: usize, layer0: &[TileId], name: &str, turn_limit: u32) -> Self {
        let authored = (0..width * height)
            .map(|i| layer0.get(i).copied().unwrap_or(tile::FLOOR))
            .map(|id| if tile::is_static(id) { id } else { tile::FLOOR })
            .collect::<Vec<_>>();
        let mut grid = TileGrid {
            width,
            height,
            display: vec![],
            solid: vec![],
            authored,
            name: name.to_string(),
            turn_limit,
            lava_phase: 0.0,
            purple_fading: false,
            purple_timer: 0.0,
            purple_initial_time: 0.0,
            stage_ended: false,
        };
        grid.reset();
        grid
    }

    /// Discard every runtime mutation.
    pub fn reset(&mut self) {
        self.display = self.authored.clone();
        self.solid = self.authored.clone();
        self.purple_fading = false;
        self.purple_timer = 0.0;
        self.stage_ended = false;
    }
}

// ── Queries ──

impl TileGrid {
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn turn_limit(&self) -> u32 {
        self.turn_limit
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        self.index(x, y).is_some()
    }

    /// Strictly inside the border ring.
    pub fn is_interior(&self, x: i32, y: i32) -> bool {
        x > 0 && y > 0 && x < self.width as i32 - 1 && y < self.height as i32 - 1
    }

    /// Display id at (x, y), wall outside the grid.
    #[inline]
    pub fn tile_at(&self, x: i32, y: i32) -> TileId {
        self.index(x, y).map_or(tile::WALL, |i| self.display[i])
    }

    /// Collision id at (x, y), wall outside the grid.
    #[inline]
    pub fn solid_tile_at(&self, x: i32, y: i32) -> TileId {
        self.index(x, y).map_or(tile::WALL, |i| self.solid[i])
    }

    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        tile::is_solid(self.solid_tile_at(x, y))
    }

    pub fn is_solid_excluding_lava(&self, x: i32, y: i32) -> bool {
        tile::is_solid_excluding_lava(self.solid_tile_at(x, y))
    }

    /// Lava is a display property: a lava eater resting on lava keeps it lava.
    pub fn is_lava(&self, x: i32, y: i32) -> bool {
        tile::is_lava(self.tile_at(x, y))
    }
}

// ── Mutation ──

impl TileGrid {
    /// Write both layers (the cell's logical occupancy changed).
    pub fn set_display_and_solid(&mut self, x: i32, y: i32, id: TileId) {
        if let Some(i) = self.index(x, y) {
            self.display[i] = id;
            self.solid[i] = id;
        }
    }

    /// Write only the collision layer (something stands on the tile).
    pub fn set_solid_only(&mut self, x: i32, y: i32, id: TileId) {
        if let Some(i) = self.index(x, y) {
            self.solid[i] = id;
        }
    }

    /// Swap active/inactive purple walls grid-wide, keyed by the display layer.
    pub fn toggle_purple_walls(&mut self) {
        for i in 0..self.display.len() {
            if let Some(next) = tile::toggled_purple(self.display[i]) {
                self.display[i] = next;
                self.solid[i] = next;
            }
        }
    }

    pub fn start_purple_fade(&mut self, duration: f32) {
        self.purple_fading = true;
        self.purple_timer = duration;
        self.purple_initial_time = duration;
        self.toggle_purple_walls();
        log::debug!("purple walls toggled ({} frame fade)", duration);
    }

    pub fn end_stage(&mut self) {
        self.stage_ended = true;
    }

    pub fn stage_end_pending(&self) -> bool {
        self.stage_ended
    }

    /// Read-and-clear.
    pub fn consume_stage_ended(&mut self) -> bool {
        std::mem::take(&mut self.stage_ended)
    }
}

// ── Grid-wide animation ──

impl TileGrid {
    pub fn tick(&mut self, dt: f32) {
        self.lava_phase += LAVA_SPEED * dt;
        if self.lava_phase >= 1.0 {
            self.lava_phase -= 1.0;
        }

        if self.purple_fading {
            self.purple_timer -= dt;
            if self.purple_timer <= 0.0 {
                self.purple_fading = false;
            }
        }
    }

    /// Cyclic in [0, 1).
    pub fn lava_phase(&self) -> f32 {
        self.lava_phase
    }

    pub fn purple_fading(&self) -> bool {
        self.purple_fading
    }

    /// 1.0 when a fade just started, 0.0 when finished or idle.
    pub fn purple_alpha(&self) -> f32 {
        if !self.purple_fading || self.purple_initial_time <= 0.0 {
            return 0.0;
        }
        (self.purple_timer / self.purple_initial_time).clamp(0.0, 1.0)
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
