/// World: one loaded stage plus the run-level state around it.
///
/// ## Stage data
///
///   - `layer0` — layer 0 of the stage as loaded. **Never mutated**;
///                `reset_map()` re-spawns every entity from it.
///   - `grid`   — the live tile layers (see `TileGrid`).
///
/// ## Camera / Viewport
///
/// Stage coordinates and screen coordinates are separate:
///   - `camera` — viewport into the stage, in tiles
///   - Renderer maps: `screen(sx, sy) = stage(camera.x + sx, camera.y + sy)`
///   - Camera follows the player with a dead-zone approach
///   - Stages smaller than the viewport are centered

use crate::config::SimContext;
use crate::domain::clock::TurnClock;
use crate::domain::entity::Point;
use crate::domain::grid::TileGrid;
use crate::domain::tile::{self, TileId};
use super::level::{self, LoadError, TilemapSource};
use super::object::{CollectibleKind, FieldObject, ObjectKind};
use super::player::Player;
use super::status::Status;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    Paused,
    StageClear { golden: bool },
}

/// Camera: a viewport into the stage.
///
/// `(x, y)` is the stage coordinate of the top-left visible tile.
/// `(view_w, view_h)` is how many tiles fit in the viewport.
/// These are computed from terminal size and set during `render()`.
#[derive(Clone, Debug, Default)]
pub struct Camera {
    /// Stage X of the top-left visible tile (negative when centering)
    pub x: i32,
    pub y: i32,
    pub view_w: usize,
    pub view_h: usize,
}

impl Camera {
    pub fn new() -> Self {
        Camera::default()
    }

    /// Follow a target, scrolling only when it leaves the inner dead zone.
    pub fn follow(&mut self, target: Point, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = follow_axis(self.x, target.x, self.view_w, world_w);
        self.y = follow_axis(self.y, target.y, self.view_h, world_h);
    }

    /// Snap directly to center on a position. Used on load / reset.
    pub fn center_on(&mut self, target: Point, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = center_axis(target.x, self.view_w, world_w);
        self.y = center_axis(target.y, self.view_h, world_h);
    }
}

fn follow_axis(current: i32, target: i32, view: usize, world: usize) -> i32 {
    let view = view as i32;
    let world = world as i32;
    if world <= view {
        return -((view - world) / 2);
    }
    // 20% margin on each side
    let margin = view / 5;
    let mut pos = current;
    if target < current + margin {
        pos = target - margin;
    } else if target > current + view - margin - 1 {
        pos = target - view + margin + 1;
    }
    pos.clamp(0, world - view)
}

fn center_axis(target: i32, view: usize, world: usize) -> i32 {
    let view = view as i32;
    let world = world as i32;
    if world <= view {
        -((view - world) / 2)
    } else {
        (target - view / 2).clamp(0, world - view)
    }
}

pub struct World {
    // ── Stage source ──
    layer0: Vec<TileId>,
    spawn: Point,

    // ── Simulation ──
    pub ctx: SimContext,
    pub grid: TileGrid,
    pub clock: TurnClock,
    pub player: Player,
    pub objects: Vec<FieldObject>,
    pub status: Status,

    // ── Meta ──
    pub phase: Phase,
    pub stage_index: usize,

    // ── UI ──
    pub message: String,
    pub message_timer: f32,
    pub camera: Camera,
}

// ── Construction ──

impl World {
    /// Build a stage from any tilemap source. Fails before anything is
    /// spawned if the stage is malformed.
    pub fn load(source: &impl TilemapSource, stage_index: usize, ctx: SimContext) -> Result<World, LoadError> {
        let header = level::read_header(source)?;
        let (width, height) = (source.width(), source.height());
        let layer = source.layer(0).ok_or(LoadError::MissingLayer(0))?;
        let layer0 = (0..width * height)
            .map(|i| layer.get(i).copied().unwrap_or(tile::FLOOR))
            .collect::<Vec<_>>();

        let grid = TileGrid::new(width, height, &layer0, &header.name, header.turn_limit);
        let status = Status::new(&header.name, stage_index, header.turn_limit);

        let mut world = World {
            layer0,
            spawn: header.player,
            ctx,
            grid,
            clock: TurnClock::new(),
            player: Player::new(header.player, 0),
            objects: vec![],
            status,
            phase: Phase::Playing,
            stage_index,
            message: String::new(),
            message_timer: 0.0,
            camera: Camera::new(),
        };
        world.populate();
        log::info!(
            "loaded stage {} \"{}\" ({}x{}, {} turns, {} objects)",
            stage_index + 1, header.name, width, height, header.turn_limit, world.objects.len(),
        );
        Ok(world)
    }

    /// Restore the tile layers and re-spawn every entity from layer 0.
    pub fn reset_map(&mut self) {
        self.populate();
        self.phase = Phase::Playing;
        log::info!("stage \"{}\" reset", self.grid.name());
    }

    fn populate(&mut self) {
        self.grid.reset();
        self.clock = TurnClock::new();

        let width = self.grid.width().max(1);
        self.objects = self.layer0.iter()
            .enumerate()
            .filter_map(|(i, &id)| {
                let pos = Point::new((i % width) as i32, (i / width) as i32);
                FieldObject::spawn(id, pos)
            })
            .collect();

        for obj in &self.objects {
            obj.place(&mut self.grid);
        }

        let emeralds = self.objects.iter()
            .filter(|o| o.kind == ObjectKind::Collectible(CollectibleKind::Emerald))
            .count() as u32;
        self.player = Player::new(self.spawn, emeralds);

        let mut status = Status::new(self.grid.name(), self.stage_index, self.grid.turn_limit());
        status.emeralds_remaining = emeralds;
        self.status = status;

        let (w, h) = (self.grid.width(), self.grid.height());
        self.camera.center_on(self.spawn, w, h);
    }
}

// ── Lifecycle / queries ──

impl World {
    /// Read-and-clear: did this frame end the stage?
    pub fn consume_stage_ended(&mut self) -> bool {
        self.grid.consume_stage_ended()
    }

    pub fn set_message(&mut self, msg: &str, duration: f32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    pub fn tick_message(&mut self, dt: f32) {
        if self.message_timer > 0.0 {
            self.message_timer -= dt;
            if self.message_timer <= 0.0 {
                self.message_timer = 0.0;
                self.message.clear();
            }
        }
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    /// Entities still worth drawing: alive, or playing their fade.
    pub fn visible_objects(&self) -> impl Iterator<Item = &FieldObject> {
        self.objects.iter().filter(|o| o.body.visible())
    }
}
