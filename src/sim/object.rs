/// Field objects: everything on the stage that is not the player.
///
/// One record type with a `kind` tag. Per-kind behavior is selected by
/// `match` in a handful of hooks:
///
///   - `player_collision_or_interaction` — push, pick up, or interact
///   - `on_moving_stopped`               — a pushed object arrived
///   - `on_interact`                     — player pressed toward a lock/container
///   - `on_death`                        — extra grid effects when an object dies
///   - `update`                          — hazards and animation timers
///
/// ## Kinds
///
/// ┌───────────────────────┬──────────────┬───────────┬────────────────────────┐
/// │ Kind                   │ Free tile    │ Lava      │ Extra                  │
/// ├───────────────────────┼──────────────┼───────────┼────────────────────────┤
/// │ Crate (plain)          │ Open         │ dies      │ fills the lava         │
/// │ Crate (purple)         │ Open         │ dies      │ death toggles purple   │
/// │ Crate (black hole)     │ Interior     │ immune    │ leaves void behind     │
/// │ Crate (lava eater)     │ LavaOnly     │ survives  │ eats lava it leaves    │
/// │ Collectible            │ -            │ -         │ picked up on contact   │
/// │ Lock                   │ -            │ -         │ costs a key            │
/// │ LavaContainer          │ -            │ -         │ costs a hammer         │
/// │ StarContainer          │ -            │ -         │ opens at 0 emeralds    │
/// └───────────────────────┴──────────────┴───────────┴────────────────────────┘

use std::f32::consts::PI;

use crate::config::SimContext;
use crate::domain::clock::TurnClock;
use crate::domain::entity::{Body, Direction, InputSnapshot, Point};
use crate::domain::grid::TileGrid;
use crate::domain::rules::{self, FreeTileRule};
use crate::domain::tile::{self, TileId};
use super::event::{DeathCause, GameEvent};
use super::player::Player;

const FLOAT_SPEED: f32 = 0.05;
const ROTATE_SPEED: f32 = 0.05;
const SIZE_SPEED: f32 = 0.05;
const SIZE_MOD: f32 = 0.20;
const EYE_CLOSE_TIME: f32 = 6.0;

/// Mutable frame state every hook may touch. Only the object being
/// updated holds it, so grid writes never interleave.
pub struct Field<'a> {
    pub grid: &'a mut TileGrid,
    pub clock: &'a mut TurnClock,
    pub ctx: &'a SimContext,
    pub events: &'a mut Vec<GameEvent>,
    pub dt: f32,
}

// ── Kinds ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CrateKind {
    Plain,
    Purple,
    BlackHole,
    LavaEater,
}

impl CrateKind {
    pub fn free_tile_rule(self) -> FreeTileRule {
        match self {
            CrateKind::Plain | CrateKind::Purple => FreeTileRule::Open,
            CrateKind::BlackHole => FreeTileRule::Interior,
            CrateKind::LavaEater => FreeTileRule::LavaOnly,
        }
    }

    pub fn dies_in_lava(self) -> bool {
        matches!(self, CrateKind::Plain | CrateKind::Purple)
    }

    /// Unaffected by the void.
    pub fn immune(self) -> bool {
        self == CrateKind::BlackHole
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CollectibleKind {
    Key,
    Hammer,
    Gem,
    Emerald,
    Star,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AnimationMode {
    Float,
    Shine,
    Shrink,
}

impl CollectibleKind {
    pub fn animation_mode(self) -> AnimationMode {
        match self {
            CollectibleKind::Key | CollectibleKind::Hammer => AnimationMode::Float,
            CollectibleKind::Gem | CollectibleKind::Emerald => AnimationMode::Shine,
            CollectibleKind::Star => AnimationMode::Shrink,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StarOutcome {
    Golden,
    Gray,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ObjectKind {
    Crate(CrateKind),
    Collectible(CollectibleKind),
    Lock,
    LavaContainer { purple: bool },
    StarContainer,
}

impl ObjectKind {
    /// Object spawned by a layer-0 id, if any.
    pub fn from_spawn_id(id: TileId) -> Option<ObjectKind> {
        use CollectibleKind as C;
        let kind = match id {
            tile::SPAWN_CRATE => ObjectKind::Crate(CrateKind::Plain),
            tile::SPAWN_LOCK => ObjectKind::Lock,
            tile::SPAWN_KEY => ObjectKind::Collectible(C::Key),
            tile::SPAWN_GEM => ObjectKind::Collectible(C::Gem),
            tile::SPAWN_PURPLE_CRATE => ObjectKind::Crate(CrateKind::Purple),
            tile::SPAWN_HAMMER => ObjectKind::Collectible(C::Hammer),
            tile::SPAWN_LAVA_CONTAINER => ObjectKind::LavaContainer { purple: false },
            tile::SPAWN_PURPLE_LAVA_CONTAINER => ObjectKind::LavaContainer { purple: true },
            tile::SPAWN_STAR => ObjectKind::Collectible(C::Star),
            tile::SPAWN_BLACK_HOLE => ObjectKind::Crate(CrateKind::BlackHole),
            tile::SPAWN_LAVA_EATER => ObjectKind::Crate(CrateKind::LavaEater),
            tile::SPAWN_EMERALD => ObjectKind::Collectible(C::Emerald),
            tile::SPAWN_STAR_CONTAINER => ObjectKind::StarContainer,
            _ => return None,
        };
        Some(kind)
    }

    pub fn label(self) -> &'static str {
        match self {
            ObjectKind::Crate(CrateKind::Plain) => "crate",
            ObjectKind::Crate(CrateKind::Purple) => "purple crate",
            ObjectKind::Crate(CrateKind::BlackHole) => "black hole",
            ObjectKind::Crate(CrateKind::LavaEater) => "lava eater",
            ObjectKind::Collectible(CollectibleKind::Key) => "key",
            ObjectKind::Collectible(CollectibleKind::Hammer) => "hammer",
            ObjectKind::Collectible(CollectibleKind::Gem) => "gem",
            ObjectKind::Collectible(CollectibleKind::Emerald) => "emerald",
            ObjectKind::Collectible(CollectibleKind::Star) => "star",
            ObjectKind::Lock => "lock",
            ObjectKind::LavaContainer { purple: false } => "lava container",
            ObjectKind::LavaContainer { purple: true } => "purple lava container",
            ObjectKind::StarContainer => "star container",
        }
    }
}

// ── Record ──

#[derive(Clone, Debug)]
pub struct FieldObject {
    pub kind: ObjectKind,
    pub body: Body,
    /// Direction the player must press to act on this object, while adjacent.
    player_dir: Option<Direction>,
    /// Float timer for collectibles, rotation angle for black holes.
    phase: f32,
    size_timer: f32,
    eye_timer: f32,
    eyes_closed: bool,
    star: StarOutcome,
}

impl FieldObject {
    pub fn new(kind: ObjectKind, pos: Point) -> Self {
        let phase = match kind {
            ObjectKind::Collectible(_) => (pos.x + pos.y) as f32 * PI / 6.0,
            _ => 0.0,
        };
        FieldObject {
            kind,
            body: Body::new(pos),
            player_dir: None,
            phase,
            size_timer: 0.0,
            eye_timer: 0.0,
            eyes_closed: false,
            star: StarOutcome::Golden,
        }
    }

    pub fn spawn(id: TileId, pos: Point) -> Option<Self> {
        ObjectKind::from_spawn_id(id).map(|kind| FieldObject::new(kind, pos))
    }

    /// Write the object's initial marks into the grid.
    pub fn place(&self, grid: &mut TileGrid) {
        let Point { x, y } = self.body.pos;
        match self.kind {
            ObjectKind::Crate(CrateKind::BlackHole) => mark_void(grid, x, y),
            ObjectKind::Crate(_) | ObjectKind::LavaContainer { .. } | ObjectKind::StarContainer => {
                grid.set_solid_only(x, y, tile::OCCUPIED);
            }
            // Locks are static tiles; collectibles leave the cell walkable.
            ObjectKind::Lock | ObjectKind::Collectible(_) => {}
        }
    }

    #[inline]
    pub fn exists(&self) -> bool {
        self.body.exists
    }

    pub fn player_dir(&self) -> Option<Direction> {
        self.player_dir
    }

    pub fn star_outcome(&self) -> StarOutcome {
        self.star
    }

    /// Vertical float offset in tiles, for collectibles.
    pub fn float_offset(&self) -> f32 {
        self.phase.sin()
    }

    /// Rotation angle, black holes only.
    pub fn angle(&self) -> f32 {
        self.phase
    }

    /// Pulsing scale factor, black holes only.
    pub fn pulse(&self) -> f32 {
        1.0 + SIZE_MOD + self.size_timer.sin() * SIZE_MOD
    }

    pub fn eyes_closed(&self) -> bool {
        self.eyes_closed
    }
}

// ── Frame protocol ──

impl FieldObject {
    /// Interpolate, or commit an arrival and run `on_moving_stopped`.
    pub fn update_position(&mut self, f: &mut Field) {
        if self.body.update_position(&*f.clock) {
            self.on_moving_stopped(f);
        }
    }

    pub fn player_collision_or_interaction(
        &mut self, player: &mut Player, input: &InputSnapshot, f: &mut Field,
    ) {
        match self.kind {
            ObjectKind::Crate(kind) => self.attempt_push(kind, player, input, f),
            ObjectKind::Collectible(kind) => self.collect(kind, player, f),
            ObjectKind::Lock | ObjectKind::LavaContainer { .. } => {
                self.check_player_interaction(player, input, f);
            }
            ObjectKind::StarContainer => {
                if self.body.exists && player.emeralds_remaining == 0 {
                    let Point { x, y } = self.body.pos;
                    f.grid.set_display_and_solid(x, y, tile::FLOOR);
                    self.die(f, DeathCause::Opened);
                }
            }
        }
    }

    pub fn update(&mut self, f: &mut Field) {
        if !self.body.exists {
            self.body.tick_death(f.dt);
            return;
        }
        let Point { x, y } = self.body.pos;
        let on_void = f.grid.solid_tile_at(x, y) == tile::VOID;

        match self.kind {
            ObjectKind::Crate(kind) => {
                if on_void && !self.body.moving && !kind.immune() {
                    self.die(f, DeathCause::Void);
                    return;
                }
                match kind {
                    CrateKind::BlackHole => {
                        self.phase += ROTATE_SPEED * f.dt;
                        self.size_timer += SIZE_SPEED * f.dt;
                    }
                    CrateKind::LavaEater => self.blink(f.dt),
                    _ => {}
                }
            }
            ObjectKind::Collectible(kind) => {
                if on_void {
                    log::debug!("{} swallowed at ({x}, {y})", self.kind.label());
                    self.body.fade_out(f.ctx.death_time);
                    let kind = self.kind;
                    f.events.push(GameEvent::EntityDied { kind, cause: DeathCause::Void, x, y });
                    return;
                }
                self.phase += FLOAT_SPEED * f.dt;
                if kind == CollectibleKind::Star && f.clock.turn() > f.grid.turn_limit() {
                    self.star = StarOutcome::Gray;
                }
            }
            ObjectKind::Lock | ObjectKind::LavaContainer { .. } | ObjectKind::StarContainer => {}
        }
    }
}

// ── Hooks ──

impl FieldObject {
    fn attempt_push(&mut self, kind: CrateKind, player: &Player, input: &InputSnapshot, f: &mut Field) {
        if !self.body.exists || f.clock.waiting() || player.is_moving() {
            return;
        }
        let here = self.body.pos;
        self.player_dir = rules::facing_direction(player.pos(), here);
        let Some(dest) = rules::push_destination(
            f.grid, player.pos(), here, input.direction, kind.free_tile_rule(),
        ) else {
            return;
        };
        self.body.begin_move(dest);
        f.grid.set_display_and_solid(here.x, here.y, tile::FLOOR);
        f.events.push(GameEvent::CratePushed { x: dest.x, y: dest.y });
        log::debug!("{} pushed ({}, {}) -> ({}, {})", self.kind.label(), here.x, here.y, dest.x, dest.y);
    }

    fn on_moving_stopped(&mut self, f: &mut Field) {
        let ObjectKind::Crate(kind) = self.kind else { return };
        let Point { x, y } = self.body.pos;

        if kind == CrateKind::BlackHole {
            mark_void(f.grid, x, y);
        } else if kind.dies_in_lava() && f.grid.is_lava(x, y) {
            // The crate fills the lava
            f.grid.set_display_and_solid(x, y, tile::FLOOR);
            self.die(f, DeathCause::Lava);
        } else if f.grid.solid_tile_at(x, y) == tile::VOID && !kind.immune() {
            // Left for `update` to finish off
        } else {
            f.grid.set_solid_only(x, y, tile::OCCUPIED);
        }
    }

    fn check_player_interaction(&mut self, player: &mut Player, input: &InputSnapshot, f: &mut Field) {
        if !self.body.exists || f.clock.waiting() || player.is_moving() {
            return;
        }
        let here = self.body.pos;
        self.player_dir = rules::facing_direction(player.pos(), here);
        if rules::is_facing(player.pos(), here, input.direction) {
            self.on_interact(player, f);
        }
    }

    fn on_interact(&mut self, player: &mut Player, f: &mut Field) {
        let Point { x, y } = self.body.pos;
        match self.kind {
            ObjectKind::Lock => {
                if !player.reduce_key() {
                    return;
                }
                f.grid.set_display_and_solid(x, y, tile::FLOOR);
                f.events.push(GameEvent::LockOpened { x, y });
                self.die(f, DeathCause::Opened);
            }
            ObjectKind::LavaContainer { purple } => {
                if !player.reduce_hammer() {
                    return;
                }
                let lava = if purple { tile::PURPLE_LAVA } else { tile::LAVA };
                f.grid.set_display_and_solid(x, y, lava);
                f.events.push(GameEvent::LavaReleased { x, y, purple });
                self.die(f, DeathCause::Opened);
            }
            _ => {}
        }
    }

    fn collect(&mut self, kind: CollectibleKind, player: &mut Player, f: &mut Field) {
        if !self.body.exists || f.clock.waiting() || player.pos() != self.body.pos {
            return;
        }
        let Point { x, y } = self.body.pos;
        match kind {
            CollectibleKind::Key => player.keys += 1,
            CollectibleKind::Hammer => player.hammers += 1,
            CollectibleKind::Gem => {
                f.grid.start_purple_fade(f.ctx.purple_fade_time);
                f.events.push(GameEvent::PurpleToggled);
            }
            CollectibleKind::Emerald => player.collect_emerald(),
            CollectibleKind::Star => {
                self.star = if f.clock.turn() <= f.grid.turn_limit() {
                    StarOutcome::Golden
                } else {
                    StarOutcome::Gray
                };
                f.grid.end_stage();
            }
        }
        f.events.push(GameEvent::ItemCollected { item: kind, x, y });
        if kind == CollectibleKind::Star {
            f.events.push(GameEvent::StageEnded { golden: self.star == StarOutcome::Golden });
        }
        log::debug!("{} collected at ({x}, {y})", self.kind.label());
        self.body.fade_out(f.ctx.death_time);
    }

    /// Begin death (interrupting the turn), report it, run `on_death`.
    fn die(&mut self, f: &mut Field, cause: DeathCause) {
        let Point { x, y } = self.body.pos;
        self.body.begin_death(f.clock, f.ctx.death_time);
        f.events.push(GameEvent::EntityDied { kind: self.kind, cause, x, y });
        log::debug!("{} died at ({x}, {y})", self.kind.label());
        self.on_death(f);
    }

    fn on_death(&mut self, f: &mut Field) {
        if self.kind == ObjectKind::Crate(CrateKind::Purple) {
            f.grid.start_purple_fade(f.ctx.purple_fade_time);
            f.events.push(GameEvent::PurpleToggled);
        }
    }

    /// Eyes shut while moving and for a moment after stopping.
    fn blink(&mut self, dt: f32) {
        if self.body.moving {
            self.eyes_closed = true;
            self.eye_timer = 0.0;
        } else if self.eyes_closed {
            if self.eye_timer <= 0.0 {
                self.eye_timer = EYE_CLOSE_TIME;
            } else {
                self.eye_timer -= dt;
                if self.eye_timer <= 0.0 {
                    self.eyes_closed = false;
                }
            }
        }
    }
}

fn mark_void(grid: &mut TileGrid, x: i32, y: i32) {
    grid.set_display_and_solid(x, y, tile::FLOOR);
    grid.set_solid_only(x, y, tile::VOID);
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::tests::grid_from;

    /// Frame harness: grid, clock and event sink the hooks can borrow.
    struct Rig {
        grid: TileGrid,
        clock: TurnClock,
        ctx: SimContext,
        events: Vec<GameEvent>,
    }

    impl Rig {
        fn new(rows: &[&str]) -> Self {
            Rig {
                grid: grid_from(rows),
                clock: TurnClock::new(),
                ctx: SimContext::default(),
                events: vec![],
            }
        }

        fn field(&mut self) -> Field<'_> {
            Field {
                grid: &mut self.grid,
                clock: &mut self.clock,
                ctx: &self.ctx,
                events: &mut self.events,
                dt: 1.0,
            }
        }

        /// One object-side frame: tick clock, then the object protocol.
        fn frame(&mut self, obj: &mut FieldObject, player: &mut Player, dir: Direction) {
            self.clock.tick(1.0);
            let input = InputSnapshot::new(dir);
            let mut f = self.field();
            obj.update_position(&mut f);
            obj.player_collision_or_interaction(player, &input, &mut f);
            obj.update(&mut f);
        }

        fn run_out_clock(&mut self) {
            while self.clock.waiting() {
                self.clock.tick(1.0);
            }
        }
    }

    fn placed(rig: &mut Rig, kind: ObjectKind, x: i32, y: i32) -> FieldObject {
        let obj = FieldObject::new(kind, Point::new(x, y));
        obj.place(&mut rig.grid);
        obj
    }

    // ── Spawning ──

    #[test]
    fn spawn_ids_map_to_kinds() {
        assert_eq!(ObjectKind::from_spawn_id(2), Some(ObjectKind::Crate(CrateKind::Plain)));
        assert_eq!(ObjectKind::from_spawn_id(14), Some(ObjectKind::LavaContainer { purple: true }));
        assert_eq!(ObjectKind::from_spawn_id(18), Some(ObjectKind::Collectible(CollectibleKind::Star)));
        assert_eq!(ObjectKind::from_spawn_id(22), Some(ObjectKind::StarContainer));
        assert_eq!(ObjectKind::from_spawn_id(tile::SPAWN_PLAYER), None);
        assert_eq!(ObjectKind::from_spawn_id(tile::WALL), None);
    }

    #[test]
    fn placement_marks() {
        let mut rig = Rig::new(&["    "]);
        placed(&mut rig, ObjectKind::Crate(CrateKind::Plain), 0, 0);
        placed(&mut rig, ObjectKind::Crate(CrateKind::BlackHole), 1, 0);
        placed(&mut rig, ObjectKind::Collectible(CollectibleKind::Key), 2, 0);
        placed(&mut rig, ObjectKind::LavaContainer { purple: false }, 3, 0);
        assert_eq!(rig.grid.tile_at(0, 0), tile::FLOOR);
        assert_eq!(rig.grid.solid_tile_at(0, 0), tile::OCCUPIED);
        assert_eq!(rig.grid.solid_tile_at(1, 0), tile::VOID);
        assert!(!rig.grid.is_solid(2, 0));
        assert!(rig.grid.is_solid(3, 0));
    }

    #[test]
    fn collectible_float_phase_is_seeded_by_position() {
        let a = FieldObject::new(ObjectKind::Collectible(CollectibleKind::Key), Point::new(1, 2));
        let b = FieldObject::new(ObjectKind::Collectible(CollectibleKind::Key), Point::new(3, 0));
        assert!((a.phase - PI / 2.0).abs() < 1e-6);
        assert!((a.float_offset() - b.float_offset()).abs() < 1e-6);
    }

    // ── Push ──

    #[test]
    fn push_clears_origin_and_commits_later() {
        let mut rig = Rig::new(&[
            "   ",
            "   ",
            "   ",
            "   ",
        ]);
        let mut crate_ = placed(&mut rig, ObjectKind::Crate(CrateKind::Plain), 1, 2);
        let mut player = Player::new(Point::new(1, 1), 0);

        rig.frame(&mut crate_, &mut player, Direction::Down);
        assert!(crate_.body.moving);
        assert_eq!(crate_.body.target, Point::new(1, 3));
        assert_eq!(crate_.body.pos, Point::new(1, 2));
        assert!(!rig.grid.is_solid(1, 2));
        assert_eq!(crate_.player_dir(), Some(Direction::Down));
        assert!(rig.events.contains(&GameEvent::CratePushed { x: 1, y: 3 }));

        // The player's own move starts the turn
        rig.clock.start_turn(16.0, true);
        for _ in 0..16 {
            rig.frame(&mut crate_, &mut player, Direction::None);
        }
        assert!(!crate_.body.moving);
        assert_eq!(crate_.body.pos, Point::new(1, 3));
        assert_eq!(rig.grid.solid_tile_at(1, 3), tile::OCCUPIED);
    }

    #[test]
    fn rejected_push_leaves_target_alone() {
        let mut rig = Rig::new(&["   #"]);
        let mut crate_ = placed(&mut rig, ObjectKind::Crate(CrateKind::Plain), 2, 0);
        let mut player = Player::new(Point::new(1, 0), 0);
        rig.frame(&mut crate_, &mut player, Direction::Right);
        assert_eq!(crate_.body.target, crate_.body.pos);
        assert!(rig.grid.is_solid(2, 0));

        // Wrong direction
        rig.frame(&mut crate_, &mut player, Direction::Up);
        assert!(!crate_.body.moving);
    }

    #[test]
    fn no_push_mid_turn_or_while_player_moves() {
        let mut rig = Rig::new(&["    "]);
        let mut crate_ = placed(&mut rig, ObjectKind::Crate(CrateKind::Plain), 2, 0);
        let mut player = Player::new(Point::new(1, 0), 0);

        rig.clock.start_turn(16.0, true);
        rig.frame(&mut crate_, &mut player, Direction::Right);
        assert!(!crate_.body.moving);

        rig.run_out_clock();
        player.body.begin_move(Point::new(0, 0));
        rig.frame(&mut crate_, &mut player, Direction::Right);
        assert!(!crate_.body.moving);
    }

    #[test]
    fn crate_dies_in_lava_and_fills_it() {
        let mut rig = Rig::new(&["   ~"]);
        let mut crate_ = placed(&mut rig, ObjectKind::Crate(CrateKind::Plain), 2, 0);
        let mut player = Player::new(Point::new(1, 0), 0);

        rig.frame(&mut crate_, &mut player, Direction::Right);
        rig.clock.start_turn(16.0, true);
        // The 16th frame idles the clock; the crate commits and dies in it
        for _ in 0..16 {
            rig.frame(&mut crate_, &mut player, Direction::None);
        }

        assert!(!crate_.exists());
        assert!(crate_.body.dying);
        assert_eq!(rig.grid.tile_at(3, 0), tile::FLOOR);
        assert!(!rig.grid.is_solid(3, 0));
        assert!(!rig.grid.is_solid(2, 0));
        // Death interrupts the turn without counting one
        assert!(rig.clock.waiting());
        assert_eq!(rig.clock.turn(), 1);
        assert!(rig.clock.stop_pending());
    }

    #[test]
    fn purple_crate_death_toggles_walls() {
        let mut rig = Rig::new(&["o  ~"]);
        let mut crate_ = placed(&mut rig, ObjectKind::Crate(CrateKind::Purple), 2, 0);
        let mut player = Player::new(Point::new(1, 0), 0);

        rig.frame(&mut crate_, &mut player, Direction::Right);
        rig.clock.start_turn(16.0, true);
        rig.run_out_clock();
        rig.frame(&mut crate_, &mut player, Direction::None);

        assert!(!crate_.exists());
        assert_eq!(rig.grid.tile_at(0, 0), tile::PURPLE_ON);
        assert!(rig.grid.purple_fading());
        assert!(rig.events.contains(&GameEvent::PurpleToggled));
    }

    #[test]
    fn lava_eater_travels_on_lava_only() {
        let mut rig = Rig::new(&["  ~ "]);
        let mut eater = placed(&mut rig, ObjectKind::Crate(CrateKind::LavaEater), 1, 0);
        let mut player = Player::new(Point::new(0, 0), 0);

        rig.frame(&mut eater, &mut player, Direction::Right);
        assert_eq!(eater.body.target, Point::new(2, 0));
        rig.clock.start_turn(16.0, true);
        rig.run_out_clock();
        rig.frame(&mut eater, &mut player, Direction::None);

        assert!(eater.exists());
        assert_eq!(eater.body.pos, Point::new(2, 0));
        // Still lava underneath, occupied on top
        assert!(rig.grid.is_lava(2, 0));
        assert_eq!(rig.grid.solid_tile_at(2, 0), tile::OCCUPIED);

        // Floor beyond: refuses
        player.body.pos = Point::new(1, 0);
        rig.frame(&mut eater, &mut player, Direction::Right);
        assert!(!eater.body.moving);
    }

    #[test]
    fn lava_eater_eats_the_lava_it_leaves() {
        let mut rig = Rig::new(&["  ~~"]);
        let mut eater = placed(&mut rig, ObjectKind::Crate(CrateKind::LavaEater), 2, 0);
        rig.grid.set_solid_only(2, 0, tile::OCCUPIED);
        let mut player = Player::new(Point::new(1, 0), 0);

        rig.frame(&mut eater, &mut player, Direction::Right);
        assert!(eater.body.moving);
        assert_eq!(rig.grid.tile_at(2, 0), tile::FLOOR);
        assert!(!rig.grid.is_solid(2, 0));
    }

    #[test]
    fn lava_eater_blinks_after_moving() {
        let mut rig = Rig::new(&[" ~~"]);
        let mut eater = placed(&mut rig, ObjectKind::Crate(CrateKind::LavaEater), 1, 0);
        eater.body.begin_move(Point::new(2, 0));
        rig.clock.start_turn(4.0, true);
        rig.frame(&mut eater, &mut Player::new(Point::new(0, 0), 0), Direction::None);
        assert!(eater.eyes_closed());
        rig.run_out_clock();
        let mut player = Player::new(Point::new(0, 0), 0);
        for _ in 0..10 {
            rig.frame(&mut eater, &mut player, Direction::None);
        }
        assert!(!eater.eyes_closed());
    }

    // ── Black hole ──

    #[test]
    fn black_hole_may_enter_walls_inside_border() {
        let mut rig = Rig::new(&[
            "#####",
            "#  ##",
            "#####",
        ]);
        let mut hole = placed(&mut rig, ObjectKind::Crate(CrateKind::BlackHole), 2, 1);
        let mut player = Player::new(Point::new(1, 1), 0);

        rig.frame(&mut hole, &mut player, Direction::Right);
        assert_eq!(hole.body.target, Point::new(3, 1));
        rig.clock.start_turn(16.0, true);
        rig.run_out_clock();
        rig.frame(&mut hole, &mut player, Direction::None);

        assert!(hole.exists());
        assert_eq!(rig.grid.tile_at(3, 1), tile::FLOOR);
        assert_eq!(rig.grid.solid_tile_at(3, 1), tile::VOID);
        // The cell it left is plain floor again
        assert_eq!(rig.grid.solid_tile_at(2, 1), tile::FLOOR);

        // Border stays out of reach
        player.body.pos = Point::new(2, 1);
        rig.frame(&mut hole, &mut player, Direction::Right);
        assert!(!hole.body.moving);
    }

    #[test]
    fn crate_on_void_dies_but_black_hole_does_not() {
        let mut rig = Rig::new(&["     "]);
        let mut crate_ = placed(&mut rig, ObjectKind::Crate(CrateKind::Plain), 1, 0);
        let mut hole = placed(&mut rig, ObjectKind::Crate(CrateKind::BlackHole), 3, 0);
        let mut player = Player::new(Point::new(0, 4), 0);

        rig.grid.set_solid_only(1, 0, tile::VOID);
        rig.frame(&mut crate_, &mut player, Direction::None);
        rig.frame(&mut hole, &mut player, Direction::None);
        assert!(!crate_.exists());
        assert!(hole.exists());
        assert!(hole.angle() > 0.0);
        assert!(rig.events.iter().any(|e| matches!(
            e,
            GameEvent::EntityDied {
                kind: ObjectKind::Crate(CrateKind::Plain), cause: DeathCause::Void, x: 1, y: 0,
            }
        )));
    }

    #[test]
    fn collectible_swallowed_by_void_without_pickup() {
        let mut rig = Rig::new(&["   "]);
        let mut key = placed(&mut rig, ObjectKind::Collectible(CollectibleKind::Key), 1, 0);
        let mut player = Player::new(Point::new(0, 0), 0);
        rig.grid.set_solid_only(1, 0, tile::VOID);
        rig.frame(&mut key, &mut player, Direction::None);
        assert!(!key.exists());
        assert_eq!(player.keys, 0);
        // Fading does not hold up the clock
        assert!(!rig.clock.waiting());
    }

    // ── Collectibles ──

    #[test]
    fn key_picked_up_once() {
        let mut rig = Rig::new(&["   "]);
        let mut key = placed(&mut rig, ObjectKind::Collectible(CollectibleKind::Key), 1, 0);
        let mut player = Player::new(Point::new(1, 0), 0);

        rig.frame(&mut key, &mut player, Direction::None);
        assert_eq!(player.keys, 1);
        assert!(!key.exists());
        assert!(key.body.dying);
        assert!(!rig.clock.waiting());

        for _ in 0..5 {
            rig.frame(&mut key, &mut player, Direction::None);
        }
        assert_eq!(player.keys, 1);
        let pickups = rig.events.iter()
            .filter(|e| matches!(e, GameEvent::ItemCollected { .. }))
            .count();
        assert_eq!(pickups, 1);
    }

    #[test]
    fn no_pickup_mid_turn() {
        let mut rig = Rig::new(&["   "]);
        let mut hammer = placed(&mut rig, ObjectKind::Collectible(CollectibleKind::Hammer), 1, 0);
        let mut player = Player::new(Point::new(1, 0), 0);
        rig.clock.start_turn(16.0, true);
        rig.frame(&mut hammer, &mut player, Direction::None);
        assert_eq!(player.hammers, 0);
        rig.run_out_clock();
        rig.frame(&mut hammer, &mut player, Direction::None);
        assert_eq!(player.hammers, 1);
    }

    #[test]
    fn gem_toggles_purple_walls() {
        let mut rig = Rig::new(&["oO "]);
        let mut gem = placed(&mut rig, ObjectKind::Collectible(CollectibleKind::Gem), 2, 0);
        let mut player = Player::new(Point::new(2, 0), 0);
        rig.frame(&mut gem, &mut player, Direction::None);
        assert!(rig.grid.is_solid(0, 0));
        assert!(!rig.grid.is_solid(1, 0));
    }

    #[test]
    fn star_outcome_decided_at_pickup() {
        // Limit is 10 in the test grid
        let mut rig = Rig::new(&["   "]);
        let mut star = placed(&mut rig, ObjectKind::Collectible(CollectibleKind::Star), 1, 0);
        let mut player = Player::new(Point::new(1, 0), 0);
        for _ in 0..10 {
            rig.clock.start_turn(0.0, true);
        }
        rig.frame(&mut star, &mut player, Direction::None);
        assert_eq!(star.star_outcome(), StarOutcome::Golden);
        assert!(rig.grid.consume_stage_ended());
        assert!(rig.events.contains(&GameEvent::StageEnded { golden: true }));

        // Later turns do not repaint a collected star
        rig.clock.start_turn(0.0, true);
        rig.frame(&mut star, &mut player, Direction::None);
        assert_eq!(star.star_outcome(), StarOutcome::Golden);
    }

    #[test]
    fn star_over_limit_is_gray() {
        let mut rig = Rig::new(&["   "]);
        let mut star = placed(&mut rig, ObjectKind::Collectible(CollectibleKind::Star), 1, 0);
        let mut player = Player::new(Point::new(0, 0), 0);
        for _ in 0..11 {
            rig.clock.start_turn(0.0, true);
        }
        // Turns past the limit gray the star before pickup
        rig.frame(&mut star, &mut player, Direction::None);
        assert_eq!(star.star_outcome(), StarOutcome::Gray);

        player.body.pos = Point::new(1, 0);
        rig.frame(&mut star, &mut player, Direction::None);
        assert!(rig.events.contains(&GameEvent::StageEnded { golden: false }));
    }

    // ── Locks and containers ──

    #[test]
    fn lock_needs_a_key() {
        let mut rig = Rig::new(&[
            "    ",
            "    ",
            "  L ",
            "    ",
        ]);
        let mut lock = placed(&mut rig, ObjectKind::Lock, 2, 2);
        let mut player = Player::new(Point::new(1, 2), 0);

        rig.frame(&mut lock, &mut player, Direction::Right);
        assert!(lock.exists());
        assert_eq!(rig.grid.tile_at(2, 2), tile::LOCK);
        assert_eq!(lock.player_dir(), Some(Direction::Right));

        player.keys = 1;
        rig.frame(&mut lock, &mut player, Direction::Right);
        assert_eq!(player.keys, 0);
        assert_eq!(rig.grid.tile_at(2, 2), tile::FLOOR);
        assert!(!rig.grid.is_solid(2, 2));
        assert!(!lock.exists());
        assert!(lock.body.dying);
        assert!(rig.events.contains(&GameEvent::LockOpened { x: 2, y: 2 }));
    }

    #[test]
    fn lock_ignores_wrong_facing() {
        let mut rig = Rig::new(&["  L "]);
        let mut lock = placed(&mut rig, ObjectKind::Lock, 2, 0);
        let mut player = Player::new(Point::new(1, 0), 0);
        player.keys = 1;
        rig.frame(&mut lock, &mut player, Direction::Left);
        assert!(lock.exists());
        assert_eq!(player.keys, 1);
    }

    #[test]
    fn lava_container_releases_lava() {
        let mut rig = Rig::new(&["    "]);
        let mut plain = placed(&mut rig, ObjectKind::LavaContainer { purple: false }, 1, 0);
        let mut purple = placed(&mut rig, ObjectKind::LavaContainer { purple: true }, 3, 0);
        let mut player = Player::new(Point::new(2, 0), 0);

        rig.frame(&mut plain, &mut player, Direction::Left);
        assert!(plain.exists());

        player.hammers = 2;
        rig.frame(&mut plain, &mut player, Direction::Left);
        assert_eq!(rig.grid.tile_at(1, 0), tile::LAVA);
        assert!(!plain.exists());

        rig.run_out_clock();
        rig.frame(&mut purple, &mut player, Direction::Right);
        assert_eq!(rig.grid.tile_at(3, 0), tile::PURPLE_LAVA);
        assert_eq!(player.hammers, 0);
    }

    #[test]
    fn star_container_opens_when_emeralds_run_out() {
        let mut rig = Rig::new(&["   "]);
        let mut container = placed(&mut rig, ObjectKind::StarContainer, 1, 0);
        let mut player = Player::new(Point::new(0, 0), 1);

        rig.frame(&mut container, &mut player, Direction::None);
        assert!(container.exists());
        assert!(rig.grid.is_solid(1, 0));

        player.collect_emerald();
        rig.frame(&mut container, &mut player, Direction::None);
        assert!(!container.exists());
        assert!(!rig.grid.is_solid(1, 0));

        let deaths = rig.events.iter()
            .filter(|e| matches!(e, GameEvent::EntityDied { .. }))
            .count();
        rig.frame(&mut container, &mut player, Direction::None);
        let again = rig.events.iter()
            .filter(|e| matches!(e, GameEvent::EntityDied { .. }))
            .count();
        assert_eq!(deaths, again);
    }
}
