/// Entity base: grid position, pending target, interpolated render position,
/// existence and the death/fade timer. Shared by the player and every
/// field object.
///
/// ## Position invariant
///
///   - not moving          → `render_pos == pos`
///   - moving, clock waits → `render_pos` blends `pos` → `target` by the
///                           clock fraction (1.0 = at `pos`, 0.0 = at `target`)
///   - moving, clock idle  → commit `pos = target`, stop moving
///
/// `render_pos` is stored in tile units; scaling to pixels / terminal cells
/// happens where it is consumed (`scaled_render_pos`).

use super::clock::TurnClock;

/// Default length of a death / fade animation, in frame units.
pub const DEFAULT_DEATH_TIME: f32 = 30.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
    None,
}

impl Direction {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::None => (0, 0),
        }
    }
}

impl Default for Direction {
    fn default() -> Self {
        Direction::None
    }
}

pub const BUTTON_RESET: &str = "reset";
pub const BUTTON_CONFIRM: &str = "confirm";
pub const BUTTON_CANCEL: &str = "cancel";

/// Frame input: one discrete direction plus named buttons pressed this frame.
#[derive(Clone, Debug, Default)]
pub struct InputSnapshot {
    pub direction: Direction,
    pressed: Vec<&'static str>,
}

impl InputSnapshot {
    pub fn new(direction: Direction) -> Self {
        InputSnapshot { direction, pressed: vec![] }
    }

    pub fn with_button(mut self, name: &'static str) -> Self {
        if !self.pressed.contains(&name) {
            self.pressed.push(name);
        }
        self
    }

    pub fn button(&self, name: &str) -> bool {
        self.pressed.iter().any(|b| *b == name)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }

    pub fn step(self, dir: Direction) -> Point {
        let (dx, dy) = dir.delta();
        Point::new(self.x + dx, self.y + dy)
    }

    pub fn manhattan(self, other: Point) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

#[derive(Clone, Debug)]
pub struct Body {
    pub pos: Point,
    pub target: Point,
    pub render_pos: (f32, f32),
    pub moving: bool,
    pub exists: bool,
    pub dying: bool,
    pub death_timer: f32,
    pub initial_death_time: f32,
}

impl Body {
    pub fn new(pos: Point) -> Self {
        Body {
            pos,
            target: pos,
            render_pos: (pos.x as f32, pos.y as f32),
            moving: false,
            exists: true,
            dying: false,
            death_timer: 0.0,
            initial_death_time: 0.0,
        }
    }

    /// Start heading for `target`. The clock decides when it arrives.
    pub fn begin_move(&mut self, target: Point) {
        self.target = target;
        self.moving = true;
    }

    /// Interpolate or commit. Returns true on the frame the move commits,
    /// so the owner can run its arrival hook.
    pub fn update_position(&mut self, clock: &TurnClock) -> bool {
        if !self.moving {
            self.pin();
            return false;
        }
        if clock.waiting() {
            let t = clock.fraction();
            self.render_pos = (
                self.pos.x as f32 * t + self.target.x as f32 * (1.0 - t),
                self.pos.y as f32 * t + self.target.y as f32 * (1.0 - t),
            );
            return false;
        }
        self.pos = self.target;
        self.moving = false;
        self.pin();
        true
    }

    /// Commit the target right now, without waiting for the clock.
    pub fn stop_moving(&mut self) {
        self.pos = self.target;
        self.moving = false;
        self.pin();
    }

    #[inline]
    fn pin(&mut self) {
        self.render_pos = (self.pos.x as f32, self.pos.y as f32);
    }

    /// Leave play and interrupt the running turn: the clock waits out the
    /// death animation and the player's in-flight move is cut short.
    pub fn begin_death(&mut self, clock: &mut TurnClock, duration: f32) {
        self.fade_out(duration);
        clock.start_turn(duration, false);
        clock.force_stop();
    }

    /// Leave play with a fade, but leave the clock alone.
    pub fn fade_out(&mut self, duration: f32) {
        self.exists = false;
        self.dying = true;
        self.death_timer = duration;
        self.initial_death_time = duration;
    }

    pub fn tick_death(&mut self, dt: f32) {
        if !self.dying {
            return;
        }
        self.death_timer -= dt;
        if self.death_timer <= 0.0 {
            self.death_timer = 0.0;
            self.dying = false;
        }
    }

    /// 0.0 when the death starts, 1.0 when it is over.
    pub fn death_progress(&self) -> f32 {
        if self.initial_death_time <= 0.0 {
            return 1.0;
        }
        1.0 - (self.death_timer / self.initial_death_time).clamp(0.0, 1.0)
    }

    /// Render position multiplied out by the tile size.
    pub fn scaled_render_pos(&self, tile_size: (f32, f32)) -> (f32, f32) {
        (self.render_pos.0 * tile_size.0, self.render_pos.1 * tile_size.1)
    }

    /// Still worth drawing: alive, or playing its death animation.
    pub fn visible(&self) -> bool {
        self.exists || self.dying
    }
}

/// A fading afterimage left behind by the moving player.
#[derive(Clone, Debug)]
pub struct Afterimage {
    pub pos: (f32, f32),
    timer: f32,
    initial_time: f32,
}

impl Afterimage {
    pub fn new(pos: (f32, f32), time: f32) -> Self {
        Afterimage { pos, timer: time, initial_time: time }
    }

    /// Advance. Returns true once the afterimage has expired.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.timer -= dt;
        self.timer <= 0.0
    }

    /// 1.0 fresh → 0.0 gone.
    pub fn strength(&self) -> f32 {
        if self.initial_time <= 0.0 {
            return 0.0;
        }
        (self.timer / self.initial_time).clamp(0.0, 1.0)
    }
}
