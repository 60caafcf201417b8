/// The player: the only entity that reads input and starts turns.
///
/// A move is legal when the clock is idle, no forced stop is pending and
/// `rules::player_move_target` accepts the cell. The player never dies and
/// may walk over the void left by a black hole.
///
/// The player stays put for the frame its move commits, so every object
/// sees the settled position once with the clock idle before the next
/// move can start.

use crate::domain::entity::{Afterimage, Body, Direction, InputSnapshot, Point};
use crate::domain::rules;
use super::event::GameEvent;
use super::object::Field;

const TRAIL_MAX: usize = 16;
const TRAIL_INTERVAL: f32 = 4.0;
const TRAIL_LIFETIME: f32 = 20.0;
const OUTLINE_SPEED: f32 = 0.05;

#[derive(Clone, Debug)]
pub struct Player {
    pub body: Body,
    pub keys: u32,
    pub hammers: u32,
    pub emeralds_remaining: u32,
    /// Direction of the last move the player started.
    pub facing: Direction,
    trail: Vec<Afterimage>,
    trail_timer: f32,
    outline_phase: f32,
    arrived: bool,
}

impl Player {
    pub fn new(pos: Point, emeralds: u32) -> Self {
        Player {
            body: Body::new(pos),
            keys: 0,
            hammers: 0,
            emeralds_remaining: emeralds,
            facing: Direction::Down,
            trail: Vec::with_capacity(TRAIL_MAX),
            trail_timer: TRAIL_INTERVAL,
            outline_phase: 0.0,
            arrived: false,
        }
    }

    #[inline]
    pub fn pos(&self) -> Point {
        self.body.pos
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        self.body.moving
    }

    pub fn reduce_key(&mut self) -> bool {
        if self.keys == 0 {
            return false;
        }
        self.keys -= 1;
        true
    }

    pub fn reduce_hammer(&mut self) -> bool {
        if self.hammers == 0 {
            return false;
        }
        self.hammers -= 1;
        true
    }

    pub fn collect_emerald(&mut self) {
        self.emeralds_remaining = self.emeralds_remaining.saturating_sub(1);
    }

    pub fn trail(&self) -> &[Afterimage] {
        &self.trail
    }

    /// Cyclic phase for the pulsing outline.
    pub fn outline_phase(&self) -> f32 {
        self.outline_phase
    }

    pub fn update_position(&mut self, f: &Field) {
        self.arrived = self.body.update_position(&*f.clock);
    }

    pub fn stop_moving(&mut self) {
        self.body.stop_moving();
    }

    /// Per-frame update: animation, then input, then trail.
    pub fn update(&mut self, input: &InputSnapshot, f: &mut Field) {
        self.outline_phase += OUTLINE_SPEED * f.dt;
        self.trail.retain_mut(|a| !a.tick(f.dt));

        self.control(input.direction, f);
        self.generate_trail(f.dt);
    }

    fn control(&mut self, dir: Direction, f: &mut Field) {
        // No new turns once the stage is over
        if self.arrived || f.clock.waiting() || f.clock.stop_pending() || f.grid.stage_end_pending() {
            return;
        }
        let Some(dest) = rules::player_move_target(f.grid, self.body.pos, dir) else {
            return;
        };
        self.body.begin_move(dest);
        self.facing = dir;
        f.clock.start_turn(f.ctx.turn_length, true);
        f.events.push(GameEvent::TurnStarted { turn: f.clock.turn() });
    }

    fn generate_trail(&mut self, dt: f32) {
        if !self.body.moving {
            return;
        }
        self.trail_timer -= dt;
        if self.trail_timer <= 0.0 {
            if self.trail.len() < TRAIL_MAX {
                self.trail.push(Afterimage::new(self.body.render_pos, TRAIL_LIFETIME));
            }
            self.trail_timer += TRAIL_INTERVAL;
        }
    }
}
