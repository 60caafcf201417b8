/// Stage-wide status aggregation for the HUD.
///
/// Refreshed once per frame after the player has settled. The key counter
/// animates: when the count changes, the old count is kept for
/// `KEY_APPEARANCE_TIME` frame units so the HUD can slide the key in/out.

use crate::domain::clock::TurnClock;
use super::player::Player;

const KEY_APPEARANCE_TIME: f32 = 30.0;

#[derive(Clone, Debug)]
pub struct Status {
    pub stage_name: String,
    pub stage_index: usize,
    pub turn_limit: u32,
    pub turn: u32,
    pub key_count: u32,
    pub hammer_count: u32,
    pub emeralds_remaining: u32,
    key_appearance_timer: f32,
    previous_key_count: u32,
}

impl Status {
    pub fn new(stage_name: &str, stage_index: usize, turn_limit: u32) -> Self {
        Status {
            stage_name: stage_name.to_string(),
            stage_index,
            turn_limit,
            turn: 0,
            key_count: 0,
            hammer_count: 0,
            emeralds_remaining: 0,
            key_appearance_timer: 0.0,
            previous_key_count: 0,
        }
    }

    pub fn update(&mut self, clock: &TurnClock, player: &Player, dt: f32) {
        self.turn = clock.turn();
        self.hammer_count = player.hammers;
        self.emeralds_remaining = player.emeralds_remaining;

        if player.keys != self.key_count {
            self.previous_key_count = self.key_count;
            self.key_count = player.keys;
            self.key_appearance_timer = KEY_APPEARANCE_TIME;
        }

        if self.key_appearance_timer > 0.0 {
            self.key_appearance_timer -= dt;
            if self.key_appearance_timer <= 0.0 {
                self.key_appearance_timer = 0.0;
                self.previous_key_count = self.key_count;
            }
        }
    }

    pub fn over_limit(&self) -> bool {
        self.turn > self.turn_limit
    }

    /// Key count the HUD shows as settled.
    pub fn previous_key_count(&self) -> u32 {
        self.previous_key_count
    }

    /// 1.0 right after the key count changed, 0.0 once settled.
    pub fn key_appearance(&self) -> f32 {
        (self.key_appearance_timer / KEY_APPEARANCE_TIME).clamp(0.0, 1.0)
    }
}
