/// The step function: advances the world by one frame.
///
/// Processing order (load-bearing):
///   1. Grid effects and the turn clock tick
///   2. Objects, each in turn: `update_position` → `player_collision_or_interaction` → `update`
///   3. Forced stop: a death raised it and the clock is waiting → commit the player's move
///   4. Player: `update_position` → `update` (reads input, may start a turn)
///   5. Status aggregation from the settled player
///   6. Reset shortcut
///
/// Objects resolve before the player so a crate vacating its cell is
/// already reflected in the solid layer when the player's target is checked.
/// Within the object list, spawn order is the only tie-break.

use crate::domain::entity::{InputSnapshot, BUTTON_RESET};
use super::event::GameEvent;
use super::object::{Field, FieldObject};
use super::player::Player;
use super::world::{Phase, World};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut World, input: &InputSnapshot, dt: f32) -> Vec<GameEvent> {
    if world.phase != Phase::Playing { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick_message(dt);

    {
        let World { ctx, grid, clock, player, objects, status, .. } = &mut *world;

        grid.tick(dt);
        clock.tick(dt);

        let mut f = Field { grid, clock, ctx: &*ctx, events: &mut events, dt };
        resolve_objects(objects, player, input, &mut f);
        resolve_forced_stop(player, &mut f);
        player.update_position(&f);
        player.update(input, &mut f);
        status.update(&*f.clock, player, dt);
    }

    if input.button(BUTTON_RESET) {
        world.reset_map();
        events.push(GameEvent::StageReset);
    }

    events
}

// ══════════════════════════════════════════════════════════════
// Objects
// ══════════════════════════════════════════════════════════════

fn resolve_objects(objects: &mut [FieldObject], player: &mut Player, input: &InputSnapshot, f: &mut Field) {
    for obj in objects.iter_mut() {
        obj.update_position(f);
        obj.player_collision_or_interaction(player, input, f);
        obj.update(f);
    }
}

// ══════════════════════════════════════════════════════════════
// Forced stop
// ══════════════════════════════════════════════════════════════

/// A death this frame cut the turn short. The signal is consumed either
/// way; the player only snaps when the death window is actually running.
fn resolve_forced_stop(player: &mut Player, f: &mut Field) {
    if f.clock.take_forced_stop() && f.clock.waiting() {
        player.stop_moving();
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimContext;
    use crate::domain::entity::{Direction, Point};
    use crate::domain::tile::*;
    use crate::sim::event::DeathCause;
    use crate::sim::level::tests::tilemap_from;
    use crate::sim::object::{CollectibleKind, ObjectKind, StarOutcome};

    fn world(rows: &[&str], turns: u32) -> World {
        World::load(&tilemap_from(rows, turns), 0, SimContext::default()).unwrap()
    }

    fn press(dir: Direction) -> InputSnapshot {
        InputSnapshot::new(dir)
    }

    /// Run `n` frames with the same input, collecting every event.
    fn run(w: &mut World, input: &InputSnapshot, n: usize) -> Vec<GameEvent> {
        let mut all = vec![];
        for _ in 0..n {
            all.extend(step(w, input, 1.0));
        }
        all
    }

    /// Press once, then idle until the turn has committed and settled.
    fn do_move(w: &mut World, dir: Direction) -> Vec<GameEvent> {
        let mut events = step(w, &press(dir), 1.0);
        events.extend(run(w, &InputSnapshot::default(), 17));
        events
    }

    #[test]
    fn push_and_player_move_share_the_turn() {
        let mut w = world(&[
            "   ",
            " P ",
            " C ",
            "   ",
        ], 10);

        let events = step(&mut w, &press(Direction::Down), 1.0);
        assert!(events.contains(&GameEvent::CratePushed { x: 1, y: 3 }));
        assert!(events.contains(&GameEvent::TurnStarted { turn: 1 }));
        assert_eq!(w.objects[0].body.target, Point::new(1, 3));
        assert_eq!(w.player.body.target, Point::new(1, 2));
        // The crate's old cell is open at push time
        assert!(!w.grid.is_solid(1, 2));

        // Mid-turn both are still logically where they started
        run(&mut w, &InputSnapshot::default(), 8);
        assert_eq!(w.player.pos(), Point::new(1, 1));
        assert_eq!(w.objects[0].body.pos, Point::new(1, 2));

        run(&mut w, &InputSnapshot::default(), 8);
        assert_eq!(w.player.pos(), Point::new(1, 2));
        assert_eq!(w.objects[0].body.pos, Point::new(1, 3));
        assert_eq!(w.grid.solid_tile_at(1, 3), OCCUPIED);
        assert_eq!(w.status.turn, 1);
    }

    #[test]
    fn push_needs_facing_and_free_destination() {
        let mut w = world(&[
            " P ",
            " C ",
            " # ",
        ], 10);
        // Blocked by the wall: neither the crate nor the player moves
        let events = run(&mut w, &press(Direction::Down), 3);
        assert!(events.is_empty());
        assert_eq!(w.objects[0].body.target, Point::new(1, 1));
        assert_eq!(w.clock.turn(), 0);

        // Walking away is not a push
        do_move(&mut w, Direction::Left);
        assert_eq!(w.objects[0].body.target, Point::new(1, 1));
        assert_eq!(w.clock.turn(), 1);
    }

    #[test]
    fn turn_counts_only_successful_moves() {
        let mut w = world(&["#P  "], 10);
        run(&mut w, &press(Direction::Left), 5);
        run(&mut w, &press(Direction::Up), 5);
        assert_eq!(w.status.turn, 0);

        do_move(&mut w, Direction::Right);
        do_move(&mut w, Direction::Right);
        assert_eq!(w.status.turn, 2);
        assert_eq!(w.player.pos(), Point::new(3, 0));

        // Out of bounds
        run(&mut w, &press(Direction::Right), 5);
        assert_eq!(w.status.turn, 2);
    }

    #[test]
    fn crate_dying_in_lava_forces_stop() {
        let mut w = world(&["PC~ "], 10);

        step(&mut w, &press(Direction::Right), 1.0);
        let events = run(&mut w, &InputSnapshot::default(), 16);
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::EntityDied { cause: DeathCause::Lava, x: 2, y: 0, .. }
        )));

        // The crate filled the lava and the death animation holds the clock
        assert!(!w.objects[0].exists());
        assert_eq!(w.grid.tile_at(2, 0), FLOOR);
        assert!(!w.grid.is_solid(2, 0));
        assert!(w.clock.waiting());
        assert!(!w.clock.stop_pending());
        assert_eq!(w.player.pos(), Point::new(1, 0));
        assert!(!w.player.is_moving());

        // No move while the death plays out, and it does not count as a turn
        run(&mut w, &press(Direction::Right), 10);
        assert_eq!(w.player.pos(), Point::new(1, 0));
        assert_eq!(w.status.turn, 1);

        run(&mut w, &InputSnapshot::default(), 25);
        do_move(&mut w, Direction::Right);
        assert_eq!(w.player.pos(), Point::new(2, 0));
        assert_eq!(w.status.turn, 2);
    }

    #[test]
    fn key_opens_lock() {
        let mut w = world(&[
            "PK  ",
            "  L ",
        ], 10);
        // Walk onto the key, then next to the lock
        do_move(&mut w, Direction::Right);
        run(&mut w, &InputSnapshot::default(), 1);
        assert_eq!(w.player.keys, 1);
        assert_eq!(w.status.key_count, 1);

        do_move(&mut w, Direction::Right);
        let lock = w.objects.iter().position(|o| o.kind == ObjectKind::Lock).unwrap();

        // Facing the lock from above
        let events = step(&mut w, &press(Direction::Down), 1.0);
        assert!(events.contains(&GameEvent::LockOpened { x: 2, y: 1 }));
        assert_eq!(w.player.keys, 0);
        assert_eq!(w.grid.tile_at(2, 1), FLOOR);
        assert!(!w.objects[lock].exists());
    }

    #[test]
    fn lock_without_key_stays() {
        let mut w = world(&["PL"], 10);
        let events = run(&mut w, &press(Direction::Right), 3);
        assert!(events.is_empty());
        assert_eq!(w.grid.tile_at(1, 0), LOCK);
        assert!(w.objects[0].exists());
    }

    #[test]
    fn held_direction_still_collects() {
        let mut w = world(&["PKKK "], 10);
        run(&mut w, &press(Direction::Right), 80);
        assert_eq!(w.player.pos(), Point::new(4, 0));
        assert_eq!(w.player.keys, 3);
    }

    #[test]
    fn collecting_fires_once() {
        let mut w = world(&["PH "], 10);
        let mut events = do_move(&mut w, Direction::Right);
        events.extend(run(&mut w, &InputSnapshot::default(), 20));
        let picked = events.iter()
            .filter(|e| matches!(e, GameEvent::ItemCollected { item: CollectibleKind::Hammer, .. }))
            .count();
        assert_eq!(picked, 1);
        assert_eq!(w.player.hammers, 1);
    }

    #[test]
    fn star_ends_stage_golden_within_limit() {
        let mut w = world(&["P S"], 2);
        do_move(&mut w, Direction::Right);
        let events = do_move(&mut w, Direction::Right);
        assert!(events.contains(&GameEvent::StageEnded { golden: true }));
        assert!(w.consume_stage_ended());
        assert!(!w.consume_stage_ended());
    }

    #[test]
    fn held_direction_stops_at_the_star() {
        let mut w = world(&["P S  "], 5);
        let events = run(&mut w, &press(Direction::Right), 60);
        assert!(events.contains(&GameEvent::StageEnded { golden: true }));
        assert!(!events.contains(&GameEvent::TurnStarted { turn: 3 }));
        assert_eq!(w.status.turn, 2);
        assert_eq!(w.player.pos(), Point::new(2, 0));
        assert!(!w.player.is_moving());
    }

    #[test]
    fn star_turns_gray_past_limit() {
        let mut w = world(&["P S"], 1);
        let star = w.objects.iter()
            .position(|o| o.kind == ObjectKind::Collectible(CollectibleKind::Star))
            .unwrap();
        do_move(&mut w, Direction::Right);
        let events = do_move(&mut w, Direction::Right);
        assert!(events.contains(&GameEvent::StageEnded { golden: false }));
        assert_eq!(w.objects[star].star_outcome(), StarOutcome::Gray);
    }

    #[test]
    fn gem_toggles_purple_walls() {
        let mut w = world(&["PGO"], 10);
        assert!(w.grid.is_solid(2, 0));
        let events = do_move(&mut w, Direction::Right);
        assert!(events.contains(&GameEvent::PurpleToggled));
        assert_eq!(w.grid.tile_at(2, 0), PURPLE_OFF);
        assert!(!w.grid.is_solid(2, 0));
    }

    #[test]
    fn reset_button_restores_stage() {
        let mut w = world(&["PC  "], 10);
        do_move(&mut w, Direction::Right);
        assert_eq!(w.objects[0].body.pos, Point::new(2, 0));

        let events = step(&mut w, &InputSnapshot::default().with_button(BUTTON_RESET), 1.0);
        assert_eq!(events.last(), Some(&GameEvent::StageReset));
        assert_eq!(w.objects[0].body.pos, Point::new(1, 0));
        assert_eq!(w.player.pos(), Point::new(0, 0));
        assert_eq!(w.grid.solid_tile_at(1, 0), OCCUPIED);
        assert_eq!(w.grid.solid_tile_at(2, 0), FLOOR);
        assert_eq!(w.clock.turn(), 0);
    }

    #[test]
    fn paused_world_does_not_advance() {
        let mut w = world(&["P  "], 10);
        w.phase = Phase::Paused;
        let events = run(&mut w, &press(Direction::Right), 5);
        assert!(events.is_empty());
        assert!(!w.player.is_moving());
    }

    fn play(w: &mut World, moves: &[Direction]) -> Vec<GameEvent> {
        moves.iter().flat_map(|&dir| do_move(w, dir)).collect()
    }

    #[test]
    fn first_builtin_stage_clears_golden() {
        use Direction::*;
        let stages = crate::sim::level::builtin_stages().unwrap();
        let mut w = World::load(&stages[0], 0, SimContext::default()).unwrap();

        let mut events = play(&mut w, &[Right, Right, Right]);
        // Let the crate finish sinking
        run(&mut w, &InputSnapshot::default(), 40);
        events.extend(play(&mut w, &[Right, Right, Right]));

        assert!(events.contains(&GameEvent::StageEnded { golden: true }));
        assert_eq!(w.status.turn, 6);
    }

    #[test]
    fn emerald_vault_clears_golden() {
        use Direction::*;
        let stages = crate::sim::level::builtin_stages().unwrap();
        let mut w = World::load(&stages[4], 4, SimContext::default()).unwrap();
        let events = play(&mut w, &[
            Down, Down, Right, Right, Up, Right, Up, Right, Right, Down, Down, Down,
        ]);
        assert!(events.contains(&GameEvent::StageEnded { golden: true }));
        assert_eq!(w.status.turn, 12);
    }

    #[test]
    fn emeralds_open_star_container() {
        let mut w = world(&["PM X"], 10);
        assert!(w.grid.is_solid(3, 0));
        do_move(&mut w, Direction::Right);
        assert_eq!(w.status.emeralds_remaining, 0);
        // The container comes later in spawn order and opens the same frame
        assert!(!w.grid.is_solid(3, 0));
        assert!(w.objects.iter().all(|o| !o.exists()));
    }
}
