/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags};
use crossterm::{execute, terminal};
use env_logger::{Env, Target};

use config::{GameConfig, SimContext};
use domain::entity::{BUTTON_CANCEL, BUTTON_CONFIRM, BUTTON_RESET};
use sim::event::{DeathCause, GameEvent};
use sim::level::{self, Tilemap};
use sim::object::ObjectKind;
use sim::step;
use sim::world::{Phase, World};
use ui::gamepad::GamepadState;
use ui::input::Keyboard;
use ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// Message durations, in frame units.
const MSG_SHORT: f32 = 45.0;
const MSG_LONG: f32 = 120.0;

fn main() {
    let config = GameConfig::load();
    init_logging(&config);
    for w in &config.warnings {
        log::warn!("config: {w}");
    }

    // Surface stage problems before the terminal is taken over
    let stages = match level::load_stages(config.stages_dir.as_deref()) {
        Ok(stages) => stages,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("Falling back to the built-in stages.");
            log::warn!("stage load failed, using built-in stages: {e}");
            match level::builtin_stages() {
                Ok(stages) => stages,
                Err(e) => {
                    eprintln!("Built-in stages are broken: {e}");
                    return;
                }
            }
        }
    };

    let ctx = config.sim_context();
    let Some(first) = stages.first() else {
        eprintln!("No stages to play.");
        return;
    };
    let mut world = match World::load(first, 0, ctx.clone()) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }
    let mut kb = Keyboard::new();
    kb.honor_release = enable_key_release();

    let mut run = Run::new(stages.len());
    let result = game_loop(&mut world, &stages, &ctx, &mut renderer, &mut kb, &mut run, &config);

    if kb.honor_release {
        let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
    }
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
        log::error!("game loop failed: {e}");
    }

    println!();
    println!("Thanks for playing Tile Push!");
    println!(
        "Stages cleared: {}/{}  (golden stars: {})",
        run.cleared(), stages.len(), run.golden(),
    );
}

/// The terminal belongs to the renderer, so log lines go to a file.
fn init_logging(config: &GameConfig) {
    let file = match File::create(&config.log_file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Cannot open log file {}: {e}", config.log_file.display());
            return;
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .init();
}

/// Ask for Release events. Without them held keys expire on a timeout.
fn enable_key_release() -> bool {
    if !matches!(terminal::supports_keyboard_enhancement(), Ok(true)) {
        return false;
    }
    let flags = KeyboardEnhancementFlags::REPORT_EVENT_TYPES;
    execute!(io::stdout(), PushKeyboardEnhancementFlags(flags)).is_ok()
}

// ── Run-level bookkeeping ──

/// Best result per stage: `None` not cleared, `Some(golden)` otherwise.
struct Run {
    results: Vec<Option<bool>>,
}

impl Run {
    fn new(stage_count: usize) -> Self {
        Run { results: vec![None; stage_count] }
    }

    fn record(&mut self, stage: usize, golden: bool) {
        if let Some(slot) = self.results.get_mut(stage) {
            *slot = Some(slot.unwrap_or(false) || golden);
        }
    }

    fn cleared(&self) -> usize {
        self.results.iter().filter(|r| r.is_some()).count()
    }

    fn golden(&self) -> usize {
        self.results.iter().filter(|r| **r == Some(true)).count()
    }
}

// ── Game loop ──

fn game_loop(
    world: &mut World,
    stages: &[Tilemap],
    ctx: &SimContext,
    renderer: &mut Renderer,
    kb: &mut Keyboard,
    run: &mut Run,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut gp = GamepadState::new();
    gp.apply_config(&config.gamepad);
    if gp.connected {
        log::info!("gamepad detected");
    }

    let tick_rate = Duration::from_millis(config.timing.frame_ms);
    let dt = config.frame_dt();
    let mut last_tick = Instant::now();

    loop {
        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();

            kb.drain_events();
            gp.update();
            if kb.ctrl_c_pressed() {
                break;
            }
            let input = gp.merge_into(kb.snapshot());
            if input.button(BUTTON_CANCEL) {
                log::info!("quit from stage {}", world.stage_index + 1);
                break;
            }

            match world.phase {
                Phase::Playing => {
                    if input.button(BUTTON_CONFIRM) {
                        world.phase = Phase::Paused;
                    } else {
                        let events = step::step(world, &input, dt);
                        process_events(world, run, &events);
                    }
                }
                Phase::Paused => {
                    if input.button(BUTTON_CONFIRM) {
                        world.phase = Phase::Playing;
                    } else if input.button(BUTTON_RESET) {
                        world.reset_map();
                        world.set_message("Stage restarted", MSG_SHORT);
                    }
                }
                Phase::StageClear { .. } => {
                    if input.button(BUTTON_RESET) {
                        world.reset_map();
                        world.set_message("Stage restarted", MSG_SHORT);
                    } else if input.button(BUTTON_CONFIRM) {
                        let next = world.stage_index + 1;
                        if next >= stages.len() {
                            log::info!("all {} stages done", stages.len());
                            break;
                        }
                        *world = World::load(&stages[next], next, ctx.clone())?;
                        world.set_message(&format!("Stage {}: {}", next + 1, world.status.stage_name), MSG_LONG);
                    }
                }
            }
        }

        renderer.render(world, stages.len())?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Turn this frame's events into messages, and a finished stage into
/// the clear screen.
fn process_events(world: &mut World, run: &mut Run, events: &[GameEvent]) {
    let mut golden = false;
    for event in events {
        if let Some(msg) = describe(event) {
            world.set_message(&msg, MSG_SHORT);
        }
        if let GameEvent::StageEnded { golden: g } = *event {
            golden = g;
        }
    }
    if world.consume_stage_ended() {
        log::info!("stage {} cleared (golden: {golden})", world.stage_index + 1);
        run.record(world.stage_index, golden);
        world.phase = Phase::StageClear { golden };
    }
}

fn describe(event: &GameEvent) -> Option<String> {
    match event {
        GameEvent::ItemCollected { item, .. } => {
            Some(format!("Picked up {}", ObjectKind::Collectible(*item).label()))
        }
        GameEvent::LockOpened { .. } => Some("Unlocked!".into()),
        GameEvent::LavaReleased { purple: true, .. } => Some("Purple lava spills out".into()),
        GameEvent::LavaReleased { purple: false, .. } => Some("Lava spills out".into()),
        GameEvent::EntityDied { kind, cause: DeathCause::Lava, .. } => {
            Some(format!("The {} sinks into the lava", kind.label()))
        }
        GameEvent::EntityDied { kind: kind @ ObjectKind::Crate(_), cause: DeathCause::Void, .. } => {
            Some(format!("The {} falls into the void", kind.label()))
        }
        GameEvent::EntityDied { kind, cause: DeathCause::Void, .. } => {
            Some(format!("The void swallows the {}", kind.label()))
        }
        GameEvent::PurpleToggled => Some("Purple walls shift".into()),
        GameEvent::StageEnded { golden: true } => Some("Golden star!".into()),
        GameEvent::StageEnded { golden: false } => Some("Star collected, over the turn limit".into()),
        GameEvent::StageReset => Some("Stage restarted".into()),
        GameEvent::TurnStarted { .. }
        | GameEvent::CratePushed { .. }
        | GameEvent::EntityDied { .. } => None,
    }
}
