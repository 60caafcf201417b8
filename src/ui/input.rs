/// Keyboard input tracker.
///
/// Turns raw crossterm key events into the frame's `InputSnapshot`:
///   - Direction keys are level-triggered (held = keep walking)
///   - Named buttons are edge-triggered (fire once per press)
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.
///
/// ## Key map
///
///   Arrows / WASD   →  direction
///   R               →  reset
///   Enter / Space   →  confirm (pause, next stage)
///   Esc / Q         →  cancel (quit)

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::{Direction, InputSnapshot, BUTTON_CANCEL, BUTTON_CONFIRM, BUTTON_RESET};

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Checked in this order; the first held one wins.
const DIRECTION_KEYS: &[(Direction, &[KeyCode])] = &[
    (Direction::Up, &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')]),
    (Direction::Down, &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')]),
    (Direction::Left, &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')]),
    (Direction::Right, &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')]),
];

const BUTTON_KEYS: &[(&str, &[KeyCode])] = &[
    (BUTTON_RESET, &[KeyCode::Char('r'), KeyCode::Char('R')]),
    (BUTTON_CONFIRM, &[KeyCode::Enter, KeyCode::Char(' ')]),
    (BUTTON_CANCEL, &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')]),
];

pub struct Keyboard {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the most recent
    /// `drain_events()` call.
    fresh_presses: Vec<KeyCode>,

    ctrl_c: bool,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl Keyboard {
    pub fn new() -> Self {
        Keyboard {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            ctrl_c: false,
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before the simulation step.
    pub fn drain_events(&mut self) {
        self.begin_frame();

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key, Instant::now());
            }
        }

        // Expire keys that have timed out (fallback for terminals without Release)
        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    /// Direction plus every button freshly pressed this frame.
    pub fn snapshot(&self) -> InputSnapshot {
        let direction = DIRECTION_KEYS.iter()
            .find(|(_, keys)| keys.iter().any(|k| self.is_held(*k)))
            .map_or(Direction::None, |(dir, _)| *dir);

        BUTTON_KEYS.iter()
            .filter(|(_, keys)| keys.iter().any(|k| self.fresh_presses.contains(k)))
            .fold(InputSnapshot::new(direction), |snap, (name, _)| snap.with_button(*name))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.ctrl_c
    }

    // ── Internal ──

    fn begin_frame(&mut self) {
        self.fresh_presses.clear();
        self.ctrl_c = false;
    }

    fn record(&mut self, key: KeyEvent, now: Instant) {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            self.ctrl_c = true;
            return;
        }

        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            // Without enhancement, releases are unreliable; rely on the timeout
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held(key.code);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }
}
