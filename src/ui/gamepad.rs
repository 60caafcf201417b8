/// Gamepad input tracker using gilrs.
///
/// Button mapping comes from `[gamepad]` in config.toml via `apply_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  direction
///   Select / Y            →  reset
///   Start / A             →  confirm (pause, next stage)
///   B                     →  cancel
///
/// Without the `gamepad` feature the tracker compiles to an idle stub, so
/// the main loop can merge it unconditionally.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::entity::{Direction, InputSnapshot, BUTTON_CANCEL, BUTTON_CONFIRM, BUTTON_RESET};

const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical face/shoulder button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,
    R1,
    L2,
    R2,
    Start,
    Select,
}

const BTN_COUNT: usize = 10;

impl Btn {
    pub fn from_name(s: &str) -> Option<Btn> {
        match s.trim().to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2"  => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2  => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Per-button state: held (continuous) and just_pressed (edge).
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

impl BtnState {
    #[cfg(any(feature = "gamepad", test))]
    fn set(&mut self, held: bool) {
        if held && !self.held {
            self.just_pressed = true;
        }
        self.held = held;
    }
}

/// Named button → physical buttons.
#[derive(Debug)]
struct ActionMap {
    bindings: Vec<(&'static str, Vec<Btn>)>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            bindings: vec![
                (BUTTON_RESET, vec![Btn::Select, Btn::Y]),
                (BUTTON_CONFIRM, vec![Btn::Start, Btn::A]),
                (BUTTON_CANCEL, vec![Btn::B]),
            ],
        }
    }
}

/// Unknown names are dropped; a list with nothing usable keeps the default.
fn parse_list(names: &[String]) -> Vec<Btn> {
    names.iter().filter_map(|s| Btn::from_name(s)).collect()
}

/// Up, Down, Left, Right; checked in this order like the keyboard.
const DIRECTIONS: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BTN_COUNT],
    dpad: [BtnState; 4],
    stick: (f32, f32),
    action_map: ActionMap,

    pub connected: bool,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = match Gilrs::new() {
            Ok(g) => {
                let has_pad = g.gamepads().next().is_some();
                (Some(g), has_pad)
            }
            Err(e) => {
                log::warn!("gamepad support unavailable: {e}");
                (None, false)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); BTN_COUNT],
            dpad: [BtnState::default(); 4],
            stick: (0.0, 0.0),
            action_map: ActionMap::default(),
            connected,
        }
    }

    pub fn apply_config(&mut self, cfg: &GamepadConfig) {
        let lists = [
            (BUTTON_RESET, &cfg.reset),
            (BUTTON_CONFIRM, &cfg.confirm),
            (BUTTON_CANCEL, &cfg.cancel),
        ];
        for (name, names) in lists {
            let btns = parse_list(names);
            if btns.is_empty() { continue; }
            if let Some(entry) = self.action_map.bindings.iter_mut().find(|(n, _)| *n == name) {
                entry.1 = btns;
            }
        }
    }

    /// Poll pending gamepad events. Call once per frame.
    pub fn update(&mut self) {
        for b in self.buttons.iter_mut().chain(&mut self.dpad) {
            b.just_pressed = false;
        }

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    /// Fold this pad into the keyboard's snapshot: the keyboard's direction
    /// wins when both are held, buttons are unioned.
    pub fn merge_into(&self, snap: InputSnapshot) -> InputSnapshot {
        let mut out = snap;
        if out.direction == Direction::None {
            out.direction = self.direction();
        }
        for (name, btns) in &self.action_map.bindings {
            if btns.iter().any(|&b| self.buttons[b as usize].just_pressed) {
                out = out.with_button(*name);
            }
        }
        out
    }

    fn direction(&self) -> Direction {
        let (sx, sy) = self.stick;
        let stick = [sy > STICK_DEADZONE, sy < -STICK_DEADZONE, sx < -STICK_DEADZONE, sx > STICK_DEADZONE];
        (0..4)
            .find(|&i| self.dpad[i].held || stick[i])
            .map_or(Direction::None, |i| DIRECTIONS[i])
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, false);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.stick.0 = value,
                        Axis::LeftStickY => self.stick.1 = value,
                        _ => {}
                    }
                }
                EventType::Connected => {
                    self.connected = true;
                    log::info!("gamepad connected");
                }
                EventType::Disconnected => {
                    self.connected = false;
                    self.release_all();
                    log::info!("gamepad disconnected");
                }
                _ => {}
            }
        }
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        let dpad = match gilrs_btn {
            Button::DPadUp => Some(0),
            Button::DPadDown => Some(1),
            Button::DPadLeft => Some(2),
            Button::DPadRight => Some(3),
            _ => None,
        };
        if let Some(i) = dpad {
            self.dpad[i].set(held);
        } else if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.buttons[btn as usize].set(held);
        }
    }

    #[cfg(feature = "gamepad")]
    fn release_all(&mut self) {
        self.buttons = [BtnState::default(); BTN_COUNT];
        self.dpad = [BtnState::default(); 4];
        self.stick = (0.0, 0.0);
    }
}
