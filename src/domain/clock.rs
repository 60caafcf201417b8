/// Turn clock: discrete turn counting plus the continuous fraction used
/// for interpolation.
///
/// Time is measured in frame units (`dt == 1.0` is one nominal frame).
/// `fraction()` runs from 1.0 (turn just started) down to 0.0 (turn done),
/// always over the same denominator within one turn.
///
/// Negative `dt` is the caller's problem: nothing panics, but the
/// interpolation it produces is meaningless.

/// Default length of one move, in frame units.
pub const DEFAULT_TURN_LENGTH: f32 = 16.0;

#[derive(Clone, Debug)]
pub struct TurnClock {
    turn: u32,
    duration: f32,
    timer: f32,
    waiting: bool,
    forced_stop: bool,
}

impl TurnClock {
    pub fn new() -> Self {
        TurnClock {
            turn: 0,
            duration: DEFAULT_TURN_LENGTH,
            timer: 0.0,
            waiting: false,
            forced_stop: false,
        }
    }

    /// Begin a timed window. Only real player moves count as turns.
    pub fn start_turn(&mut self, duration: f32, counts_as_turn: bool) {
        self.duration = duration;
        self.timer = duration;
        self.waiting = true;
        if counts_as_turn {
            self.turn += 1;
        }
    }

    pub fn tick(&mut self, dt: f32) {
        if !self.waiting {
            return;
        }
        self.timer -= dt;
        if self.timer <= 0.0 {
            self.timer = 0.0;
            self.waiting = false;
        }
    }

    /// Remaining share of the current window, in [0, 1].
    pub fn fraction(&self) -> f32 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        (self.timer / self.duration).clamp(0.0, 1.0)
    }

    #[inline]
    pub fn waiting(&self) -> bool {
        self.waiting
    }

    #[inline]
    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// Raise the one-shot stop signal (a death interrupted the turn).
    pub fn force_stop(&mut self) {
        self.forced_stop = true;
    }

    /// Has a stop been requested and not yet consumed?
    #[inline]
    pub fn stop_pending(&self) -> bool {
        self.forced_stop
    }

    /// Read and clear the stop signal.
    pub fn take_forced_stop(&mut self) -> bool {
        std::mem::take(&mut self.forced_stop)
    }
}

impl Default for TurnClock {
    fn default() -> Self {
        TurnClock::new()
    }
}
