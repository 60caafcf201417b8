/// Events emitted during a simulation step.
/// The presentation layer consumes these for messages and effects.

use super::object::{CollectibleKind, ObjectKind};

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    TurnStarted { turn: u32 },
    CratePushed { x: i32, y: i32 },
    EntityDied { kind: ObjectKind, cause: DeathCause, x: i32, y: i32 },
    ItemCollected { item: CollectibleKind, x: i32, y: i32 },
    LockOpened { x: i32, y: i32 },
    LavaReleased { x: i32, y: i32, purple: bool },
    PurpleToggled,
    StageEnded { golden: bool },
    StageReset,
}

/// Why an object left the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeathCause {
    /// Sank into lava and filled it.
    Lava,
    /// Fell into (or was swallowed by) the void.
    Void,
    /// Opened by the player or by collecting every emerald.
    Opened,
}
