pub mod event;
pub mod level;
pub mod object;
pub mod player;
pub mod status;
pub mod step;
pub mod world;
