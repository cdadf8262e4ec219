mod atomic_io;
mod config;
mod map;

pub use config::{ConfigError, ConfigStore, GameConfig, CONFIG_SECTION};
pub use map::{GameMap, MapError, MapObject};
