pub mod app;
pub mod content;
pub mod sim;

pub use app::{
    run_headless, run_headless_with_metrics, AppError, Intent, IntentAction, IntentSource,
    LoopConfig, LoopMetricsSnapshot, LoopSummary, ManualPacer, MetricsHandle, RealTimePacer,
    ScriptedIntents, StopReason, TickPacer,
};
pub use content::{ConfigError, ConfigStore, GameConfig, GameMap, MapError, MapObject};
pub use sim::{
    Clock, Coordinate, Dimensions, Direction, Entity, EntityId, EntityKind, EntityTunables, Game,
    GameError, GameEvent, ManualClock, SystemClock, TickReport,
};
