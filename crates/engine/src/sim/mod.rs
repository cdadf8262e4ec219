mod board;
mod clock;
mod coord;
mod entity;
mod error;
mod events;
mod game;
mod registry;
mod space;
mod tasks;
mod world;

pub use board::Board;
pub use clock::{Clock, ManualClock, SystemClock};
pub use coord::{wrap_physical, Coordinate, Dimensions, Direction, Vec2};
pub use entity::{
    entity_from_map_identifier, modifier_effect, Arsenal, Capabilities, Capability, Entity,
    EntityId, EntityKind, EntityTunables, Flame, Fuse, Mobility, ModifierEffect, ModifierKind,
    OccupantCategory,
};
pub use error::GameError;
pub use events::{GameEvent, GameEventBus, GameEventCounts, GameEventKind, MAX_PENDING_EVENTS};
pub use game::{Game, TickReport};
pub use registry::EntityRegistry;
pub use space::Space;
pub use tasks::{
    DetonationTask, MovementTask, Task, TaskAction, TaskKind, TaskManager, TaskPhase,
    TaskRunSummary,
};
