use std::collections::VecDeque;

use tracing::warn;

use super::coord::{Coordinate, Direction};
use super::entity::{EntityId, EntityKind, ModifierKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    EntityAdded {
        entity_id: EntityId,
        kind: EntityKind,
        location: Coordinate,
    },
    EntityDestroyed {
        entity_id: EntityId,
        kind: EntityKind,
        location: Coordinate,
    },
    EntityRemoved {
        entity_id: EntityId,
        kind: EntityKind,
    },
    BombDropped {
        bomb_id: EntityId,
        owner_id: EntityId,
        location: Coordinate,
    },
    BombDetonated {
        bomb_id: EntityId,
        location: Coordinate,
        blast: Vec<Coordinate>,
    },
    ModifierApplied {
        modifier_id: EntityId,
        target_id: EntityId,
        kind: ModifierKind,
    },
    MovementStarted {
        entity_id: EntityId,
        from: Coordinate,
        to: Coordinate,
    },
    MovementBlocked {
        entity_id: EntityId,
        at: Coordinate,
        direction: Direction,
    },
    MovementFinished {
        entity_id: EntityId,
        location: Coordinate,
    },
    FireBurnedOut {
        fire_id: EntityId,
        location: Coordinate,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEventKind {
    EntityAdded,
    EntityDestroyed,
    EntityRemoved,
    BombDropped,
    BombDetonated,
    ModifierApplied,
    MovementStarted,
    MovementBlocked,
    MovementFinished,
    FireBurnedOut,
}

impl GameEvent {
    pub fn kind(&self) -> GameEventKind {
        match self {
            Self::EntityAdded { .. } => GameEventKind::EntityAdded,
            Self::EntityDestroyed { .. } => GameEventKind::EntityDestroyed,
            Self::EntityRemoved { .. } => GameEventKind::EntityRemoved,
            Self::BombDropped { .. } => GameEventKind::BombDropped,
            Self::BombDetonated { .. } => GameEventKind::BombDetonated,
            Self::ModifierApplied { .. } => GameEventKind::ModifierApplied,
            Self::MovementStarted { .. } => GameEventKind::MovementStarted,
            Self::MovementBlocked { .. } => GameEventKind::MovementBlocked,
            Self::MovementFinished { .. } => GameEventKind::MovementFinished,
            Self::FireBurnedOut { .. } => GameEventKind::FireBurnedOut,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameEventCounts {
    pub total: u32,
    pub entities_added: u32,
    pub entities_destroyed: u32,
    pub entities_removed: u32,
    pub bombs_dropped: u32,
    pub bombs_detonated: u32,
    pub modifiers_applied: u32,
    pub movements: u32,
    pub fires_burned_out: u32,
}

impl GameEventCounts {
    fn record(&mut self, kind: GameEventKind) {
        self.total = self.total.saturating_add(1);
        let counter = match kind {
            GameEventKind::EntityAdded => &mut self.entities_added,
            GameEventKind::EntityDestroyed => &mut self.entities_destroyed,
            GameEventKind::EntityRemoved => &mut self.entities_removed,
            GameEventKind::BombDropped => &mut self.bombs_dropped,
            GameEventKind::BombDetonated => &mut self.bombs_detonated,
            GameEventKind::ModifierApplied => &mut self.modifiers_applied,
            GameEventKind::MovementStarted
            | GameEventKind::MovementBlocked
            | GameEventKind::MovementFinished => &mut self.movements,
            GameEventKind::FireBurnedOut => &mut self.fires_burned_out,
        };
        *counter = counter.saturating_add(1);
    }
}

/// Upper bound on undrained events. Oldest events are dropped past it.
pub const MAX_PENDING_EVENTS: usize = 4096;

/// Buffers events until an observer drains them. Counts roll over once per
/// `Game::process`.
#[derive(Debug, Default)]
pub struct GameEventBus {
    pending: VecDeque<GameEvent>,
    dropped: u64,
    current_tick_counts: GameEventCounts,
    last_tick_counts: GameEventCounts,
}

impl GameEventBus {
    pub fn emit(&mut self, event: GameEvent) {
        self.current_tick_counts.record(event.kind());
        if self.pending.len() == MAX_PENDING_EVENTS {
            self.pending.pop_front();
            if self.dropped == 0 {
                warn!(capacity = MAX_PENDING_EVENTS, "event_buffer_full_dropping_oldest");
            }
            self.dropped = self.dropped.saturating_add(1);
        }
        self.pending.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<GameEvent> {
        self.dropped = 0;
        self.pending.drain(..).collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Events discarded since the last drain.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn finish_tick_rollover(&mut self) {
        self.last_tick_counts = std::mem::take(&mut self.current_tick_counts);
    }

    pub fn last_tick_counts(&self) -> GameEventCounts {
        self.last_tick_counts
    }
}
