use std::collections::BTreeMap;

use crate::sim::{Direction, EntityId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentAction {
    Move { direction: Direction, spaces: u32 },
    DropBomb,
}

/// A command for one entity, applied before the tick's `process` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intent {
    pub entity: EntityId,
    pub action: IntentAction,
}

impl Intent {
    pub fn movement(entity: EntityId, direction: Direction, spaces: u32) -> Self {
        Self {
            entity,
            action: IntentAction::Move { direction, spaces },
        }
    }

    pub fn drop_bomb(entity: EntityId) -> Self {
        Self {
            entity,
            action: IntentAction::DropBomb,
        }
    }
}

pub trait IntentSource {
    /// Intents due at or before `tick`, in submission order.
    fn poll(&mut self, tick: u64) -> Vec<Intent>;

    /// True once no further intents will ever be produced.
    fn is_exhausted(&self) -> bool;
}

/// Fixed, tick-keyed intent queue.
#[derive(Debug, Clone, Default)]
pub struct ScriptedIntents {
    queue: BTreeMap<u64, Vec<Intent>>,
}

impl ScriptedIntents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tick: u64, intent: Intent) {
        self.queue.entry(tick).or_default().push(intent);
    }

    pub fn len(&self) -> usize {
        self.queue.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl FromIterator<(u64, Intent)> for ScriptedIntents {
    fn from_iter<T: IntoIterator<Item = (u64, Intent)>>(iter: T) -> Self {
        let mut scripted = Self::new();
        for (tick, intent) in iter {
            scripted.push(tick, intent);
        }
        scripted
    }
}

impl IntentSource for ScriptedIntents {
    fn poll(&mut self, tick: u64) -> Vec<Intent> {
        let later = match tick.checked_add(1) {
            Some(next) => self.queue.split_off(&next),
            None => BTreeMap::new(),
        };
        let due = std::mem::replace(&mut self.queue, later);
        due.into_values().flatten().collect()
    }

    fn is_exhausted(&self) -> bool {
        self.queue.is_empty()
    }
}
