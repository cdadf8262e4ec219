use std::collections::HashMap;

use super::entity::{Entity, EntityId};
use super::error::GameError;

/// Id-keyed owner of every live entity. Board spaces and tasks refer to
/// entities by id only.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: HashMap<EntityId, Entity>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entity: Entity) -> Result<EntityId, GameError> {
        let id = entity.id();
        if self.entities.contains_key(&id) {
            return Err(GameError::DuplicateEntity(id));
        }
        self.entities.insert(id, entity);
        Ok(id)
    }

    pub fn remove(&mut self, id: EntityId) -> Result<Entity, GameError> {
        self.entities
            .remove(&id)
            .ok_or(GameError::EntityNotFound(id))
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn is_live(&self, id: EntityId) -> bool {
        self.get(id).is_some_and(Entity::is_live)
    }

    /// Ids of every registered entity flagged destroyed, lowest id first.
    pub fn destroyed_entities(&self) -> Vec<EntityId> {
        let mut ids = self
            .entities
            .values()
            .filter(|entity| entity.is_destroyed())
            .map(Entity::id)
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.entities.values().filter(|entity| entity.is_live()).count()
    }
}
