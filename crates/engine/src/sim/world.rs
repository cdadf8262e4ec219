use tracing::debug;

use super::board::Board;
use super::coord::Coordinate;
use super::entity::{Capability, Entity, EntityId, EntityTunables, OccupantCategory};
use super::error::GameError;
use super::events::{GameEvent, GameEventBus};
use super::registry::EntityRegistry;

/// Board, registry and event bus bundled so tasks can mutate them together.
#[derive(Debug)]
pub(crate) struct World {
    pub(crate) board: Board,
    pub(crate) entities: EntityRegistry,
    pub(crate) events: GameEventBus,
    pub(crate) tunables: EntityTunables,
}

impl World {
    pub(crate) fn new(board: Board, tunables: EntityTunables) -> Self {
        Self {
            board,
            entities: EntityRegistry::new(),
            events: GameEventBus::default(),
            tunables,
        }
    }

    pub(crate) fn entity(&self, id: EntityId) -> Result<&Entity, GameError> {
        self.entities.get(id).ok_or(GameError::EntityNotFound(id))
    }

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity, GameError> {
        self.entities
            .get_mut(id)
            .ok_or(GameError::EntityNotFound(id))
    }

    /// Registers and places `entity`, then settles what it landed on.
    pub(crate) fn place(&mut self, entity: Entity) -> Result<EntityId, GameError> {
        let id = entity.id();
        if self.entities.contains(id) {
            return Err(GameError::DuplicateEntity(id));
        }
        self.board.add(&entity)?;
        let kind = entity.kind();
        let location = entity.logical_location;
        self.entities.add(entity)?;
        self.events.emit(GameEvent::EntityAdded {
            entity_id: id,
            kind,
            location,
        });
        self.resolve_arrival(id)?;
        Ok(id)
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Result<Entity, GameError> {
        let entity = self
            .entities
            .get(id)
            .ok_or(GameError::EntityNotFound(id))?;
        self.board.remove(entity)?;
        let entity = self.entities.remove(id)?;
        self.events.emit(GameEvent::EntityRemoved {
            entity_id: id,
            kind: entity.kind(),
        });
        Ok(entity)
    }

    /// Modifier first, then fire: a pickup is still collected on the cell
    /// that burns the collector.
    pub(crate) fn resolve_arrival(&mut self, id: EntityId) -> Result<(), GameError> {
        let entity = self.entity(id)?;
        let location = entity.logical_location;
        let modifiable = entity.has_capability(Capability::Modifiable);
        let destroyable = entity.has_capability(Capability::Destroyable);
        let space = self.board.get(location)?;

        let modifier_id = space
            .live_occupant(OccupantCategory::Modifier, &self.entities)
            .map(Entity::id)
            .filter(|modifier_id| *modifier_id != id);
        let burning = space
            .live_occupant(OccupantCategory::Fire, &self.entities)
            .is_some_and(|fire| fire.id() != id);

        if modifiable {
            if let Some(modifier_id) = modifier_id {
                self.apply_modifier(modifier_id, id)?;
            }
        }
        if destroyable && burning {
            self.destroy(id);
        }
        Ok(())
    }

    fn apply_modifier(&mut self, modifier_id: EntityId, target_id: EntityId) -> Result<(), GameError> {
        let effect = self.entity(modifier_id)?.effect;
        if let Some(effect) = effect {
            let applied = effect.apply(self.entity_mut(target_id)?);
            debug!(
                modifier = %modifier_id,
                target = %target_id,
                kind = ?effect.kind(),
                applied,
                "modifier_applied"
            );
            self.events.emit(GameEvent::ModifierApplied {
                modifier_id,
                target_id,
                kind: effect.kind(),
            });
        }
        self.destroy(modifier_id);
        Ok(())
    }

    pub(crate) fn destroy(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        if !entity.mark_destroyed() {
            return false;
        }
        let kind = entity.kind();
        let location = entity.logical_location;
        debug!(entity = %id, %kind, %location, "entity_destroyed");
        self.events.emit(GameEvent::EntityDestroyed {
            entity_id: id,
            kind,
            location,
        });
        true
    }

    pub(crate) fn destroy_space(&mut self, location: Coordinate) -> Result<(), GameError> {
        let destroyed = self.board.get(location)?.destroy_all(&mut self.entities);
        for id in destroyed {
            let kind = self.entity(id)?.kind();
            debug!(entity = %id, %kind, %location, "entity_destroyed");
            self.events.emit(GameEvent::EntityDestroyed {
                entity_id: id,
                kind,
                location,
            });
        }
        Ok(())
    }

    /// Reaps a destroyed occupant of `category` at `location` ahead of the
    /// end-of-tick pass so the slot can be reused this tick.
    pub(crate) fn evict_destroyed(
        &mut self,
        location: Coordinate,
        category: OccupantCategory,
    ) -> Result<(), GameError> {
        let Some(occupant) = self.board.get(location)?.slot(category) else {
            return Ok(());
        };
        if self.entities.is_live(occupant) {
            return Ok(());
        }
        self.remove(occupant)?;
        debug!(entity = %occupant, %location, %category, "destroyed_occupant_evicted");
        Ok(())
    }

    /// Moves `id` between board cells and updates its logical location. The
    /// destination slot is checked before the entity leaves its old cell, so
    /// a rejected move leaves the board untouched.
    pub(crate) fn relocate(&mut self, id: EntityId, destination: Coordinate) -> Result<(), GameError> {
        let category = self.entity(id)?.category();
        self.evict_destroyed(destination, category)?;
        if let Some(occupant) = self.board.get(destination)?.slot(category) {
            if occupant != id {
                return Err(GameError::SpaceOccupied {
                    location: destination,
                    category,
                    occupant,
                });
            }
        }

        let entity = self
            .entities
            .get(id)
            .ok_or(GameError::EntityNotFound(id))?;
        self.board.remove(entity)?;
        let entity = self.entity_mut(id)?;
        entity.logical_location = destination;
        let entity = self
            .entities
            .get(id)
            .ok_or(GameError::EntityNotFound(id))?;
        self.board.add(entity)
    }

    /// Spawns fire at `location`, first reaping a fire the blast just
    /// destroyed there.
    pub(crate) fn ignite(&mut self, location: Coordinate) -> Result<EntityId, GameError> {
        self.evict_destroyed(location, OccupantCategory::Fire)?;
        self.place(Entity::fire(location, self.tunables.fire_duration_seconds))
    }

    pub(crate) fn reap(&mut self) -> Result<Vec<EntityId>, GameError> {
        let destroyed = self.entities.destroyed_entities();
        for id in &destroyed {
            self.remove(*id)?;
        }
        Ok(destroyed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::coord::Dimensions;

    fn world(width: u32, height: u32) -> World {
        let board = Board::new(Dimensions::new(width, height).expect("dims"));
        World::new(board, EntityTunables::default())
    }

    #[test]
    fn relocate_onto_a_live_occupant_leaves_the_mover_in_place() {
        let mut world = world(3, 1);
        let start = Coordinate::new(0, 0);
        let blocked = Coordinate::new(1, 0);
        let player = world
            .place(Entity::player(start, &EntityTunables::default()))
            .expect("player");
        let wall = world
            .place(Entity::destructible_wall(blocked))
            .expect("wall");

        assert_eq!(
            world.relocate(player, blocked),
            Err(GameError::SpaceOccupied {
                location: blocked,
                category: OccupantCategory::Entity,
                occupant: wall,
            })
        );
        assert_eq!(world.entity(player).expect("player").logical_location, start);
        assert_eq!(
            world.board.get(start).expect("space").slot(OccupantCategory::Entity),
            Some(player)
        );

        world.destroy(player);
        assert_eq!(world.reap().expect("reap"), vec![player]);
    }

    #[test]
    fn relocate_reaps_a_destroyed_occupant_early() {
        let mut world = world(3, 1);
        let target = Coordinate::new(1, 0);
        let player = world
            .place(Entity::player(Coordinate::new(0, 0), &EntityTunables::default()))
            .expect("player");
        let wall = world
            .place(Entity::destructible_wall(target))
            .expect("wall");
        world.destroy(wall);

        world.relocate(player, target).expect("relocate");
        assert!(!world.entities.contains(wall));
        assert_eq!(
            world.board.get(target).expect("space").slot(OccupantCategory::Entity),
            Some(player)
        );
    }

    #[test]
    fn ignite_replaces_a_fire_destroyed_by_the_same_blast() {
        let mut world = world(3, 3);
        let cell = Coordinate::new(1, 1);
        let first = world.ignite(cell).expect("first fire");
        world.destroy_space(cell).expect("blast");

        let second = world.ignite(cell).expect("second fire");
        assert_ne!(first, second);
        assert!(!world.entities.contains(first));
        assert!(world.entities.is_live(second));
        assert_eq!(
            world.board.get(cell).expect("space").slot(OccupantCategory::Fire),
            Some(second)
        );
    }
}
