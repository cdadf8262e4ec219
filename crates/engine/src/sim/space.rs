use super::coord::Coordinate;
use super::entity::{Capability, Entity, EntityId, OccupantCategory};
use super::error::GameError;
use super::registry::EntityRegistry;

/// One board cell: a nullable slot per occupant category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Space {
    location: Coordinate,
    entity: Option<EntityId>,
    bomb: Option<EntityId>,
    fire: Option<EntityId>,
    modifier: Option<EntityId>,
}

impl Space {
    pub(crate) fn new(location: Coordinate) -> Self {
        Self {
            location,
            entity: None,
            bomb: None,
            fire: None,
            modifier: None,
        }
    }

    pub fn location(&self) -> Coordinate {
        self.location
    }

    /// Raw slot content, destroyed occupants included.
    pub fn slot(&self, category: OccupantCategory) -> Option<EntityId> {
        match category {
            OccupantCategory::Entity => self.entity,
            OccupantCategory::Bomb => self.bomb,
            OccupantCategory::Fire => self.fire,
            OccupantCategory::Modifier => self.modifier,
        }
    }

    fn slot_mut(&mut self, category: OccupantCategory) -> &mut Option<EntityId> {
        match category {
            OccupantCategory::Entity => &mut self.entity,
            OccupantCategory::Bomb => &mut self.bomb,
            OccupantCategory::Fire => &mut self.fire,
            OccupantCategory::Modifier => &mut self.modifier,
        }
    }

    pub(crate) fn insert(&mut self, entity: &Entity) -> Result<(), GameError> {
        let location = self.location;
        let category = entity.category();
        let slot = self.slot_mut(category);
        if let Some(occupant) = *slot {
            return Err(GameError::SpaceOccupied {
                location,
                category,
                occupant,
            });
        }
        *slot = Some(entity.id());
        Ok(())
    }

    pub(crate) fn take(&mut self, entity: &Entity) -> Result<(), GameError> {
        let location = self.location;
        let category = entity.category();
        let slot = self.slot_mut(category);
        if *slot != Some(entity.id()) {
            return Err(GameError::SpaceNotOccupied {
                location,
                category,
                entity: entity.id(),
            });
        }
        *slot = None;
        Ok(())
    }

    pub fn occupants(&self) -> impl Iterator<Item = EntityId> + '_ {
        [self.entity, self.bomb, self.fire, self.modifier]
            .into_iter()
            .flatten()
    }

    pub fn live_occupant<'a>(
        &self,
        category: OccupantCategory,
        entities: &'a EntityRegistry,
    ) -> Option<&'a Entity> {
        self.slot(category)
            .and_then(|id| entities.get(id))
            .filter(|entity| entity.is_live())
    }

    /// True when the slot `entity` would land in holds a live occupant.
    pub fn occupied(&self, entity: &Entity, entities: &EntityRegistry) -> bool {
        self.live_occupant(entity.category(), entities).is_some()
    }

    pub fn has_live(&self, category: OccupantCategory, entities: &EntityRegistry) -> bool {
        self.live_occupant(category, entities).is_some()
    }

    /// Blast obstruction: a live collideable that cannot be destroyed in the
    /// entity slot, or any live bomb.
    pub fn has_indestructible_entity(&self, entities: &EntityRegistry) -> bool {
        let walled = self
            .live_occupant(OccupantCategory::Entity, entities)
            .is_some_and(Entity::is_indestructible_obstruction);
        walled || self.has_live(OccupantCategory::Bomb, entities)
    }

    /// Whether `mover` may not step into this space.
    pub fn blocks(&self, mover: &Entity, entities: &EntityRegistry) -> bool {
        if self.occupied(mover, entities) {
            return true;
        }
        mover.has_capability(Capability::Collideable)
            && self
                .occupants()
                .filter(|id| *id != mover.id())
                .filter_map(|id| entities.get(id))
                .any(|entity| entity.is_live() && entity.has_capability(Capability::Collideable))
    }

    /// Flags every destroyable occupant. Returns the ids that changed state;
    /// removal is left to the reap pass.
    pub fn destroy_all(&self, entities: &mut EntityRegistry) -> Vec<EntityId> {
        self.occupants()
            .filter(|id| {
                entities
                    .get_mut(*id)
                    .is_some_and(|entity| entity.mark_destroyed())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::{EntityTunables, ModifierEffect};

    fn register(registry: &mut EntityRegistry, space: &mut Space, entity: Entity) -> EntityId {
        space.insert(&entity).expect("insert");
        registry.add(entity).expect("register")
    }

    #[test]
    fn bomb_and_player_share_a_space_in_different_slots() {
        let location = Coordinate::new(1, 1);
        let mut registry = EntityRegistry::new();
        let mut space = Space::new(location);
        let player = Entity::player(location, &EntityTunables::default());
        let arsenal = player.arsenal.expect("arsenal");
        let bomb = Entity::bomb(location, Some(player.id()), &arsenal);
        let player_id = register(&mut registry, &mut space, player);
        let bomb_id = register(&mut registry, &mut space, bomb);

        assert_eq!(space.slot(OccupantCategory::Entity), Some(player_id));
        assert_eq!(space.slot(OccupantCategory::Bomb), Some(bomb_id));
        assert_eq!(space.occupants().count(), 2);
    }

    #[test]
    fn second_occupant_of_a_category_is_rejected() {
        let location = Coordinate::new(0, 0);
        let mut space = Space::new(location);
        let first = Entity::destructible_wall(location);
        let second = Entity::indestructible_wall(location);
        space.insert(&first).expect("first");
        assert_eq!(
            space.insert(&second),
            Err(GameError::SpaceOccupied {
                location,
                category: OccupantCategory::Entity,
                occupant: first.id(),
            })
        );
    }

    #[test]
    fn take_checks_identity_not_just_category() {
        let location = Coordinate::new(0, 0);
        let mut space = Space::new(location);
        let placed = Entity::destructible_wall(location);
        let other = Entity::destructible_wall(location);
        space.insert(&placed).expect("insert");
        assert_eq!(
            space.take(&other),
            Err(GameError::SpaceNotOccupied {
                location,
                category: OccupantCategory::Entity,
                entity: other.id(),
            })
        );
        space.take(&placed).expect("take");
        assert!(space.slot(OccupantCategory::Entity).is_none());
    }

    #[test]
    fn occupied_ignores_destroyed_occupants() {
        let location = Coordinate::new(0, 0);
        let mut registry = EntityRegistry::new();
        let mut space = Space::new(location);
        let wall_id = register(
            &mut registry,
            &mut space,
            Entity::destructible_wall(location),
        );
        let probe = Entity::player(location, &EntityTunables::default());
        assert!(space.occupied(&probe, &registry));

        registry.get_mut(wall_id).expect("wall").mark_destroyed();
        assert!(!space.occupied(&probe, &registry));
        assert_eq!(space.slot(OccupantCategory::Entity), Some(wall_id));
    }

    #[test]
    fn live_bomb_and_indestructible_wall_obstruct() {
        let location = Coordinate::new(0, 0);
        let mut registry = EntityRegistry::new();

        let mut walled = Space::new(location);
        register(
            &mut registry,
            &mut walled,
            Entity::indestructible_wall(location),
        );
        assert!(walled.has_indestructible_entity(&registry));

        let mut crated = Space::new(location);
        register(
            &mut registry,
            &mut crated,
            Entity::destructible_wall(location),
        );
        assert!(!crated.has_indestructible_entity(&registry));

        let mut bombed = Space::new(location);
        let owner = Entity::player(location, &EntityTunables::default());
        let arsenal = owner.arsenal.expect("arsenal");
        let bomb_id = register(
            &mut registry,
            &mut bombed,
            Entity::bomb(location, None, &arsenal),
        );
        assert!(bombed.has_indestructible_entity(&registry));
        registry.get_mut(bomb_id).expect("bomb").mark_destroyed();
        assert!(!bombed.has_indestructible_entity(&registry));
    }

    #[test]
    fn destroy_all_spares_indestructible_occupants() {
        let location = Coordinate::new(0, 0);
        let mut registry = EntityRegistry::new();
        let mut space = Space::new(location);
        let wall_id = register(
            &mut registry,
            &mut space,
            Entity::indestructible_wall(location),
        );
        let modifier_id = register(
            &mut registry,
            &mut space,
            Entity::modifier(location, ModifierEffect::BombCount(1)),
        );

        let destroyed = space.destroy_all(&mut registry);
        assert_eq!(destroyed, vec![modifier_id]);
        assert!(registry.is_live(wall_id));
        assert!(registry.contains(modifier_id));
    }

    #[test]
    fn bombs_block_collideable_movers() {
        let location = Coordinate::new(0, 0);
        let mut registry = EntityRegistry::new();
        let mut space = Space::new(location);
        let mover = Entity::player(Coordinate::new(1, 0), &EntityTunables::default());
        assert!(!space.blocks(&mover, &registry));

        let arsenal = mover.arsenal.expect("arsenal");
        register(
            &mut registry,
            &mut space,
            Entity::bomb(location, None, &arsenal),
        );
        assert!(space.blocks(&mover, &registry));
    }
}
