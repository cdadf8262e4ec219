use std::time::Duration;

use tracing::{debug, info};

use super::board::Board;
use super::clock::{Clock, SystemClock};
use super::coord::{Coordinate, Dimensions, Direction};
use super::entity::{
    entity_from_map_identifier, Capability, Entity, EntityId, EntityKind, EntityTunables,
    OccupantCategory,
};
use super::error::GameError;
use super::events::{GameEvent, GameEventCounts};
use super::registry::EntityRegistry;
use super::tasks::{Task, TaskManager};
use super::world::World;

/// Outcome of one `Game::process` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub now: Duration,
    pub tasks_ran: usize,
    pub tasks_finished: usize,
    pub tasks_cancelled: usize,
    pub active_tasks: usize,
    pub reaped: usize,
    pub live_entities: usize,
}

/// Tick-driven simulation: owns the board, every entity and the pending
/// timed tasks. Callers issue commands between `process` calls.
#[derive(Debug)]
pub struct Game {
    world: World,
    tasks: TaskManager,
    clock: Box<dyn Clock>,
    tick: u64,
    players: Vec<EntityId>,
}

impl Game {
    /// Builds a game from map objects using default tunables and wall-clock time.
    pub fn new<'a, I>(dimensions: Dimensions, objects: I) -> Result<Self, GameError>
    where
        I: IntoIterator<Item = (&'a str, Coordinate)>,
    {
        Self::with_settings(
            dimensions,
            objects,
            EntityTunables::default(),
            Box::new(SystemClock::default()),
        )
    }

    /// Unknown identifiers are skipped; the first object claiming a slot
    /// wins and later conflicts are errors.
    pub fn with_settings<'a, I>(
        dimensions: Dimensions,
        objects: I,
        tunables: EntityTunables,
        clock: Box<dyn Clock>,
    ) -> Result<Self, GameError>
    where
        I: IntoIterator<Item = (&'a str, Coordinate)>,
    {
        let mut game = Self::empty(dimensions, tunables, clock);
        let mut skipped = 0usize;
        for (identifier, location) in objects {
            match entity_from_map_identifier(identifier, location, &tunables) {
                Some(entity) => {
                    game.add(entity)?;
                }
                None => {
                    skipped += 1;
                    debug!(identifier, %location, "map_object_skipped");
                }
            }
        }
        info!(
            width = dimensions.width,
            height = dimensions.height,
            entity_count = game.world.entities.len(),
            player_count = game.players.len(),
            skipped,
            "game_created"
        );
        Ok(game)
    }

    pub fn empty(dimensions: Dimensions, tunables: EntityTunables, clock: Box<dyn Clock>) -> Self {
        Self {
            world: World::new(Board::new(dimensions), tunables),
            tasks: TaskManager::new(),
            clock,
            tick: 0,
            players: Vec::new(),
        }
    }

    /// Places `entity` on the board. Landing on a modifier applies it when
    /// the entity is modifiable; landing on live fire destroys it when it is
    /// destroyable.
    pub fn add(&mut self, entity: Entity) -> Result<EntityId, GameError> {
        let is_player = entity.kind() == EntityKind::Player;
        let id = self.world.place(entity)?;
        if is_player {
            self.players.push(id);
        }
        Ok(id)
    }

    pub fn remove(&mut self, id: EntityId) -> Result<Entity, GameError> {
        self.world.remove(id)
    }

    /// Drops a bomb under `id`. Returns `Ok(None)` when the entity cannot
    /// drop right now: destroyed, mid-move, out of bombs, or already
    /// standing on a live bomb.
    pub fn drop_bomb(&mut self, id: EntityId) -> Result<Option<EntityId>, GameError> {
        let entity = self.world.entity(id)?;
        if !entity.has_capability(Capability::DropsBombs) {
            return Err(incapable(entity, "drop_bomb"));
        }
        if entity.is_destroyed() || entity.is_moving() {
            return Ok(None);
        }
        let Some(arsenal) = entity.arsenal.filter(|arsenal| arsenal.bombs > 0) else {
            return Ok(None);
        };
        let location = entity.logical_location;
        if self
            .world
            .board
            .get(location)?
            .has_live(OccupantCategory::Bomb, &self.world.entities)
        {
            return Ok(None);
        }

        self.world.evict_destroyed(location, OccupantCategory::Bomb)?;
        let bomb_id = self.world.place(Entity::bomb(location, Some(id), &arsenal))?;
        if let Some(arsenal) = self.world.entity_mut(id)?.arsenal.as_mut() {
            arsenal.bombs -= 1;
        }
        self.tasks.register(Task::detonation(bomb_id, Some(id)));
        debug!(owner = %id, bomb = %bomb_id, %location, "bomb_dropped");
        self.world.events.emit(GameEvent::BombDropped {
            bomb_id,
            owner_id: id,
            location,
        });
        Ok(Some(bomb_id))
    }

    /// Starts moving `id` up to `spaces` cells. A new order replaces the
    /// current one; each cell is re-checked for obstruction on arrival.
    pub fn move_entity(
        &mut self,
        id: EntityId,
        direction: Direction,
        spaces: u32,
    ) -> Result<(), GameError> {
        let entity = self.world.entity(id)?;
        if !entity.has_capability(Capability::Movable) {
            return Err(incapable(entity, "move"));
        }
        if entity.is_destroyed() || spaces == 0 {
            return Ok(());
        }
        self.tasks.register(Task::movement(id, direction, spaces));
        Ok(())
    }

    /// Advances the simulation to the clock's current time: runs each task
    /// once, reaps destroyed entities, then closes the tick's event counts.
    pub fn process(&mut self) -> Result<TickReport, GameError> {
        let now = self.clock.now();
        let summary = self.tasks.run(&mut self.world, now)?;
        let reaped = self.world.reap()?;
        self.world.events.finish_tick_rollover();
        self.tick += 1;
        if !reaped.is_empty() {
            debug!(tick = self.tick, reaped = reaped.len(), "entities_reaped");
        }
        Ok(TickReport {
            tick: self.tick,
            now,
            tasks_ran: summary.ran,
            tasks_finished: summary.finished,
            tasks_cancelled: summary.cancelled,
            active_tasks: self.tasks.len(),
            reaped: reaped.len(),
            live_entities: self.world.entities.live_count(),
        })
    }

    pub fn board(&self) -> &Board {
        &self.world.board
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.world.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.world.entities.get(id)
    }

    pub fn tasks(&self) -> &TaskManager {
        &self.tasks
    }

    pub fn tunables(&self) -> &EntityTunables {
        &self.world.tunables
    }

    /// Players in placement order. Ids stay listed after the player is gone.
    pub fn players(&self) -> &[EntityId] {
        &self.players
    }

    pub fn live_players(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.players
            .iter()
            .copied()
            .filter(|id| self.world.entities.is_live(*id))
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.world.events.drain()
    }

    pub fn last_tick_event_counts(&self) -> GameEventCounts {
        self.world.events.last_tick_counts()
    }
}

fn incapable(entity: &Entity, action: &'static str) -> GameError {
    GameError::IncapableAction {
        entity: entity.id(),
        kind: entity.kind().identifier(),
        location: entity.logical_location,
        action,
    }
}
