use std::time::Duration;

use tracing::debug;

use super::coord::{wrap_physical, Direction};
use super::entity::EntityId;
use super::error::GameError;
use super::events::GameEvent;
use super::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Movement,
    Detonation,
    Burning,
}

/// Lifecycle of a task. A task reaches `Finished` exactly once; the finish
/// hook runs on that transition unless the task was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    Pending,
    Started,
    Running,
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovementTask {
    pub direction: Direction,
    pub distance: u32,
    remaining: f32,
    blocked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetonationTask {
    pub owner: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskAction {
    Movement(MovementTask),
    Detonation(DetonationTask),
    Burning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    entity: EntityId,
    phase: TaskPhase,
    last_update: Option<Duration>,
    action: TaskAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOutcome {
    Continue,
    Finished,
    Cancelled,
}

/// Per-run counters reported back to the tick driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskRunSummary {
    pub ran: usize,
    pub finished: usize,
    pub cancelled: usize,
    pub spawned: usize,
}

impl Task {
    pub fn movement(entity: EntityId, direction: Direction, distance: u32) -> Self {
        Self::pending(
            entity,
            TaskAction::Movement(MovementTask {
                direction,
                distance,
                remaining: 0.0,
                blocked: false,
            }),
        )
    }

    pub fn detonation(bomb: EntityId, owner: Option<EntityId>) -> Self {
        Self::pending(bomb, TaskAction::Detonation(DetonationTask { owner }))
    }

    pub fn burning(fire: EntityId) -> Self {
        Self::pending(fire, TaskAction::Burning)
    }

    fn pending(entity: EntityId, action: TaskAction) -> Self {
        Self {
            entity,
            phase: TaskPhase::Pending,
            last_update: None,
            action,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn kind(&self) -> TaskKind {
        match self.action {
            TaskAction::Movement(_) => TaskKind::Movement,
            TaskAction::Detonation(_) => TaskKind::Detonation,
            TaskAction::Burning => TaskKind::Burning,
        }
    }

    pub fn phase(&self) -> TaskPhase {
        self.phase
    }

    pub fn action(&self) -> &TaskAction {
        &self.action
    }

    pub fn is_finished(&self) -> bool {
        self.phase == TaskPhase::Finished
    }

    fn run(
        &mut self,
        world: &mut World,
        now: Duration,
        spawned: &mut Vec<Task>,
    ) -> Result<TaskOutcome, GameError> {
        if !world.entities.is_live(self.entity) {
            self.phase = TaskPhase::Finished;
            self.on_cancel(world);
            return Ok(TaskOutcome::Cancelled);
        }

        if self.phase == TaskPhase::Pending {
            self.phase = TaskPhase::Started;
            self.last_update = Some(now);
            if self.on_start(world)? {
                self.phase = TaskPhase::Finished;
            }
        }

        if self.phase != TaskPhase::Finished {
            let elapsed = self
                .last_update
                .map_or(Duration::ZERO, |last| now.saturating_sub(last));
            let done = self.process(world, elapsed.as_secs_f32())?;
            self.last_update = Some(now);
            world.entity_mut(self.entity)?.last_update = now;
            self.phase = if done {
                TaskPhase::Finished
            } else {
                TaskPhase::Running
            };
        }

        if self.phase == TaskPhase::Finished {
            self.on_finish(world, spawned)?;
            return Ok(TaskOutcome::Finished);
        }
        Ok(TaskOutcome::Continue)
    }

    /// Returns true when the task completed without needing to run.
    fn on_start(&mut self, world: &mut World) -> Result<bool, GameError> {
        let entity = self.entity;
        match &mut self.action {
            TaskAction::Movement(movement) => movement.start(entity, world),
            TaskAction::Detonation(_) => {
                if let Some(fuse) = world.entity_mut(entity)?.fuse.as_mut() {
                    fuse.is_detonating = true;
                }
                Ok(false)
            }
            TaskAction::Burning => {
                if let Some(flame) = world.entity_mut(entity)?.flame.as_mut() {
                    flame.is_burning = true;
                }
                Ok(false)
            }
        }
    }

    fn process(&mut self, world: &mut World, elapsed: f32) -> Result<bool, GameError> {
        let entity = self.entity;
        match &mut self.action {
            TaskAction::Movement(movement) => movement.process(entity, world, elapsed),
            TaskAction::Detonation(_) => {
                let Some(fuse) = world.entity_mut(entity)?.fuse.as_mut() else {
                    return Ok(true);
                };
                fuse.bomb_duration -= elapsed;
                Ok(fuse.bomb_duration <= 0.0)
            }
            TaskAction::Burning => {
                let Some(flame) = world.entity_mut(entity)?.flame.as_mut() else {
                    return Ok(true);
                };
                flame.fire_duration -= elapsed;
                Ok(flame.fire_duration <= 0.0)
            }
        }
    }

    fn on_finish(&mut self, world: &mut World, spawned: &mut Vec<Task>) -> Result<(), GameError> {
        let entity = self.entity;
        match &self.action {
            TaskAction::Movement(movement) => movement.finish(entity, world, spawned),
            TaskAction::Detonation(detonation) => detonate(entity, detonation.owner, world, spawned),
            TaskAction::Burning => burn_out(entity, world),
        }
    }

    fn on_cancel(&mut self, world: &mut World) {
        debug!(entity = %self.entity, kind = ?self.kind(), "task_cancelled");
        if let TaskAction::Detonation(DetonationTask { owner: Some(owner) }) = self.action {
            refund_bomb(owner, world);
        }
    }
}

impl MovementTask {
    fn start(&mut self, id: EntityId, world: &mut World) -> Result<bool, GameError> {
        let entity = world.entity(id)?;
        let from = entity.logical_location;
        let physical = entity.physical_location;
        let destination = world.board.relative_location(from, self.direction, 1);

        if world
            .board
            .get(destination)?
            .blocks(entity, &world.entities)
        {
            self.blocked = true;
            debug!(entity = %id, at = %from, direction = self.direction.as_token(), "movement_blocked");
            world.events.emit(GameEvent::MovementBlocked {
                entity_id: id,
                at: from,
                direction: self.direction,
            });
            return Ok(true);
        }

        let extent = world.board.dimensions().extent_along(self.direction);
        let sign = axis_sign(self.direction);
        let target_axis = destination.to_vec2().axis(self.direction);
        self.remaining = ((target_axis - physical.axis(self.direction)) * sign).rem_euclid(extent as f32);

        world.relocate(id, destination)?;
        let entity = world.entity_mut(id)?;
        if let Some(mobility) = entity.mobility.as_mut() {
            mobility.is_moving = true;
        }
        entity.physical_location = destination
            .to_vec2()
            .with_axis(self.direction, physical.axis(self.direction));
        world.events.emit(GameEvent::MovementStarted {
            entity_id: id,
            from,
            to: destination,
        });
        Ok(false)
    }

    fn process(&mut self, id: EntityId, world: &mut World, elapsed: f32) -> Result<bool, GameError> {
        let extent = world.board.dimensions().extent_along(self.direction);
        let entity = world.entity_mut(id)?;
        let speed = entity.mobility.map_or(0.0, |mobility| mobility.movement_speed);
        let step = (speed * elapsed).max(0.0);
        self.remaining -= step;

        let axis = entity.physical_location.axis(self.direction) + axis_sign(self.direction) * step;
        entity.physical_location = entity
            .physical_location
            .with_axis(self.direction, wrap_physical(axis, extent));
        Ok(self.remaining <= 0.0)
    }

    fn finish(&self, id: EntityId, world: &mut World, spawned: &mut Vec<Task>) -> Result<(), GameError> {
        let entity = world.entity_mut(id)?;
        if let Some(mobility) = entity.mobility.as_mut() {
            mobility.is_moving = false;
        }
        entity.physical_location = entity.logical_location.to_vec2();
        if self.blocked {
            return Ok(());
        }

        let location = entity.logical_location;
        world.events.emit(GameEvent::MovementFinished {
            entity_id: id,
            location,
        });
        world.resolve_arrival(id)?;

        if self.distance > 1 && world.entities.is_live(id) {
            spawned.push(Task::movement(id, self.direction, self.distance - 1));
        }
        Ok(())
    }
}

fn axis_sign(direction: Direction) -> f32 {
    let (dx, dy) = direction.delta();
    (dx + dy) as f32
}

fn refund_bomb(owner: EntityId, world: &mut World) {
    let Some(arsenal) = world
        .entities
        .get_mut(owner)
        .filter(|entity| entity.is_live())
        .and_then(|entity| entity.arsenal.as_mut())
    else {
        return;
    };
    arsenal.bombs = arsenal.bombs.saturating_add(1);
}

fn detonate(
    bomb_id: EntityId,
    owner: Option<EntityId>,
    world: &mut World,
    spawned: &mut Vec<Task>,
) -> Result<(), GameError> {
    let bomb = world.entity_mut(bomb_id)?;
    let location = bomb.logical_location;
    let radius = match bomb.fuse.as_mut() {
        Some(fuse) => {
            fuse.is_detonating = false;
            fuse.fire_distance
        }
        None => 0,
    };
    world.destroy(bomb_id);
    if let Some(owner) = owner {
        refund_bomb(owner, world);
    }

    let blast = world.board.blast_radius(location, radius, &world.entities)?;
    for cell in &blast {
        world.destroy_space(*cell)?;
        let fire = world.ignite(*cell)?;
        spawned.push(Task::burning(fire));
    }
    debug!(bomb = %bomb_id, %location, cells = blast.len(), "bomb_detonated");
    world.events.emit(GameEvent::BombDetonated {
        bomb_id,
        location,
        blast,
    });
    Ok(())
}

fn burn_out(fire_id: EntityId, world: &mut World) -> Result<(), GameError> {
    let fire = world.entity_mut(fire_id)?;
    if let Some(flame) = fire.flame.as_mut() {
        flame.is_burning = false;
    }
    let location = fire.logical_location;
    world.destroy(fire_id);
    world.events.emit(GameEvent::FireBurnedOut { fire_id, location });
    Ok(())
}

/// Ordered set of timed tasks, at most one per (entity, kind).
#[derive(Debug, Default)]
pub struct TaskManager {
    tasks: Vec<Task>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `task`, replacing any task of the same kind on the same entity.
    /// Returns true when a task was superseded.
    pub fn register(&mut self, task: Task) -> bool {
        let before = self.tasks.len();
        self.tasks
            .retain(|existing| !(existing.entity == task.entity && existing.kind() == task.kind()));
        let superseded = self.tasks.len() != before;
        if superseded {
            debug!(entity = %task.entity, kind = ?task.kind(), "task_superseded");
        }
        self.tasks.push(task);
        superseded
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task_for(&self, entity: EntityId, kind: TaskKind) -> Option<&Task> {
        self.tasks
            .iter()
            .find(|task| task.entity == entity && task.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Runs every task once in registration order. Follow-up tasks spawned
    /// by finish hooks are registered afterwards and first run next call.
    pub(crate) fn run(&mut self, world: &mut World, now: Duration) -> Result<TaskRunSummary, GameError> {
        let mut summary = TaskRunSummary::default();
        let mut spawned = Vec::new();
        let mut kept = Vec::with_capacity(self.tasks.len());
        let mut pending = std::mem::take(&mut self.tasks).into_iter();

        while let Some(mut task) = pending.next() {
            summary.ran += 1;
            match task.run(world, now, &mut spawned) {
                Ok(TaskOutcome::Continue) => kept.push(task),
                Ok(TaskOutcome::Finished) => summary.finished += 1,
                Ok(TaskOutcome::Cancelled) => summary.cancelled += 1,
                Err(error) => {
                    kept.push(task);
                    kept.extend(pending);
                    self.tasks = kept;
                    return Err(error);
                }
            }
        }

        self.tasks = kept;
        summary.spawned = spawned.len();
        for task in spawned {
            self.register(task);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::board::Board;
    use crate::sim::coord::{Coordinate, Dimensions, Vec2};
    use crate::sim::entity::{Entity, EntityTunables};

    fn world(width: u32, height: u32) -> World {
        let dimensions = Dimensions::new(width, height).expect("dims");
        World::new(Board::new(dimensions), EntityTunables::default())
    }

    fn secs(value: f32) -> Duration {
        Duration::from_secs_f32(value)
    }

    #[test]
    fn registering_same_kind_twice_keeps_only_the_latest() {
        let mut manager = TaskManager::new();
        let entity = EntityId(41);
        assert!(!manager.register(Task::movement(entity, Direction::Right, 1)));
        assert!(manager.register(Task::movement(entity, Direction::Right, 3)));
        assert!(!manager.register(Task::detonation(entity, None)));

        assert_eq!(manager.len(), 2);
        let movement = manager
            .task_for(entity, TaskKind::Movement)
            .expect("movement task");
        match movement.action() {
            TaskAction::Movement(movement) => assert_eq!(movement.distance, 3),
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn zero_elapsed_runs_do_not_advance_countdowns() {
        let mut world = world(5, 5);
        let tunables = EntityTunables::default();
        let owner = Entity::player(Coordinate::new(0, 0), &tunables);
        let arsenal = owner.arsenal.expect("arsenal");
        let bomb_id = world
            .place(Entity::bomb(Coordinate::new(2, 2), None, &arsenal))
            .expect("bomb");
        let mut manager = TaskManager::new();
        manager.register(Task::detonation(bomb_id, None));

        for _ in 0..3 {
            manager.run(&mut world, secs(1.0)).expect("run");
        }

        let bomb = world.entity(bomb_id).expect("bomb");
        assert!(bomb.is_detonating());
        assert_eq!(bomb.fuse.expect("fuse").bomb_duration, arsenal.bomb_duration);
        assert_eq!(manager.tasks()[0].phase(), TaskPhase::Running);
    }

    #[test]
    fn multi_space_movement_chains_one_cell_at_a_time() {
        let mut world = world(5, 5);
        let player = world
            .place(Entity::player(Coordinate::new(0, 0), &EntityTunables::default()))
            .expect("player");
        let mut manager = TaskManager::new();
        manager.register(Task::movement(player, Direction::Right, 2));

        manager.run(&mut world, secs(0.0)).expect("start");
        let entity = world.entity(player).expect("player");
        assert_eq!(entity.logical_location, Coordinate::new(1, 0));
        assert!(entity.is_moving());

        let summary = manager.run(&mut world, secs(1.0)).expect("arrive");
        assert_eq!(summary.finished, 1);
        assert_eq!(summary.spawned, 1);
        assert_eq!(
            world.entity(player).expect("player").physical_location,
            Vec2::new(1.0, 0.0)
        );

        manager.run(&mut world, secs(1.0)).expect("chain start");
        manager.run(&mut world, secs(2.0)).expect("chain arrive");
        let entity = world.entity(player).expect("player");
        assert_eq!(entity.logical_location, Coordinate::new(2, 0));
        assert!(!entity.is_moving());
        assert!(manager.is_empty());
    }

    #[test]
    fn movement_wraps_across_the_left_edge() {
        let mut world = world(5, 5);
        let player = world
            .place(Entity::player(Coordinate::new(0, 2), &EntityTunables::default()))
            .expect("player");
        let mut manager = TaskManager::new();
        manager.register(Task::movement(player, Direction::Left, 1));

        manager.run(&mut world, secs(0.0)).expect("start");
        assert_eq!(
            world.entity(player).expect("player").logical_location,
            Coordinate::new(4, 2)
        );
        manager.run(&mut world, secs(1.0)).expect("arrive");
        let entity = world.entity(player).expect("player");
        assert_eq!(entity.physical_location, Vec2::new(4.0, 2.0));
        assert!(manager.is_empty());
    }

    #[test]
    fn blocked_movement_finishes_without_moving() {
        let mut world = world(5, 5);
        let player = world
            .place(Entity::player(Coordinate::new(0, 0), &EntityTunables::default()))
            .expect("player");
        world
            .place(Entity::destructible_wall(Coordinate::new(1, 0)))
            .expect("wall");
        world.events.drain();
        let mut manager = TaskManager::new();
        manager.register(Task::movement(player, Direction::Right, 3));

        let summary = manager.run(&mut world, secs(0.0)).expect("run");
        assert_eq!(summary.finished, 1);
        assert_eq!(summary.spawned, 0);
        assert!(manager.is_empty());
        assert_eq!(
            world.entity(player).expect("player").logical_location,
            Coordinate::new(0, 0)
        );
        assert!(matches!(
            world.events.drain().as_slice(),
            [GameEvent::MovementBlocked { .. }]
        ));
    }

    #[test]
    fn cancelled_detonation_refunds_a_live_owner() {
        let mut world = world(5, 5);
        let mut owner = Entity::player(Coordinate::new(0, 0), &EntityTunables::default());
        let arsenal = owner.arsenal.expect("arsenal");
        if let Some(arsenal) = owner.arsenal.as_mut() {
            arsenal.bombs = 0;
        }
        let owner_id = world.place(owner).expect("owner");
        let bomb_id = world
            .place(Entity::bomb(Coordinate::new(0, 0), Some(owner_id), &arsenal))
            .expect("bomb");
        let mut manager = TaskManager::new();
        manager.register(Task::detonation(bomb_id, Some(owner_id)));
        world.destroy(bomb_id);

        let summary = manager.run(&mut world, secs(0.0)).expect("run");
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.finished, 0);
        assert!(manager.is_empty());
        assert_eq!(world.entity(owner_id).expect("owner").bomb_count(), Some(1));
        assert!(!world.entities.is_live(bomb_id));
    }

    #[test]
    fn detonation_fills_the_blast_with_burning_fire() {
        let mut world = world(5, 5);
        let owner = Entity::player(Coordinate::new(0, 0), &EntityTunables::default());
        let arsenal = owner.arsenal.expect("arsenal");
        let bomb_id = world
            .place(Entity::bomb(Coordinate::new(2, 2), None, &arsenal))
            .expect("bomb");
        let mut manager = TaskManager::new();
        manager.register(Task::detonation(bomb_id, None));

        manager.run(&mut world, secs(0.0)).expect("arm");
        let summary = manager
            .run(&mut world, secs(arsenal.bomb_duration))
            .expect("detonate");
        assert_eq!(summary.finished, 1);
        assert_eq!(summary.spawned, 9);
        assert!(!world.entities.is_live(bomb_id));

        manager.run(&mut world, secs(arsenal.bomb_duration)).expect("ignite");
        let burning = world
            .entities
            .iter()
            .filter(|entity| entity.is_burning())
            .count();
        assert_eq!(burning, 9);
    }

    #[test]
    fn superseding_a_move_keeps_progress_along_the_axis() {
        let mut world = world(5, 5);
        let player = world
            .place(Entity::player(Coordinate::new(0, 0), &EntityTunables::default()))
            .expect("player");
        let mut manager = TaskManager::new();
        manager.register(Task::movement(player, Direction::Right, 1));
        manager.run(&mut world, secs(0.0)).expect("start");
        manager.run(&mut world, secs(0.25)).expect("advance");
        assert_eq!(
            world.entity(player).expect("player").physical_location,
            Vec2::new(0.25, 0.0)
        );

        assert!(manager.register(Task::movement(player, Direction::Right, 1)));
        assert_eq!(manager.len(), 1);
        manager.run(&mut world, secs(0.25)).expect("restart");
        let entity = world.entity(player).expect("player");
        assert_eq!(entity.logical_location, Coordinate::new(2, 0));
        assert_eq!(entity.physical_location, Vec2::new(0.25, 0.0));

        manager.run(&mut world, secs(1.25)).expect("halfway");
        assert!(world.entity(player).expect("player").is_moving());
        assert_eq!(
            world.entity(player).expect("player").physical_location,
            Vec2::new(1.25, 0.0)
        );

        let summary = manager.run(&mut world, secs(2.0)).expect("arrive");
        assert_eq!(summary.finished, 1);
        let entity = world.entity(player).expect("player");
        assert!(!entity.is_moving());
        assert_eq!(entity.physical_location, Vec2::new(2.0, 0.0));
    }
}
