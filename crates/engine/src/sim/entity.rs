use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::coord::{Coordinate, Vec2};

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Fresh process-unique id. Every constructor draws its own.
    pub fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Movable,
    Collideable,
    Detonatable,
    Burnable,
    Destroyable,
    Modifiable,
    Modifier,
    DropsBombs,
}

impl Capability {
    const fn bit(self) -> u16 {
        match self {
            Self::Movable => 1 << 0,
            Self::Collideable => 1 << 1,
            Self::Detonatable => 1 << 2,
            Self::Burnable => 1 << 3,
            Self::Destroyable => 1 << 4,
            Self::Modifiable => 1 << 5,
            Self::Modifier => 1 << 6,
            Self::DropsBombs => 1 << 7,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u16);

impl Capabilities {
    pub const NONE: Capabilities = Capabilities(0);

    pub const fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    pub const fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    BombCount,
    FireDistance,
    MovementSpeed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Bomb,
    Fire,
    DestructibleWall,
    IndestructibleWall,
    Modifier(ModifierKind),
}

impl EntityKind {
    pub fn identifier(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Bomb => "bomb",
            Self::Fire => "fire",
            Self::DestructibleWall => "destructible_wall",
            Self::IndestructibleWall => "indestructible_wall",
            Self::Modifier(ModifierKind::BombCount) => "bomb_modifier",
            Self::Modifier(ModifierKind::FireDistance) => "fire_modifier",
            Self::Modifier(ModifierKind::MovementSpeed) => "movement_modifier",
        }
    }

    pub const fn capabilities(self) -> Capabilities {
        use Capability::*;
        let none = Capabilities::NONE;
        match self {
            Self::Player => none
                .with(Movable)
                .with(Collideable)
                .with(Destroyable)
                .with(Modifiable)
                .with(DropsBombs),
            Self::Bomb => none.with(Detonatable).with(Collideable).with(Destroyable),
            Self::Fire => none.with(Burnable).with(Destroyable),
            Self::DestructibleWall => none.with(Collideable).with(Destroyable),
            Self::IndestructibleWall => none.with(Collideable),
            Self::Modifier(_) => none.with(Modifier).with(Destroyable),
        }
    }

    pub fn category(self) -> OccupantCategory {
        match self {
            Self::Bomb => OccupantCategory::Bomb,
            Self::Fire => OccupantCategory::Fire,
            Self::Modifier(_) => OccupantCategory::Modifier,
            Self::Player | Self::DestructibleWall | Self::IndestructibleWall => {
                OccupantCategory::Entity
            }
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Board slot an entity lands in. One occupant per category per space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OccupantCategory {
    Entity,
    Bomb,
    Fire,
    Modifier,
}

impl fmt::Display for OccupantCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Entity => "entity",
            Self::Bomb => "bomb",
            Self::Fire => "fire",
            Self::Modifier => "modifier",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityTunables {
    pub player_bombs: u32,
    pub player_movement_speed: f32,
    pub player_fire_distance: u32,
    pub player_bomb_duration_seconds: f32,
    pub fire_duration_seconds: f32,
    pub bomb_modifier_amount: u32,
    pub fire_modifier_amount: u32,
    pub movement_modifier_amount: f32,
}

impl Default for EntityTunables {
    fn default() -> Self {
        Self {
            player_bombs: 1,
            player_movement_speed: 1.0,
            player_fire_distance: 3,
            player_bomb_duration_seconds: 3.0,
            fire_duration_seconds: 2.0,
            bomb_modifier_amount: 1,
            fire_modifier_amount: 1,
            movement_modifier_amount: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mobility {
    pub movement_speed: f32,
    pub is_moving: bool,
}

/// Bomb-dropping stats. Bombs copy radius and fuse from here when dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arsenal {
    pub bombs: u32,
    pub fire_distance: u32,
    pub bomb_duration: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fuse {
    pub bomb_duration: f32,
    pub fire_distance: u32,
    pub owner: Option<EntityId>,
    pub is_detonating: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flame {
    pub fire_duration: f32,
    pub is_burning: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModifierEffect {
    BombCount(u32),
    FireDistance(u32),
    MovementSpeed(f32),
}

impl ModifierEffect {
    pub fn kind(self) -> ModifierKind {
        match self {
            Self::BombCount(_) => ModifierKind::BombCount,
            Self::FireDistance(_) => ModifierKind::FireDistance,
            Self::MovementSpeed(_) => ModifierKind::MovementSpeed,
        }
    }

    fn for_kind(kind: ModifierKind, tunables: &EntityTunables) -> Self {
        match kind {
            ModifierKind::BombCount => Self::BombCount(tunables.bomb_modifier_amount),
            ModifierKind::FireDistance => Self::FireDistance(tunables.fire_modifier_amount),
            ModifierKind::MovementSpeed => Self::MovementSpeed(tunables.movement_modifier_amount),
        }
    }

    /// Returns false when the target lacks the stat this effect raises.
    pub fn apply(self, target: &mut Entity) -> bool {
        if !target.has_capability(Capability::Modifiable) {
            return false;
        }
        match self {
            Self::BombCount(amount) => match target.arsenal.as_mut() {
                Some(arsenal) => {
                    arsenal.bombs = arsenal.bombs.saturating_add(amount);
                    true
                }
                None => false,
            },
            Self::FireDistance(amount) => match target.arsenal.as_mut() {
                Some(arsenal) => {
                    arsenal.fire_distance = arsenal.fire_distance.saturating_add(amount);
                    true
                }
                None => false,
            },
            Self::MovementSpeed(amount) => match target.mobility.as_mut() {
                Some(mobility) => {
                    mobility.movement_speed += amount;
                    true
                }
                None => false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    capabilities: Capabilities,
    pub logical_location: Coordinate,
    pub physical_location: Vec2,
    pub last_update: Duration,
    destroyed: bool,
    pub mobility: Option<Mobility>,
    pub arsenal: Option<Arsenal>,
    pub fuse: Option<Fuse>,
    pub flame: Option<Flame>,
    pub effect: Option<ModifierEffect>,
}

impl Entity {
    fn bare(kind: EntityKind, location: Coordinate) -> Self {
        Self {
            id: EntityId::next(),
            kind,
            capabilities: kind.capabilities(),
            logical_location: location,
            physical_location: location.to_vec2(),
            last_update: Duration::ZERO,
            destroyed: false,
            mobility: None,
            arsenal: None,
            fuse: None,
            flame: None,
            effect: None,
        }
    }

    pub fn player(location: Coordinate, tunables: &EntityTunables) -> Self {
        let mut entity = Self::bare(EntityKind::Player, location);
        entity.mobility = Some(Mobility {
            movement_speed: tunables.player_movement_speed,
            is_moving: false,
        });
        entity.arsenal = Some(Arsenal {
            bombs: tunables.player_bombs,
            fire_distance: tunables.player_fire_distance,
            bomb_duration: tunables.player_bomb_duration_seconds,
        });
        entity
    }

    pub fn bomb(location: Coordinate, owner: Option<EntityId>, arsenal: &Arsenal) -> Self {
        let mut entity = Self::bare(EntityKind::Bomb, location);
        entity.fuse = Some(Fuse {
            bomb_duration: arsenal.bomb_duration,
            fire_distance: arsenal.fire_distance,
            owner,
            is_detonating: false,
        });
        entity
    }

    pub fn fire(location: Coordinate, fire_duration: f32) -> Self {
        let mut entity = Self::bare(EntityKind::Fire, location);
        entity.flame = Some(Flame {
            fire_duration,
            is_burning: false,
        });
        entity
    }

    pub fn destructible_wall(location: Coordinate) -> Self {
        Self::bare(EntityKind::DestructibleWall, location)
    }

    pub fn indestructible_wall(location: Coordinate) -> Self {
        Self::bare(EntityKind::IndestructibleWall, location)
    }

    pub fn modifier(location: Coordinate, effect: ModifierEffect) -> Self {
        let mut entity = Self::bare(EntityKind::Modifier(effect.kind()), location);
        entity.effect = Some(effect);
        entity
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn category(&self) -> OccupantCategory {
        self.kind.category()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn is_live(&self) -> bool {
        !self.destroyed
    }

    /// Flags the entity for the end-of-tick reap. Returns true only on the
    /// transition; entities without `Destroyable` are never flagged.
    pub fn mark_destroyed(&mut self) -> bool {
        if self.destroyed || !self.has_capability(Capability::Destroyable) {
            return false;
        }
        self.destroyed = true;
        true
    }

    pub fn is_moving(&self) -> bool {
        self.mobility.is_some_and(|mobility| mobility.is_moving)
    }

    pub fn is_detonating(&self) -> bool {
        self.fuse.is_some_and(|fuse| fuse.is_detonating)
    }

    pub fn is_burning(&self) -> bool {
        self.flame.is_some_and(|flame| flame.is_burning)
    }

    /// Collideable but never destroyable, e.g. indestructible walls.
    pub fn is_indestructible_obstruction(&self) -> bool {
        self.has_capability(Capability::Collideable)
            && !self.has_capability(Capability::Destroyable)
    }

    pub fn bomb_count(&self) -> Option<u32> {
        self.arsenal.map(|arsenal| arsenal.bombs)
    }
}

type MapObjectFactory = fn(Coordinate, &EntityTunables) -> Entity;

fn spawn_player(location: Coordinate, tunables: &EntityTunables) -> Entity {
    Entity::player(location, tunables)
}

fn spawn_destructible_wall(location: Coordinate, _: &EntityTunables) -> Entity {
    Entity::destructible_wall(location)
}

fn spawn_indestructible_wall(location: Coordinate, _: &EntityTunables) -> Entity {
    Entity::indestructible_wall(location)
}

fn spawn_bomb_modifier(location: Coordinate, tunables: &EntityTunables) -> Entity {
    Entity::modifier(
        location,
        ModifierEffect::for_kind(ModifierKind::BombCount, tunables),
    )
}

fn spawn_fire_modifier(location: Coordinate, tunables: &EntityTunables) -> Entity {
    Entity::modifier(
        location,
        ModifierEffect::for_kind(ModifierKind::FireDistance, tunables),
    )
}

fn spawn_movement_modifier(location: Coordinate, tunables: &EntityTunables) -> Entity {
    Entity::modifier(
        location,
        ModifierEffect::for_kind(ModifierKind::MovementSpeed, tunables),
    )
}

const MAP_OBJECT_FACTORIES: [(&str, MapObjectFactory); 6] = [
    ("player", spawn_player),
    ("destructible_wall", spawn_destructible_wall),
    ("indestructible_wall", spawn_indestructible_wall),
    ("bomb_modifier", spawn_bomb_modifier),
    ("fire_modifier", spawn_fire_modifier),
    ("movement_modifier", spawn_movement_modifier),
];

/// Builds the entity a map object stands for. Unknown identifiers, and
/// `bomb`/`fire` which only the simulation spawns, yield `None`.
pub fn entity_from_map_identifier(
    identifier: &str,
    location: Coordinate,
    tunables: &EntityTunables,
) -> Option<Entity> {
    MAP_OBJECT_FACTORIES
        .iter()
        .find(|(name, _)| *name == identifier)
        .map(|(_, factory)| factory(location, tunables))
}

pub fn modifier_effect(kind: ModifierKind, tunables: &EntityTunables) -> ModifierEffect {
    ModifierEffect::for_kind(kind, tunables)
}
