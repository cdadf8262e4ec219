use thiserror::Error;

use super::coord::Coordinate;
use super::entity::{EntityId, OccupantCategory};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("board dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("location {location} is outside the {width}x{height} board")]
    InvalidLocation {
        location: Coordinate,
        width: u32,
        height: u32,
    },
    #[error("relative board lookup needs both a direction and a distance")]
    IncompleteArguments,
    #[error("{category} slot at {location} is already held by entity {occupant}")]
    SpaceOccupied {
        location: Coordinate,
        category: OccupantCategory,
        occupant: EntityId,
    },
    #[error("{category} slot at {location} does not hold entity {entity}")]
    SpaceNotOccupied {
        location: Coordinate,
        category: OccupantCategory,
        entity: EntityId,
    },
    #[error("entity {0} is already registered")]
    DuplicateEntity(EntityId),
    #[error("entity {0} is not registered")]
    EntityNotFound(EntityId),
    #[error("entity {entity} ({kind}) at {location} cannot {action}")]
    IncapableAction {
        entity: EntityId,
        kind: &'static str,
        location: Coordinate,
        action: &'static str,
    },
}
