use std::collections::HashSet;

use super::coord::{Coordinate, Dimensions, Direction};
use super::entity::{Entity, EntityId};
use super::error::GameError;
use super::registry::EntityRegistry;
use super::space::Space;

/// Toroidal grid of spaces, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    dimensions: Dimensions,
    spaces: Vec<Space>,
}

impl Board {
    pub fn new(dimensions: Dimensions) -> Self {
        let mut spaces = Vec::with_capacity(dimensions.cell_count());
        for y in 0..dimensions.height as i32 {
            for x in 0..dimensions.width as i32 {
                spaces.push(Space::new(Coordinate::new(x, y)));
            }
        }
        Self { dimensions, spaces }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn contains(&self, location: Coordinate) -> bool {
        self.dimensions.contains(location)
    }

    fn index_of(&self, location: Coordinate) -> Result<usize, GameError> {
        if !self.contains(location) {
            return Err(GameError::InvalidLocation {
                location,
                width: self.dimensions.width,
                height: self.dimensions.height,
            });
        }
        Ok(location.y as usize * self.dimensions.width as usize + location.x as usize)
    }

    pub fn get(&self, location: Coordinate) -> Result<&Space, GameError> {
        self.get_offset(location, None, None)
    }

    pub fn relative(
        &self,
        location: Coordinate,
        direction: Direction,
        distance: i32,
    ) -> Result<&Space, GameError> {
        self.get_offset(location, Some(direction), Some(distance))
    }

    /// Space at `location`, or `distance` cells away in `direction` with
    /// wraparound. The base location itself must be on the board, and the
    /// direction and distance come together or not at all.
    pub fn get_offset(
        &self,
        location: Coordinate,
        direction: Option<Direction>,
        distance: Option<i32>,
    ) -> Result<&Space, GameError> {
        self.index_of(location)?;
        let target = match (direction, distance) {
            (None, None) => location,
            (Some(direction), Some(distance)) => self.relative_location(location, direction, distance),
            _ => return Err(GameError::IncompleteArguments),
        };
        let index = self.index_of(target)?;
        Ok(&self.spaces[index])
    }

    /// Wraps on both axes for any distance, including ones far larger than
    /// the board.
    pub fn relative_location(
        &self,
        location: Coordinate,
        direction: Direction,
        distance: i32,
    ) -> Coordinate {
        let (dx, dy) = direction.delta();
        let width = i64::from(self.dimensions.width);
        let height = i64::from(self.dimensions.height);
        let x = (i64::from(location.x) + i64::from(dx) * i64::from(distance)).rem_euclid(width);
        let y = (i64::from(location.y) + i64::from(dy) * i64::from(distance)).rem_euclid(height);
        // Both values lie in [0, extent) and extents fit in i32.
        Coordinate::new(x as i32, y as i32)
    }

    fn space_mut(&mut self, location: Coordinate) -> Result<&mut Space, GameError> {
        let index = self.index_of(location)?;
        Ok(&mut self.spaces[index])
    }

    /// Places `entity` in its category slot at its logical location.
    pub fn add(&mut self, entity: &Entity) -> Result<(), GameError> {
        self.space_mut(entity.logical_location)?.insert(entity)
    }

    pub fn remove(&mut self, entity: &Entity) -> Result<(), GameError> {
        self.space_mut(entity.logical_location)?.take(entity)
    }

    pub fn spaces(&self) -> impl Iterator<Item = &Space> {
        self.spaces.iter()
    }

    pub fn all_entities(&self) -> Vec<EntityId> {
        self.spaces.iter().flat_map(Space::occupants).collect()
    }

    /// Cells reached by a blast of `radius` from `origin`: the origin plus up
    /// to `radius - 1` cells along each arm. An arm stops before the first
    /// cell holding an indestructible obstruction or a live bomb.
    pub fn blast_radius(
        &self,
        origin: Coordinate,
        radius: u32,
        entities: &EntityRegistry,
    ) -> Result<Vec<Coordinate>, GameError> {
        self.index_of(origin)?;
        let mut seen = HashSet::from([origin]);
        let mut cells = vec![origin];
        for direction in Direction::ALL {
            // Steps past the axis extent revisit cells already walked.
            let extent = self.dimensions.extent_along(direction);
            let reach = radius.saturating_sub(1).min(extent.saturating_sub(1)) as i32;
            for step in 1..=reach {
                let location = self.relative_location(origin, direction, step);
                if self.get(location)?.has_indestructible_entity(entities) {
                    break;
                }
                if seen.insert(location) {
                    cells.push(location);
                }
            }
        }
        Ok(cells)
    }
}
