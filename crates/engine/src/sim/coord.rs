use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::GameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Unwrapped, saturating offset. Board lookups wrap through
    /// `Board::relative_location`.
    pub fn offset(self, direction: Direction, distance: i32) -> Self {
        let (dx, dy) = direction.delta();
        Self {
            x: self.x.saturating_add(dx.saturating_mul(distance)),
            y: self.y.saturating_add(dy.saturating_mul(distance)),
        }
    }

    pub fn to_vec2(self) -> Vec2 {
        Vec2 {
            x: self.x as f32,
            y: self.y as f32,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Coordinate {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Grid delta for one step. `Up` decreases `y`.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Result<Self, GameError> {
        if width == 0 || height == 0 || width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(GameError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn contains(self, location: Coordinate) -> bool {
        location.x >= 0
            && location.y >= 0
            && (location.x as u32) < self.width
            && (location.y as u32) < self.height
    }

    pub fn wrap(self, location: Coordinate) -> Coordinate {
        Coordinate {
            x: location.x.rem_euclid(self.width as i32),
            y: location.y.rem_euclid(self.height as i32),
        }
    }

    pub fn cell_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Extent of the axis a direction travels along.
    pub fn extent_along(self, direction: Direction) -> u32 {
        if direction.is_horizontal() {
            self.width
        } else {
            self.height
        }
    }
}

/// Sub-cell position. Equal to the logical cell whenever the entity is at rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn axis(self, direction: Direction) -> f32 {
        if direction.is_horizontal() {
            self.x
        } else {
            self.y
        }
    }

    pub fn with_axis(mut self, direction: Direction, value: f32) -> Self {
        if direction.is_horizontal() {
            self.x = value;
        } else {
            self.y = value;
        }
        self
    }
}

/// Rolls a physical axis value over once it leaves `[-0.5, extent - 0.5)`.
pub fn wrap_physical(value: f32, extent: u32) -> f32 {
    let extent = extent as f32;
    if value < -0.5 {
        value + extent
    } else if value >= extent - 0.5 {
        value - extent
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_rolls_negative_and_overflowing_coordinates() {
        let dims = Dimensions::new(5, 4).expect("dims");
        assert_eq!(dims.wrap(Coordinate::new(-1, 0)), Coordinate::new(4, 0));
        assert_eq!(dims.wrap(Coordinate::new(5, 4)), Coordinate::new(0, 0));
        assert_eq!(dims.wrap(Coordinate::new(-6, -9)), Coordinate::new(4, 3));
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert_eq!(
            Dimensions::new(0, 3),
            Err(GameError::InvalidDimensions {
                width: 0,
                height: 3
            })
        );
    }

    #[test]
    fn physical_wrap_keeps_half_cell_margin() {
        assert_eq!(wrap_physical(-0.4, 5), -0.4);
        assert_eq!(wrap_physical(-0.6, 5), 4.4);
        assert_eq!(wrap_physical(4.5, 5), -0.5);
        assert_eq!(wrap_physical(4.2, 5), 4.2);
    }

    #[test]
    fn up_decreases_y() {
        let moved = Coordinate::new(2, 2).offset(Direction::Up, 2);
        assert_eq!(moved, Coordinate::new(2, 0));
    }
}
