use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::sim::{Clock, Coordinate, Dimensions, EntityTunables, Game, GameError};

use super::atomic_io::write_atomic;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapObject {
    pub identifier: String,
    pub location: Coordinate,
}

impl MapObject {
    pub fn new(identifier: impl Into<String>, location: Coordinate) -> Self {
        Self {
            identifier: identifier.into(),
            location,
        }
    }
}

/// Named board layout: at most one object per cell, kept in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameMap {
    name: String,
    dimensions: Dimensions,
    objects: Vec<MapObject>,
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to read map '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write map '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    Parse(String),
    #[error("failed to encode map: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("map dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("map object '{identifier}' at {location} is outside the {width}x{height} map")]
    OutOfBounds {
        identifier: String,
        location: Coordinate,
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct MapFile {
    metadata: MapMetadata,
    #[serde(default)]
    objects: Vec<MapObjectRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MapMetadata {
    #[serde(default)]
    name: String,
    dimensions: Dimensions,
}

#[derive(Debug, Serialize, Deserialize)]
struct MapObjectRecord {
    identifier: String,
    location: [i32; 2],
}

impl GameMap {
    pub fn new(name: impl Into<String>, dimensions: Dimensions) -> Self {
        Self {
            name: name.into(),
            dimensions,
            objects: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Adds `object`, replacing whatever already sits in its cell.
    pub fn add(&mut self, object: MapObject) -> Result<Option<MapObject>, MapError> {
        if !self.dimensions.contains(object.location) {
            return Err(MapError::OutOfBounds {
                identifier: object.identifier,
                location: object.location,
                width: self.dimensions.width,
                height: self.dimensions.height,
            });
        }
        let replaced = self.remove(object.location);
        self.objects.push(object);
        Ok(replaced)
    }

    pub fn remove(&mut self, location: Coordinate) -> Option<MapObject> {
        let index = self
            .objects
            .iter()
            .position(|object| object.location == location)?;
        Some(self.objects.remove(index))
    }

    pub fn object_at(&self, location: Coordinate) -> Option<&MapObject> {
        self.objects.iter().find(|object| object.location == location)
    }

    pub fn all_objects(&self) -> &[MapObject] {
        &self.objects
    }

    pub fn count_of(&self, identifier: &str) -> usize {
        self.objects
            .iter()
            .filter(|object| object.identifier == identifier)
            .count()
    }

    pub fn from_json_str(raw: &str) -> Result<Self, MapError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let file: MapFile = match serde_path_to_error::deserialize(&mut deserializer) {
            Ok(file) => file,
            Err(error) => {
                let path = error.path().to_string();
                let source = error.into_inner();
                return Err(if path.is_empty() || path == "." {
                    MapError::Parse(format!("parse map json: {source}"))
                } else {
                    MapError::Parse(format!("parse map json at {path}: {source}"))
                });
            }
        };

        let MapMetadata { name, dimensions } = file.metadata;
        let dimensions = Dimensions::new(dimensions.width, dimensions.height).map_err(|_| {
            MapError::InvalidDimensions {
                width: dimensions.width,
                height: dimensions.height,
            }
        })?;
        let mut map = Self::new(name, dimensions);
        for record in file.objects {
            let [x, y] = record.location;
            map.add(MapObject::new(record.identifier, Coordinate::new(x, y)))?;
        }
        Ok(map)
    }

    pub fn to_json_string(&self) -> Result<String, MapError> {
        let file = MapFile {
            metadata: MapMetadata {
                name: self.name.clone(),
                dimensions: self.dimensions,
            },
            objects: self
                .objects
                .iter()
                .map(|object| MapObjectRecord {
                    identifier: object.identifier.clone(),
                    location: [object.location.x, object.location.y],
                })
                .collect(),
        };
        serde_json::to_string_pretty(&file).map_err(MapError::Encode)
    }

    pub fn load(path: &Path) -> Result<Self, MapError> {
        let raw = fs::read_to_string(path).map_err(|source| MapError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let map = Self::from_json_str(&raw)?;
        info!(
            path = %path.display(),
            name = %map.name,
            width = map.dimensions.width,
            height = map.dimensions.height,
            object_count = map.objects.len(),
            "map_loaded"
        );
        Ok(map)
    }

    pub fn save(&self, path: &Path) -> Result<(), MapError> {
        let mut text = self.to_json_string()?;
        text.push('\n');
        write_atomic(path, &text).map_err(|source| MapError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Builds a game whose entities come from this map's objects.
    pub fn build_game(
        &self,
        tunables: EntityTunables,
        clock: Box<dyn Clock>,
    ) -> Result<Game, GameError> {
        Game::with_settings(
            self.dimensions,
            self.objects
                .iter()
                .map(|object| (object.identifier.as_str(), object.location)),
            tunables,
            clock,
        )
    }
}
