use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bomber_engine::sim::Direction;
use bomber_engine::{EntityId, Intent, ScriptedIntents};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub(crate) enum ScriptError {
    #[error("failed to read script '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    Parse(String),
    #[error("script entry {index} targets player {player}, but the map has {player_count}")]
    UnknownPlayer {
        index: usize,
        player: usize,
        player_count: usize,
    },
    #[error("script entry {index} is a move without a direction")]
    MissingDirection { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ScriptAction {
    Move,
    DropBomb,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptEntry {
    tick: u64,
    player: usize,
    action: ScriptAction,
    #[serde(default)]
    direction: Option<Direction>,
    #[serde(default = "default_spaces")]
    spaces: u32,
}

fn default_spaces() -> u32 {
    1
}

/// Parsed intent script. Players are addressed by their index in map order
/// until `resolve` binds them to entity ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IntentScript {
    entries: Vec<ScriptEntry>,
}

impl IntentScript {
    pub(crate) fn load(path: &Path) -> Result<Self, ScriptError> {
        let raw = fs::read_to_string(path).map_err(|source| ScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let script = Self::from_json_str(&raw)?;
        info!(path = %path.display(), entries = script.len(), "script_loaded");
        Ok(script)
    }

    pub(crate) fn from_json_str(raw: &str) -> Result<Self, ScriptError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        match serde_path_to_error::deserialize::<_, Vec<ScriptEntry>>(&mut deserializer) {
            Ok(entries) => Ok(Self { entries }),
            Err(error) => {
                let path = error.path().to_string();
                let source = error.into_inner();
                if path.is_empty() || path == "." {
                    Err(ScriptError::Parse(format!("parse script json: {source}")))
                } else {
                    Err(ScriptError::Parse(format!(
                        "parse script json at {path}: {source}"
                    )))
                }
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn resolve(&self, players: &[EntityId]) -> Result<ScriptedIntents, ScriptError> {
        let mut intents = ScriptedIntents::new();
        for (index, entry) in self.entries.iter().enumerate() {
            let entity = *players
                .get(entry.player)
                .ok_or(ScriptError::UnknownPlayer {
                    index,
                    player: entry.player,
                    player_count: players.len(),
                })?;
            let intent = match entry.action {
                ScriptAction::Move => {
                    let direction = entry
                        .direction
                        .ok_or(ScriptError::MissingDirection { index })?;
                    Intent::movement(entity, direction, entry.spaces)
                }
                ScriptAction::DropBomb => Intent::drop_bomb(entity),
            };
            intents.push(entry.tick, intent);
        }
        Ok(intents)
    }
}

#[cfg(test)]
mod tests {
    use bomber_engine::{IntentAction, IntentSource};

    use super::*;

    #[test]
    fn resolves_player_indices_to_entities() {
        let script = IntentScript::from_json_str(
            r#"[
                {"tick": 0, "player": 1, "action": "move", "direction": "up", "spaces": 2},
                {"tick": 5, "player": 0, "action": "drop_bomb"},
                {"tick": 5, "player": 0, "action": "move", "direction": "left"}
            ]"#,
        )
        .expect("script");
        assert_eq!(script.len(), 3);

        let players = [EntityId(10), EntityId(20)];
        let mut intents = script.resolve(&players).expect("resolve");
        assert_eq!(
            intents.poll(0),
            vec![Intent::movement(EntityId(20), Direction::Up, 2)]
        );
        let later = intents.poll(5);
        assert_eq!(later[0].action, IntentAction::DropBomb);
        assert_eq!(
            later[1],
            Intent::movement(EntityId(10), Direction::Left, 1)
        );
        assert!(intents.is_exhausted());
    }

    #[test]
    fn unknown_player_index_is_an_error() {
        let script = IntentScript::from_json_str(
            r#"[{"tick": 0, "player": 3, "action": "drop_bomb"}]"#,
        )
        .expect("script");
        assert!(matches!(
            script.resolve(&[EntityId(1)]),
            Err(ScriptError::UnknownPlayer {
                index: 0,
                player: 3,
                player_count: 1
            })
        ));
    }

    #[test]
    fn move_without_direction_is_an_error() {
        let script =
            IntentScript::from_json_str(r#"[{"tick": 2, "player": 0, "action": "move"}]"#)
                .expect("script");
        assert!(matches!(
            script.resolve(&[EntityId(1)]),
            Err(ScriptError::MissingDirection { index: 0 })
        ));
    }

    #[test]
    fn parse_errors_carry_the_json_path() {
        let error = IntentScript::from_json_str(
            r#"[{"tick": 0, "player": 0, "action": "move", "direction": "sideways"}]"#,
        )
        .expect_err("should fail");
        let message = error.to_string();
        assert!(message.contains("[0].direction"), "{message}");
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("script.json");
        fs::write(&path, r#"[{"tick": 1, "player": 0, "action": "drop_bomb"}]"#)
            .expect("write");
        let script = IntentScript::load(&path).expect("load");
        assert_eq!(script.len(), 1);
    }
}
