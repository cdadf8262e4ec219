use std::env;
use std::path::{Path, PathBuf};

use bomber_engine::{
    ConfigError, ConfigStore, Coordinate, Dimensions, Game, GameError, GameMap, LoopConfig,
    MapError, MapObject, ScriptedIntents, SystemClock,
};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::script::{IntentScript, ScriptError};

pub(crate) const CONFIG_ENV_VAR: &str = "BOMBER_CONFIG";
pub(crate) const MAP_ENV_VAR: &str = "BOMBER_MAP";
pub(crate) const SCRIPT_ENV_VAR: &str = "BOMBER_SCRIPT";
const DEFAULT_CONFIG_PATH: &str = "bomber.json";

const ARENA_WIDTH: u32 = 11;
const ARENA_HEIGHT: u32 = 9;

#[derive(Debug, Error)]
pub(crate) enum StartupError {
    #[error("missing value for {flag}")]
    MissingValue { flag: String },
    #[error("unknown argument '{0}' (expected --config, --map or --script)")]
    UnknownArgument(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("failed to build game: {0}")]
    Game(#[from] GameError),
    #[error(transparent)]
    Script(#[from] ScriptError),
}

pub(crate) struct AppWiring {
    pub(crate) game: Game,
    pub(crate) intents: ScriptedIntents,
    pub(crate) config: LoopConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LaunchPaths {
    pub(crate) config: PathBuf,
    pub(crate) map: Option<PathBuf>,
    pub(crate) script: Option<PathBuf>,
}

pub(crate) fn build_app() -> Result<AppWiring, StartupError> {
    init_tracing();
    info!("=== Bomber Startup ===");

    let paths = resolve_launch_paths(env::args().skip(1), |name| env::var(name).ok())?;
    let store = ConfigStore::load(&paths.config)?;
    let settings = store.config().clone();

    let map_path = paths
        .map
        .unwrap_or_else(|| relative_to_config(&paths.config, &settings.map));
    let map = load_map_or_arena(&map_path)?;
    let game = map.build_game(settings.tunables, Box::new(SystemClock::default()))?;

    let intents = match &paths.script {
        Some(path) => IntentScript::load(path)?.resolve(game.players())?,
        None => ScriptedIntents::new(),
    };

    let config = LoopConfig {
        target_tps: settings.target_tps,
        max_ticks: settings.max_ticks,
        metrics_log_interval: settings.metrics_log_interval(),
        ..LoopConfig::default()
    };
    info!(
        config = %paths.config.display(),
        map = %map_path.display(),
        script = ?paths.script,
        players = game.players().len(),
        scripted_intents = intents.len(),
        "startup"
    );

    Ok(AppWiring {
        game,
        intents,
        config,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// Command-line flags win over environment variables.
pub(crate) fn resolve_launch_paths<I, F>(args: I, env_lookup: F) -> Result<LaunchPaths, StartupError>
where
    I: IntoIterator<Item = String>,
    F: Fn(&str) -> Option<String>,
{
    let mut config = None;
    let mut map = None;
    let mut script = None;

    let args = args.into_iter().collect::<Vec<_>>();
    let mut index = 0usize;
    while index < args.len() {
        let flag = args[index].as_str();
        let slot = match flag {
            "--config" => &mut config,
            "--map" => &mut map,
            "--script" => &mut script,
            other => return Err(StartupError::UnknownArgument(other.to_string())),
        };
        let value = args
            .get(index + 1)
            .ok_or_else(|| StartupError::MissingValue {
                flag: flag.to_string(),
            })?;
        *slot = Some(PathBuf::from(value));
        index += 2;
    }

    let from_env = |name: &str| {
        env_lookup(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    };
    Ok(LaunchPaths {
        config: config
            .or_else(|| from_env(CONFIG_ENV_VAR))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
        map: map.or_else(|| from_env(MAP_ENV_VAR)),
        script: script.or_else(|| from_env(SCRIPT_ENV_VAR)),
    })
}

fn relative_to_config(config_path: &Path, map: &Path) -> PathBuf {
    if map.is_absolute() {
        return map.to_path_buf();
    }
    match config_path.parent() {
        Some(parent) => parent.join(map),
        None => map.to_path_buf(),
    }
}

fn load_map_or_arena(path: &Path) -> Result<GameMap, StartupError> {
    if path.is_file() {
        return Ok(GameMap::load(path)?);
    }
    warn!(path = %path.display(), "map_missing_using_arena");
    default_arena()
}

/// Two-player arena: pillars on every odd cell pair, crates in a fixed
/// pattern that keeps each corner's neighbourhood open.
pub(crate) fn default_arena() -> Result<GameMap, StartupError> {
    let dimensions = Dimensions::new(ARENA_WIDTH, ARENA_HEIGHT)?;
    let mut map = GameMap::new("arena", dimensions);
    let last_x = ARENA_WIDTH as i32 - 1;
    let last_y = ARENA_HEIGHT as i32 - 1;

    for y in 0..ARENA_HEIGHT as i32 {
        for x in 0..ARENA_WIDTH as i32 {
            let location = Coordinate::new(x, y);
            let near_spawn = (x + y <= 2) || (last_x - x + last_y - y <= 2);
            let identifier = if x % 2 == 1 && y % 2 == 1 {
                "indestructible_wall"
            } else if near_spawn {
                continue;
            } else if (x * 7 + y * 3) % 11 == 0 {
                "bomb_modifier"
            } else if (x * 5 + y * 2) % 13 == 0 {
                "fire_modifier"
            } else if (x + 2 * y) % 3 == 0 {
                "destructible_wall"
            } else {
                continue;
            };
            map.add(MapObject::new(identifier, location))?;
        }
    }
    map.add(MapObject::new("player", Coordinate::new(0, 0)))?;
    map.add(MapObject::new("player", Coordinate::new(last_x, last_y)))?;
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn flags_override_environment() {
        let paths = resolve_launch_paths(args(&["--map", "cli.json"]), |name| match name {
            MAP_ENV_VAR => Some("env.json".to_string()),
            SCRIPT_ENV_VAR => Some("script.json".to_string()),
            _ => None,
        })
        .expect("paths");

        assert_eq!(paths.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(paths.map, Some(PathBuf::from("cli.json")));
        assert_eq!(paths.script, Some(PathBuf::from("script.json")));
    }

    #[test]
    fn blank_environment_values_are_ignored() {
        let paths = resolve_launch_paths(Vec::new(), |name| match name {
            CONFIG_ENV_VAR => Some("  ".to_string()),
            _ => None,
        })
        .expect("paths");
        assert_eq!(paths.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(paths.map, None);
    }

    #[test]
    fn bad_arguments_are_reported() {
        assert!(matches!(
            resolve_launch_paths(args(&["--script"]), |_| None),
            Err(StartupError::MissingValue { .. })
        ));
        assert!(matches!(
            resolve_launch_paths(args(&["--verbose"]), |_| None),
            Err(StartupError::UnknownArgument(flag)) if flag == "--verbose"
        ));
    }

    #[test]
    fn map_path_resolves_next_to_the_config() {
        assert_eq!(
            relative_to_config(Path::new("settings/bomber.json"), Path::new("maps/a.json")),
            PathBuf::from("settings/maps/a.json")
        );
        assert_eq!(
            relative_to_config(Path::new("bomber.json"), Path::new("maps/a.json")),
            PathBuf::from("maps/a.json")
        );
    }

    #[test]
    fn default_arena_builds_a_two_player_game() {
        let map = default_arena().expect("arena");
        assert_eq!(map.count_of("player"), 2);
        assert!(map.count_of("indestructible_wall") > 0);
        assert!(map.count_of("destructible_wall") > 0);
        for corner in [Coordinate::new(1, 0), Coordinate::new(0, 1)] {
            assert!(map.object_at(corner).is_none(), "{corner} should be open");
        }

        let game = map
            .build_game(Default::default(), Box::new(SystemClock::default()))
            .expect("game");
        assert_eq!(game.players().len(), 2);
    }

    #[test]
    fn missing_map_file_falls_back_to_the_arena() {
        let dir = tempfile::tempdir().expect("tempdir");
        let map = load_map_or_arena(&dir.path().join("missing.json")).expect("arena");
        assert_eq!(map.name(), "arena");
    }
}
