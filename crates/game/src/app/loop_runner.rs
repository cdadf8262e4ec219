use std::process::ExitCode;

use bomber_engine::{run_headless, RealTimePacer};
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        mut game,
        mut intents,
        config,
    } = app;
    let mut pacer = RealTimePacer::new(config.max_backlog_ticks);

    match run_headless(&mut game, &mut intents, &mut pacer, &config) {
        Ok(summary) => {
            info!(
                ticks = summary.ticks,
                live_players = summary.live_players,
                live_entities = summary.live_entities,
                stop_reason = ?summary.stop_reason,
                "=== Bomber Shutdown ==="
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "simulation_failed");
            ExitCode::FAILURE
        }
    }
}
