use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::sim::{Game, GameError, GameEvent, ManualClock};

use super::intents::{Intent, IntentAction, IntentSource};
use super::metrics::MetricsAccumulator;
use super::MetricsHandle;

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_ticks: Option<u64>,
    pub metrics_log_interval: Duration,
    /// Stop once the intent source is exhausted and no task is pending.
    pub stop_when_idle: bool,
    /// Ticks the real-time pacer may fall behind before the backlog is dropped.
    pub max_backlog_ticks: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_ticks: None,
            metrics_log_interval: Duration::from_secs(1),
            stop_when_idle: true,
            max_backlog_ticks: 5,
        }
    }
}

impl LoopConfig {
    pub fn fixed_dt(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_tps.max(1) as f64)
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("simulation failed on tick {tick}: {source}")]
    Simulation {
        tick: u64,
        #[source]
        source: GameError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxTicks,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub ticks: u64,
    pub intents_applied: u64,
    pub intents_rejected: u64,
    pub events: u64,
    pub live_entities: usize,
    pub live_players: usize,
    pub stop_reason: StopReason,
}

/// Waits out the remainder of a fixed tick.
pub trait TickPacer {
    fn wait_for_next_tick(&mut self, fixed_dt: Duration);
}

/// Sleeps until the next wall-clock deadline.
#[derive(Debug, Default)]
pub struct RealTimePacer {
    deadline: Option<Instant>,
    max_backlog_ticks: u32,
}

impl RealTimePacer {
    pub fn new(max_backlog_ticks: u32) -> Self {
        Self {
            deadline: None,
            max_backlog_ticks,
        }
    }
}

impl TickPacer for RealTimePacer {
    fn wait_for_next_tick(&mut self, fixed_dt: Duration) {
        let now = Instant::now();
        let plan = plan_deadline(
            self.deadline.unwrap_or(now),
            now,
            fixed_dt,
            self.max_backlog_ticks,
        );
        if plan.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = plan.dropped_backlog.as_millis() as u64,
                max_backlog_ticks = self.max_backlog_ticks,
                "sim_clamp_triggered"
            );
        }
        let sleep_for = plan.deadline.saturating_duration_since(now);
        if sleep_for > Duration::ZERO {
            thread::sleep(sleep_for);
        }
        self.deadline = Some(plan.deadline);
    }
}

/// Advances a shared `ManualClock` by exactly one tick instead of sleeping.
#[derive(Debug, Clone)]
pub struct ManualPacer {
    clock: ManualClock,
}

impl ManualPacer {
    pub fn new(clock: ManualClock) -> Self {
        Self { clock }
    }
}

impl TickPacer for ManualPacer {
    fn wait_for_next_tick(&mut self, fixed_dt: Duration) {
        self.clock.advance(fixed_dt);
    }
}

pub fn run_headless(
    game: &mut Game,
    intents: &mut dyn IntentSource,
    pacer: &mut dyn TickPacer,
    config: &LoopConfig,
) -> Result<LoopSummary, AppError> {
    run_headless_with_metrics(game, intents, pacer, config, MetricsHandle::default())
}

pub fn run_headless_with_metrics(
    game: &mut Game,
    intents: &mut dyn IntentSource,
    pacer: &mut dyn TickPacer,
    config: &LoopConfig,
    metrics_handle: MetricsHandle,
) -> Result<LoopSummary, AppError> {
    let fixed_dt = config.fixed_dt();
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    info!(
        target_tps = config.target_tps.max(1),
        max_ticks = ?config.max_ticks,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        stop_when_idle = config.stop_when_idle,
        "loop_config"
    );

    let mut metrics = MetricsAccumulator::new(metrics_log_interval, Instant::now());
    let mut ticks = 0u64;
    let mut intents_applied = 0u64;
    let mut intents_rejected = 0u64;
    let mut events = 0u64;

    let stop_reason = loop {
        if config.max_ticks.is_some_and(|max| ticks >= max) {
            break StopReason::MaxTicks;
        }
        if config.stop_when_idle && ticks > 0 && intents.is_exhausted() && game.is_idle() {
            break StopReason::Idle;
        }

        for intent in intents.poll(ticks) {
            match apply_intent(game, intent) {
                Ok(()) => intents_applied += 1,
                Err(error) => {
                    intents_rejected += 1;
                    warn!(tick = ticks, entity = %intent.entity, error = %error, "intent_rejected");
                }
            }
        }

        let started = Instant::now();
        let report = game
            .process()
            .map_err(|source| AppError::Simulation { tick: ticks, source })?;
        let process_time = started.elapsed();
        ticks += 1;

        for event in game.drain_events() {
            events += 1;
            log_event(report.tick, &event);
        }

        metrics.record_tick(process_time, report.live_entities, report.active_tasks);
        if let Some(snapshot) = metrics.maybe_snapshot(Instant::now()) {
            metrics_handle.publish(snapshot);
            info!(
                tps = snapshot.tps,
                process_time_ms = snapshot.process_time_ms,
                live_entities = snapshot.live_entities,
                active_tasks = snapshot.active_tasks,
                live_players = game.live_players().count(),
                "loop_metrics"
            );
        }

        pacer.wait_for_next_tick(fixed_dt);
    };

    let summary = LoopSummary {
        ticks,
        intents_applied,
        intents_rejected,
        events,
        live_entities: game.entities().live_count(),
        live_players: game.live_players().count(),
        stop_reason,
    };
    info!(
        ticks,
        intents_applied,
        intents_rejected,
        events,
        live_players = summary.live_players,
        stop_reason = ?stop_reason,
        "loop_finished"
    );
    Ok(summary)
}

fn apply_intent(game: &mut Game, intent: Intent) -> Result<(), GameError> {
    match intent.action {
        IntentAction::Move { direction, spaces } => {
            game.move_entity(intent.entity, direction, spaces)
        }
        IntentAction::DropBomb => {
            if game.drop_bomb(intent.entity)?.is_none() {
                debug!(entity = %intent.entity, "bomb_drop_declined");
            }
            Ok(())
        }
    }
}

fn log_event(tick: u64, event: &GameEvent) {
    match event {
        GameEvent::BombDetonated {
            bomb_id,
            location,
            blast,
        } => info!(tick, bomb = %bomb_id, %location, cells = blast.len(), "bomb_detonated"),
        GameEvent::EntityDestroyed {
            entity_id,
            kind,
            location,
        } => info!(tick, entity = %entity_id, %kind, %location, "entity_destroyed"),
        other => debug!(tick, event = ?other, "game_event"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DeadlinePlan {
    deadline: Instant,
    dropped_backlog: Duration,
}

/// Next tick deadline after `previous`. When the loop has fallen more than
/// `max_backlog_ticks` behind, the deadline restarts from `now`.
fn plan_deadline(
    previous: Instant,
    now: Instant,
    fixed_dt: Duration,
    max_backlog_ticks: u32,
) -> DeadlinePlan {
    let deadline = previous + fixed_dt;
    let behind = now.saturating_duration_since(deadline);
    let allowed = fixed_dt.saturating_mul(max_backlog_ticks.max(1));
    if behind > allowed {
        DeadlinePlan {
            deadline: now,
            dropped_backlog: behind,
        }
    } else {
        DeadlinePlan {
            deadline,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
