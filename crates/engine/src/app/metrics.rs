use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;

static METRICS_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_metrics_lock_poison_once(operation: &'static str) {
    if METRICS_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "metrics lock poisoned; recovered inner value");
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub tps: f32,
    pub process_time_ms: f32,
    pub live_entities: usize,
    pub active_tasks: usize,
}

/// Shared view of the latest published metrics window.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    snapshot: Arc<RwLock<LoopMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        match self.snapshot.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("read");
                *poisoned.into_inner()
            }
        }
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        match self.snapshot.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("write");
                *poisoned.into_inner() = snapshot;
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    ticks: u32,
    process_time_sum: Duration,
    live_entities: usize,
    active_tasks: usize,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval_start: start,
            interval,
            ticks: 0,
            process_time_sum: Duration::ZERO,
            live_entities: 0,
            active_tasks: 0,
        }
    }

    pub(crate) fn record_tick(&mut self, process_time: Duration, live_entities: usize, active_tasks: usize) {
        self.ticks = self.ticks.saturating_add(1);
        self.process_time_sum = self.process_time_sum.saturating_add(process_time);
        self.live_entities = live_entities;
        self.active_tasks = active_tasks;
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let process_time_ms = if self.ticks == 0 {
            0.0
        } else {
            (self.process_time_sum.as_secs_f32() / self.ticks as f32) * 1000.0
        };

        let snapshot = LoopMetricsSnapshot {
            tps: self.ticks as f32 / elapsed_seconds,
            process_time_ms,
            live_entities: self.live_entities,
            active_tasks: self.active_tasks,
        };

        self.interval_start = now;
        self.ticks = 0;
        self.process_time_sum = Duration::ZERO;

        Some(snapshot)
    }
}
