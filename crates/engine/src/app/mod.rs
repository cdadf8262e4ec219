mod intents;
mod loop_runner;
mod metrics;

pub use intents::{Intent, IntentAction, IntentSource, ScriptedIntents};
pub use loop_runner::{
    run_headless, run_headless_with_metrics, AppError, LoopConfig, LoopSummary, ManualPacer,
    RealTimePacer, StopReason, TickPacer,
};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
