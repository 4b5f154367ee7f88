use super::run_state::RunState;
use crate::stats::ReducedStats;
use anyhow::Result;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Callbacks around the epoch loop. Returning `true` from a hook is this worker's vote to stop.
/// The vote travels with the next epoch reduction and the run ends on every worker once any
/// worker voted, the epoch carrying the vote is not logged.
pub trait DdpgHooks {
    fn init_hook(&mut self) -> bool;

    fn post_cycle_hook(&mut self, state: &RunState) -> bool;

    fn post_epoch_hook(&mut self, state: &RunState, stats: &ReducedStats) -> bool;

    fn shutdown_hook(&mut self) -> Result<()>;
}

/// Cooperative cancellation flag, clone it into whatever should be able to stop the run.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct DefaultDdpgHooks {
    stop: StopSignal,
}

impl DefaultDdpgHooks {
    pub fn new(stop: StopSignal) -> Self {
        Self { stop }
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }
}

impl Default for DefaultDdpgHooks {
    fn default() -> Self {
        Self::new(StopSignal::new())
    }
}

impl DdpgHooks for DefaultDdpgHooks {
    fn init_hook(&mut self) -> bool {
        self.stop.is_stopped()
    }

    fn post_cycle_hook(&mut self, _state: &RunState) -> bool {
        self.stop.is_stopped()
    }

    fn post_epoch_hook(&mut self, state: &RunState, stats: &ReducedStats) -> bool {
        tracing::info!(
            epoch = state.epoch,
            steps = state.total_steps,
            episodes = state.episodes,
            "epoch done, return history {:.2}",
            stats.get("rollout/return_history").unwrap_or(f64::NAN)
        );
        self.stop.is_stopped()
    }

    fn shutdown_hook(&mut self) -> Result<()> {
        Ok(())
    }
}
