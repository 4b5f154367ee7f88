use crate::stats::StatValue;
use anyhow::Result;
use candle_core::Tensor;
use std::collections::BTreeMap;

/// Stats an agent reports about itself (normalizer moments, noise scale, ...).
pub type AgentStats = BTreeMap<String, StatValue>;

/// One recorded environment step. The action is the agent's normalized `[-1, 1]` action.
#[derive(Debug, Clone)]
pub struct Transition {
    pub observation: Tensor,
    pub action: Tensor,
    pub reward: f32,
    pub next_observation: Tensor,
    pub done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Losses {
    pub critic: f32,
    pub actor: f32,
}

/// The actor-critic learner driven by the DDPG loop. It owns its replay memory, exploration
/// noise and target networks, the loop only sequences the calls.
pub trait DdpgAgent {
    /// Prepares networks and optimizers, called once before the first rollout.
    fn initialize(&mut self) -> Result<()>;

    /// Picks an action for `observation` in the normalized action range, optionally with the
    /// critic's estimate for it.
    fn pi(
        &mut self,
        observation: &Tensor,
        apply_noise: bool,
        compute_q: bool,
    ) -> Result<(Tensor, Option<f32>)>;

    /// One optimization step over a sampled batch.
    fn train(&mut self) -> Result<Losses>;

    fn store_transition(&mut self, transition: Transition) -> Result<()>;

    /// Number of transitions currently held in replay memory.
    fn memory_len(&self) -> usize;

    /// Recalibrates the parameter noise, returns the measured action distance.
    fn adapt_param_noise(&mut self) -> Result<f32>;

    /// Soft update of the target networks.
    fn update_target_net(&mut self) -> Result<()>;

    /// Resets per-episode state such as the action noise process.
    fn reset(&mut self) -> Result<()>;

    fn get_stats(&mut self) -> Result<AgentStats>;
}
