use crate::error::TrainingError;
use serde::{Deserialize, Serialize};

/// Loop shape of a DDPG run. Agent hyperparameters live with the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DdpgConfig {
    pub nb_epochs: usize,
    pub nb_epoch_cycles: usize,
    pub nb_rollout_steps: usize,
    pub nb_train_steps: usize,
    pub nb_eval_steps: usize,
    pub batch_size: usize,
    pub param_noise_adaption_interval: usize,
    /// Capacity of the rolling episode return history, for training and evaluation alike.
    pub history_len: usize,
    pub render: bool,
    pub render_eval: bool,
    /// Base seed, every worker offsets it by `1_000_000 * rank`.
    pub seed: Option<u64>,
}

impl Default for DdpgConfig {
    fn default() -> Self {
        Self {
            nb_epochs: 500,
            nb_epoch_cycles: 20,
            nb_rollout_steps: 100,
            nb_train_steps: 50,
            nb_eval_steps: 100,
            batch_size: 64,
            param_noise_adaption_interval: 50,
            history_len: 100,
            render: false,
            render_eval: false,
            seed: None,
        }
    }
}

impl DdpgConfig {
    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.param_noise_adaption_interval == 0 {
            return Err(TrainingError::InvalidConfig(
                "param_noise_adaption_interval must be positive".into(),
            ));
        }
        if self.history_len == 0 {
            return Err(TrainingError::InvalidConfig(
                "history_len must be positive".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(TrainingError::InvalidConfig(
                "batch_size must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Offsets the base seed by `1_000_000 * rank`, wrapping around on overflow.
    pub fn worker_seed(&self, rank: usize) -> Option<u64> {
        self.seed
            .map(|seed| seed.wrapping_add(1_000_000u64.wrapping_mul(rank as u64)))
    }
}
