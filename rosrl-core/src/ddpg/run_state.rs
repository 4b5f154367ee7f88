use std::time::Instant;

/// Counters of one worker's run, handed by `&mut` to every driver instead of living in loop
/// locals.
#[derive(Debug, Clone)]
pub struct RunState {
    pub epoch: usize,
    pub cycle: usize,
    /// Environment steps taken by the rollout driver.
    pub total_steps: usize,
    /// Optimization steps taken by the training driver.
    pub train_steps: usize,
    pub episodes: usize,
    pub eval_episodes: usize,
    /// Sum of all rollout rewards.
    pub total_reward: f64,
    pub started: Instant,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            epoch: 0,
            cycle: 0,
            total_steps: 0,
            train_steps: 0,
            episodes: 0,
            eval_episodes: 0,
            total_reward: 0.,
            started: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub fn steps_per_second(&self) -> f64 {
        self.total_steps as f64 / self.elapsed_secs()
    }

    /// `1 - mean reward per step`, the value hyperparameter searches minimize.
    pub fn optim_metric(&self) -> f64 {
        if self.total_steps == 0 {
            return f64::NAN;
        }
        1. - self.total_reward / self.total_steps as f64
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
