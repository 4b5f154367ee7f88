use super::run_state::RunState;
use crate::{agents::DdpgAgent, stats::epoch_stats::TrainAccumulator};
use anyhow::Result;

pub struct TrainingDriver {
    pub nb_train_steps: usize,
    pub batch_size: usize,
    pub param_noise_adaption_interval: usize,
}

impl TrainingDriver {
    /// Runs `nb_train_steps` optimization steps. Any error from the agent ends the run, the step
    /// counter is never rolled back.
    pub fn run<A: DdpgAgent>(
        &self,
        agent: &mut A,
        state: &mut RunState,
        acc: &mut TrainAccumulator,
    ) -> Result<()> {
        for _ in 0..self.nb_train_steps {
            if self.should_adapt(agent.memory_len(), state.train_steps) {
                let distance = agent.adapt_param_noise()?;
                acc.adaptive_distances.push(distance as f64);
            }
            let losses = agent.train()?;
            acc.critic_losses.push(losses.critic as f64);
            acc.actor_losses.push(losses.actor as f64);
            agent.update_target_net()?;
            state.train_steps += 1;
        }
        Ok(())
    }

    /// `train_steps` counts optimization steps over the whole run, not within the cycle and not
    /// environment steps. With `nb_train_steps` a multiple of the interval the cadence is the
    /// same as counting per cycle.
    fn should_adapt(&self, memory_len: usize, train_steps: usize) -> bool {
        memory_len >= self.batch_size && train_steps % self.param_noise_adaption_interval == 0
    }
}
