use super::{action::ActionScaler, run_state::RunState};
use crate::{
    agents::{DdpgAgent, Transition},
    env::Env,
    episode::EpisodeTracker,
    stats::epoch_stats::RolloutAccumulator,
};
use anyhow::Result;
use candle_core::{DType, Tensor};

/// An environment together with the observation it last returned and its running episode.
pub struct EnvSlot<'a, E: Env> {
    pub env: &'a mut E,
    pub obs: Tensor,
    pub tracker: EpisodeTracker,
}

impl<'a, E: Env> EnvSlot<'a, E> {
    pub fn reset(env: &'a mut E, history_len: usize) -> Result<Self> {
        let obs = env.reset()?;
        Ok(Self {
            env,
            obs,
            tracker: EpisodeTracker::new(history_len),
        })
    }
}

pub(crate) fn flat_values(tensor: &Tensor) -> Result<Vec<f64>> {
    Ok(tensor.to_dtype(DType::F64)?.flatten_all()?.to_vec1()?)
}

/// Collects experience with exploration noise on.
pub struct RolloutDriver {
    pub nb_rollout_steps: usize,
    /// Already resolved against the worker's rank.
    pub render: bool,
}

impl RolloutDriver {
    pub fn run<E: Env, A: DdpgAgent>(
        &self,
        slot: &mut EnvSlot<E>,
        agent: &mut A,
        scaler: &ActionScaler,
        state: &mut RunState,
        acc: &mut RolloutAccumulator,
    ) -> Result<()> {
        for _ in 0..self.nb_rollout_steps {
            let (action, q) = agent.pi(&slot.obs, true, true)?;
            let scaled = scaler.scale(&action)?;
            if self.render {
                slot.env.render()?;
            }
            let outcome = slot.env.step(&scaled)?;
            if self.render {
                slot.env.render()?;
            }
            let done = outcome.done();
            slot.tracker.step(outcome.reward);
            state.total_steps += 1;
            state.total_reward += outcome.reward as f64;

            acc.actions.extend(flat_values(&action)?);
            if let Some(q) = q {
                acc.qs.push(q as f64);
            }
            acc.step_rewards.push(outcome.reward as f64);

            agent.store_transition(Transition {
                observation: slot.obs.clone(),
                action,
                reward: outcome.reward,
                next_observation: outcome.observation.clone(),
                done,
            })?;
            acc.transitions += 1;
            slot.obs = outcome.observation;

            if done {
                let finished = slot.tracker.finish();
                tracing::debug!(
                    episode = state.episodes,
                    reward = finished.reward,
                    steps = finished.steps,
                    "episode finished"
                );
                acc.episode_rewards.push(finished.reward);
                acc.episode_steps.push(finished.steps as f64);
                acc.episodes += 1;
                state.episodes += 1;
                agent.reset()?;
                slot.obs = slot.env.reset()?;
            }
        }
        Ok(())
    }
}
