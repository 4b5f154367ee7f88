use super::{action::ActionScaler, rollout::EnvSlot, run_state::RunState};
use crate::{agents::DdpgAgent, env::Env, stats::epoch_stats::EvalAccumulator};
use anyhow::Result;

/// Runs the greedy policy against the evaluation environment. Nothing it sees reaches the replay
/// memory.
pub struct EvalDriver {
    pub nb_eval_steps: usize,
    pub render: bool,
}

impl EvalDriver {
    pub fn run<E: Env, A: DdpgAgent>(
        &self,
        slot: &mut EnvSlot<E>,
        agent: &mut A,
        scaler: &ActionScaler,
        state: &mut RunState,
        acc: &mut EvalAccumulator,
    ) -> Result<()> {
        for _ in 0..self.nb_eval_steps {
            let (action, q) = agent.pi(&slot.obs, false, true)?;
            let scaled = scaler.scale(&action)?;
            let outcome = slot.env.step(&scaled)?;
            if self.render {
                slot.env.render()?;
            }
            slot.tracker.step(outcome.reward);
            acc.steps += 1;
            if let Some(q) = q {
                acc.qs.push(q as f64);
            }
            let done = outcome.done();
            slot.obs = outcome.observation;
            if done {
                let finished = slot.tracker.finish();
                acc.episode_rewards.push(finished.reward);
                state.eval_episodes += 1;
                slot.obs = slot.env.reset()?;
            }
        }
        Ok(())
    }
}
