use super::{ReduceOp, StatEntry, mean, std_dev};
use crate::{agents::AgentStats, error::TrainingError};
use std::collections::BTreeMap;

/// Raw per-epoch observations of the rollout driver.
#[derive(Debug, Default)]
pub struct RolloutAccumulator {
    pub episode_rewards: Vec<f64>,
    pub episode_steps: Vec<f64>,
    pub episodes: usize,
    pub actions: Vec<f64>,
    pub qs: Vec<f64>,
    pub step_rewards: Vec<f64>,
    pub transitions: usize,
}

/// Raw per-epoch observations of the training driver.
#[derive(Debug, Default)]
pub struct TrainAccumulator {
    pub actor_losses: Vec<f64>,
    pub critic_losses: Vec<f64>,
    pub adaptive_distances: Vec<f64>,
}

/// Raw per-epoch observations of the evaluation driver.
#[derive(Debug, Default)]
pub struct EvalAccumulator {
    pub episode_rewards: Vec<f64>,
    pub qs: Vec<f64>,
    pub steps: usize,
}

/// Everything the drivers collect during one epoch. Rebuilt for every epoch.
#[derive(Debug, Default)]
pub struct EpochAccumulator {
    pub rollout: RolloutAccumulator,
    pub train: TrainAccumulator,
    pub eval: EvalAccumulator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RolloutStats {
    pub return_mean: f64,
    pub return_history: f64,
    pub episode_steps: f64,
    pub episodes: f64,
    pub actions_mean: f64,
    pub actions_std: f64,
    pub q_mean: f64,
    pub reward_mean: f64,
    pub reward_std: f64,
}

impl RolloutStats {
    pub fn from_accumulator(acc: &RolloutAccumulator, return_history: f64) -> Self {
        Self {
            return_mean: mean(&acc.episode_rewards),
            return_history,
            episode_steps: mean(&acc.episode_steps),
            episodes: acc.episodes as f64,
            actions_mean: mean(&acc.actions),
            actions_std: std_dev(&acc.actions),
            q_mean: mean(&acc.qs),
            reward_mean: mean(&acc.step_rewards),
            reward_std: std_dev(&acc.step_rewards),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainStats {
    pub loss_actor: f64,
    pub loss_critic: f64,
    pub param_noise_distance: f64,
}

impl TrainStats {
    pub fn from_accumulator(acc: &TrainAccumulator) -> Self {
        Self {
            loss_actor: mean(&acc.actor_losses),
            loss_critic: mean(&acc.critic_losses),
            param_noise_distance: mean(&acc.adaptive_distances),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalStats {
    pub return_mean: f64,
    pub return_history: f64,
    pub q_mean: f64,
    pub episodes: f64,
}

impl EvalStats {
    pub fn from_accumulator(acc: &EvalAccumulator, return_history: f64) -> Self {
        Self {
            return_mean: mean(&acc.episode_rewards),
            return_history,
            q_mean: mean(&acc.qs),
            episodes: acc.episode_rewards.len() as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TotalStats {
    pub duration: f64,
    pub steps_per_second: f64,
    pub episodes: f64,
}

/// The statistics of one epoch on one worker, before cross-worker reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochStats {
    pub agent: AgentStats,
    pub rollout: RolloutStats,
    pub train: TrainStats,
    pub eval: Option<EvalStats>,
    pub total: TotalStats,
}

impl EpochStats {
    /// Flattens the record into reducible entries, sorted by key. Built-in keys shadow agent
    /// keys of the same name. Fails on agent stats that do not coerce to a scalar.
    pub fn entries(&self) -> Result<Vec<StatEntry>, TrainingError> {
        let mut entries = BTreeMap::new();
        for (key, value) in &self.agent {
            let value = value.as_scalar(key)?;
            entries.insert(key.clone(), (value, ReduceOp::Mean));
        }
        let rollout = &self.rollout;
        let train = &self.train;
        let total = &self.total;
        let mut builtin = vec![
            ("rollout/return", rollout.return_mean, ReduceOp::Mean),
            ("rollout/return_history", rollout.return_history, ReduceOp::Mean),
            ("rollout/episode_steps", rollout.episode_steps, ReduceOp::Mean),
            ("rollout/episodes", rollout.episodes, ReduceOp::Sum),
            ("rollout/actions_mean", rollout.actions_mean, ReduceOp::Mean),
            ("rollout/actions_std", rollout.actions_std, ReduceOp::Std),
            ("rollout/Q_mean", rollout.q_mean, ReduceOp::Mean),
            ("rollout/reward_mean", rollout.reward_mean, ReduceOp::Mean),
            ("rollout/reward_std", rollout.reward_std, ReduceOp::Std),
            ("train/loss_actor", train.loss_actor, ReduceOp::Mean),
            ("train/loss_critic", train.loss_critic, ReduceOp::Mean),
            ("train/param_noise_distance", train.param_noise_distance, ReduceOp::Mean),
            ("total/duration", total.duration, ReduceOp::Mean),
            ("total/steps_per_second", total.steps_per_second, ReduceOp::Mean),
            ("total/episodes", total.episodes, ReduceOp::Mean),
        ];
        if let Some(eval) = &self.eval {
            builtin.extend([
                ("eval/return", eval.return_mean, ReduceOp::Mean),
                ("eval/return_history", eval.return_history, ReduceOp::Mean),
                ("eval/Q", eval.q_mean, ReduceOp::Mean),
                ("eval/episodes", eval.episodes, ReduceOp::Mean),
            ]);
        }
        for (key, value, op) in builtin {
            entries.insert(key.to_owned(), (value, op));
        }
        Ok(entries
            .into_iter()
            .map(|(key, (value, op))| StatEntry { key, value, op })
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::stats::StatValue;

    fn stats(agent: AgentStats, eval: Option<EvalStats>) -> EpochStats {
        let mut rollout = RolloutAccumulator::default();
        rollout.episode_rewards = vec![10., 20.];
        rollout.episode_steps = vec![10., 10.];
        rollout.episodes = 2;
        rollout.actions = vec![-1., 1.];
        EpochStats {
            agent,
            rollout: RolloutStats::from_accumulator(&rollout, 15.),
            train: TrainStats::from_accumulator(&TrainAccumulator::default()),
            eval,
            total: TotalStats {
                duration: 1.,
                steps_per_second: 20.,
                episodes: 2.,
            },
        }
    }

    #[test]
    fn entries_are_sorted_and_typed() -> anyhow::Result<()> {
        let entries = stats(AgentStats::new(), None).entries()?;
        let keys: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert!(keys.iter().all(|k| !k.starts_with("eval/")));
        let episodes = entries.iter().find(|e| e.key == "rollout/episodes").unwrap();
        assert_eq!(episodes.op, ReduceOp::Sum);
        assert_eq!(episodes.value, 2.);
        let actions_std = entries.iter().find(|e| e.key == "rollout/actions_std").unwrap();
        assert_eq!(actions_std.op, ReduceOp::Std);
        assert_eq!(actions_std.value, 1.);
        // no training happened, so the losses are the mean of nothing
        let loss = entries.iter().find(|e| e.key == "train/loss_actor").unwrap();
        assert!(loss.value.is_nan());
        Ok(())
    }

    #[test]
    fn eval_entries_only_with_eval_stats() -> anyhow::Result<()> {
        let eval = EvalStats::from_accumulator(
            &EvalAccumulator {
                episode_rewards: vec![3., 5.],
                qs: vec![1.],
                steps: 10,
            },
            4.,
        );
        let entries = stats(AgentStats::new(), Some(eval)).entries()?;
        let eval_keys: Vec<_> = entries
            .iter()
            .filter(|e| e.key.starts_with("eval/"))
            .map(|e| (e.key.as_str(), e.value))
            .collect();
        assert_eq!(
            eval_keys,
            vec![
                ("eval/Q", 1.),
                ("eval/episodes", 2.),
                ("eval/return", 4.),
                ("eval/return_history", 4.)
            ]
        );
        Ok(())
    }

    #[test]
    fn builtin_keys_shadow_agent_keys() -> anyhow::Result<()> {
        let mut agent = AgentStats::new();
        agent.insert("rollout/return".into(), StatValue::Scalar(-1.));
        agent.insert("reference_Q_mean".into(), StatValue::Vector(vec![0.5]));
        let entries = stats(agent, None).entries()?;
        let ret = entries.iter().find(|e| e.key == "rollout/return").unwrap();
        assert_eq!(ret.value, 15.);
        let q = entries.iter().find(|e| e.key == "reference_Q_mean").unwrap();
        assert_eq!((q.value, q.op), (0.5, ReduceOp::Mean));
        Ok(())
    }

    #[test]
    fn multi_element_agent_stat_is_rejected() {
        let mut agent = AgentStats::new();
        agent.insert("obs_rms_std".into(), StatValue::Vector(vec![1., 2., 3.]));
        let err = stats(agent, None).entries().unwrap_err();
        assert!(matches!(err, TrainingError::NonScalarStat { ref key, .. } if key == "obs_rms_std"));
    }
}
