pub mod action;
pub mod config;
pub mod evaluation;
pub mod hooks;
pub mod rollout;
pub mod run_state;
pub mod snapshot;
pub mod training;

pub use action::ActionScaler;
pub use config::DdpgConfig;
pub use evaluation::EvalDriver;
pub use hooks::{DdpgHooks, DefaultDdpgHooks, StopSignal};
pub use rollout::{EnvSlot, RolloutDriver};
pub use run_state::RunState;
pub use snapshot::{ENV_STATE_FILE, EVAL_ENV_STATE_FILE, persist_snapshot};
pub use training::TrainingDriver;

use crate::{
    Algorithm,
    agents::DdpgAgent,
    cluster::Cluster,
    env::Env,
    logger::TabularSink,
    stats::{
        EpochAccumulator, EpochStats, EvalStats, RolloutStats, StatReducer, TotalStats, TrainStats,
    },
};
use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingSummary {
    /// Epochs whose statistics were reduced and logged.
    pub epochs: usize,
    pub total_steps: usize,
    pub episodes: usize,
    pub optim_metric: f64,
}

/// The DDPG epoch loop: per cycle a rollout, a training phase and an optional evaluation, per
/// epoch a single cross-worker reduction followed by logging and snapshots on the leader.
///
/// Stopping is collective. A hook asking to stop ends this worker's cycles, the worker still
/// joins the epoch's reduction with a stop vote, and every worker ends the run once any vote is
/// seen. That epoch is dropped. A stop requested by `post_epoch_hook` is voted on during the
/// next epoch's reduction, which then runs no cycles on the stopping worker.
pub struct Ddpg<E: Env, A: DdpgAgent, C: Cluster, S: TabularSink, H: DdpgHooks> {
    pub config: DdpgConfig,
    pub env: E,
    pub eval_env: Option<E>,
    pub agent: A,
    pub cluster: C,
    pub sink: S,
    pub hooks: H,
}

impl<E: Env, A: DdpgAgent, C: Cluster, S: TabularSink, H: DdpgHooks> Algorithm
    for Ddpg<E, A, C, S, H>
{
    type Summary = TrainingSummary;

    fn train(&mut self) -> Result<TrainingSummary> {
        let Self {
            config,
            env,
            eval_env,
            agent,
            cluster,
            sink,
            hooks,
        } = self;
        config.validate()?;
        let is_leader = cluster.is_leader();
        let scaler = ActionScaler::new(&env.env_description().action_space)?;
        if is_leader {
            tracing::info!("scaling actions by {} before executing in env", scaler.max_action());
        }
        if let Some(seed) = config.worker_seed(cluster.rank()) {
            env.seed(seed);
            if let Some(eval_env) = eval_env.as_mut() {
                eval_env.seed(seed);
            }
        }
        agent.initialize()?;
        agent.reset()?;
        let mut slot = EnvSlot::reset(env, config.history_len)?;
        let mut eval_slot = eval_env
            .as_mut()
            .map(|eval_env| EnvSlot::reset(eval_env, config.history_len))
            .transpose()?;

        let rollout = RolloutDriver {
            nb_rollout_steps: config.nb_rollout_steps,
            render: config.render && is_leader,
        };
        let training = TrainingDriver {
            nb_train_steps: config.nb_train_steps,
            batch_size: config.batch_size,
            param_noise_adaption_interval: config.param_noise_adaption_interval,
        };
        let evaluation = EvalDriver {
            nb_eval_steps: config.nb_eval_steps,
            render: config.render_eval,
        };

        let mut state = RunState::new();
        let mut completed_epochs = 0;
        // a local stop only ends this worker's cycles, the epoch reduction decides for everyone
        let mut stop_vote = hooks.init_hook();
        for epoch in 0..config.nb_epochs {
            state.epoch = epoch;
            let mut acc = EpochAccumulator::default();
            for cycle in 0..config.nb_epoch_cycles {
                if stop_vote {
                    break;
                }
                state.cycle = cycle;
                rollout.run(&mut slot, agent, &scaler, &mut state, &mut acc.rollout)?;
                training.run(agent, &mut state, &mut acc.train)?;
                if let Some(eval_slot) = eval_slot.as_mut() {
                    evaluation.run(eval_slot, agent, &scaler, &mut state, &mut acc.eval)?;
                }
                stop_vote = hooks.post_cycle_hook(&state);
            }

            let stats = EpochStats {
                agent: agent.get_stats()?,
                rollout: RolloutStats::from_accumulator(&acc.rollout, slot.tracker.history_mean()),
                train: TrainStats::from_accumulator(&acc.train),
                eval: eval_slot
                    .as_ref()
                    .map(|s| EvalStats::from_accumulator(&acc.eval, s.tracker.history_mean())),
                total: TotalStats {
                    duration: state.elapsed_secs(),
                    steps_per_second: state.steps_per_second(),
                    episodes: state.episodes as f64,
                },
            };
            let (mut reduced, stop) =
                StatReducer::reduce_with_stop_vote(cluster, &stats.entries()?, stop_vote)?;
            // an epoch some worker cut short is neither logged nor snapshotted
            if stop {
                break;
            }
            reduced.insert("total/epochs".to_owned(), (epoch + 1) as f64);
            reduced.insert("total/steps".to_owned(), state.total_steps as f64);
            completed_epochs += 1;

            if is_leader {
                for (key, value) in reduced.iter() {
                    sink.record_tabular(key, *value);
                }
                sink.dump_tabular()?;
                if let Some(dir) = sink.dir() {
                    persist_snapshot(&*slot.env, dir, ENV_STATE_FILE);
                    if let Some(eval_slot) = eval_slot.as_ref() {
                        persist_snapshot(&*eval_slot.env, dir, EVAL_ENV_STATE_FILE);
                    }
                }
            }
            stop_vote = hooks.post_epoch_hook(&state, &reduced);
        }
        hooks.shutdown_hook()?;
        Ok(TrainingSummary {
            epochs: completed_epochs,
            total_steps: state.total_steps,
            episodes: state.episodes,
            optim_metric: state.optim_metric(),
        })
    }
}
