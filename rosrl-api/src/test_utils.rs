use anyhow::{Result, bail};
use candle_core::{DType, Device, Tensor};
use rosrl_core::{
    agents::{AgentStats, DdpgAgent, Losses, Transition},
    env::{Env, EnvState, EnvironmentDescription, Snapshot, Space, StepOutcome},
    logger::TabularSink,
};
use std::{
    cell::Cell,
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Pays a reward of 1 every step and truncates the episode every `episode_len` steps.
pub struct FixedRewardEnv {
    pub obs_dim: usize,
    pub high: Vec<f32>,
    pub low: Vec<f32>,
    pub episode_len: usize,
    pub with_snapshot: bool,
    pub t: usize,
    pub steps: usize,
    pub resets: usize,
    pub renders: usize,
    pub seed: Option<u64>,
    pub last_action: Option<Vec<f32>>,
    pub snapshots_taken: Cell<usize>,
}

impl FixedRewardEnv {
    pub fn new(episode_len: usize) -> Self {
        Self {
            obs_dim: 3,
            high: vec![2., 2.],
            low: vec![-2., -2.],
            episode_len,
            with_snapshot: false,
            t: 0,
            steps: 0,
            resets: 0,
            renders: 0,
            seed: None,
            last_action: None,
            snapshots_taken: Cell::new(0),
        }
    }

    pub fn with_snapshot(mut self) -> Self {
        self.with_snapshot = true;
        self
    }

    pub fn with_bounds(mut self, low: Vec<f32>, high: Vec<f32>) -> Self {
        self.low = low;
        self.high = high;
        self
    }

    fn observation(&self) -> Result<Tensor> {
        Ok(Tensor::full(self.t as f32, self.obs_dim, &Device::Cpu)?)
    }
}

impl Snapshot for FixedRewardEnv {
    fn get_state(&self) -> Result<EnvState> {
        self.snapshots_taken.set(self.snapshots_taken.get() + 1);
        EnvState::pickle(&(self.t, self.steps))
    }
}

impl Env for FixedRewardEnv {
    fn reset(&mut self) -> Result<Tensor> {
        self.t = 0;
        self.resets += 1;
        self.observation()
    }

    fn step(&mut self, action: &Tensor) -> Result<StepOutcome> {
        self.last_action = Some(action.to_dtype(DType::F32)?.to_vec1()?);
        self.t += 1;
        self.steps += 1;
        Ok(StepOutcome {
            observation: self.observation()?,
            reward: 1.,
            terminated: false,
            truncated: self.t == self.episode_len,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        let bound = |values: &[f32]| Tensor::new(values, &Device::Cpu).ok();
        EnvironmentDescription::new(
            Space::continuous_from_dims(vec![self.obs_dim]),
            Space::Continuous {
                low: bound(&self.low),
                high: bound(&self.high),
                shape: vec![self.high.len()],
            },
        )
    }

    fn render(&mut self) -> Result<()> {
        self.renders += 1;
        Ok(())
    }

    fn seed(&mut self, seed: u64) {
        self.seed = Some(seed);
    }

    fn snapshot(&self) -> Option<&dyn Snapshot> {
        if self.with_snapshot { Some(self) } else { None }
    }
}

/// Always proposes the same action and counts every call the loop makes.
pub struct ScriptedAgent {
    pub action: Vec<f32>,
    pub q: f32,
    pub stats: AgentStats,
    pub memory: Vec<Transition>,
    pub initialized: bool,
    pub noisy_actions: usize,
    pub greedy_actions: usize,
    pub train_steps: usize,
    pub target_syncs: usize,
    pub adaptations: usize,
    pub resets: usize,
    pub fail_train_at: Option<usize>,
}

impl ScriptedAgent {
    pub fn new(action: Vec<f32>) -> Self {
        Self {
            action,
            q: 0.5,
            stats: AgentStats::new(),
            memory: vec![],
            initialized: false,
            noisy_actions: 0,
            greedy_actions: 0,
            train_steps: 0,
            target_syncs: 0,
            adaptations: 0,
            resets: 0,
            fail_train_at: None,
        }
    }
}

impl DdpgAgent for ScriptedAgent {
    fn initialize(&mut self) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn pi(
        &mut self,
        _observation: &Tensor,
        apply_noise: bool,
        compute_q: bool,
    ) -> Result<(Tensor, Option<f32>)> {
        if apply_noise {
            self.noisy_actions += 1;
        } else {
            self.greedy_actions += 1;
        }
        let action = Tensor::new(self.action.as_slice(), &Device::Cpu)?;
        Ok((action, compute_q.then_some(self.q)))
    }

    fn train(&mut self) -> Result<Losses> {
        if self.fail_train_at == Some(self.train_steps) {
            bail!("critic diverged");
        }
        self.train_steps += 1;
        Ok(Losses {
            critic: 2.,
            actor: -1.,
        })
    }

    fn store_transition(&mut self, transition: Transition) -> Result<()> {
        self.memory.push(transition);
        Ok(())
    }

    fn memory_len(&self) -> usize {
        self.memory.len()
    }

    fn adapt_param_noise(&mut self) -> Result<f32> {
        self.adaptations += 1;
        Ok(0.1)
    }

    fn update_target_net(&mut self) -> Result<()> {
        self.target_syncs += 1;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.resets += 1;
        Ok(())
    }

    fn get_stats(&mut self) -> Result<AgentStats> {
        Ok(self.stats.clone())
    }
}

/// Keeps every dumped row in memory.
#[derive(Default)]
pub struct MemorySink {
    pub dir: Option<PathBuf>,
    pub rows: Vec<BTreeMap<String, f64>>,
    pub recorded_keys: Vec<String>,
    row: BTreeMap<String, f64>,
}

impl MemorySink {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            dir: Some(dir.to_owned()),
            ..Default::default()
        }
    }

    pub fn last_row(&self) -> Option<&BTreeMap<String, f64>> {
        self.rows.last()
    }
}

impl TabularSink for MemorySink {
    fn record_tabular(&mut self, key: &str, value: f64) {
        self.recorded_keys.push(key.to_owned());
        self.row.insert(key.to_owned(), value);
    }

    fn dump_tabular(&mut self) -> Result<()> {
        self.rows.push(std::mem::take(&mut self.row));
        Ok(())
    }

    fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}
