use anyhow::Result;
use candle_core::Tensor;
use derive_more::{Deref, From, Into};
use serde::Serialize;

#[derive(Debug, Clone)]
pub enum Space {
    Discrete(usize),
    Continuous {
        low: Option<Tensor>,
        high: Option<Tensor>,
        shape: Vec<usize>,
    },
}

impl Space {
    pub fn continuous_from_dims(shape: Vec<usize>) -> Self {
        Self::Continuous {
            low: None,
            high: None,
            shape,
        }
    }

    /// A continuous space bounded by `[-high, high]`.
    pub fn symmetric(high: Tensor) -> Result<Self> {
        let low = high.neg()?;
        let shape = high.dims().to_vec();
        Ok(Self::Continuous {
            low: Some(low),
            high: Some(high),
            shape,
        })
    }

    pub fn size(&self) -> usize {
        match &self {
            Self::Discrete(size) => *size,
            Self::Continuous { shape, .. } => shape.iter().product(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentDescription {
    pub observation_space: Space,
    pub action_space: Space,
}

impl EnvironmentDescription {
    pub fn new(observation_space: Space, action_space: Space) -> Self {
        Self {
            observation_space,
            action_space,
        }
    }

    pub fn action_size(&self) -> usize {
        self.action_space.size()
    }

    pub fn observation_size(&self) -> usize {
        self.observation_space.size()
    }
}

pub struct StepOutcome {
    pub observation: Tensor,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
}

impl StepOutcome {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Opaque, already serialized environment state. Written to disk as is.
#[derive(Debug, Clone, PartialEq, Deref, From, Into)]
pub struct EnvState(Vec<u8>);

impl EnvState {
    /// Serializes `state` in the python pickle format, the format the `*.pkl` snapshot files
    /// have always been written in.
    pub fn pickle<T: Serialize>(state: &T) -> Result<Self> {
        let bytes = serde_pickle::to_vec(state, serde_pickle::SerOptions::new())?;
        Ok(Self(bytes))
    }
}

/// Environments that can hand out their internal state, e.g. a simulator's joint positions.
pub trait Snapshot {
    fn get_state(&self) -> Result<EnvState>;
}

pub trait Env {
    fn reset(&mut self) -> Result<Tensor>;

    fn step(&mut self, action: &Tensor) -> Result<StepOutcome>;

    fn env_description(&self) -> EnvironmentDescription;

    fn render(&mut self) -> Result<()> {
        Ok(())
    }

    fn seed(&mut self, _seed: u64) {}

    /// The snapshot capability, if this environment has one.
    fn snapshot(&self) -> Option<&dyn Snapshot> {
        None
    }
}
