pub mod epoch_stats;
pub mod reducer;

pub use epoch_stats::{EpochAccumulator, EpochStats, EvalStats, RolloutStats, TotalStats, TrainStats};
pub use reducer::{ReducedStats, StatReducer};

use crate::error::TrainingError;

/// A value reported by an agent. Vectors are only accepted by the reducer when they hold
/// exactly one element.
#[derive(Debug, Clone, PartialEq)]
pub enum StatValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl StatValue {
    pub fn as_scalar(&self, key: &str) -> Result<f64, TrainingError> {
        match self {
            Self::Scalar(value) => Ok(*value),
            Self::Vector(values) if values.len() == 1 => Ok(values[0]),
            Self::Vector(values) => Err(TrainingError::NonScalarStat {
                key: key.to_owned(),
                value: values.clone(),
            }),
        }
    }
}

impl From<f64> for StatValue {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<f32> for StatValue {
    fn from(value: f32) -> Self {
        Self::Scalar(value as f64)
    }
}

impl From<Vec<f64>> for StatValue {
    fn from(values: Vec<f64>) -> Self {
        Self::Vector(values)
    }
}

/// How a stat is combined across workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Summed and divided by the world size.
    Mean,
    /// Summed.
    Sum,
    /// A local standard deviation, averaged across workers like `Mean`. This is not the pooled
    /// standard deviation of all samples.
    Std,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatEntry {
    pub key: String,
    pub value: f64,
    pub op: ReduceOp,
}

impl StatEntry {
    pub fn new(key: impl Into<String>, value: f64, op: ReduceOp) -> Self {
        Self {
            key: key.into(),
            value,
            op,
        }
    }
}

/// Mean of `values`, `NaN` when empty.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation of `values`, `NaN` when empty.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mean = mean(values);
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
