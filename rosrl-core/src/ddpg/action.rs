use crate::{env::Space, error::TrainingError};
use anyhow::Result;
use candle_core::{DType, Tensor};

/// Maps the agent's `[-1, 1]` actions onto a symmetric, bounded action space.
#[derive(Debug, Clone)]
pub struct ActionScaler {
    max_action: Tensor,
    shape: Vec<usize>,
}

impl ActionScaler {
    /// Fails unless `space` is continuous, bounded and symmetric (`|low| == high`).
    pub fn new(space: &Space) -> Result<Self> {
        let Space::Continuous { low, high, shape } = space else {
            return Err(TrainingError::UnsupportedActionSpace(format!("{space:?}")).into());
        };
        let (Some(low), Some(high)) = (low, high) else {
            return Err(TrainingError::UnboundedActionSpace.into());
        };
        for bound in [low, high] {
            if bound.dims() != shape.as_slice() {
                return Err(TrainingError::BoundsShapeMismatch {
                    declared: shape.clone(),
                    bounds: bound.dims().to_vec(),
                }
                .into());
            }
        }
        let low_values = low.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
        let high_values = high.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
        let symmetric = low_values
            .iter()
            .zip(&high_values)
            .all(|(l, h)| l.abs() == *h);
        if !symmetric {
            return Err(TrainingError::AsymmetricActionSpace {
                low: low_values,
                high: high_values,
            }
            .into());
        }
        Ok(Self {
            max_action: high.clone(),
            shape: shape.clone(),
        })
    }

    pub fn max_action(&self) -> &Tensor {
        &self.max_action
    }

    /// Shape check first, a mismatch means the agent was built for another environment.
    pub fn check_shape(&self, action: &Tensor) -> Result<(), TrainingError> {
        if action.dims() != self.shape.as_slice() {
            return Err(TrainingError::ActionShapeMismatch {
                expected: self.shape.clone(),
                got: action.dims().to_vec(),
            });
        }
        Ok(())
    }

    pub fn scale(&self, action: &Tensor) -> Result<Tensor> {
        self.check_shape(action)?;
        let max_action = self.max_action.to_dtype(action.dtype())?;
        Ok(action.mul(&max_action)?)
    }
}
