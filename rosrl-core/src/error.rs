use thiserror::Error;

/// Failures raised by the training loop itself. Environment and agent errors travel as
/// `anyhow::Error` untouched, these are the ones the loop decides on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrainingError {
    #[error("ddpg needs a continuous action space, got {0}")]
    UnsupportedActionSpace(String),

    #[error("action space must be bounded on both sides")]
    UnboundedActionSpace,

    #[error("action bounds have shape {bounds:?}, action space declares {declared:?}")]
    BoundsShapeMismatch {
        declared: Vec<usize>,
        bounds: Vec<usize>,
    },

    #[error("action space must be symmetric, got low {low:?} and high {high:?}")]
    AsymmetricActionSpace { low: Vec<f32>, high: Vec<f32> },

    #[error("action has shape {got:?}, action space expects {expected:?}")]
    ActionShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("expected a scalar for stat `{key}`, got {value:?}")]
    NonScalarStat { key: String, value: Vec<f64> },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failures of the collective reduction transport.
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("rank {rank} is out of range for a world of size {world_size}")]
    InvalidRank { rank: usize, world_size: usize },

    #[error("rank {rank} joined twice")]
    DuplicateRank { rank: usize },

    #[error("rank {rank} sent {got} values, expected {expected}")]
    LengthMismatch {
        rank: usize,
        expected: usize,
        got: usize,
    },

    #[error("reduction aborted by the leader: {0}")]
    Aborted(String),

    #[error("unexpected packet: {0}")]
    UnexpectedPacket(String),

    #[error("peer disconnected")]
    Disconnected,

    #[error("could not reach the leader at `{socket_name}` within {waited_ms}ms")]
    ConnectTimeout { socket_name: String, waited_ms: u128 },
}
