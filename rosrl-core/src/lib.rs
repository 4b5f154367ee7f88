pub mod agents;
pub mod cluster;
pub mod ddpg;
pub mod env;
pub mod episode;
pub mod error;
pub mod ipc;
pub mod logger;
pub mod stats;

use anyhow::Result;

/// A learning algorithm. Currently only `Ddpg` implements this trait, it hands back a summary of
/// the finished run.
pub trait Algorithm {
    type Summary;

    fn train(&mut self) -> Result<Self::Summary>;
}
