pub mod channel_link;
pub mod socket_link;

pub use channel_link::{ChannelLink, thread_cluster};
pub use socket_link::SocketLink;

use crate::{error::ClusterError, ipc::Packet};
use anyhow::Result;

/// The process group a worker belongs to. Rank 0 is the leader, the only worker allowed to log
/// and to write files.
pub trait Cluster {
    fn rank(&self) -> usize;

    fn world_size(&self) -> usize;

    fn is_leader(&self) -> bool {
        self.rank() == 0
    }

    /// Element-wise sum of `values` over all workers. Blocks until every worker has called it,
    /// so it doubles as the epoch barrier.
    fn allreduce_sum(&mut self, values: &[f64]) -> Result<Vec<f64>>;
}

/// A single worker. Reductions hand the local values back.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalCluster;

impl Cluster for LocalCluster {
    fn rank(&self) -> usize {
        0
    }

    fn world_size(&self) -> usize {
        1
    }

    fn allreduce_sum(&mut self, values: &[f64]) -> Result<Vec<f64>> {
        Ok(values.to_vec())
    }
}

/// A bidirectional packet connection between the leader and one follower.
pub trait Link {
    fn send(&mut self, packet: Packet) -> Result<()>;

    fn receive(&mut self) -> Result<Packet>;
}

enum Role<L: Link> {
    // followers[i] is rank i + 1
    Leader { followers: Vec<L> },
    Follower { leader: L },
}

/// Star topology reduction: followers send their values to the leader, the leader sums them in
/// rank order and sends the result back.
pub struct StarCluster<L: Link> {
    rank: usize,
    world_size: usize,
    role: Role<L>,
}

impl<L: Link> StarCluster<L> {
    pub fn leader(followers: Vec<L>) -> Self {
        Self {
            rank: 0,
            world_size: followers.len() + 1,
            role: Role::Leader { followers },
        }
    }

    pub fn follower(rank: usize, world_size: usize, leader: L) -> Result<Self> {
        if rank == 0 || rank >= world_size {
            return Err(ClusterError::InvalidRank { rank, world_size }.into());
        }
        Ok(Self {
            rank,
            world_size,
            role: Role::Follower { leader },
        })
    }

    fn abort_all(followers: &mut [L], reason: &str) {
        for link in followers.iter_mut() {
            // followers that already hung up do not need to hear about it
            let _ = link.send(Packet::Abort {
                reason: reason.to_owned(),
            });
        }
    }

    fn gather(followers: &mut [L], values: &[f64]) -> Result<Vec<f64>> {
        let mut sums = values.to_vec();
        for (idx, link) in followers.iter_mut().enumerate() {
            let rank = idx + 1;
            match link.receive()? {
                Packet::Reduce { values } if values.len() == sums.len() => {
                    for (sum, value) in sums.iter_mut().zip(values) {
                        *sum += value;
                    }
                }
                Packet::Reduce { values } => {
                    return Err(ClusterError::LengthMismatch {
                        rank,
                        expected: sums.len(),
                        got: values.len(),
                    }
                    .into());
                }
                other => return Err(ClusterError::UnexpectedPacket(format!("{other:?}")).into()),
            }
        }
        Ok(sums)
    }
}

impl<L: Link> Cluster for StarCluster<L> {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn allreduce_sum(&mut self, values: &[f64]) -> Result<Vec<f64>> {
        match &mut self.role {
            Role::Leader { followers } => {
                let sums = match Self::gather(followers, values) {
                    Ok(sums) => sums,
                    Err(err) => {
                        Self::abort_all(followers, &err.to_string());
                        return Err(err);
                    }
                };
                for link in followers.iter_mut() {
                    link.send(Packet::Reduced {
                        values: sums.clone(),
                    })?;
                }
                Ok(sums)
            }
            Role::Follower { leader } => {
                leader.send(Packet::Reduce {
                    values: values.to_vec(),
                })?;
                match leader.receive()? {
                    Packet::Reduced { values: sums } if sums.len() == values.len() => Ok(sums),
                    Packet::Reduced { values: sums } => Err(ClusterError::LengthMismatch {
                        rank: 0,
                        expected: values.len(),
                        got: sums.len(),
                    }
                    .into()),
                    Packet::Abort { reason } => Err(ClusterError::Aborted(reason).into()),
                    other => Err(ClusterError::UnexpectedPacket(format!("{other:?}")).into()),
                }
            }
        }
    }
}
