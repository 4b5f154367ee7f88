use super::{Link, StarCluster};
use crate::{error::ClusterError, ipc::Packet};
use anyhow::Result;
use crossbeam::channel::{Receiver, Sender, unbounded};

/// In-process link, used to run several workers as threads of one process.
pub struct ChannelLink {
    tx: Sender<Packet>,
    rx: Receiver<Packet>,
}

impl ChannelLink {
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = unbounded();
        let (b_tx, a_rx) = unbounded();
        (Self { tx: a_tx, rx: a_rx }, Self { tx: b_tx, rx: b_rx })
    }
}

impl Link for ChannelLink {
    fn send(&mut self, packet: Packet) -> Result<()> {
        self.tx
            .send(packet)
            .map_err(|_| ClusterError::Disconnected)?;
        Ok(())
    }

    fn receive(&mut self) -> Result<Packet> {
        let packet = self.rx.recv().map_err(|_| ClusterError::Disconnected)?;
        Ok(packet)
    }
}

/// Builds `world_size` connected workers, ordered by rank. Move each one into its own thread.
pub fn thread_cluster(world_size: usize) -> Vec<StarCluster<ChannelLink>> {
    let mut leader_ends = Vec::with_capacity(world_size.saturating_sub(1));
    let mut followers = Vec::with_capacity(world_size.saturating_sub(1));
    for rank in 1..world_size {
        let (leader_end, follower_end) = ChannelLink::pair();
        leader_ends.push(leader_end);
        followers.push((rank, follower_end));
    }
    let mut workers = vec![StarCluster::leader(leader_ends)];
    for (rank, link) in followers {
        workers.push(StarCluster {
            rank,
            world_size,
            role: super::Role::Follower { leader: link },
        });
    }
    workers
}

#[cfg(test)]
mod test {
    use super::thread_cluster;
    use crate::cluster::Cluster;
    use crate::error::ClusterError;
    use std::thread;

    #[test]
    fn ranks_are_assigned_in_order() {
        let workers = thread_cluster(3);
        let ranks: Vec<_> = workers.iter().map(|w| w.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
        assert!(workers.iter().all(|w| w.world_size() == 3));
        assert!(workers[0].is_leader() && !workers[2].is_leader());
    }

    #[test]
    fn sums_over_all_workers() {
        let sums: Vec<Vec<f64>> = thread::scope(|s| {
            let handles: Vec<_> = thread_cluster(3)
                .into_iter()
                .map(|mut worker| {
                    s.spawn(move || {
                        let rank = worker.rank() as f64;
                        worker.allreduce_sum(&[rank, 1.]).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(sums.iter().all(|s| s == &vec![3., 3.]));
    }

    #[test]
    fn length_mismatch_aborts_every_worker() {
        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = thread_cluster(2)
                .into_iter()
                .map(|mut worker| {
                    s.spawn(move || {
                        let values = vec![0.; 2 + worker.rank()];
                        worker.allreduce_sum(&values).map_err(|e| e.to_string())
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(results.iter().all(|r| r.is_err()));
    }

    #[test]
    fn hung_up_leader_is_reported() {
        let mut workers = thread_cluster(2);
        let mut follower = workers.pop().unwrap();
        drop(workers);
        let err = follower.allreduce_sum(&[1.]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClusterError>(),
            Some(ClusterError::Disconnected)
        ));
    }
}
