use super::{ReduceOp, StatEntry};
use crate::cluster::Cluster;
use anyhow::Result;
use derive_more::{Deref, DerefMut};
use std::collections::BTreeMap;

/// Stats after cross-worker reduction, keyed and therefore iterated in lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Deref, DerefMut)]
pub struct ReducedStats(BTreeMap<String, f64>);

impl ReducedStats {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }
}

pub struct StatReducer;

impl StatReducer {
    /// Reduces `entries` across all workers of `cluster` with a single collective call. Every
    /// worker has to call this with the same keys in the same order, `EpochStats::entries`
    /// guarantees the order.
    pub fn reduce<C: Cluster + ?Sized>(
        cluster: &mut C,
        entries: &[StatEntry],
    ) -> Result<ReducedStats> {
        let local: Vec<f64> = entries.iter().map(|entry| entry.value).collect();
        let sums = cluster.allreduce_sum(&local)?;
        Ok(Self::combine(entries, sums, cluster.world_size()))
    }

    /// Same single collective call as `reduce`, with this worker's stop vote riding along as a
    /// trailing element. The returned flag is set when any worker voted to stop, so every worker
    /// comes to the same decision.
    pub fn reduce_with_stop_vote<C: Cluster + ?Sized>(
        cluster: &mut C,
        entries: &[StatEntry],
        stop: bool,
    ) -> Result<(ReducedStats, bool)> {
        let mut local: Vec<f64> = entries.iter().map(|entry| entry.value).collect();
        local.push(if stop { 1. } else { 0. });
        let mut sums = cluster.allreduce_sum(&local)?;
        let votes = sums.pop().unwrap_or_default();
        Ok((Self::combine(entries, sums, cluster.world_size()), votes > 0.))
    }

    fn combine(entries: &[StatEntry], sums: Vec<f64>, world_size: usize) -> ReducedStats {
        let world_size = world_size as f64;
        let reduced = entries
            .iter()
            .zip(sums)
            .map(|(entry, sum)| {
                let value = match entry.op {
                    ReduceOp::Sum => sum,
                    ReduceOp::Mean | ReduceOp::Std => sum / world_size,
                };
                (entry.key.clone(), value)
            })
            .collect();
        ReducedStats(reduced)
    }
}

#[cfg(test)]
mod test {
    use super::StatReducer;
    use crate::cluster::{Cluster, LocalCluster, thread_cluster};
    use crate::stats::{ReduceOp, StatEntry};
    use std::thread;

    fn entries(offset: f64) -> Vec<StatEntry> {
        vec![
            StatEntry::new("rollout/actions_std", 1. + offset, ReduceOp::Std),
            StatEntry::new("rollout/episodes", 3. + offset, ReduceOp::Sum),
            StatEntry::new("rollout/return", 10. + offset, ReduceOp::Mean),
        ]
    }

    #[test]
    fn single_worker_reduction_is_identity() -> anyhow::Result<()> {
        let mut cluster = LocalCluster;
        let local = entries(0.5);
        let reduced = StatReducer::reduce(&mut cluster, &local)?;
        for entry in &local {
            assert_eq!(reduced.get(&entry.key), Some(entry.value));
        }
        Ok(())
    }

    #[test]
    fn mean_sum_and_std_across_workers() -> anyhow::Result<()> {
        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = thread_cluster(2)
                .into_iter()
                .map(|mut cluster| {
                    s.spawn(move || {
                        let offset = cluster.rank() as f64 * 2.;
                        StatReducer::reduce(&mut cluster, &entries(offset))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for reduced in results {
            let reduced = reduced?;
            assert_eq!(reduced.get("rollout/return"), Some(11.));
            assert_eq!(reduced.get("rollout/episodes"), Some(8.));
            // mean of the per-worker stds, 1 and 3
            assert_eq!(reduced.get("rollout/actions_std"), Some(2.));
        }
        Ok(())
    }

    #[test]
    fn one_stop_vote_stops_everyone() -> anyhow::Result<()> {
        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = thread_cluster(3)
                .into_iter()
                .map(|mut cluster| {
                    s.spawn(move || {
                        let stop = cluster.rank() == 2;
                        StatReducer::reduce_with_stop_vote(&mut cluster, &entries(0.), stop)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for result in results {
            let (reduced, stop) = result?;
            assert!(stop);
            // the vote is not a stat
            assert_eq!(reduced.len(), 3);
            assert_eq!(reduced.get("rollout/episodes"), Some(9.));
        }
        let (_, stop) = StatReducer::reduce_with_stop_vote(&mut LocalCluster, &entries(0.), false)?;
        assert!(!stop);
        Ok(())
    }
}
