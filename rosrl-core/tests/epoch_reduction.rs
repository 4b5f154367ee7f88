use anyhow::Result;
use rosrl_core::{
    agents::AgentStats,
    cluster::{Cluster, LocalCluster, thread_cluster},
    error::ClusterError,
    stats::{
        EpochAccumulator, EpochStats, ReducedStats, RolloutStats, StatReducer, StatValue,
        TotalStats, TrainStats,
    },
};
use std::thread;

fn worker_stats(rank: usize, with_agent_key: bool) -> Result<EpochStats> {
    let mut acc = EpochAccumulator::default();
    let episodes = rank + 1;
    for _ in 0..episodes {
        acc.rollout.episode_rewards.push(10. * episodes as f64);
        acc.rollout.episode_steps.push(10.);
    }
    acc.rollout.episodes = episodes;
    acc.rollout.actions = vec![-(episodes as f64), episodes as f64];
    acc.train.actor_losses = vec![1., 3.];
    acc.train.critic_losses = vec![rank as f64];
    let mut agent = AgentStats::new();
    if with_agent_key {
        agent.insert("param_noise_stddev".into(), StatValue::Vector(vec![0.2]));
    }
    Ok(EpochStats {
        agent,
        rollout: RolloutStats::from_accumulator(&acc.rollout, 10. * episodes as f64),
        train: TrainStats::from_accumulator(&acc.train),
        eval: None,
        total: TotalStats {
            duration: 1.,
            steps_per_second: 100.,
            episodes: episodes as f64,
        },
    })
}

fn reduce_on<C: Cluster>(mut cluster: C, with_agent_key: bool) -> Result<ReducedStats> {
    let stats = worker_stats(cluster.rank(), with_agent_key)?;
    StatReducer::reduce(&mut cluster, &stats.entries()?)
}

fn same_stats(a: &ReducedStats, b: &ReducedStats) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b.iter())
            .all(|((ka, va), (kb, vb))| ka == kb && va.to_bits() == vb.to_bits())
}

#[test]
fn single_worker_reduction_is_identity() -> Result<()> {
    let reduced = reduce_on(LocalCluster, true)?;
    assert_eq!(reduced.get("rollout/episodes"), Some(1.));
    assert_eq!(reduced.get("rollout/return"), Some(10.));
    assert_eq!(reduced.get("rollout/actions_std"), Some(1.));
    assert_eq!(reduced.get("train/loss_actor"), Some(2.));
    assert_eq!(reduced.get("param_noise_stddev"), Some(0.2));
    // empty accumulators reduce to NaN rather than failing
    assert!(reduced.get("rollout/Q_mean").unwrap().is_nan());
    Ok(())
}

#[test]
fn three_workers_agree_on_the_reduced_epoch() -> Result<()> {
    let reduced: Vec<ReducedStats> = thread::scope(|s| {
        let handles: Vec<_> = thread_cluster(3)
            .into_iter()
            .map(|cluster| s.spawn(move || reduce_on(cluster, true)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Result<_>>()
    })?;
    // empty accumulators reduce to NaN on every worker, so compare bit patterns
    for other in &reduced[1..] {
        assert!(same_stats(other, &reduced[0]));
    }
    assert!(reduced[0].get("rollout/Q_mean").unwrap().is_nan());
    let stats = &reduced[0];
    // sum kind
    assert_eq!(stats.get("rollout/episodes"), Some(6.));
    // mean kind, (10 + 20 + 30) / 3
    assert_eq!(stats.get("rollout/return"), Some(20.));
    // std kind is the mean of per-worker stds: (1 + 2 + 3) / 3
    assert_eq!(stats.get("rollout/actions_std"), Some(2.));
    assert_eq!(stats.get("train/loss_critic"), Some(1.));
    assert_eq!(stats.get("total/episodes"), Some(2.));
    Ok(())
}

#[test]
fn workers_with_different_keys_abort_together() -> Result<()> {
    let results: Vec<Result<ReducedStats>> = thread::scope(|s| {
        let handles: Vec<_> = thread_cluster(2)
            .into_iter()
            .map(|cluster| {
                let with_agent_key = cluster.rank() == 0;
                s.spawn(move || reduce_on(cluster, with_agent_key))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for result in results {
        let err = result.unwrap_err();
        assert!(err.downcast_ref::<ClusterError>().is_some(), "{err:#}");
    }
    Ok(())
}
