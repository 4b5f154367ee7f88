use super::{Link, StarCluster};
use crate::{
    error::ClusterError,
    ipc::{Packet, receive_packet, send_packet},
};
use anyhow::Result;
use interprocess::local_socket::{
    GenericNamespaced, ListenerOptions, Stream, ToNsName,
    traits::{ListenerExt, Stream as StreamTrait},
};
use std::{
    io::BufReader,
    thread,
    time::{Duration, Instant},
};

const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Link over a local socket, one OS process per worker.
pub struct SocketLink {
    conn: BufReader<Stream>,
}

impl Link for SocketLink {
    fn send(&mut self, packet: Packet) -> Result<()> {
        send_packet(self.conn.get_mut(), packet)
    }

    fn receive(&mut self) -> Result<Packet> {
        receive_packet(&mut self.conn)
    }
}

impl StarCluster<SocketLink> {
    /// Joins the process group rendezvousing on `socket_name`. Rank 0 listens and blocks until
    /// every other rank has connected, the others retry until `timeout` has passed.
    pub fn connect_socket(
        socket_name: &str,
        rank: usize,
        world_size: usize,
        timeout: Duration,
    ) -> Result<Self> {
        if rank >= world_size {
            return Err(ClusterError::InvalidRank { rank, world_size }.into());
        }
        if rank == 0 {
            Self::listen(socket_name, world_size)
        } else {
            let link = Self::dial(socket_name, rank, timeout)?;
            Self::follower(rank, world_size, link)
        }
    }

    fn listen(socket_name: &str, world_size: usize) -> Result<Self> {
        let name = socket_name.to_ns_name::<GenericNamespaced>()?;
        let listener = ListenerOptions::new().name(name).create_sync()?;
        let mut followers: Vec<Option<SocketLink>> = (1..world_size).map(|_| None).collect();
        for conn in listener.incoming().take(world_size - 1) {
            let mut link = SocketLink {
                conn: BufReader::new(conn?),
            };
            let rank = match link.receive()? {
                Packet::Hello { rank } => rank,
                other => return Err(ClusterError::UnexpectedPacket(format!("{other:?}")).into()),
            };
            if rank == 0 || rank >= world_size {
                return Err(ClusterError::InvalidRank { rank, world_size }.into());
            }
            let slot = &mut followers[rank - 1];
            if slot.is_some() {
                return Err(ClusterError::DuplicateRank { rank }.into());
            }
            *slot = Some(link);
            tracing::debug!(rank, "worker joined");
        }
        let followers = followers
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or(ClusterError::Disconnected)?;
        Ok(Self::leader(followers))
    }

    fn dial(socket_name: &str, rank: usize, timeout: Duration) -> Result<SocketLink> {
        let started = Instant::now();
        let conn = loop {
            let name = socket_name.to_ns_name::<GenericNamespaced>()?;
            match Stream::connect(name) {
                Ok(conn) => break conn,
                Err(_) if started.elapsed() < timeout => thread::sleep(RETRY_INTERVAL),
                Err(_) => {
                    return Err(ClusterError::ConnectTimeout {
                        socket_name: socket_name.to_owned(),
                        waited_ms: started.elapsed().as_millis(),
                    }
                    .into());
                }
            }
        };
        let mut link = SocketLink {
            conn: BufReader::new(conn),
        };
        link.send(Packet::Hello { rank })?;
        Ok(link)
    }
}

#[cfg(test)]
mod test {
    use crate::cluster::{Cluster, SocketLink, StarCluster};
    use crate::error::ClusterError;
    use std::{thread, time::Duration};

    #[test]
    fn reduces_over_local_sockets() {
        let socket_name = format!("rosrl-test-{}.sock", std::process::id());
        let sums: Vec<Vec<f64>> = thread::scope(|s| {
            let handles: Vec<_> = (0..3)
                .map(|rank| {
                    let socket_name = socket_name.clone();
                    s.spawn(move || {
                        let mut worker = StarCluster::<SocketLink>::connect_socket(
                            &socket_name,
                            rank,
                            3,
                            Duration::from_secs(10),
                        )
                        .unwrap();
                        assert_eq!(worker.rank(), rank);
                        let first = worker.allreduce_sum(&[rank as f64]).unwrap();
                        let second = worker.allreduce_sum(&[1., 2.]).unwrap();
                        assert_eq!(second, vec![3., 6.]);
                        first
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(sums.iter().all(|s| s == &vec![3.]));
    }

    #[test]
    fn follower_gives_up_without_a_leader() {
        let socket_name = format!("rosrl-missing-{}.sock", std::process::id());
        let err =
            StarCluster::<SocketLink>::connect_socket(&socket_name, 1, 2, Duration::from_millis(120))
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<ClusterError>(),
            Some(ClusterError::ConnectTimeout { .. })
        ));
    }
}
