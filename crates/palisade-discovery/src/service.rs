//! Discovery service: announce self, collect peers, emit roster snapshots.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};

use palisade_identity::{decode_public_key, Advertisement, ParticipantId};

use crate::error::Result;

/// Discovery configuration.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Address the discovery socket binds to.
    pub bind: SocketAddr,
    /// Where announcements go: peer discovery addresses or a broadcast
    /// address. An empty list makes the node a passive seed.
    pub announce_to: Vec<SocketAddr>,
    /// Announcement interval.
    pub interval: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:7777".parse().unwrap(),
            announce_to: vec!["255.255.255.255:7777".parse().unwrap()],
            interval: Duration::from_millis(1000),
        }
    }
}

/// Handle for stopping a running discovery service.
#[derive(Debug)]
pub struct DiscoveryHandle {
    shutdown: Arc<Notify>,
}

impl DiscoveryHandle {
    /// Stop announcing and listening.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

/// UDP discovery service.
///
/// Owns the socket and the known-peer map. [`spawn`] moves the service
/// into a background task; the caller keeps a [`DiscoveryHandle`] and the
/// snapshot channel.
///
/// [`spawn`]: DiscoveryService::spawn
pub struct DiscoveryService {
    socket: UdpSocket,
    local_addr: SocketAddr,
    config: DiscoveryConfig,
}

impl DiscoveryService {
    /// Bind the discovery socket.
    ///
    /// Goes through socket2 so reuse-address and broadcast are set before
    /// the bind, then converts to a tokio socket.
    pub fn bind(config: DiscoveryConfig) -> Result<Self> {
        let domain = if config.bind.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_broadcast(true)?;
        socket.bind(&config.bind.into())?;
        socket.set_nonblocking(true)?;

        let std_socket: std::net::UdpSocket = socket.into();
        let socket = UdpSocket::from_std(std_socket)?;
        let local_addr = socket.local_addr()?;

        info!("Discovery socket bound to {}", local_addr);

        Ok(Self {
            socket,
            local_addr,
            config,
        })
    }

    /// Address the discovery socket actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start the announce/listen loop in a background task.
    ///
    /// Returns a shutdown handle plus the snapshot channel. The first
    /// snapshot, containing just the local advertisement, is emitted
    /// immediately; a new one follows every time the known set changes.
    pub fn spawn(
        self,
        advert: Advertisement,
    ) -> Result<(DiscoveryHandle, mpsc::Receiver<Vec<Advertisement>>)> {
        let payload = serde_json::to_vec(&advert)?;
        let (snapshot_tx, snapshot_rx) = mpsc::channel(16);
        let shutdown = Arc::new(Notify::new());
        let handle = DiscoveryHandle {
            shutdown: Arc::clone(&shutdown),
        };

        tokio::spawn(async move {
            self.run(advert, payload, snapshot_tx, shutdown).await;
        });

        Ok((handle, snapshot_rx))
    }

    async fn run(
        self,
        advert: Advertisement,
        payload: Vec<u8>,
        snapshots: mpsc::Sender<Vec<Advertisement>>,
        shutdown: Arc<Notify>,
    ) {
        let own_pid = advert.pid();
        let mut known: HashMap<ParticipantId, Advertisement> = HashMap::new();
        let mut sources: HashMap<ParticipantId, SocketAddr> = HashMap::new();
        known.insert(own_pid.clone(), advert);
        Self::emit(&known, &snapshots).await;

        let mut announce = tokio::time::interval(self.config.interval);
        let mut buf = [0u8; 2048];

        loop {
            tokio::select! {
                _ = announce.tick() => {
                    for addr in &self.config.announce_to {
                        if let Err(e) = self.socket.send_to(&payload, addr).await {
                            debug!("Announce to {} failed: {}", addr, e);
                        }
                    }
                }
                recv = self.socket.recv_from(&mut buf) => {
                    match recv {
                        Ok((len, src)) => {
                            match serde_json::from_slice::<Advertisement>(&buf[..len]) {
                                Ok(peer) => {
                                    self.handle_advert(
                                        peer, src, &own_pid,
                                        &mut known, &mut sources, &snapshots,
                                    )
                                    .await;
                                }
                                Err(e) => {
                                    warn!(
                                        "Undecodable advertisement from {} ({} bytes): {}",
                                        src, len, e
                                    );
                                }
                            }
                        }
                        Err(e) => {
                            warn!("Discovery recv error: {}", e);
                        }
                    }
                }
                _ = shutdown.notified() => {
                    info!("Discovery service stopping");
                    break;
                }
            }
        }
    }

    /// Absorb a peer advertisement and gossip it onward.
    ///
    /// When the known set changes, the newcomer's advertisement is
    /// forwarded to everyone heard from so far and the newcomer is caught
    /// up with the full set, then a fresh snapshot goes out.
    async fn handle_advert(
        &self,
        peer: Advertisement,
        src: SocketAddr,
        own_pid: &ParticipantId,
        known: &mut HashMap<ParticipantId, Advertisement>,
        sources: &mut HashMap<ParticipantId, SocketAddr>,
        snapshots: &mpsc::Sender<Vec<Advertisement>>,
    ) {
        let pid = peer.pid();
        if pid == *own_pid {
            return;
        }
        if decode_public_key(&peer.public_key).is_err() {
            warn!("Dropping advertisement from {} with invalid key", src);
            return;
        }

        let changed = known.get(&pid) != Some(&peer);
        sources.insert(pid.clone(), src);
        if !changed {
            return;
        }

        debug!("Discovered {} via {}", pid, src);
        known.insert(pid.clone(), peer.clone());

        // Forward the newcomer to everyone already heard from.
        if let Ok(bytes) = serde_json::to_vec(&peer) {
            for (other, addr) in sources.iter() {
                if *other != pid {
                    if let Err(e) = self.socket.send_to(&bytes, addr).await {
                        debug!("Forward to {} failed: {}", addr, e);
                    }
                }
            }
        }

        // Catch the newcomer up with the full set.
        for existing in known.values() {
            if let Ok(bytes) = serde_json::to_vec(existing) {
                if let Err(e) = self.socket.send_to(&bytes, src).await {
                    debug!("Catch-up to {} failed: {}", src, e);
                }
            }
        }

        Self::emit(known, snapshots).await;
    }

    async fn emit(
        known: &HashMap<ParticipantId, Advertisement>,
        snapshots: &mpsc::Sender<Vec<Advertisement>>,
    ) {
        let roster: Vec<Advertisement> = known.values().cloned().collect();
        if snapshots.send(roster).await.is_err() {
            debug!("Snapshot receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_identity::KeyMaterial;
    use tokio::sync::mpsc::Receiver;

    fn loopback_config(announce_to: Vec<SocketAddr>) -> DiscoveryConfig {
        DiscoveryConfig {
            bind: "127.0.0.1:0".parse().unwrap(),
            announce_to,
            interval: Duration::from_millis(50),
        }
    }

    fn advert_for(port: u16, seed: u8) -> Advertisement {
        Advertisement {
            host: "127.0.0.1".to_string(),
            port,
            public_key: KeyMaterial::from_seed([seed; 32]).public_key_bytes(),
        }
    }

    async fn wait_for_roster(
        rx: &mut Receiver<Vec<Advertisement>>,
        size: usize,
    ) -> Vec<Advertisement> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let snapshot = rx.recv().await.expect("snapshot channel closed");
                if snapshot.len() == size {
                    return snapshot;
                }
            }
        })
        .await
        .expect("roster never converged")
    }

    #[tokio::test]
    async fn seed_and_peer_converge() {
        let seed = DiscoveryService::bind(loopback_config(vec![])).unwrap();
        let seed_addr = seed.local_addr();
        let peer = DiscoveryService::bind(loopback_config(vec![seed_addr])).unwrap();

        let (seed_handle, mut seed_rx) = seed.spawn(advert_for(9000, 1)).unwrap();
        let (peer_handle, mut peer_rx) = peer.spawn(advert_for(9001, 2)).unwrap();

        let seed_roster = wait_for_roster(&mut seed_rx, 2).await;
        let peer_roster = wait_for_roster(&mut peer_rx, 2).await;

        let mut seed_pids: Vec<String> =
            seed_roster.iter().map(|a| a.pid().to_string()).collect();
        let mut peer_pids: Vec<String> =
            peer_roster.iter().map(|a| a.pid().to_string()).collect();
        seed_pids.sort();
        peer_pids.sort();
        assert_eq!(seed_pids, peer_pids);
        assert!(seed_pids.contains(&"http://127.0.0.1:9000".to_string()));
        assert!(seed_pids.contains(&"http://127.0.0.1:9001".to_string()));

        // Shutdown closes the snapshot channel once buffered items drain.
        seed_handle.shutdown();
        peer_handle.shutdown();
        tokio::time::timeout(Duration::from_secs(5), async {
            while seed_rx.recv().await.is_some() {}
        })
        .await
        .expect("seed service did not stop");
    }

    #[tokio::test]
    async fn three_nodes_converge_through_one_seed() {
        let seed = DiscoveryService::bind(loopback_config(vec![])).unwrap();
        let seed_addr = seed.local_addr();
        let b = DiscoveryService::bind(loopback_config(vec![seed_addr])).unwrap();
        let c = DiscoveryService::bind(loopback_config(vec![seed_addr])).unwrap();

        let (_seed_handle, mut seed_rx) = seed.spawn(advert_for(9000, 1)).unwrap();
        let (_b_handle, mut b_rx) = b.spawn(advert_for(9001, 2)).unwrap();
        let (_c_handle, mut c_rx) = c.spawn(advert_for(9002, 3)).unwrap();

        wait_for_roster(&mut seed_rx, 3).await;
        wait_for_roster(&mut b_rx, 3).await;
        wait_for_roster(&mut c_rx, 3).await;
    }

    #[tokio::test]
    async fn garbage_and_bad_keys_are_skipped() {
        let service = DiscoveryService::bind(loopback_config(vec![])).unwrap();
        let addr = service.local_addr();
        let (_handle, mut rx) = service.spawn(advert_for(9000, 1)).unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"not json at all", addr).await.unwrap();

        // y = 2 is not on the curve, so these bytes never decompress.
        let mut not_a_point = [0u8; 32];
        not_a_point[0] = 2;
        let bad_key = Advertisement {
            host: "127.0.0.1".to_string(),
            port: 9009,
            public_key: not_a_point,
        };
        sender
            .send_to(&serde_json::to_vec(&bad_key).unwrap(), addr)
            .await
            .unwrap();

        sender
            .send_to(&serde_json::to_vec(&advert_for(9001, 2)).unwrap(), addr)
            .await
            .unwrap();

        let roster = wait_for_roster(&mut rx, 2).await;
        let pids: Vec<String> = roster.iter().map(|a| a.pid().to_string()).collect();
        assert!(pids.contains(&"http://127.0.0.1:9001".to_string()));
        assert!(!pids.contains(&"http://127.0.0.1:9009".to_string()));
    }
}
