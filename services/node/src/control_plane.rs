//! The Service API (spec §6): the operations collaborators call to drive
//! a node's lifecycle, membership, and client-data streams. Each method
//! here is a thin orchestration layer over the library crates — none of
//! them reimplement SWIM, Raft, or chunking, they just wire those pieces
//! together the way a running node must.

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use mesh_consensus::{gate_proposal, AckQuorumPolicy, DsgEntry, McgEntry};
use mesh_core::model::{JoinPolicy, Mesh, MeshStatus, Node, NodeState, QosClass, RaftGroupMeta, Stream};
use mesh_crypto::KeyScope;
use mesh_events::MeshEvent;
use mesh_protocol::payload::{HealthState, ManagementData};
use mesh_protocol::{ManagementPayload, ManagementSubType, Message, MessageType, Priority};
use mesh_streams::{chunk_payload, StreamPublisher};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::error::NodeError;
use crate::fanout::fanout_management;
use crate::state::{AppState, JoinWaiter};

/// How long `join_mesh` waits for the introducer to admit the node
/// before giving up (§4.7 "Join").
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

fn now_unix_s() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock is before the unix epoch").as_secs() as i64
}

impl AppState {
    /// Creates the mesh identity, becomes the sole MCG member and leader,
    /// and marks the node online (§4.7 "Seed").
    pub async fn seed_mesh(
        self: &Arc<Self>,
        mesh_id: impl Into<String>,
        name: impl Into<String>,
        join_policy: JoinPolicy,
        join_key_digest: Option<String>,
    ) -> Result<(), NodeError> {
        let mesh = Mesh::seed(mesh_id, name, join_policy, join_key_digest);
        *self.mesh.write().await = Some(mesh);

        let node = Node::new(self.node_id.clone(), &self.config.listen_addr, Vec::new());
        self.node_repo.put(node).await?;

        {
            let mut mcg = self.mcg.lock().await;
            mcg.start_election();
            mcg.become_leader_if_majority(1, 1);
        }
        self.raft_group_repo
            .put(RaftGroupMeta::mcg("mcg", vec![self.node_id.clone()]))
            .await?;

        self.online.store(true, Ordering::SeqCst);
        self.event_bus.publish(MeshEvent::NodeJoined { node_id: self.node_id.clone() });
        self.event_bus.publish(MeshEvent::LeaderElected {
            group_id: "mcg".to_owned(),
            leader_id: self.node_id.clone(),
        });
        Ok(())
    }

    /// Sends a `NodeDiscovery` join request to `introducer_id` over an
    /// already-established link (dialing and authenticating that link is
    /// the transport layer's job, wired before this is called) and waits
    /// for its reply: the rest of the known membership, relayed as
    /// `NodeDiscovery` messages, followed by an MCG `ConfigChange`
    /// admitting this node (§4.7 "Join"). This node starts as an MCG
    /// follower — it did not win an election, the introducer already
    /// holds leadership — so no leader state is fabricated here. Returns
    /// `NodeError::Transport` if the introducer never admits the request
    /// within `JOIN_TIMEOUT`.
    pub async fn join_mesh(
        self: &Arc<Self>,
        introducer_id: impl Into<String>,
        introducer_addr: impl Into<String>,
        mesh_id: impl Into<String>,
        name: impl Into<String>,
        join_policy: JoinPolicy,
    ) -> Result<(), NodeError> {
        let introducer_id = introducer_id.into();
        let introducer_addr = introducer_addr.into();
        let mesh_id = mesh_id.into();
        let name = name.into();

        let request = ManagementPayload {
            sub_type: ManagementSubType::NodeDiscovery,
            data: ManagementData::NodeDiscovery {
                node_id: self.node_id.clone(),
                mesh_id: mesh_id.clone(),
                address: self.config.listen_addr.clone(),
                capabilities: Vec::new(),
                metadata: Default::default(),
            },
        };
        let body = serde_json::to_vec(&request).map_err(|_| NodeError::Transport("failed to encode join request".to_owned()))?;
        let header = self.framer.header(MessageType::Management, introducer_id.clone(), Priority::High, 30);
        let frame = Message::new(header, body)
            .to_frame()
            .map_err(|_| NodeError::Transport("failed to frame join request".to_owned()))?;

        let (members_tx, mut members_rx) = mpsc::unbounded_channel();
        let (admitted_tx, mut admitted_rx) = oneshot::channel();
        *self.join_waiter.lock().await = Some(Arc::new(JoinWaiter {
            members_tx,
            admitted_tx: tokio::sync::Mutex::new(Some(admitted_tx)),
        }));

        if let Err(err) = self.link_registry.send_to(&introducer_id, Priority::High, frame) {
            *self.join_waiter.lock().await = None;
            return Err(NodeError::Transport(format!("failed to send join request to {introducer_id}: {err}")));
        }

        let mut members = Vec::new();
        let admitted = tokio::time::timeout(JOIN_TIMEOUT, async {
            loop {
                tokio::select! {
                    received = members_rx.recv() => match received {
                        Some(node) => members.push(node),
                        None => return false,
                    },
                    _ = &mut admitted_rx => return true,
                }
            }
        })
        .await
        .unwrap_or(false);
        *self.join_waiter.lock().await = None;

        if !admitted {
            return Err(NodeError::Transport(format!("introducer {introducer_id} did not admit the join request")));
        }

        let mesh = Mesh::seed(mesh_id, name, join_policy, None);
        *self.mesh.write().await = Some(mesh);

        for node in members {
            self.node_repo.put(node).await?;
        }
        self.node_repo.put(Node::new(introducer_id.clone(), introducer_addr, Vec::new())).await?;
        self.node_repo.put(Node::new(self.node_id.clone(), &self.config.listen_addr, Vec::new())).await?;
        self.raft_group_repo
            .put(RaftGroupMeta::mcg("mcg", vec![self.node_id.clone(), introducer_id.clone()]))
            .await?;

        self.swim.lock().await.record_join(introducer_id.clone(), "", 0);
        self.online.store(true, Ordering::SeqCst);
        self.event_bus.publish(MeshEvent::NodeJoined { node_id: self.node_id.clone() });
        self.recompute_mesh_status().await?;
        Ok(())
    }

    pub async fn start_mesh(self: &Arc<Self>) -> Result<(), NodeError> {
        self.online.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Stops accepting new work; in-flight Raft applies and the outbox
    /// drainer are expected to finish their current batch before the
    /// caller tears down the process (graceful shutdown, main.rs).
    pub async fn stop_mesh(self: &Arc<Self>) -> Result<(), NodeError> {
        self.online.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Cooperative departure: an MCG config-change requiring quorum
    /// (§4.7 "Leave / Evict").
    pub async fn leave_mesh(self: &Arc<Self>) -> Result<(), NodeError> {
        self.propose_membership_change(self.node_id.clone(), false).await?;
        self.node_repo.remove(&self.node_id).await?;
        self.online.store(false, Ordering::SeqCst);
        self.event_bus.publish(MeshEvent::NodeLeft { node_id: self.node_id.clone() });
        Ok(())
    }

    /// Removes a dead or uncooperative node. The only mutation admitted
    /// while the mesh is `critical` (§4.5 "Degradation").
    pub async fn evict_node(self: &Arc<Self>, node_id: &str) -> Result<(), NodeError> {
        let entry = McgEntry::EvictNode { node_id: node_id.to_owned() };
        self.propose_mcg(entry).await?;
        self.node_repo.remove(node_id).await?;
        self.link_registry.remove(node_id);
        self.event_bus.publish(MeshEvent::NodeDead { node_id: node_id.to_owned() });
        self.recompute_mesh_status().await?;
        Ok(())
    }

    async fn propose_membership_change(&self, node_id: String, joining: bool) -> Result<(), NodeError> {
        self.propose_mcg(McgEntry::MembershipChange { node_id, joining }).await.map(|_| ())
    }

    /// Appends `entry` to the MCG log, gated by critical-mode rules and
    /// requiring this node currently holds leadership (§4.5, §4.7).
    pub async fn propose_mcg(&self, entry: McgEntry) -> Result<u64, NodeError> {
        gate_proposal(&entry, self.is_critical().await)?;
        let mcg = self.mcg.lock().await;
        if !mcg.is_leader() {
            return Err(NodeError::ConsensusUnavailable);
        }
        Ok(mcg.propose(entry).await?)
    }

    /// Registers a link to `peer_id` in the link registry. The actual
    /// socket handshake (dial or accept) is driven by `services/node`'s
    /// transport wiring; this records the resulting send-queue handle so
    /// the rest of the control plane can address the peer.
    pub fn add_link(&self, peer_id: impl Into<String>, sender: mesh_transport::PriorityQueueSender) {
        let peer_id = peer_id.into();
        self.link_registry.register(peer_id.clone(), sender);
        self.event_bus.publish(MeshEvent::LinkUp { a: self.node_id.clone(), b: peer_id });
    }

    pub fn drop_link(&self, peer_id: &str) {
        self.link_registry.remove(peer_id);
        self.event_bus.publish(MeshEvent::LinkDown {
            a: self.node_id.clone(),
            b: peer_id.to_owned(),
        });
    }

    /// Proposes a `SystemUpdate` MCG entry and, once the propose
    /// succeeds, fans it out to every currently linked peer (§4.7
    /// "Mesh-wide updates").
    pub async fn send_mesh_update(&self, payload: Vec<u8>) -> Result<u64, NodeError> {
        let sealed = mesh_crypto::seal(self.keyring.as_ref(), &KeyScope::Mesh, &payload).await?;
        let index = self.propose_mcg(McgEntry::SystemUpdate { payload: sealed }).await?;
        fanout_management(
            self,
            ManagementPayload {
                sub_type: ManagementSubType::HealthStatus,
                data: ManagementData::HealthStatus {
                    node_id: self.node_id.clone(),
                    status: HealthState::Healthy,
                    metrics: data_map(&[("kind", "system_update"), ("mcg_index", &index.to_string())]),
                },
            },
        );
        Ok(index)
    }

    pub async fn send_internal_db_update(&self, payload: Vec<u8>) -> Result<u64, NodeError> {
        let sealed = mesh_crypto::seal(self.keyring.as_ref(), &KeyScope::Mesh, &payload).await?;
        let index = self.propose_mcg(McgEntry::InternalDbUpdate { payload: sealed }).await?;
        Ok(index)
    }

    /// Opens a client-data stream: forms a DSG over source+targets and
    /// registers it with the stream repo (§4.6 "Stream identity").
    pub async fn open_client_data_stream(
        &self,
        stream_id: impl Into<String>,
        tenant_id: impl Into<String>,
        dst_set: Vec<String>,
        qos: QosClass,
        priority: u8,
    ) -> Result<String, NodeError> {
        let stream_id = stream_id.into();
        let stream = Stream::new(stream_id.clone(), tenant_id, self.node_id.clone(), dst_set.clone(), qos, priority);
        self.stream_repo.put(stream).await?;

        let mut members: HashSet<String> = dst_set.into_iter().collect();
        members.insert(self.node_id.clone());
        self.raft_group_repo
            .put(RaftGroupMeta::dsg(stream_id.clone(), self.node_id.clone(), members.iter().cloned().collect()))
            .await?;

        let mut dsg_guard = self.dsg.lock().await;
        let mut handle = self.new_dsg(&stream_id, members.clone(), AckQuorumPolicy::AllOfSet);
        handle.raft.start_election();
        handle.raft.become_leader_if_majority(1, members.len());
        dsg_guard.insert(stream_id.clone(), handle);
        drop(dsg_guard);

        self.stream_publishers
            .lock()
            .await
            .insert(stream_id.clone(), StreamPublisher::new(stream_id.clone(), self.stream_manager_config()));

        self.event_bus.publish(MeshEvent::StreamOpened { stream_id: stream_id.clone() });
        Ok(stream_id)
    }

    pub async fn close_client_data_stream(&self, stream_id: &str) -> Result<(), NodeError> {
        self.dsg.lock().await.remove(stream_id);
        self.stream_publishers.lock().await.remove(stream_id);
        self.raft_group_repo.remove(stream_id).await?;
        self.stream_repo.remove(stream_id).await?;
        self.event_bus.publish(MeshEvent::StreamClosed { stream_id: stream_id.to_owned() });
        Ok(())
    }

    /// Publish path steps 1-3 (§4.6): admit into the outbox (enforcing
    /// the backpressure window), chunk with CRC32C, append a
    /// `ChunkAdmit` entry to the DSG. Step 4 (forwarding once the commit
    /// lands) is the router/transport's job once the chunk-admit entry
    /// is durable.
    pub async fn publish_client_data(&self, stream_id: &str, msg_id: impl Into<String>, payload: Vec<u8>) -> Result<u64, NodeError> {
        let msg_id = msg_id.into();
        let tenant_id = self.stream_repo.get(stream_id).await?.tenant_id;
        let sealed = mesh_crypto::seal(self.keyring.as_ref(), &KeyScope::Tenant(tenant_id), &payload).await?;

        let stream_seq = {
            let mut publishers = self.stream_publishers.lock().await;
            let publisher = publishers.get_mut(stream_id).ok_or_else(|| NodeError::UnknownStream(stream_id.to_owned()))?;
            publisher.admit(msg_id.clone(), sealed.clone())?
        };

        let chunks = chunk_payload(stream_id, &msg_id, stream_seq, &sealed, self.config.credit_window.byte_capacity.min(16_384) as usize);

        let mut dsg_guard = self.dsg.lock().await;
        let handle = dsg_guard.get_mut(stream_id).ok_or_else(|| NodeError::UnknownStream(stream_id.to_owned()))?;
        if !handle.raft.is_leader() {
            return Err(NodeError::NotLeader("dsg"));
        }
        for _chunk in &chunks {
            handle
                .raft
                .propose(DsgEntry::ChunkAdmit {
                    stream_id: stream_id.to_owned(),
                    msg_id: msg_id.clone(),
                    stream_seq,
                })
                .await?;
        }
        Ok(stream_seq)
    }

    /// A target reports processed-ack for `(stream_id, msg_id)`; once the
    /// required member set has all acked, prune the source outbox and
    /// advance `committed_seq` (§4.6 step 7, §8 property 4).
    pub async fn record_processed_ack(&self, stream_id: &str, msg_id: &str, member: &str, stream_seq: u64) -> Result<bool, NodeError> {
        let mut dsg_guard = self.dsg.lock().await;
        let handle = dsg_guard.get_mut(stream_id).ok_or_else(|| NodeError::UnknownStream(stream_id.to_owned()))?;

        handle
            .raft
            .propose(DsgEntry::ProcessedAck {
                stream_id: stream_id.to_owned(),
                msg_id: msg_id.to_owned(),
                member: member.to_owned(),
            })
            .await
            .ok();

        let tracker = handle.ack_trackers.entry(msg_id.to_owned()).or_default();
        tracker.record_ack(member.to_owned());
        let committed = tracker.is_committed(&handle.required_members, handle.policy);
        drop(dsg_guard);

        if committed {
            if let Some(publisher) = self.stream_publishers.lock().await.get_mut(stream_id) {
                publisher.mark_processed_and_prune(msg_id);
            }
            let mut stream = self.stream_repo.get(stream_id).await?;
            stream.advance_committed(member, stream_seq);
            self.stream_repo.put(stream).await?;
        }
        Ok(committed)
    }

    pub async fn get_mesh_status(&self) -> MeshStatusReport {
        let mesh = self.mesh.read().await.clone();
        let nodes = self.node_repo.list().await.unwrap_or_default();
        let mcg = self.mcg.lock().await;
        MeshStatusReport {
            mesh_id: mesh.as_ref().map(|m| m.mesh_id.clone()),
            status: mesh.map(|m| m.status).unwrap_or(MeshStatus::Active),
            online: self.online.load(Ordering::SeqCst),
            node_count: nodes.len(),
            online_node_count: nodes.iter().filter(|n| n.state == NodeState::Alive).count(),
            mcg_term: mcg.term(),
            mcg_is_leader: mcg.is_leader(),
        }
    }

    pub fn watch_mesh_events(&self) -> broadcast::Receiver<MeshEvent> {
        self.event_bus.subscribe()
    }

    /// Recomputes `Mesh::status` from the SWIM-reachable fraction of
    /// known nodes, publishing a `MeshStatusChanged` event on change
    /// (§3 "status derived from reachable-fraction").
    pub async fn recompute_mesh_status(&self) -> Result<(), NodeError> {
        let nodes = self.node_repo.list().await?;
        let swim = self.swim.lock().await;
        let reachable = nodes.iter().filter(|n| swim.member(&n.node_id).is_none() || matches!(swim.member(&n.node_id), Some(m) if m.state == mesh_membership::MemberState::Alive)).count();
        drop(swim);
        let new_status = Mesh::status_for_reachable_fraction(reachable, nodes.len().max(1));

        let mut mesh_guard = self.mesh.write().await;
        if let Some(mesh) = mesh_guard.as_mut() {
            if mesh.status != new_status {
                mesh.status = new_status;
                let status_label = format!("{new_status:?}").to_lowercase();
                drop(mesh_guard);
                self.event_bus.publish(MeshEvent::MeshStatusChanged { status: status_label });
            }
        }
        Ok(())
    }

    pub fn now_unix_s(&self) -> i64 {
        now_unix_s()
    }
}

pub struct MeshStatusReport {
    pub mesh_id: Option<String>,
    pub status: MeshStatus,
    pub online: bool,
    pub node_count: usize,
    pub online_node_count: usize,
    pub mcg_term: u64,
    pub mcg_is_leader: bool,
}

fn data_map(pairs: &[(&str, &str)]) -> serde_json::Map<String, serde_json::Value> {
    pairs.iter().map(|(k, v)| ((*k).to_owned(), serde_json::Value::String((*v).to_owned()))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn test_state(node_id: &str) -> Arc<AppState> {
        let toml = format!("node_id = \"{node_id}\"\n[mesh]\nmesh_id = \"m1\"\n");
        AppState::new(load_config_from_str(&toml).unwrap())
    }

    #[tokio::test]
    async fn seeding_makes_the_node_the_sole_online_member_and_leader() {
        let state = test_state("node-a");
        state.seed_mesh("m1", "mesh one", JoinPolicy::KeyRequired, Some("digest".to_owned())).await.unwrap();
        let status = state.get_mesh_status().await;
        assert_eq!(status.online_node_count, 1);
        assert!(status.mcg_is_leader);
    }

    #[tokio::test]
    async fn opening_a_stream_registers_a_leader_dsg_and_publisher() {
        let state = test_state("node-a");
        state.seed_mesh("m1", "mesh one", JoinPolicy::Open, None).await.unwrap();
        let stream_id = state
            .open_client_data_stream("s1", "tenant-1", vec!["node-b".to_owned()], QosClass::Bulk, 0)
            .await
            .unwrap();
        let dsg = state.dsg.lock().await;
        assert!(dsg.get(&stream_id).unwrap().raft.is_leader());
    }

    #[tokio::test]
    async fn publish_then_single_member_ack_commits_and_prunes_outbox() {
        let state = test_state("node-a");
        state.seed_mesh("m1", "mesh one", JoinPolicy::Open, None).await.unwrap();
        let stream_id = state
            .open_client_data_stream("s1", "tenant-1", vec!["node-b".to_owned()], QosClass::Bulk, 0)
            .await
            .unwrap();
        state.publish_client_data(&stream_id, "msg-1", b"hello".to_vec()).await.unwrap();
        let committed = state.record_processed_ack(&stream_id, "msg-1", "node-b", 1).await.unwrap();
        assert!(committed);
        let publishers = state.stream_publishers.lock().await;
        assert!(publishers.get(&stream_id).unwrap().is_outbox_empty());
    }

    #[tokio::test]
    async fn critical_mode_blocks_non_eviction_mesh_updates() {
        let state = test_state("node-a");
        state.seed_mesh("m1", "mesh one", JoinPolicy::Open, None).await.unwrap();
        {
            let mut mesh = state.mesh.write().await;
            mesh.as_mut().unwrap().status = MeshStatus::Critical;
        }
        let err = state.send_mesh_update(b"payload".to_vec()).await.unwrap_err();
        assert!(matches!(err, NodeError::CriticalMode(_)));
    }

    #[tokio::test]
    async fn evict_node_is_admitted_even_while_critical() {
        let state = test_state("node-a");
        state.seed_mesh("m1", "mesh one", JoinPolicy::Open, None).await.unwrap();
        state.node_repo.put(Node::new("node-b", "10.0.0.2:7000", vec![])).await.unwrap();
        {
            let mut mesh = state.mesh.write().await;
            mesh.as_mut().unwrap().status = MeshStatus::Critical;
        }
        state.evict_node("node-b").await.unwrap();
        assert!(state.node_repo.get("node-b").await.is_err());
    }
}
