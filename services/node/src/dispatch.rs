//! Inbound message dispatch. `mesh-transport::run_link_loop` already
//! frames, validates, and filters what it reads off a link — only
//! well-formed, unexpired, unthrottled `Message`s reach `inbound_tx`.
//! This module is what drains that channel: it routes each message by
//! `header.kind` into the membership, routing, consensus, or data
//! handling it needs.
//!
//! Consensus routing note: `ConsensusPayload` carries no `group_id`, so
//! a wire `consensus` message can't be demuxed between the node's one
//! MCG and any number of locally-held DSGs. Since there is exactly one
//! MCG per node, every wire consensus RPC is handled against the local
//! MCG `RaftNode`. DSG consensus is driven in-process by
//! `control_plane`'s stream operations rather than over the wire — a
//! small mesh's DSG membership changes rarely enough that this doesn't
//! need its own wire RPC path yet.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use mesh_consensus::raft::{AppendEntriesArgs, RequestVoteArgs};
use mesh_consensus::McgEntry;
use mesh_core::model::{Chunk, Lsa, Node};
use mesh_protocol::payload::{ConfigChangeType, ConnectionAction, ManagementData, TopologyAction};
use mesh_protocol::{ConsensusData, ConsensusPayload, ConsensusSubType, Message, MessageType};
use mesh_protocol::{ManagementPayload, ManagementSubType, RoutingPayload};
use mesh_transport::{ForwardingPlan, RouterPort};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::NodeError;
use crate::state::AppState;

/// Hop budget for store-and-forward `Data` traffic not addressed to this
/// node. There's no hop-count field on the wire header (expiry is
/// time-based, via `ttl_s`), so this only bounds the local route
/// computation, not how many times a message can actually traverse the
/// mesh — a stale or looping route still relies on header expiry to stop.
const MAX_FORWARD_HOPS: usize = 16;

/// Computes the next hop for `Data` traffic addressed elsewhere, from
/// this node's live link-state view (§4.2 "Forwarding"). Only `Data`
/// messages are routed multi-hop this way — heartbeat/management are
/// always addressed to an immediate link peer, routing LSAs are
/// reflooded rather than routed, and consensus RPCs are exchanged
/// directly between group members.
struct LsdbRouter<'a> {
    node_id: &'a str,
    graph: mesh_topology::routing::Graph,
}

impl RouterPort for LsdbRouter<'_> {
    fn plan_forward(&self, message: &Message) -> ForwardingPlan {
        let next_hops = mesh_topology::routing::shortest_path(&self.graph, self.node_id, &message.header.to, MAX_FORWARD_HOPS)
            .and_then(|path| path.next_hop_from(self.node_id).map(str::to_owned))
            .into_iter()
            .collect();
        ForwardingPlan { next_hops }
    }
}

/// Drains `inbound_rx` for the node's lifetime, dispatching each already
/// validated message by type. One handler failure never stops the loop —
/// a bad message from one peer must not take the rest of the mesh down
/// with it.
pub async fn run_dispatch_loop(state: Arc<AppState>, mut inbound_rx: mpsc::Receiver<Message>) {
    while let Some(message) = inbound_rx.recv().await {
        let from_peer = message.header.from.clone();
        let kind = message.header.kind;

        if kind == MessageType::Data && !message.header.to.is_empty() && message.header.to != state.node_id {
            if let Err(err) = forward_data(&state, &message).await {
                state.metrics.handler_failures.fetch_add(1, Ordering::Relaxed);
                warn!(peer = %from_peer, error = %err, "failed to forward transit data message");
            }
            continue;
        }

        let result = match kind {
            MessageType::Heartbeat => handle_heartbeat(&state, &from_peer).await,
            MessageType::Management => handle_management(&state, &message.payload).await,
            MessageType::Routing => handle_routing(&state, &from_peer, &message.payload).await,
            MessageType::Consensus => handle_consensus(&state, &message.payload).await,
            MessageType::Data => handle_data(&state, &message.payload).await,
        };
        if let Err(err) = result {
            state.metrics.handler_failures.fetch_add(1, Ordering::Relaxed);
            warn!(peer = %from_peer, kind = %kind, error = %err, "failed to handle inbound message");
        }
    }
}

/// Re-sends a `Data` message addressed to a node this isn't, one hop
/// closer via the live topology view, rather than attempting local
/// reassembly for a stream this node holds no DSG membership in.
async fn forward_data(state: &Arc<AppState>, message: &Message) -> Result<(), NodeError> {
    let graph = state.lsdb.read().await.adjacency_graph();
    let router = LsdbRouter { node_id: &state.node_id, graph };
    let plan = router.plan_forward(message);
    if plan.next_hops.is_empty() {
        return Err(NodeError::Transport(format!("no route to {}", message.header.to)));
    }
    let frame = message.to_frame().map_err(|_| NodeError::Transport("failed to re-frame transit message".to_owned()))?;
    for next_hop in plan.next_hops {
        state.link_registry.send_to(&next_hop, message.header.priority, frame.clone()).ok();
    }
    Ok(())
}

async fn handle_heartbeat(state: &Arc<AppState>, from: &str) -> Result<(), NodeError> {
    state.swim.lock().await.receive_alive(from, 0, "");
    Ok(())
}

async fn handle_management(state: &Arc<AppState>, payload: &[u8]) -> Result<(), NodeError> {
    let parsed: ManagementPayload = serde_json::from_slice(payload).map_err(|_| NodeError::Transport("malformed management payload".to_owned()))?;
    match parsed.data {
        ManagementData::NodeDiscovery { node_id, address, .. } => {
            let already_known = state.node_repo.get(&node_id).await.is_ok();
            state.node_repo.put(Node::new(node_id.clone(), address.clone(), Vec::new())).await?;
            state.swim.lock().await.record_join(node_id.clone(), address.clone(), 0);

            if let Some(waiter) = state.join_waiter.lock().await.as_ref() {
                waiter.members_tx.send(Node::new(node_id.clone(), address.clone(), Vec::new())).ok();
            }
            if !already_known {
                admit_new_member(state, &node_id, &address).await?;
            }
        }
        ManagementData::ConnectionManagement { action, peer_id, .. } => match action {
            ConnectionAction::Disconnect => state.drop_link(&peer_id),
            ConnectionAction::Connect | ConnectionAction::Status => {}
        },
        ManagementData::TopologyUpdate { action, node_id, address, .. } => {
            if action == TopologyAction::Remove {
                state.node_repo.remove(&node_id).await.ok();
            } else if let Some(address) = address {
                state.node_repo.put(Node::new(node_id, address, Vec::new())).await?;
            }
        }
        ManagementData::HealthStatus { .. } => {}
    }
    state.recompute_mesh_status().await
}

/// Admits a freshly-discovered peer into the MCG, if this node currently
/// holds leadership (§4.7 "Join": membership changes are proposed by the
/// leader). Replies with the rest of the known membership so the joiner
/// doesn't have to rediscover it hop by hop, then announces the new
/// member's admission as a wire `ConfigChange` — to the joiner itself and
/// to every other currently-linked member — rather than leaving it as
/// purely local bookkeeping.
async fn admit_new_member(state: &Arc<AppState>, node_id: &str, address: &str) -> Result<(), NodeError> {
    if !state.mcg.lock().await.is_leader() {
        return Ok(());
    }
    state.propose_mcg(McgEntry::MembershipChange { node_id: node_id.to_owned(), joining: true }).await.ok();

    let mesh_id = state.mesh.read().await.as_ref().map(|m| m.mesh_id.clone()).unwrap_or_default();
    for existing in state.node_repo.list().await.unwrap_or_default() {
        if existing.node_id == node_id {
            continue;
        }
        send_management_to(
            state,
            node_id,
            ManagementPayload {
                sub_type: ManagementSubType::NodeDiscovery,
                data: ManagementData::NodeDiscovery {
                    node_id: existing.node_id.clone(),
                    mesh_id: mesh_id.clone(),
                    address: existing.address.clone(),
                    capabilities: Vec::new(),
                    metadata: Default::default(),
                },
            },
        );
    }

    let term = state.mcg.lock().await.term();
    let config_change = ConsensusPayload {
        sub_type: ConsensusSubType::ConfigChange,
        term,
        data: ConsensusData::ConfigChange {
            term,
            change_type: ConfigChangeType::Add,
            node_id: node_id.to_owned(),
            address: Some(address.to_owned()),
        },
    };
    let Ok(body) = serde_json::to_vec(&config_change) else {
        return Ok(());
    };
    let mut targets = state.link_registry.connected_peers();
    if !targets.contains(&node_id.to_owned()) {
        targets.push(node_id.to_owned());
    }
    for peer_id in targets {
        let header = state.framer.header(MessageType::Consensus, peer_id.clone(), mesh_protocol::Priority::Normal, 30);
        if let Ok(frame) = Message::new(header, body.clone()).to_frame() {
            state.link_registry.send_to(&peer_id, mesh_protocol::Priority::Normal, frame).ok();
        }
    }
    Ok(())
}

/// Frames and enqueues a single management payload to one peer — the
/// single-target counterpart to `fanout_management`'s broadcast-to-all.
fn send_management_to(state: &Arc<AppState>, peer_id: &str, payload: ManagementPayload) {
    let Ok(body) = serde_json::to_vec(&payload) else {
        return;
    };
    let header = state.framer.header(MessageType::Management, peer_id.to_owned(), mesh_protocol::Priority::Normal, 30);
    if let Ok(frame) = Message::new(header, body).to_frame() {
        state.link_registry.send_to(peer_id, mesh_protocol::Priority::Normal, frame).ok();
    }
}

/// Accepts a flooded LSA if it supersedes what's stored locally, in both
/// the durable `LsaRepo` and the in-memory `LinkStateDb` used for route
/// computation, then reflags it onward to every other link (§4.4 flood).
async fn handle_routing(state: &Arc<AppState>, from_peer: &str, payload: &[u8]) -> Result<(), NodeError> {
    let parsed: RoutingPayload = serde_json::from_slice(payload).map_err(|_| NodeError::Transport("malformed routing payload".to_owned()))?;
    let lsa: Lsa = serde_json::from_value(parsed.data).map_err(|_| NodeError::Transport("malformed lsa in routing payload".to_owned()))?;

    let accepted_durable = state.lsa_repo.offer(lsa.clone()).await?;
    let accepted_live = state.lsdb.write().await.offer(lsa.clone());
    if !accepted_durable && !accepted_live {
        return Ok(());
    }

    let frame = Message::new(
        state.framer.broadcast_header(MessageType::Routing, mesh_protocol::Priority::Normal, 30),
        serde_json::to_vec(&RoutingPayload {
            sub_type: parsed.sub_type,
            data: serde_json::to_value(&lsa).unwrap_or_default(),
        })
        .map_err(|_| NodeError::Transport("failed to re-encode lsa for flood".to_owned()))?,
    )
    .to_frame()
    .map_err(|_| NodeError::Transport("failed to frame flooded lsa".to_owned()))?;

    for peer_id in state.link_registry.connected_peers() {
        if peer_id == from_peer {
            continue;
        }
        state.link_registry.send_to(&peer_id, mesh_protocol::Priority::Normal, frame.clone()).ok();
    }
    Ok(())
}

async fn handle_consensus(state: &Arc<AppState>, payload: &[u8]) -> Result<(), NodeError> {
    let parsed: ConsensusPayload = serde_json::from_slice(payload).map_err(|_| NodeError::Transport("malformed consensus payload".to_owned()))?;
    let mut mcg = state.mcg.lock().await;
    match parsed.data {
        ConsensusData::RequestVote { term, candidate_id, last_log_index, last_log_term } => {
            mcg.handle_request_vote(RequestVoteArgs { term, candidate_id, last_log_index, last_log_term }).await;
        }
        ConsensusData::AppendEntries { term, leader_id, prev_log_index, prev_log_term, entries, leader_commit } => {
            let entries = entries
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<Vec<mesh_consensus::McgEntry>, _>>()
                .map_err(|_| NodeError::Transport("malformed mcg log entry".to_owned()))?;
            mcg.handle_append_entries(AppendEntriesArgs { term, leader_id, prev_log_index, prev_log_term, entries, leader_commit }).await?;
        }
        ConsensusData::ConfigChange { node_id, change_type, address, .. } => {
            drop(mcg);
            match change_type {
                ConfigChangeType::Add => {
                    state.swim.lock().await.record_join(node_id.clone(), address.unwrap_or_default(), 0);
                    if node_id == state.node_id {
                        if let Some(waiter) = state.join_waiter.lock().await.as_ref() {
                            if let Some(tx) = waiter.admitted_tx.lock().await.take() {
                                tx.send(()).ok();
                            }
                        }
                    }
                }
                ConfigChangeType::Remove => {
                    state.node_repo.remove(&node_id).await.ok();
                }
            }
        }
    }
    debug_assert!(matches!(parsed.sub_type, ConsensusSubType::RequestVote | ConsensusSubType::AppendEntries | ConsensusSubType::Heartbeat | ConsensusSubType::ConfigChange));
    Ok(())
}

/// Feeds an arrived chunk through reassembly, inbox dedup, and the
/// per-stream reorder buffer, delivering any payloads now in order to
/// the registered handler, then proposing a processed-ack once the
/// handler succeeds (§4.6 steps 5-7, §8 properties 2-4).
async fn handle_data(state: &Arc<AppState>, payload: &[u8]) -> Result<(), NodeError> {
    let chunk: Chunk = serde_json::from_slice(payload).map_err(|_| NodeError::Transport("malformed chunk payload".to_owned()))?;
    let stream_id = chunk.stream_id.clone();
    let msg_id = chunk.msg_id.clone();
    let stream_seq = chunk.stream_seq;

    // Exactly-once also covers redelivery after the inbox TTL has
    // expired, which the in-memory dedup cache alone can't catch — the
    // durable delivery log is checked first and never forgets.
    if state.delivery_log_repo.has_delivered(&stream_id, &msg_id).await? {
        state.metrics.inbox_dedup_hits.fetch_add(1, Ordering::Relaxed);
        return Ok(());
    }

    let mut dsg_guard = state.dsg.lock().await;
    let handle = dsg_guard.get_mut(&stream_id).ok_or_else(|| NodeError::UnknownStream(stream_id.clone()))?;
    let reassembled = match handle.reassembler.accept(chunk) {
        Ok(Some(payload)) => payload,
        Ok(None) => return Ok(()),
        Err(err) => return Err(NodeError::Transport(err.to_string())),
    };

    if state.dedup.lock().await.check_and_insert(&stream_id, &msg_id) {
        state.metrics.inbox_dedup_hits.fetch_add(1, Ordering::Relaxed);
        return Ok(());
    }

    handle.reorder.offer(stream_seq, msg_id.clone(), reassembled);
    let ready = handle.reorder.drain_ready();
    drop(dsg_guard);

    for (seq, ready_msg_id, payload) in ready {
        let received_ts = state.now_unix_s();
        state
            .inbox_repo
            .put(mesh_core::model::InboxEntry::new(stream_id.clone(), ready_msg_id.clone(), payload.clone(), received_ts))
            .await?;

        state.handler.handle(&stream_id, &ready_msg_id, &payload).await?;

        state.delivery_log_repo.record_delivered(&stream_id, &ready_msg_id, state.now_unix_s()).await?;
        state.inbox_repo.mark_processed(&stream_id, &ready_msg_id, state.now_unix_s()).await?;
        state.record_processed_ack(&stream_id, &ready_msg_id, &state.node_id, seq).await?;
        state.event_bus.publish(mesh_events::MeshEvent::MessageDelivered {
            stream_id: stream_id.clone(),
            msg_id: ready_msg_id,
        });
    }
    Ok(())
}

/// Builds a routing-flood frame for `lsa`, used when this node originates
/// a fresh LSA after a local link state change (not a reflood of
/// someone else's).
pub fn build_lsa_frame(state: &AppState, lsa: &Lsa) -> Result<Vec<u8>, NodeError> {
    let payload = RoutingPayload {
        sub_type: mesh_protocol::RoutingSubType::RouteUpdate,
        data: serde_json::to_value(lsa).map_err(|_| NodeError::Transport("failed to encode lsa".to_owned()))?,
    };
    let body = serde_json::to_vec(&payload).map_err(|_| NodeError::Transport("failed to encode routing payload".to_owned()))?;
    let header = state.framer.broadcast_header(MessageType::Routing, mesh_protocol::Priority::Normal, 30);
    Message::new(header, body).to_frame().map_err(|_| NodeError::Transport("failed to frame lsa".to_owned()))
}
