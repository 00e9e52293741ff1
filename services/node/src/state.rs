//! Shared node state. One `AppState` per running process, wired together
//! from the library crates at startup and handed to every task (link
//! loops, control-plane calls, the status HTTP router) as an `Arc`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use mesh_consensus::{AckQuorumPolicy, AckTracker, DsgEntry, InMemoryLogStore, LogStore, McgEntry, RaftNode};
use mesh_core::memory::{
    InMemoryConfigKvRepo, InMemoryDeliveryLogRepo, InMemoryInboxRepo, InMemoryLinkRepo, InMemoryLsaRepo, InMemoryNodeRepo,
    InMemoryOutboxRepo, InMemoryRaftGroupRepo, InMemoryStreamOffsetRepo, InMemoryStreamRepo, InMemoryTopologySnapshotRepo,
};
use mesh_core::model::{Mesh, Node};
use mesh_core::ports::{
    ConfigKvRepo, DeliveryLogRepo, InboxRepo, LinkRepo, LsaRepo, NodeRepo, OutboxRepo, RaftGroupRepo, StreamOffsetRepo, StreamRepo,
    TopologySnapshotRepo,
};
use mesh_crypto::KeyringPort;
use mesh_events::MeshEventBus;
use mesh_membership::{SwimConfig, SwimDetector};
use mesh_protocol::Framer;
use mesh_streams::{DedupCache, HandlerPort, Reassembler, ReorderBuffer, StreamManagerConfig, StreamPublisher};
use mesh_topology::LinkStateDb;
use mesh_transport::LinkRegistry;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};

use crate::config::NodeConfig;
use crate::handler::LoggingHandler;
use crate::keyring::GeneratedKeyring;

/// One active Data Stream Group, tracked locally by the node that owns
/// or participates in the stream.
pub struct DsgHandle {
    pub raft: RaftNode<DsgEntry>,
    pub required_members: HashSet<String>,
    pub policy: AckQuorumPolicy,
    pub ack_trackers: HashMap<String, AckTracker>,
    pub reassembler: Reassembler,
    pub reorder: ReorderBuffer,
}

impl DsgHandle {
    fn new(group_id: &str, local_node_id: &str, members: HashSet<String>, policy: AckQuorumPolicy) -> Self {
        let log: Arc<dyn LogStore<DsgEntry>> = Arc::new(InMemoryLogStore::new());
        DsgHandle {
            raft: RaftNode::new(group_id, local_node_id, log),
            required_members: members,
            policy,
            ack_trackers: HashMap::new(),
            reassembler: Reassembler::new(),
            reorder: ReorderBuffer::new(1),
        }
    }
}

/// Channels a pending `join_mesh` call uses to collect the introducer's
/// reply: one relayed `Node` per existing member, plus a one-shot fired
/// once this node's own admission lands as an MCG `ConfigChange` (§4.7
/// "Join"). Dropped (and cleared from `AppState::join_waiter`) once the
/// join resolves, one way or another.
pub struct JoinWaiter {
    pub members_tx: mpsc::UnboundedSender<Node>,
    pub admitted_tx: Mutex<Option<oneshot::Sender<()>>>,
}

#[derive(Default)]
pub struct Metrics {
    pub rate_limited_drops: AtomicU64,
    pub expired_drops: AtomicU64,
    pub credit_exhaustion: AtomicU64,
    pub handler_failures: AtomicU64,
    pub inbox_dedup_hits: AtomicU64,
}

impl Metrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rate_limited_drops: self.rate_limited_drops.load(Ordering::Relaxed),
            expired_drops: self.expired_drops.load(Ordering::Relaxed),
            credit_exhaustion: self.credit_exhaustion.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            inbox_dedup_hits: self.inbox_dedup_hits.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    pub rate_limited_drops: u64,
    pub expired_drops: u64,
    pub credit_exhaustion: u64,
    pub handler_failures: u64,
    pub inbox_dedup_hits: u64,
}

pub struct AppState {
    pub node_id: String,
    pub config: NodeConfig,
    pub framer: Framer,
    pub keyring: Arc<dyn KeyringPort>,
    pub handler: Arc<dyn HandlerPort>,

    pub node_repo: Arc<dyn NodeRepo>,
    pub link_repo: Arc<dyn LinkRepo>,
    pub lsa_repo: Arc<dyn LsaRepo>,
    pub stream_repo: Arc<dyn StreamRepo>,
    pub stream_offset_repo: Arc<dyn StreamOffsetRepo>,
    pub delivery_log_repo: Arc<dyn DeliveryLogRepo>,
    pub outbox_repo: Arc<dyn OutboxRepo>,
    pub inbox_repo: Arc<dyn InboxRepo>,
    pub topology_snapshot_repo: Arc<dyn TopologySnapshotRepo>,
    pub config_kv_repo: Arc<dyn ConfigKvRepo>,
    pub raft_group_repo: Arc<dyn RaftGroupRepo>,

    pub swim: Mutex<SwimDetector>,
    pub lsdb: RwLock<LinkStateDb>,
    pub mcg: Mutex<RaftNode<McgEntry>>,
    pub dsg: Mutex<HashMap<String, DsgHandle>>,
    pub stream_publishers: Mutex<HashMap<String, StreamPublisher>>,

    pub link_registry: Arc<LinkRegistry>,
    pub event_bus: Arc<MeshEventBus>,
    pub mesh: RwLock<Option<Mesh>>,
    pub dedup: Mutex<DedupCache>,
    pub metrics: Metrics,
    pub online: AtomicBool,
    pub join_waiter: Mutex<Option<Arc<JoinWaiter>>>,
}

impl AppState {
    pub fn new(config: NodeConfig) -> Arc<Self> {
        let node_id = config.node_id.clone();
        let mcg_log: Arc<dyn LogStore<McgEntry>> = Arc::new(InMemoryLogStore::new());

        Arc::new(AppState {
            framer: Framer::new(node_id.clone()),
            keyring: Arc::new(GeneratedKeyring::new()),
            handler: Arc::new(LoggingHandler),

            node_repo: Arc::new(InMemoryNodeRepo::default()),
            link_repo: Arc::new(InMemoryLinkRepo::default()),
            lsa_repo: Arc::new(InMemoryLsaRepo::default()),
            stream_repo: Arc::new(InMemoryStreamRepo::default()),
            stream_offset_repo: Arc::new(InMemoryStreamOffsetRepo::default()),
            delivery_log_repo: Arc::new(InMemoryDeliveryLogRepo::default()),
            outbox_repo: Arc::new(InMemoryOutboxRepo::default()),
            inbox_repo: Arc::new(InMemoryInboxRepo::default()),
            topology_snapshot_repo: Arc::new(InMemoryTopologySnapshotRepo::default()),
            config_kv_repo: Arc::new(InMemoryConfigKvRepo::default()),
            raft_group_repo: Arc::new(InMemoryRaftGroupRepo::default()),

            swim: Mutex::new(SwimDetector::new(node_id.clone(), SwimConfig::default())),
            lsdb: RwLock::new(LinkStateDb::new()),
            mcg: Mutex::new(RaftNode::new("mcg", node_id.clone(), mcg_log)),
            dsg: Mutex::new(HashMap::new()),
            stream_publishers: Mutex::new(HashMap::new()),

            link_registry: Arc::new(LinkRegistry::new()),
            event_bus: Arc::new(MeshEventBus::new(256, 200)),
            mesh: RwLock::new(None),
            dedup: Mutex::new(DedupCache::new(std::time::Duration::from_secs(300))),
            metrics: Metrics::default(),
            online: AtomicBool::new(false),
            join_waiter: Mutex::new(None),

            node_id,
            config,
        })
    }

    pub fn stream_manager_config(&self) -> StreamManagerConfig {
        StreamManagerConfig { window: self.config.stream_window }
    }

    pub fn new_dsg(&self, group_id: &str, members: HashSet<String>, policy: AckQuorumPolicy) -> DsgHandle {
        DsgHandle::new(group_id, &self.node_id, members, policy)
    }

    pub async fn is_critical(&self) -> bool {
        matches!(
            self.mesh.read().await.as_ref().map(|m| m.status),
            Some(mesh_core::model::MeshStatus::Critical)
        )
    }
}
