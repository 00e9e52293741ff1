//! §8 scenario S1: a node seeds a new mesh and becomes its sole,
//! leading member; a second node joins through it and both end up
//! online with a shared mesh id.

use std::sync::Arc;

use mesh_core::model::JoinPolicy;
use mesh_protocol::Message;
use mesh_transport::PriorityQueue;
use node::config::load_config_from_str;
use node::state::AppState;
use tokio::sync::mpsc;

fn config_for(node_id: &str) -> node::config::NodeConfig {
    let toml = format!("node_id = \"{node_id}\"\n[mesh]\nmesh_id = \"mesh-1\"\n");
    load_config_from_str(&toml).unwrap()
}

/// Drains `queue` and decodes each frame onto `inbound_tx`, the way a
/// real `run_link_loop` would off a socket — used here to connect two
/// `AppState`s without a live WebSocket.
fn relay(mut queue: PriorityQueue, inbound_tx: mpsc::Sender<Message>) {
    tokio::spawn(async move {
        while let Some(frame) = queue.recv_next().await {
            if let Ok(message) = Message::from_frame(&frame) {
                if inbound_tx.send(message).await.is_err() {
                    break;
                }
            }
        }
    });
}

/// Registers a bidirectional link between `a` and `b` and starts each
/// side's dispatch loop, so messages either sends actually reach the
/// other's handlers.
fn link(a: &Arc<AppState>, a_id: &str, b: &Arc<AppState>, b_id: &str) {
    let (a_to_b_tx, a_to_b_rx) = PriorityQueue::new(16);
    let (b_to_a_tx, b_to_a_rx) = PriorityQueue::new(16);
    a.link_registry.register(b_id.to_owned(), a_to_b_tx);
    b.link_registry.register(a_id.to_owned(), b_to_a_tx);

    let (a_inbound_tx, a_inbound_rx) = mpsc::channel(16);
    let (b_inbound_tx, b_inbound_rx) = mpsc::channel(16);
    relay(b_to_a_rx, a_inbound_tx);
    relay(a_to_b_rx, b_inbound_tx);
    tokio::spawn(node::dispatch::run_dispatch_loop(a.clone(), a_inbound_rx));
    tokio::spawn(node::dispatch::run_dispatch_loop(b.clone(), b_inbound_rx));
}

#[tokio::test]
async fn seeding_node_becomes_online_mcg_leader() {
    let seed = AppState::new(config_for("node-a"));
    seed.seed_mesh("mesh-1", "primary mesh", JoinPolicy::Open, None).await.unwrap();

    let status = seed.get_mesh_status().await;
    assert_eq!(status.mesh_id.as_deref(), Some("mesh-1"));
    assert!(status.online);
    assert!(status.mcg_is_leader);
    assert_eq!(status.node_count, 1);
}

#[tokio::test]
async fn joining_node_dials_the_introducer_and_both_end_up_with_two_members() {
    let seed = AppState::new(config_for("node-a"));
    seed.seed_mesh("mesh-1", "primary mesh", JoinPolicy::Open, None).await.unwrap();

    let joiner = AppState::new(config_for("node-b"));
    link(&seed, "node-a", &joiner, "node-b");

    joiner
        .join_mesh("node-a", "10.0.0.1:7950", "mesh-1", "primary mesh", JoinPolicy::Open)
        .await
        .unwrap();

    let joiner_status = joiner.get_mesh_status().await;
    assert!(joiner_status.online);
    assert_eq!(joiner_status.mesh_id.as_deref(), Some("mesh-1"));
    assert!(joiner.swim.lock().await.member("node-a").is_some());
    assert_eq!(joiner.node_repo.list().await.unwrap().len(), 2, "the joiner must learn real membership, not just itself and the introducer's address");

    // The introducer wasn't a passive bystander: the join request actually
    // reached it, and it now knows about the joiner too (§8 scenario S1).
    let seed_status = seed.get_mesh_status().await;
    assert_eq!(seed_status.online_node_count, 2);
}

#[tokio::test]
async fn join_fails_when_the_introducer_is_unreachable() {
    let joiner = AppState::new(config_for("node-b"));
    let err = joiner
        .join_mesh("node-a", "10.0.0.1:7950", "mesh-1", "primary mesh", JoinPolicy::Open)
        .await
        .unwrap_err();
    assert!(matches!(err, node::error::NodeError::Transport(_)));
    assert!(!joiner.get_mesh_status().await.online);
}
