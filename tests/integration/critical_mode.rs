//! §8 scenario S6: once the mesh enters critical mode, the MCG only
//! admits eviction proposals — every other mesh-wide update is rejected
//! until enough members rejoin to leave critical mode.

use mesh_core::model::{JoinPolicy, MeshStatus};
use node::config::load_config_from_str;
use node::error::NodeError;
use node::state::AppState;

async fn seeded_node() -> std::sync::Arc<AppState> {
    let toml = "node_id = \"node-a\"\n[mesh]\nmesh_id = \"mesh-1\"\n";
    let state = AppState::new(load_config_from_str(toml).unwrap());
    state.seed_mesh("mesh-1", "mesh one", JoinPolicy::Open, None).await.unwrap();
    state
}

#[tokio::test]
async fn mesh_update_is_rejected_once_critical_but_eviction_still_goes_through() {
    let state = seeded_node().await;
    state.mesh.write().await.as_mut().unwrap().status = MeshStatus::Critical;

    let err = state.send_mesh_update(b"config change".to_vec()).await.unwrap_err();
    assert!(matches!(err, NodeError::CriticalMode(_)));

    state.evict_node("node-ghost").await.unwrap();
}

#[tokio::test]
async fn non_critical_mesh_admits_ordinary_updates() {
    let state = seeded_node().await;
    assert!(!state.is_critical().await);
    state.send_mesh_update(b"config change".to_vec()).await.unwrap();
}
