//! Node configuration loading. TOML is the sole config source; no
//! environment variable overrides are supported here (the one
//! environment-sourced setting in this binary is `RUST_LOG`, handled in
//! `main`). Mirrors this codebase's forwarder loader: a `RawConfig`
//! deserialization struct with `Option` fields, validated and defaulted
//! into a strict `NodeConfig`.

use std::path::Path;

use mesh_core::model::JoinPolicy;
use mesh_topology::cost::CostCoefficients;
use mesh_topology::scheduler::CreditWindow;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/mesh-overlay/node.toml";

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub node_id: String,
    pub listen_addr: String,
    pub mesh_id: String,
    pub mesh_name: String,
    pub join_policy: JoinPolicy,
    pub join_key: Option<String>,
    pub seeds: Vec<String>,
    pub credit_window: CreditWindow,
    pub stream_window: usize,
    pub heartbeat_interval_s: u64,
    pub probe_interval_s: u64,
    pub k_paths: usize,
    pub cost_coefficients: CostCoefficients,
    pub dsg_member_cap: usize,
    pub snapshot_interval_s: u64,
    pub status_http_bind: String,
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    node_id: Option<String>,
    listen_addr: Option<String>,
    mesh: Option<RawMesh>,
    seeds: Option<Vec<String>>,
    credit_window: Option<RawCreditWindow>,
    stream_window: Option<usize>,
    heartbeat_interval_s: Option<u64>,
    probe_interval_s: Option<u64>,
    k_paths: Option<usize>,
    cost_coefficients: Option<RawCostCoefficients>,
    dsg_member_cap: Option<usize>,
    snapshot_interval_s: Option<u64>,
    status_http: Option<RawStatusHttp>,
}

#[derive(Debug, Deserialize)]
struct RawMesh {
    mesh_id: Option<String>,
    name: Option<String>,
    join_policy: Option<String>,
    join_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCreditWindow {
    message_capacity: Option<u64>,
    byte_capacity: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawCostCoefficients {
    alpha: Option<f64>,
    beta: Option<f64>,
    gamma: Option<f64>,
    delta: Option<f64>,
    epsilon: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawStatusHttp {
    bind: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config file '{path}': {source}")]
    Io { path: String, source: std::io::Error },
    #[error("parsing config: {0}")]
    Parse(String),
    #[error("missing required field: {0}")]
    MissingField(String),
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

pub fn load_config_from_path(path: &Path) -> Result<NodeConfig, ConfigError> {
    let toml_str = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_config_from_str(&toml_str)
}

pub fn load_config(path: Option<&Path>) -> Result<NodeConfig, ConfigError> {
    load_config_from_path(path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH)))
}

pub fn load_config_from_str(toml_str: &str) -> Result<NodeConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let node_id = raw.node_id.ok_or_else(|| ConfigError::MissingField("node_id".to_owned()))?;
    let listen_addr = raw.listen_addr.unwrap_or_else(|| "0.0.0.0:7950".to_owned());

    let raw_mesh = raw.mesh.ok_or_else(|| ConfigError::MissingField("mesh".to_owned()))?;
    let mesh_id = raw_mesh.mesh_id.ok_or_else(|| ConfigError::MissingField("mesh.mesh_id".to_owned()))?;
    let mesh_name = raw_mesh.name.unwrap_or_else(|| mesh_id.clone());
    let join_policy = match raw_mesh.join_policy.as_deref() {
        Some("open") | None => JoinPolicy::Open,
        Some("key_required") => JoinPolicy::KeyRequired,
        Some("closed") => JoinPolicy::Closed,
        Some(other) => return Err(ConfigError::InvalidValue(format!("mesh.join_policy: unknown value '{other}'"))),
    };

    let credit_window = match raw.credit_window {
        Some(c) => CreditWindow {
            message_capacity: c.message_capacity.unwrap_or(256),
            byte_capacity: c.byte_capacity.unwrap_or(1 << 20),
        },
        None => CreditWindow { message_capacity: 256, byte_capacity: 1 << 20 },
    };

    let cost_coefficients = match raw.cost_coefficients {
        Some(c) => CostCoefficients {
            alpha: c.alpha.unwrap_or(1.0),
            beta: c.beta.unwrap_or(1.0),
            gamma: c.gamma.unwrap_or(0.5),
            delta: c.delta.unwrap_or(2.0),
            epsilon: c.epsilon.unwrap_or(0.1),
        },
        None => CostCoefficients::default(),
    };

    let status_http_bind = raw.status_http.and_then(|s| s.bind).unwrap_or_else(|| "0.0.0.0:8090".to_owned());

    Ok(NodeConfig {
        node_id,
        listen_addr,
        mesh_id,
        mesh_name,
        join_policy,
        join_key: raw_mesh.join_key,
        seeds: raw.seeds.unwrap_or_default(),
        credit_window,
        stream_window: raw.stream_window.unwrap_or(64),
        heartbeat_interval_s: raw.heartbeat_interval_s.unwrap_or(10),
        probe_interval_s: raw.probe_interval_s.unwrap_or(2),
        k_paths: raw.k_paths.unwrap_or(2),
        cost_coefficients,
        dsg_member_cap: raw.dsg_member_cap.unwrap_or(16),
        snapshot_interval_s: raw.snapshot_interval_s.unwrap_or(300),
        status_http_bind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_sensible_defaults() {
        let toml = r#"
            node_id = "node-a"
            [mesh]
            mesh_id = "mesh-1"
        "#;
        let cfg = load_config_from_str(toml).unwrap();
        assert_eq!(cfg.node_id, "node-a");
        assert_eq!(cfg.mesh_name, "mesh-1");
        assert_eq!(cfg.join_policy, JoinPolicy::Open);
        assert_eq!(cfg.k_paths, 2);
    }

    #[test]
    fn missing_node_id_is_rejected() {
        let toml = "[mesh]\nmesh_id = \"mesh-1\"\n";
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn unknown_join_policy_is_rejected() {
        let toml = r#"
            node_id = "node-a"
            [mesh]
            mesh_id = "mesh-1"
            join_policy = "whatever"
        "#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn explicit_cost_coefficients_override_defaults() {
        let toml = r#"
            node_id = "node-a"
            [mesh]
            mesh_id = "mesh-1"
            [cost_coefficients]
            alpha = 2.0
        "#;
        let cfg = load_config_from_str(toml).unwrap();
        assert_eq!(cfg.cost_coefficients.alpha, 2.0);
        assert_eq!(cfg.cost_coefficients.beta, 1.0);
    }
}
