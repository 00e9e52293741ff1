use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Up,
    Degraded,
    Down,
}

/// Measured characteristics of one link, refreshed by periodic probes
/// (§4.4). All fields are instantaneous samples, not averages; smoothing
/// is the router's concern when computing cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkMetrics {
    pub latency_ms: f64,
    pub bandwidth_bps: f64,
    pub loss_rate: f64,
    pub utilization: f64,
}

impl Default for LinkMetrics {
    fn default() -> Self {
        LinkMetrics {
            latency_ms: 0.0,
            bandwidth_bps: f64::MAX,
            loss_rate: 0.0,
            utilization: 0.0,
        }
    }
}

/// An ordered pair `(a, b)` — the link is directional in storage (each
/// endpoint keeps its own view) even though §4.2 treats an established
/// link as logically symmetric once bidirectional traffic is observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub a: String,
    pub b: String,
    pub metrics: LinkMetrics,
    pub state: LinkState,
    pub consecutive_probe_failures: u32,
}

impl Link {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Link {
            a: a.into(),
            b: b.into(),
            metrics: LinkMetrics::default(),
            state: LinkState::Up,
            consecutive_probe_failures: 0,
        }
    }

    pub fn other(&self, node_id: &str) -> Option<&str> {
        if self.a == node_id {
            Some(&self.b)
        } else if self.b == node_id {
            Some(&self.a)
        } else {
            None
        }
    }
}
