//! Link cost function (§4.4): `cost = α·norm(latency) + β·(1/norm(bandwidth))
//! + γ·utilization + δ·loss + ε·hop_penalty`. Coefficients are
//! configurable per traffic class so e.g. bulk traffic can weight
//! bandwidth heavier than latency.

use mesh_core::model::LinkMetrics;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostCoefficients {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
    pub epsilon: f64,
}

impl Default for CostCoefficients {
    fn default() -> Self {
        CostCoefficients {
            alpha: 1.0,
            beta: 1.0,
            gamma: 0.5,
            delta: 2.0,
            epsilon: 0.1,
        }
    }
}

/// Reference scales for normalization — a link at or above these values
/// normalizes to 1.0.
pub struct NormalizationScale {
    pub max_latency_ms: f64,
    pub max_bandwidth_bps: f64,
}

impl Default for NormalizationScale {
    fn default() -> Self {
        NormalizationScale {
            max_latency_ms: 500.0,
            max_bandwidth_bps: 1_000_000_000.0,
        }
    }
}

fn norm(value: f64, scale: f64) -> f64 {
    if scale <= 0.0 {
        return 1.0;
    }
    (value / scale).clamp(0.0, 1.0)
}

/// Computes a single link's cost per the weighted-sum formula.
/// `hop_penalty` is a flat per-hop addend (ε term), letting a caller
/// discourage long paths independent of per-link quality.
pub fn link_cost(metrics: &LinkMetrics, coefficients: &CostCoefficients, scale: &NormalizationScale, hop_penalty: f64) -> f64 {
    let latency_term = coefficients.alpha * norm(metrics.latency_ms, scale.max_latency_ms);
    let bandwidth_norm = norm(metrics.bandwidth_bps, scale.max_bandwidth_bps).max(f64::EPSILON);
    let bandwidth_term = coefficients.beta * (1.0 / bandwidth_norm);
    let utilization_term = coefficients.gamma * metrics.utilization.clamp(0.0, 1.0);
    let loss_term = coefficients.delta * metrics.loss_rate.clamp(0.0, 1.0);
    let hop_term = coefficients.epsilon * hop_penalty;
    latency_term + bandwidth_term + utilization_term + loss_term + hop_term
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_loss_increases_cost() {
        let coefficients = CostCoefficients::default();
        let scale = NormalizationScale::default();
        let mut metrics = LinkMetrics::default();
        metrics.loss_rate = 0.0;
        let low = link_cost(&metrics, &coefficients, &scale, 1.0);
        metrics.loss_rate = 0.5;
        let high = link_cost(&metrics, &coefficients, &scale, 1.0);
        assert!(high > low);
    }

    #[test]
    fn higher_bandwidth_decreases_cost() {
        let coefficients = CostCoefficients::default();
        let scale = NormalizationScale::default();
        let mut metrics = LinkMetrics::default();
        metrics.bandwidth_bps = 1_000.0;
        let low_bw_cost = link_cost(&metrics, &coefficients, &scale, 1.0);
        metrics.bandwidth_bps = 1_000_000_000.0;
        let high_bw_cost = link_cost(&metrics, &coefficients, &scale, 1.0);
        assert!(high_bw_cost < low_bw_cost);
    }
}
