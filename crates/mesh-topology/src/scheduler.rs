//! Multi-path scheduling (§4.4): weighted round-robin across a
//! destination's viable paths, weight ∝ 1/cost, with per-link credit
//! windows that spill over to the next-best path on saturation. Control,
//! system, and internal-DB traffic never stripes — callers of this
//! scheduler are expected to route that traffic directly to a single
//! path and never call `next_path` for it.

use mesh_core::model::Path;

/// One path's scheduling state: a weight derived from cost, a message
/// credit counter, and a byte credit counter.
#[derive(Debug, Clone)]
struct PathSlot {
    path: Path,
    weight: f64,
    accumulated: f64,
    message_credits: u64,
    byte_credits: u64,
}

#[derive(Debug, Clone)]
pub struct CreditWindow {
    pub message_capacity: u64,
    pub byte_capacity: u64,
}

/// A weighted round-robin scheduler over one destination's path set.
pub struct PathScheduler {
    slots: Vec<PathSlot>,
}

impl PathScheduler {
    pub fn new(paths: Vec<Path>, window: &CreditWindow) -> Self {
        let slots = paths
            .into_iter()
            .map(|path| {
                let weight = if path.cost > 0.0 { 1.0 / path.cost } else { 1.0 };
                PathSlot {
                    path,
                    weight,
                    accumulated: 0.0,
                    message_credits: window.message_capacity,
                    byte_credits: window.byte_capacity,
                }
            })
            .collect();
        PathScheduler { slots }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Pick the next path for a `message_size` byte message using
    /// smooth weighted round-robin (à la nginx's upstream balancer),
    /// skipping any path whose credit window is currently saturated and
    /// spilling to the next-best candidate.
    pub fn next_path(&mut self, message_size: u64) -> Option<&Path> {
        if self.slots.is_empty() {
            return None;
        }
        let total_weight: f64 = self.slots.iter().map(|s| s.weight).sum();
        for slot in &mut self.slots {
            slot.accumulated += slot.weight;
        }

        let mut order: Vec<usize> = (0..self.slots.len()).collect();
        order.sort_by(|&a, &b| self.slots[b].accumulated.partial_cmp(&self.slots[a].accumulated).unwrap());

        for idx in order {
            let slot = &self.slots[idx];
            if slot.message_credits > 0 && slot.byte_credits >= message_size {
                self.slots[idx].accumulated -= total_weight;
                self.slots[idx].message_credits -= 1;
                self.slots[idx].byte_credits -= message_size;
                return Some(&self.slots[idx].path);
            }
        }
        None
    }

    /// Receiver-advertised window update (§4.6 backpressure): restore
    /// credits for the path to `destination_path_index`.
    pub fn replenish(&mut self, index: usize, messages: u64, bytes: u64) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.message_credits += messages;
            slot.byte_credits += bytes;
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.slots.iter().map(|s| &s.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(msgs: u64, bytes: u64) -> CreditWindow {
        CreditWindow {
            message_capacity: msgs,
            byte_capacity: bytes,
        }
    }

    #[test]
    fn lower_cost_path_is_favored() {
        let cheap = Path::new("b", vec!["a".into(), "c".into(), "b".into()], 1.0);
        let expensive = Path::new("b", vec!["a".into(), "d".into(), "b".into()], 4.0);
        let mut scheduler = PathScheduler::new(vec![cheap.clone(), expensive], &window(1000, 1_000_000));

        let mut cheap_count = 0;
        for _ in 0..10 {
            if scheduler.next_path(10).unwrap().nodes == cheap.nodes {
                cheap_count += 1;
            }
        }
        assert!(cheap_count >= 7);
    }

    #[test]
    fn saturated_link_spills_to_next_path() {
        let primary = Path::new("b", vec!["a".into(), "c".into(), "b".into()], 1.0);
        let secondary = Path::new("b", vec!["a".into(), "d".into(), "b".into()], 1.0);
        let mut scheduler = PathScheduler::new(vec![primary.clone(), secondary.clone()], &window(1, 1_000_000));

        let first = scheduler.next_path(10).unwrap().nodes.clone();
        let second = scheduler.next_path(10).unwrap().nodes.clone();
        assert_ne!(first, second);
        assert!(scheduler.next_path(10).is_none());
    }

    #[test]
    fn replenish_restores_credits() {
        let path = Path::new("b", vec!["a".into(), "b".into()], 1.0);
        let mut scheduler = PathScheduler::new(vec![path], &window(1, 1_000_000));
        assert!(scheduler.next_path(10).is_some());
        assert!(scheduler.next_path(10).is_none());
        scheduler.replenish(0, 5, 1_000_000);
        assert!(scheduler.next_path(10).is_some());
    }
}
