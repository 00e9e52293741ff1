//! The SWIM-like failure detector's state machine (§4.3). This module
//! owns membership *state transitions*; actually sending/receiving probes
//! over the wire is mesh-transport's job, driven by the plan this
//! detector hands back (`ProbeTarget`, indirect helper lists).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;

use crate::gossip::{GossipBuffer, GossipEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MemberState {
    Alive,
    Suspect,
    Dead,
    Left,
}

#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub node_id: String,
    pub address: String,
    pub incarnation: u64,
    pub state: MemberState,
    pub last_state_change: Instant,
}

pub struct SwimConfig {
    pub indirect_probe_count: usize,
    pub suspicion_timeout: Duration,
    pub gossip_buffer_capacity: usize,
    pub max_piggyback_sends: u32,
}

impl Default for SwimConfig {
    fn default() -> Self {
        SwimConfig {
            indirect_probe_count: 3,
            suspicion_timeout: Duration::from_secs(5),
            gossip_buffer_capacity: 256,
            max_piggyback_sends: 6,
        }
    }
}

/// Outcome of evaluating one member's suspicion timer.
pub enum SuspicionOutcome {
    StillSuspect,
    Confirmed(GossipEvent),
}

pub struct SwimDetector {
    local_node_id: String,
    local_incarnation: AtomicU64,
    members: HashMap<String, MemberRecord>,
    config: SwimConfig,
    gossip: GossipBuffer,
}

impl SwimDetector {
    pub fn new(local_node_id: impl Into<String>, config: SwimConfig) -> Self {
        let gossip = GossipBuffer::new(config.gossip_buffer_capacity, config.max_piggyback_sends);
        SwimDetector {
            local_node_id: local_node_id.into(),
            local_incarnation: AtomicU64::new(0),
            members: HashMap::new(),
            config,
            gossip,
        }
    }

    pub fn local_node_id(&self) -> &str {
        &self.local_node_id
    }

    pub fn member(&self, node_id: &str) -> Option<&MemberRecord> {
        self.members.get(node_id)
    }

    pub fn alive_members(&self) -> impl Iterator<Item = &MemberRecord> {
        self.members.values().filter(|m| m.state == MemberState::Alive)
    }

    pub fn record_join(&mut self, node_id: impl Into<String>, address: impl Into<String>, incarnation: u64) {
        let node_id = node_id.into();
        let address = address.into();
        self.members.insert(
            node_id.clone(),
            MemberRecord {
                node_id: node_id.clone(),
                address: address.clone(),
                incarnation,
                state: MemberState::Alive,
                last_state_change: Instant::now(),
            },
        );
        self.gossip.push(GossipEvent::Join {
            node_id,
            address,
            incarnation,
        });
    }

    /// §8 property 1: accept an incoming report only if its incarnation is
    /// not older than what's already stored.
    fn accepts(&self, node_id: &str, incarnation: u64) -> bool {
        match self.members.get(node_id) {
            Some(existing) => incarnation >= existing.incarnation,
            None => true,
        }
    }

    pub fn receive_alive(&mut self, node_id: &str, incarnation: u64, address: &str) {
        if !self.accepts(node_id, incarnation) {
            return;
        }
        let record = self.members.entry(node_id.to_owned()).or_insert_with(|| MemberRecord {
            node_id: node_id.to_owned(),
            address: address.to_owned(),
            incarnation,
            state: MemberState::Alive,
            last_state_change: Instant::now(),
        });
        record.incarnation = incarnation;
        record.state = MemberState::Alive;
        record.last_state_change = Instant::now();
        self.gossip.push(GossipEvent::Alive {
            node_id: node_id.to_owned(),
            incarnation,
        });
    }

    /// A suspicion report for `node_id` arrived. If `node_id` is us, we
    /// refute by bumping our own incarnation and broadcasting `Alive`
    /// rather than accepting the suspicion (§4.3).
    pub fn receive_suspect(&mut self, node_id: &str, incarnation: u64) -> Option<GossipEvent> {
        if node_id == self.local_node_id {
            let refuted_incarnation = self.local_incarnation.fetch_add(1, Ordering::SeqCst) + 1;
            let event = GossipEvent::Alive {
                node_id: self.local_node_id.clone(),
                incarnation: refuted_incarnation,
            };
            self.gossip.push(event.clone());
            return Some(event);
        }
        if !self.accepts(node_id, incarnation) {
            return None;
        }
        if let Some(record) = self.members.get_mut(node_id) {
            if record.state == MemberState::Alive {
                record.state = MemberState::Suspect;
                record.incarnation = incarnation;
                record.last_state_change = Instant::now();
                let event = GossipEvent::Suspect {
                    node_id: node_id.to_owned(),
                    incarnation,
                };
                self.gossip.push(event.clone());
                return Some(event);
            }
        }
        None
    }

    /// Evaluate whether a suspected member's timeout has elapsed; if so,
    /// transition it to dead and return a `Confirm` event to disseminate.
    pub fn check_suspicion_timeout(&mut self, node_id: &str) -> Option<SuspicionOutcome> {
        let timeout = self.config.suspicion_timeout;
        let record = self.members.get_mut(node_id)?;
        if record.state != MemberState::Suspect {
            return None;
        }
        if record.last_state_change.elapsed() < timeout {
            return Some(SuspicionOutcome::StillSuspect);
        }
        record.state = MemberState::Dead;
        record.last_state_change = Instant::now();
        let event = GossipEvent::Confirm {
            node_id: node_id.to_owned(),
            incarnation: record.incarnation,
        };
        self.gossip.push(event.clone());
        Some(SuspicionOutcome::Confirmed(event))
    }

    pub fn receive_leave(&mut self, node_id: &str, incarnation: u64) {
        if !self.accepts(node_id, incarnation) {
            return;
        }
        if let Some(record) = self.members.get_mut(node_id) {
            record.state = MemberState::Left;
            record.incarnation = incarnation;
            record.last_state_change = Instant::now();
        }
        self.gossip.push(GossipEvent::Leave {
            node_id: node_id.to_owned(),
            incarnation,
        });
    }

    /// Pick `k` random alive peers (excluding `exclude`) to ask for an
    /// indirect probe of a timed-out direct probe target.
    pub fn pick_indirect_probers(&self, exclude: &str) -> Vec<String> {
        let mut candidates: Vec<&str> = self
            .alive_members()
            .map(|m| m.node_id.as_str())
            .filter(|id| *id != exclude && *id != self.local_node_id)
            .collect();
        candidates.shuffle(&mut rand::thread_rng());
        candidates
            .into_iter()
            .take(self.config.indirect_probe_count)
            .map(str::to_owned)
            .collect()
    }

    pub fn drain_piggyback(&mut self, max: usize) -> Vec<GossipEvent> {
        self.gossip.select_for_piggyback(max)
    }
}
