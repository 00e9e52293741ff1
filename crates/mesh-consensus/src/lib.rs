//! mesh-consensus: the shared Raft core plus the two group flavors the
//! mesh hosts on top of it (§4.5) — the mesh-wide MCG and per-stream
//! DSGs.

pub mod dsg;
pub mod log;
pub mod mcg;
pub mod raft;

pub use dsg::{AckQuorumPolicy, AckTracker, DsgEntry};
pub use log::{InMemoryLogStore, LogEntry, LogError, LogStore};
pub use mcg::{gate_proposal, McgEntry, McgProposalError};
pub use raft::{AppendEntriesArgs, AppendEntriesReply, RaftError, RaftNode, RequestVoteArgs, RequestVoteReply, Role};
