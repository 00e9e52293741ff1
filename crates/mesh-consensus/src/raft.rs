//! The shared Raft core (§4.5): term, voted-for, role, and commit index
//! bookkeeping common to both MCG and DSG groups. This models the state
//! machine transitions; the actual `request_vote`/`append_entries` RPCs
//! travel as `consensus` messages over mesh-transport, which calls into
//! this type.

use std::collections::HashSet;
use std::sync::Arc;

use crate::log::{LogError, LogStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Follower,
    Candidate,
    Leader,
}

#[derive(Debug, thiserror::Error)]
pub enum RaftError {
    #[error("log error: {0}")]
    Log(#[from] LogError),
    #[error("not the leader")]
    NotLeader,
}

/// One request-vote RPC's inputs/outputs (§6 consensus sub-payload).
pub struct RequestVoteArgs {
    pub term: u64,
    pub candidate_id: String,
    pub last_log_index: u64,
    pub last_log_term: u64,
}

pub struct RequestVoteReply {
    pub term: u64,
    pub vote_granted: bool,
}

pub struct AppendEntriesArgs<E> {
    pub term: u64,
    pub leader_id: String,
    pub prev_log_index: u64,
    pub prev_log_term: u64,
    pub entries: Vec<E>,
    pub leader_commit: u64,
}

pub struct AppendEntriesReply {
    pub term: u64,
    pub success: bool,
    pub match_index: u64,
}

/// Per-group Raft state. `group_id` identifies which MCG/DSG this
/// instance serves; the group's member list and entry semantics live one
/// layer up (`crate::mcg`, `crate::dsg`).
pub struct RaftNode<E: Clone + Send + Sync + 'static> {
    pub group_id: String,
    pub node_id: String,
    term: u64,
    voted_for: Option<String>,
    role: Role,
    commit_index: u64,
    log: Arc<dyn LogStore<E>>,
}

impl<E: Clone + Send + Sync + 'static> RaftNode<E> {
    pub fn new(group_id: impl Into<String>, node_id: impl Into<String>, log: Arc<dyn LogStore<E>>) -> Self {
        RaftNode {
            group_id: group_id.into(),
            node_id: node_id.into(),
            term: 0,
            voted_for: None,
            role: Role::Follower,
            commit_index: 0,
            log,
        }
    }

    pub fn term(&self) -> u64 {
        self.term
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn commit_index(&self) -> u64 {
        self.commit_index
    }

    pub fn is_leader(&self) -> bool {
        self.role == Role::Leader
    }

    /// Begin an election: bump term, vote for self, become candidate.
    pub fn start_election(&mut self) -> RequestVoteArgs {
        self.term += 1;
        self.voted_for = Some(self.node_id.clone());
        self.role = Role::Candidate;
        RequestVoteArgs {
            term: self.term,
            candidate_id: self.node_id.clone(),
            last_log_index: 0,
            last_log_term: 0,
        }
    }

    /// Evaluate an incoming vote request per the standard Raft rules:
    /// reject stale terms, grant at most one vote per term, and require
    /// the candidate's log be at least as up to date as ours.
    pub async fn handle_request_vote(&mut self, args: RequestVoteArgs) -> RequestVoteReply {
        if args.term < self.term {
            return RequestVoteReply {
                term: self.term,
                vote_granted: false,
            };
        }
        if args.term > self.term {
            self.term = args.term;
            self.voted_for = None;
            self.role = Role::Follower;
        }
        let last_index = self.log.last_index().await;
        let last_term = self.log.last_term().await;
        let log_ok = args.last_log_term > last_term || (args.last_log_term == last_term && args.last_log_index >= last_index);
        let can_vote = self.voted_for.is_none() || self.voted_for.as_deref() == Some(args.candidate_id.as_str());
        let grant = log_ok && can_vote;
        if grant {
            self.voted_for = Some(args.candidate_id);
        }
        RequestVoteReply {
            term: self.term,
            vote_granted: grant,
        }
    }

    /// A candidate that has collected a majority of `votes` (including
    /// itself) becomes leader for the current term.
    pub fn become_leader_if_majority(&mut self, votes: usize, cluster_size: usize) -> bool {
        if self.role != Role::Candidate {
            return false;
        }
        if votes * 2 > cluster_size {
            self.role = Role::Leader;
            true
        } else {
            false
        }
    }

    pub fn step_down(&mut self, new_term: u64) {
        if new_term > self.term {
            self.term = new_term;
            self.voted_for = None;
        }
        self.role = Role::Follower;
    }

    /// Leader-only: append a new entry to the local log at the current
    /// term. Replication to followers happens one layer up (transport).
    pub async fn propose(&self, entry: E) -> Result<u64, RaftError> {
        if self.role != Role::Leader {
            return Err(RaftError::NotLeader);
        }
        Ok(self.log.append(self.term, entry).await?)
    }

    /// Follower-side handling of an append-entries RPC: validate the
    /// term and the log-matching property, truncate conflicts, append
    /// new entries, and advance the local commit index.
    pub async fn handle_append_entries(&mut self, args: AppendEntriesArgs<E>) -> Result<AppendEntriesReply, RaftError> {
        if args.term < self.term {
            return Ok(AppendEntriesReply {
                term: self.term,
                success: false,
                match_index: 0,
            });
        }
        self.term = args.term;
        self.role = Role::Follower;

        if args.prev_log_index > 0 {
            match self.log.get(args.prev_log_index).await? {
                Some(entry) if entry.term == args.prev_log_term => {}
                _ => {
                    return Ok(AppendEntriesReply {
                        term: self.term,
                        success: false,
                        match_index: 0,
                    })
                }
            }
        }

        self.log.truncate_after(args.prev_log_index).await?;
        let mut match_index = args.prev_log_index;
        for entry in args.entries {
            match_index = self.log.append(args.term, entry).await?;
        }

        if args.leader_commit > self.commit_index {
            self.commit_index = args.leader_commit.min(match_index);
        }

        Ok(AppendEntriesReply {
            term: self.term,
            success: true,
            match_index,
        })
    }

    /// Leader-side commit advance: an entry at `index` is committed once
    /// a majority of `cluster_size` members (including the leader) report
    /// `match_index >= index`.
    pub fn advance_commit_index(&mut self, match_indices: &[u64], cluster_size: usize) {
        let mut candidates: Vec<u64> = match_indices.to_vec();
        candidates.sort_unstable();
        candidates.reverse();
        let majority_pos = cluster_size / 2;
        if let Some(&majority_index) = candidates.get(majority_pos) {
            if majority_index > self.commit_index {
                self.commit_index = majority_index;
            }
        }
    }
}

/// Whether `votes` (a set of distinct voter node ids, including self)
/// constitutes a Raft majority of `cluster_size`.
pub fn has_majority(votes: &HashSet<String>, cluster_size: usize) -> bool {
    votes.len() * 2 > cluster_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::InMemoryLogStore;

    fn node(id: &str) -> RaftNode<String> {
        let log: Arc<dyn LogStore<String>> = Arc::new(InMemoryLogStore::new());
        RaftNode::new("group-1", id, log)
    }

    #[tokio::test]
    async fn starting_an_election_bumps_term_and_votes_self() {
        let mut n = node("a");
        let args = n.start_election();
        assert_eq!(args.term, 1);
        assert_eq!(n.role(), Role::Candidate);
    }

    #[tokio::test]
    async fn stale_term_vote_request_is_rejected() {
        let mut n = node("a");
        n.start_election();
        n.start_election();
        let reply = n
            .handle_request_vote(RequestVoteArgs {
                term: 1,
                candidate_id: "b".into(),
                last_log_index: 0,
                last_log_term: 0,
            })
            .await;
        assert!(!reply.vote_granted);
    }

    #[tokio::test]
    async fn majority_votes_become_leader() {
        let mut n = node("a");
        n.start_election();
        assert!(!n.become_leader_if_majority(1, 5));
        assert!(n.become_leader_if_majority(3, 5));
        assert_eq!(n.role(), Role::Leader);
    }

    #[tokio::test]
    async fn propose_requires_leadership() {
        let n = node("a");
        let err = n.propose("entry".to_owned()).await.unwrap_err();
        assert!(matches!(err, RaftError::NotLeader));
    }

    #[tokio::test]
    async fn commit_index_advances_on_majority_match() {
        let mut n = node("a");
        n.start_election();
        n.become_leader_if_majority(3, 5);
        n.propose("e1".to_owned()).await.unwrap();
        n.advance_commit_index(&[1, 1, 1, 0, 0], 5);
        assert_eq!(n.commit_index(), 1);
    }
}
