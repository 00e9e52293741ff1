//! The control plane's unified error surface. Library crates each keep
//! their own tight error enum (`RepoError`, `PublishError`,
//! `McgProposalError`, ...); this enum is where those get folded
//! together for the operations `services/node` exposes.

use mesh_consensus::{McgProposalError, RaftError};
use mesh_core::RepoError;
use mesh_crypto::CryptoError;
use mesh_streams::{HandlerError, PublishError};

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("persistence error: {0}")]
    Repo(#[from] RepoError),
    #[error("this node is not the {0} leader")]
    NotLeader(&'static str),
    #[error("mesh is in critical mode: {0}")]
    CriticalMode(#[from] McgProposalError),
    #[error("raft error: {0}")]
    Raft(#[from] RaftError),
    #[error("unknown stream {0}")]
    UnknownStream(String),
    #[error("unknown node {0}")]
    UnknownNode(String),
    #[error("publish rejected: {0}")]
    Publish(#[from] PublishError),
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("handler error: {0}")]
    Handler(#[from] HandlerError),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("consensus unavailable: mesh cannot currently reach an MCG quorum")]
    ConsensusUnavailable,
}
