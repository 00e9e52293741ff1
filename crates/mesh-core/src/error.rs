/// Errors a persistence port can return. Ports are abstract — a real
/// adapter (Postgres, Redis, an embedded log store) is external
/// collaborator work; only this error surface and the in-memory
/// reference implementations live here.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

pub type RepoResult<T> = Result<T, RepoError>;
