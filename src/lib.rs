//! Workspace root for the mesh overlay: membership, link-state routing,
//! consensus, and ordered exactly-once streaming live in the `crates/`
//! members; `services/node` assembles them into the running node
//! binary. This crate itself carries no runtime code — it exists so the
//! workspace has a place to hang cross-crate integration tests under
//! `tests/integration/`.
