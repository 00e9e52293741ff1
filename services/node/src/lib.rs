//! The node library: shared state, the Service API (`control_plane`),
//! inbound message dispatch, and the status HTTP surface. Split from
//! `main.rs` so integration tests (and the binary itself) can drive a
//! node's lifecycle without going through the CLI.

pub mod config;
pub mod control_plane;
pub mod dispatch;
pub mod error;
pub mod fanout;
pub mod handler;
pub mod health;
pub mod http;
pub mod keyring;
pub mod state;
