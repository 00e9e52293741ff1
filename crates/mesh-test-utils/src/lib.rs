//! Shared test doubles: a mock peer listener and a raw mock client,
//! speaking the real wire frame format, for exercising the transport
//! layer without standing up a full multi-node mesh.

pub mod mock_peer_client;
pub mod mock_peer_server;

pub use mock_peer_client::MockPeerClient;
pub use mock_peer_server::MockPeerServer;
