//! A mock link listener for testing dialers and link-loop behavior.
//!
//! Binds to port 0, accepts connections, and replies to the first frame
//! it receives with a heartbeat addressed back to the sender — enough to
//! exercise a dialer's handshake expectations without a real peer node.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use mesh_protocol::{Framer, Message, MessageType, Priority};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;

pub struct MockPeerServer {
    addr: SocketAddr,
    _task: tokio::task::JoinHandle<()>,
}

impl MockPeerServer {
    pub async fn start(server_node_id: impl Into<String> + Send + 'static) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            Self::accept_loop(listener, server_node_id.into()).await;
        });
        Ok(MockPeerServer { addr, _task: task })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    async fn accept_loop(listener: TcpListener, server_node_id: String) {
        loop {
            match listener.accept().await {
                Ok((stream, _peer)) => {
                    let node_id = server_node_id.clone();
                    tokio::spawn(async move {
                        let _ = Self::handle_connection(stream, node_id).await;
                    });
                }
                Err(_) => break,
            }
        }
    }

    async fn handle_connection(
        stream: tokio::net::TcpStream,
        server_node_id: String,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let ws_stream = tokio_tungstenite::accept_async(stream).await?;
        let (mut write, mut read) = ws_stream.split();
        let framer = Framer::new(server_node_id);

        while let Some(msg_result) = read.next().await {
            let msg = msg_result?;
            let bytes = match msg {
                WsMessage::Binary(b) => b.to_vec(),
                WsMessage::Close(_) => break,
                _ => continue,
            };
            let incoming = Message::from_frame(&bytes)?;
            let header = framer.header(MessageType::Heartbeat, incoming.header.from, Priority::Low, 0);
            let reply = Message::new(header, Vec::new());
            write.send(WsMessage::Binary(reply.to_frame()?.into())).await?;
        }
        Ok(())
    }
}
