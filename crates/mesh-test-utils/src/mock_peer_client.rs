//! A minimal raw WebSocket client for driving a node's inbound listener
//! in tests, speaking the same length-prefixed binary frames as a real
//! peer link.

use futures_util::{SinkExt, StreamExt};
use mesh_protocol::Message;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::MaybeTlsStream;

type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

pub struct MockPeerClient {
    write: futures_util::stream::SplitSink<WsStream, WsMessage>,
    read: futures_util::stream::SplitStream<WsStream>,
}

impl MockPeerClient {
    pub async fn connect(url: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(url).await?;
        let (write, read) = ws_stream.split();
        Ok(MockPeerClient { write, read })
    }

    pub async fn send(&mut self, message: &Message) -> Result<(), Box<dyn std::error::Error>> {
        let frame = message.to_frame()?;
        self.write.send(WsMessage::Binary(frame.into())).await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> Result<Message, Box<dyn std::error::Error>> {
        loop {
            match self.read.next().await {
                Some(Ok(WsMessage::Binary(bytes))) => return Ok(Message::from_frame(&bytes)?),
                Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => continue,
                Some(Ok(WsMessage::Close(_))) => return Err("connection closed by peer".into()),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => return Err("connection stream ended".into()),
            }
        }
    }
}
