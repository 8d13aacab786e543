use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    tungstenite::{self, Message},
    MaybeTlsStream, WebSocketStream,
};
use wifidice::{Command, ServerFrame};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("websocket: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("frame: {0}")]
    Frame(#[from] wifidice::frame::Error),
}

#[derive(Debug)]
pub struct Session {
    socket: Socket,
}

impl Session {
    #[tracing::instrument]
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let (socket, response) = tokio_tungstenite::connect_async(url).await?;
        tracing::info!(status = %response.status(), "Connected");
        Ok(Self { socket })
    }

    pub fn split(self) -> (Sender, Receiver) {
        let (sink, stream) = self.socket.split();
        (Sender { sink }, Receiver { stream })
    }
}

pub struct Sender {
    sink: SplitSink<Socket, Message>,
}

impl Sender {
    pub async fn roll(&mut self, bound: u32) -> Result<(), Error> {
        if let Some(frame) = (Command::Roll { bound }).to_frame() {
            tracing::debug!("Sending frame: {}", frame);
            self.sink.send(Message::Text(frame)).await?;
        }
        Ok(())
    }
}

pub struct Receiver {
    stream: SplitStream<Socket>,
}

impl Receiver {
    /// Next frame from the device, `None` once the connection is closed.
    pub async fn next(&mut self) -> Result<Option<ServerFrame>, Error> {
        while let Some(message) = self.stream.next().await {
            match message? {
                Message::Text(text) => {
                    let frame = ServerFrame::parse(&text)?;
                    tracing::debug!("Received frame: {:?}", frame);
                    return Ok(Some(frame));
                }
                Message::Close(_) => break,
                _ => continue,
            }
        }
        Ok(None)
    }
}
