use crate::device::Event;
use dashmap::DashMap;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::net::SocketAddr;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::tungstenite::{self, Message};
use wifidice::ServerFrame;

pub type ID = uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("websocket: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("device loop has stopped")]
    Closed,
}

/// Outbound queues of every connected client.
#[derive(Debug, Default)]
pub struct Store {
    clients: DashMap<ID, mpsc::Sender<String>>,
}

impl Store {
    pub fn insert(&self, id: ID, tx: mpsc::Sender<String>) {
        self.clients.insert(id, tx);
    }

    pub fn remove(&self, id: &ID) {
        self.clients.remove(id);
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn broadcast(&self, frame: &ServerFrame) {
        let Some(text) = encode(frame) else { return };
        let mut closed = Vec::new();
        for client in self.clients.iter() {
            if !Self::offer(client.key(), client.value(), text.clone()) {
                closed.push(*client.key());
            }
        }
        for id in closed {
            self.remove(&id);
        }
    }

    pub fn send_to(&self, id: &ID, frame: &ServerFrame) {
        let Some(text) = encode(frame) else { return };
        let open = match self.clients.get(id) {
            Some(tx) => Self::offer(id, tx.value(), text),
            None => {
                tracing::debug!(%id, "send to unknown client");
                return;
            }
        };
        if !open {
            self.remove(id);
        }
    }

    /// Queues without waiting. Returns false once the client is gone.
    fn offer(id: &ID, tx: &mpsc::Sender<String>, text: String) -> bool {
        match tx.try_send(text) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(%id, "client queue full, dropping frame");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

fn encode(frame: &ServerFrame) -> Option<String> {
    match frame.to_text() {
        Ok(text) => Some(text),
        Err(err) => {
            tracing::error!(%err, "could not encode {:?}", frame);
            None
        }
    }
}

/// One connected client.
pub struct Session {
    id: ID,
    tx: mpsc::Sender<String>,
    rx: mpsc::Receiver<String>,
    address: SocketAddr,
}

impl Session {
    pub fn new(address: SocketAddr, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            id: ID::new_v4(),
            tx,
            rx,
            address,
        }
    }

    #[tracing::instrument(skip(self, stream, events), fields(id = %self.id, address = %self.address))]
    pub async fn run(self, stream: TcpStream, events: mpsc::Sender<Event>) -> Result<(), Error> {
        let Self {
            id,
            tx,
            rx,
            address,
        } = self;
        let socket = tokio_tungstenite::accept_async(stream).await?;
        let (sink, stream) = socket.split();

        // the device registers the queue, so nothing reaches it before the greeting
        events
            .send(Event::Connected { id, address, tx })
            .await
            .map_err(|_| Error::Closed)?;
        let result = tokio::select! {
            value = Self::write(sink, rx) => value,
            value = Self::read(id, stream, &events) => value,
        };
        events
            .send(Event::Disconnected { id })
            .await
            .map_err(|_| Error::Closed)?;
        result
    }

    async fn write(
        mut sink: impl Sink<Message, Error = tungstenite::Error> + Unpin,
        mut rx: mpsc::Receiver<String>,
    ) -> Result<(), Error> {
        while let Some(text) = rx.recv().await {
            sink.send(Message::Text(text)).await?;
        }
        Ok(())
    }

    async fn read(
        id: ID,
        mut stream: impl Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
        events: &mpsc::Sender<Event>,
    ) -> Result<(), Error> {
        while let Some(message) = stream.next().await {
            let event = match message? {
                Message::Text(text) => Event::Text {
                    id,
                    bytes: text.into_bytes(),
                },
                Message::Binary(bytes) => Event::Binary { id, bytes },
                Message::Close(_) => break,
                _ => continue,
            };
            events.send(event).await.map_err(|_| Error::Closed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(store: &Store, capacity: usize) -> (ID, mpsc::Receiver<String>) {
        let id = ID::new_v4();
        let (tx, rx) = mpsc::channel(capacity);
        store.insert(id, tx);
        (id, rx)
    }

    #[test]
    fn broadcast_reaches_everyone() {
        let store = Store::default();
        let (_, mut a) = client(&store, 4);
        let (_, mut b) = client(&store, 4);
        store.broadcast(&ServerFrame::Greeting);
        assert_eq!(a.try_recv().unwrap(), wifidice::GREETING);
        assert_eq!(b.try_recv().unwrap(), wifidice::GREETING);
    }

    #[test]
    fn send_to_one() {
        let store = Store::default();
        let (a_id, mut a) = client(&store, 4);
        let (_, mut b) = client(&store, 4);
        store.send_to(&a_id, &ServerFrame::Greeting);
        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_err());
    }

    #[test]
    fn full_queue_drops_frame() {
        let store = Store::default();
        let (_, mut a) = client(&store, 1);
        store.broadcast(&ServerFrame::Greeting);
        store.broadcast(&ServerFrame::Greeting);
        assert_eq!(store.len(), 1);
        assert!(a.try_recv().is_ok());
        assert!(a.try_recv().is_err());
    }

    #[test]
    fn closed_queue_unregisters() {
        let store = Store::default();
        let (_, a) = client(&store, 1);
        let (b_id, b) = client(&store, 1);
        drop(a);
        store.broadcast(&ServerFrame::Greeting);
        assert_eq!(store.len(), 1);
        drop(b);
        store.send_to(&b_id, &ServerFrame::Greeting);
        assert_eq!(store.len(), 0);
    }
}
